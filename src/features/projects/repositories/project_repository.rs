use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::core::error::{handle_db_error, AppError, Result};
use crate::features::projects::models::{Project, ProjectSummary};
use crate::shared::deletion::{pg_is_deleted, pg_purge, pg_set_deleted_at, DeletableStore};
use crate::shared::query::{paginate, Page, PageRequest, PagedQuery, ProjectFilter};

#[async_trait]
pub trait ProjectRepository: DeletableStore {
    async fn list(&self, filter: &ProjectFilter, page: &PageRequest)
        -> Result<Page<ProjectSummary>>;

    /// Active projects ordered by name
    async fn all_active(&self) -> Result<Vec<Project>>;

    /// Any project with this id, deleted or not
    async fn find(&self, id: i64) -> Result<Option<Project>>;

    async fn create(&self, name: &str, description: Option<&str>) -> Result<Project>;

    async fn update(
        &self,
        id: i64,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Option<Project>>;
}

const TABLE: &str = "projects";

// Only active tasks are counted; the join multiplies rows, hence DISTINCT.
const LIST_QUERY: PagedQuery<'static> = PagedQuery {
    select: "SELECT p.id, p.name, p.description, p.deleted_at, COUNT(t.id) AS task_count \
             FROM projects p \
             LEFT JOIN tasks t ON t.project_id = p.id AND t.deleted_at IS NULL",
    count: "SELECT COUNT(DISTINCT p.id) FROM projects p \
            LEFT JOIN tasks t ON t.project_id = p.id AND t.deleted_at IS NULL",
    group_by: Some("p.id"),
    order_column: "p.id",
};

pub struct PgProjectRepository {
    pool: PgPool,
}

impl PgProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeletableStore for PgProjectRepository {
    fn entity_name(&self) -> &'static str {
        "Project"
    }

    async fn is_deleted(&self, id: i64) -> Result<Option<bool>> {
        pg_is_deleted(&self.pool, TABLE, id).await
    }

    async fn set_deleted_at(&self, id: i64, deleted_at: Option<DateTime<Utc>>) -> Result<bool> {
        pg_set_deleted_at(&self.pool, TABLE, id, deleted_at).await
    }

    async fn purge(&self, id: i64) -> Result<bool> {
        pg_purge(&self.pool, TABLE, id).await
    }
}

#[async_trait]
impl ProjectRepository for PgProjectRepository {
    async fn list(
        &self,
        filter: &ProjectFilter,
        page: &PageRequest,
    ) -> Result<Page<ProjectSummary>> {
        paginate(&self.pool, &LIST_QUERY, filter, page).await
    }

    async fn all_active(&self) -> Result<Vec<Project>> {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, deleted_at
            FROM projects
            WHERE deleted_at IS NULL
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list projects: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn find(&self, id: i64) -> Result<Option<Project>> {
        sqlx::query_as::<_, Project>(
            "SELECT id, name, description, deleted_at FROM projects WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get project by id: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn create(&self, name: &str, description: Option<&str>) -> Result<Project> {
        sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description, deleted_at
            "#,
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(handle_db_error)
    }

    async fn update(
        &self,
        id: i64,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Option<Project>> {
        sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects SET
                name = COALESCE($2, name),
                description = COALESCE($3, description)
            WHERE id = $1
            RETURNING id, name, description, deleted_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_optional(&self.pool)
        .await
        .map_err(handle_db_error)
    }
}
