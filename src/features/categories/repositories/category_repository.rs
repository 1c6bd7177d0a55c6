use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::core::error::{handle_db_error, AppError, Result};
use crate::features::categories::models::Category;
use crate::shared::deletion::{pg_is_deleted, pg_purge, pg_set_deleted_at, DeletableStore};
use crate::shared::query::{paginate, CategoryFilter, Page, PageRequest, PagedQuery};

#[async_trait]
pub trait CategoryRepository: DeletableStore {
    async fn list(&self, filter: &CategoryFilter, page: &PageRequest) -> Result<Page<Category>>;

    /// Active categories ordered by name, for filter dropdowns
    async fn all_active(&self) -> Result<Vec<Category>>;

    async fn find(&self, id: i64) -> Result<Option<Category>>;

    async fn create(&self, name: &str, label: &str) -> Result<Category>;

    async fn update(
        &self,
        id: i64,
        name: Option<String>,
        label: Option<String>,
    ) -> Result<Option<Category>>;
}

const TABLE: &str = "categories";

const LIST_QUERY: PagedQuery<'static> = PagedQuery {
    select: "SELECT c.id, c.name, c.label, c.deleted_at FROM categories c",
    count: "SELECT COUNT(*) FROM categories c",
    group_by: None,
    order_column: "c.id",
};

pub struct PgCategoryRepository {
    pool: PgPool,
}

impl PgCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeletableStore for PgCategoryRepository {
    fn entity_name(&self) -> &'static str {
        "Category"
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
impl CategoryRepository for PgCategoryRepository {
    async fn list(&self, filter: &CategoryFilter, page: &PageRequest) -> Result<Page<Category>> {
        paginate(&self.pool, &LIST_QUERY, filter, page).await
    }

    async fn all_active(&self) -> Result<Vec<Category>> {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, label, deleted_at
            FROM categories
            WHERE deleted_at IS NULL
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list categories: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn find(&self, id: i64) -> Result<Option<Category>> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, label, deleted_at FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get category by id: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn create(&self, name: &str, label: &str) -> Result<Category> {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, label)
            VALUES ($1, $2)
            RETURNING id, name, label, deleted_at
            "#,
        )
        .bind(name)
        .bind(label)
        .fetch_one(&self.pool)
        .await
        .map_err(handle_db_error)
    }

    async fn update(
        &self,
        id: i64,
        name: Option<String>,
        label: Option<String>,
    ) -> Result<Option<Category>> {
        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories SET
                name = COALESCE($2, name),
                label = COALESCE($3, label)
            WHERE id = $1
            RETURNING id, name, label, deleted_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(label)
        .fetch_optional(&self.pool)
        .await
        .map_err(handle_db_error)
    }
}
