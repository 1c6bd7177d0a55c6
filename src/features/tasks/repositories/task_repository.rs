use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::core::error::{handle_db_error, AppError, Result};
use crate::features::tasks::models::{NewTask, Task, TaskAssignee, TaskChanges, TaskRow};
use crate::shared::deletion::{pg_is_deleted, pg_purge, pg_set_deleted_at, DeletableStore};
use crate::shared::query::{paginate, Page, PageRequest, PagedQuery, SqlFilter, TaskFilter};

#[async_trait]
pub trait TaskRepository: DeletableStore {
    async fn list(&self, filter: &TaskFilter, page: &PageRequest) -> Result<Page<TaskRow>>;

    /// Sum of estimates over the same rows [`TaskRepository::list`] would return, 0 when empty
    async fn total_estimates(&self, filter: &TaskFilter) -> Result<i64>;

    /// Any task with this id, deleted or not
    async fn find(&self, id: i64) -> Result<Option<TaskRow>>;

    /// Assignees of every task in `task_ids`, ordered by task then user
    async fn assignees(&self, task_ids: &[i64]) -> Result<Vec<TaskAssignee>>;

    /// Insert the task and link the active users among `assignees` in one transaction
    async fn create(&self, task: NewTask, assignees: &[i64]) -> Result<Task>;

    async fn update(&self, id: i64, changes: TaskChanges) -> Result<Option<Task>>;

    /// Active tasks owned by a project
    async fn for_project(&self, project_id: i64) -> Result<Vec<TaskRow>>;

    /// Active tasks without a project
    async fn unassigned(&self) -> Result<Vec<Task>>;

    /// Move active tasks into a project, returning how many moved
    async fn assign_to_project(&self, project_id: i64, task_ids: &[i64]) -> Result<u64>;

    /// Link active users to a task; existing links and unknown ids are skipped
    async fn add_assignees(&self, task_id: i64, user_ids: &[i64]) -> Result<u64>;
}

const TABLE: &str = "tasks";

const COLUMNS: &str = "id, title, slug, description, estimate, created_at, updated_at, due_date, \
                       project_id, status, category_id, attachments, deleted_at";

const ROW_SELECT: &str = "SELECT t.id, t.title, t.slug, t.description, t.estimate, t.created_at, \
                          t.updated_at, t.due_date, t.project_id, t.status, t.category_id, \
                          t.attachments, t.deleted_at, p.name AS project_name \
                          FROM tasks t LEFT JOIN projects p ON p.id = t.project_id";

const LIST_QUERY: PagedQuery<'static> = PagedQuery {
    select: ROW_SELECT,
    count: "SELECT COUNT(DISTINCT t.id) FROM tasks t LEFT JOIN projects p ON p.id = t.project_id",
    group_by: None,
    order_column: "t.id",
};

const LINK_ASSIGNEES: &str = r#"
    INSERT INTO task_assignees (task_id, user_id)
    SELECT $1, u.id FROM users u
    WHERE u.id = ANY($2) AND u.deleted_at IS NULL
    ON CONFLICT DO NOTHING
"#;

pub struct PgTaskRepository {
    pool: PgPool,
}

impl PgTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn estimates_query(filter: &TaskFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT COALESCE(SUM(t.estimate), 0)::BIGINT FROM tasks t");
    filter.push_conditions(&mut qb);
    qb
}

#[async_trait]
impl DeletableStore for PgTaskRepository {
    fn entity_name(&self) -> &'static str {
        "Task"
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
impl TaskRepository for PgTaskRepository {
    async fn list(&self, filter: &TaskFilter, page: &PageRequest) -> Result<Page<TaskRow>> {
        paginate(&self.pool, &LIST_QUERY, filter, page).await
    }

    async fn total_estimates(&self, filter: &TaskFilter) -> Result<i64> {
        estimates_query(filter)
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to sum task estimates: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn find(&self, id: i64) -> Result<Option<TaskRow>> {
        sqlx::query_as::<_, TaskRow>(&format!("{} WHERE t.id = $1", ROW_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get task by id: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn assignees(&self, task_ids: &[i64]) -> Result<Vec<TaskAssignee>> {
        if task_ids.is_empty() {
            return Ok(vec![]);
        }

        sqlx::query_as::<_, TaskAssignee>(
            r#"
            SELECT ta.task_id, u.id AS user_id, u.username, u.email
            FROM task_assignees ta
            JOIN users u ON u.id = ta.user_id
            WHERE ta.task_id = ANY($1)
            ORDER BY ta.task_id, u.id
            "#,
        )
        .bind(task_ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load task assignees: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn create(&self, task: NewTask, assignees: &[i64]) -> Result<Task> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            tracing::error!("Failed to begin transaction: {:?}", e);
            AppError::Database(e)
        })?;

        let created = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (title, slug, description, estimate, due_date, project_id,
                               status, category_id, attachments)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(task.title)
        .bind(task.slug)
        .bind(task.description)
        .bind(task.estimate)
        .bind(task.due_date)
        .bind(task.project_id)
        .bind(task.status)
        .bind(task.category_id)
        .bind(task.attachments)
        .fetch_one(&mut *tx)
        .await
        .map_err(handle_db_error)?;

        if !assignees.is_empty() {
            sqlx::query(LINK_ASSIGNEES)
                .bind(created.id)
                .bind(assignees.to_vec())
                .execute(&mut *tx)
                .await
                .map_err(handle_db_error)?;
        }

        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit task creation: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(created)
    }

    async fn update(&self, id: i64, changes: TaskChanges) -> Result<Option<Task>> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks SET
                title = COALESCE($2, title),
                slug = COALESCE($3, slug),
                description = COALESCE($4, description),
                estimate = COALESCE($5, estimate),
                due_date = COALESCE($6, due_date),
                project_id = COALESCE($7, project_id),
                status = COALESCE($8, status),
                category_id = COALESCE($9, category_id),
                attachments = COALESCE($10, attachments),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.slug)
        .bind(changes.description)
        .bind(changes.estimate)
        .bind(changes.due_date)
        .bind(changes.project_id)
        .bind(changes.status)
        .bind(changes.category_id)
        .bind(changes.attachments)
        .fetch_optional(&self.pool)
        .await
        .map_err(handle_db_error)
    }

    async fn for_project(&self, project_id: i64) -> Result<Vec<TaskRow>> {
        sqlx::query_as::<_, TaskRow>(&format!(
            "{} WHERE t.project_id = $1 AND t.deleted_at IS NULL ORDER BY t.id",
            ROW_SELECT
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list project tasks: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn unassigned(&self) -> Result<Vec<Task>> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE project_id IS NULL AND deleted_at IS NULL ORDER BY id",
            COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list unassigned tasks: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn assign_to_project(&self, project_id: i64, task_ids: &[i64]) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE tasks SET project_id = $1, updated_at = NOW()
            WHERE id = ANY($2) AND deleted_at IS NULL
            "#,
        )
        .bind(project_id)
        .bind(task_ids.to_vec())
        .execute(&self.pool)
        .await
        .map_err(handle_db_error)?;

        Ok(result.rows_affected())
    }

    async fn add_assignees(&self, task_id: i64, user_ids: &[i64]) -> Result<u64> {
        let result = sqlx::query(LINK_ASSIGNEES)
            .bind(task_id)
            .bind(user_ids.to_vec())
            .execute(&self.pool)
            .await
            .map_err(handle_db_error)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::query::Visibility;

    #[test]
    fn test_estimates_query_shares_list_filter() {
        let filter = TaskFilter {
            min_estimate: 8,
            max_estimate: 20,
            visibility: Visibility::Trashed,
            ..Default::default()
        };
        assert_eq!(
            estimates_query(&filter).sql(),
            "SELECT COALESCE(SUM(t.estimate), 0)::BIGINT FROM tasks t \
             WHERE t.deleted_at IS NOT NULL AND t.estimate BETWEEN $1 AND $2"
        );
    }
}
