use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::core::error::{handle_db_error, AppError, Result};
use crate::features::users::models::{NewUser, User, UserChanges};
use crate::shared::deletion::{pg_is_deleted, pg_purge, pg_set_deleted_at, DeletableStore};
use crate::shared::query::{paginate, Page, PageRequest, PagedQuery, UserFilter};

#[async_trait]
pub trait UserRepository: DeletableStore {
    async fn list(&self, filter: &UserFilter, page: &PageRequest) -> Result<Page<User>>;

    async fn all_active(&self) -> Result<Vec<User>>;

    /// Any user with this id, deleted or not
    async fn find(&self, id: i64) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Number of users including soft-deleted ones
    async fn count(&self) -> Result<i64>;

    async fn create(&self, user: NewUser) -> Result<User>;

    async fn update(&self, id: i64, changes: UserChanges) -> Result<Option<User>>;

    async fn set_api_token(&self, id: i64, token: Option<&str>) -> Result<()>;
}

const TABLE: &str = "users";

const RETURNING: &str = "id, email, username, password, roles, api_token, deleted_at";

const LIST_QUERY: PagedQuery<'static> = PagedQuery {
    select: "SELECT u.id, u.email, u.username, u.password, u.roles, u.api_token, u.deleted_at \
             FROM users u",
    count: "SELECT COUNT(*) FROM users u",
    group_by: None,
    order_column: "u.id",
};

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeletableStore for PgUserRepository {
    fn entity_name(&self) -> &'static str {
        "User"
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
impl UserRepository for PgUserRepository {
    async fn list(&self, filter: &UserFilter, page: &PageRequest) -> Result<Page<User>> {
        paginate(&self.pool, &LIST_QUERY, filter, page).await
    }

    async fn all_active(&self) -> Result<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE deleted_at IS NULL ORDER BY username",
            RETURNING
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list active users: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn find(&self, id: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", RETURNING))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get user by id: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE email = $1", RETURNING))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get user by email: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count users: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, username, password, roles) VALUES ($1, $2, $3, $4) \
             RETURNING {}",
            RETURNING
        ))
        .bind(user.email)
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.roles)
        .fetch_one(&self.pool)
        .await
        .map_err(handle_db_error)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                username = COALESCE($3, username),
                password = COALESCE($4, password),
                roles = COALESCE($5, roles)
            WHERE id = $1
            RETURNING {}
            "#,
            RETURNING
        ))
        .bind(id)
        .bind(changes.email)
        .bind(changes.username)
        .bind(changes.password_hash)
        .bind(changes.roles)
        .fetch_optional(&self.pool)
        .await
        .map_err(handle_db_error)
    }

    async fn set_api_token(&self, id: i64, token: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE users SET api_token = $2 WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to store api token: {:?}", e);
                AppError::Database(e)
            })?;
        Ok(())
    }
}
