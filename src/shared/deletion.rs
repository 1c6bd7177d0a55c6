//! Soft and hard deletion for any table with a nullable `deleted_at` column.
//!
//! Nothing here checks permissions. Handlers pick the mode with
//! [`resolve_delete_mode`] before calling [`soft_delete`] or [`hard_delete`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::core::error::{handle_db_error, AppError, Result};
use crate::features::auth::model::AuthContext;

/// Storage that can mark, clear and purge rows by id
#[async_trait]
pub trait DeletableStore: Send + Sync {
    /// Human readable entity name used in error messages
    fn entity_name(&self) -> &'static str;

    /// `None` when the row does not exist, otherwise whether it is soft-deleted
    async fn is_deleted(&self, id: i64) -> Result<Option<bool>>;

    /// Returns false when no row has this id
    async fn set_deleted_at(&self, id: i64, deleted_at: Option<DateTime<Utc>>) -> Result<bool>;

    /// Returns false when no row has this id
    async fn purge(&self, id: i64) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    Soft,
    Hard,
}

/// Admins delete permanently, everyone else moves rows to the trash.
/// Only admins may touch a row that is already in the trash.
pub fn resolve_delete_mode(ctx: &AuthContext, already_deleted: bool) -> Result<DeleteMode> {
    match (ctx.is_admin(), already_deleted) {
        (true, _) => Ok(DeleteMode::Hard),
        (false, false) => Ok(DeleteMode::Soft),
        (false, true) => Err(AppError::Forbidden(
            "Only administrators can delete items from the trash".to_string(),
        )),
    }
}

fn not_found<S: DeletableStore + ?Sized>(store: &S, id: i64) -> AppError {
    AppError::NotFound(format!("{} {} not found", store.entity_name(), id))
}

/// Set `deleted_at = now()`. Deleting twice overwrites the timestamp.
pub async fn soft_delete<S: DeletableStore + ?Sized>(store: &S, id: i64) -> Result<()> {
    if !store.set_deleted_at(id, Some(Utc::now())).await? {
        return Err(not_found(store, id));
    }
    tracing::info!("Soft deleted {} {}", store.entity_name(), id);
    Ok(())
}

/// Remove the row permanently. There is no way back.
pub async fn hard_delete<S: DeletableStore + ?Sized>(store: &S, id: i64) -> Result<()> {
    if !store.purge(id).await? {
        return Err(not_found(store, id));
    }
    tracing::info!("Hard deleted {} {}", store.entity_name(), id);
    Ok(())
}

/// Clear `deleted_at`. Restoring an active row is a no-op.
pub async fn restore<S: DeletableStore + ?Sized>(store: &S, id: i64) -> Result<()> {
    if !store.set_deleted_at(id, None).await? {
        return Err(not_found(store, id));
    }
    tracing::info!("Restored {} {}", store.entity_name(), id);
    Ok(())
}

/// Look the row up, pick the mode for `ctx`, then delete
pub async fn delete_for<S: DeletableStore + ?Sized>(
    store: &S,
    ctx: &AuthContext,
    id: i64,
) -> Result<DeleteMode> {
    let already_deleted = store
        .is_deleted(id)
        .await?
        .ok_or_else(|| not_found(store, id))?;

    let mode = resolve_delete_mode(ctx, already_deleted)?;
    match mode {
        DeleteMode::Soft => soft_delete(store, id).await?,
        DeleteMode::Hard => hard_delete(store, id).await?,
    }
    Ok(mode)
}

// =============================================================================
// POSTGRES HELPERS
// =============================================================================
// `table` is always a compile-time constant owned by a repository, never input.

pub async fn pg_is_deleted(pool: &PgPool, table: &'static str, id: i64) -> Result<Option<bool>> {
    let sql = format!("SELECT deleted_at IS NOT NULL FROM {} WHERE id = $1", table);
    sqlx::query_scalar::<_, bool>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to read deletion state from {}: {:?}", table, e);
            AppError::Database(e)
        })
}

pub async fn pg_set_deleted_at(
    pool: &PgPool,
    table: &'static str,
    id: i64,
    deleted_at: Option<DateTime<Utc>>,
) -> Result<bool> {
    let sql = format!("UPDATE {} SET deleted_at = $1 WHERE id = $2", table);
    let result = sqlx::query(&sql)
        .bind(deleted_at)
        .bind(id)
        .execute(pool)
        .await
        // restoring a task can collide with an active slug
        .map_err(handle_db_error)?;
    Ok(result.rows_affected() > 0)
}

pub async fn pg_purge(pool: &PgPool, table: &'static str, id: i64) -> Result<bool> {
    let sql = format!("DELETE FROM {} WHERE id = $1", table);
    let result = sqlx::query(&sql)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete from {}: {:?}", table, e);
            AppError::Database(e)
        })?;
    Ok(result.rows_affected() > 0)
}
