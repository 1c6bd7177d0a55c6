//! Role-based authorization guards.
//!
//! Roles are flat: `ROLE_ADMIN` may hard delete and purge the trash,
//! `ROLE_USER` may do everything else.

use crate::core::error::AppError;
use crate::features::auth::model::AuthContext;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Guard for checking if user is an administrator.
///
/// # Example
/// ```ignore
/// pub async fn handler(RequireAdmin(ctx): RequireAdmin) { ... }
/// ```
pub struct RequireAdmin(pub AuthContext);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts
            .extensions
            .get::<AuthContext>()
            .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))?;

        if !ctx.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }

        Ok(RequireAdmin(ctx.clone()))
    }
}
