use std::sync::Arc;

use crate::core::error::{AppError, Result};
use crate::features::auth::dtos::{LoginRequestDto, LoginResponseDto};
use crate::features::auth::model::AuthContext;
use crate::features::auth::password::verify_password;
use crate::features::auth::token::{JwtTokenManager, TokenError};
use crate::features::users::repositories::UserRepository;

/// Service for authentication operations (login, token checks)
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: JwtTokenManager,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: JwtTokenManager) -> Self {
        Self { users, tokens }
    }

    /// Verify credentials and rotate the user's API token
    pub async fn login(&self, dto: LoginRequestDto) -> Result<LoginResponseDto> {
        let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

        let user = self
            .users
            .find_by_email(&dto.email)
            .await?
            .filter(|u| u.deleted_at.is_none())
            .ok_or_else(invalid)?;

        let password_valid = verify_password(&dto.password, &user.password).map_err(|e| {
            tracing::error!("Stored password hash for user {} is unusable: {}", user.id, e);
            AppError::Internal(e.to_string())
        })?;

        if !password_valid {
            tracing::debug!("Failed login for user {}", user.id);
            return Err(invalid());
        }

        let token = self.tokens.issue(user.id).map_err(|e| {
            tracing::error!("Failed to issue token: {}", e);
            AppError::Internal(e.to_string())
        })?;

        self.users.set_api_token(user.id, Some(&token)).await?;

        tracing::info!("User {} logged in", user.id);
        Ok(LoginResponseDto { token })
    }

    /// Resolve an API token to the caller's context.
    ///
    /// The token must verify, belong to an active user, and still be that
    /// user's current token.
    pub async fn authenticate(&self, token: &str) -> Result<AuthContext> {
        let claims = self.tokens.verify(token).map_err(|e| match e {
            TokenError::Expired => AppError::Unauthorized("API token has expired".to_string()),
            _ => AppError::Unauthorized("Invalid API token".to_string()),
        })?;

        let user = self
            .users
            .find(claims.user_id)
            .await?
            .filter(|u| u.deleted_at.is_none())
            .ok_or_else(|| AppError::Unauthorized("Invalid API token".to_string()))?;

        if user.api_token.as_deref() != Some(token) {
            return Err(AppError::Unauthorized(
                "API token has been replaced by a newer login".to_string(),
            ));
        }

        Ok(AuthContext {
            user_id: user.id,
            email: user.email,
            username: user.username,
            roles: user.roles,
        })
    }

    /// Forget the stored token so it stops authenticating
    pub async fn logout(&self, ctx: &AuthContext) -> Result<()> {
        self.users.set_api_token(ctx.user_id, None).await?;
        tracing::info!("User {} logged out", ctx.user_id);
        Ok(())
    }
}
