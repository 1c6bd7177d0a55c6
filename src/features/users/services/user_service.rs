use std::sync::Arc;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthContext;
use crate::features::auth::password::hash_password;
use crate::features::users::dtos::{CreateUserDto, UpdateUserDto, UserListQuery, UserResponseDto};
use crate::features::users::models::{NewUser, UserChanges};
use crate::features::users::repositories::UserRepository;
use crate::shared::constants::{DEFAULT_ADMIN_EMAIL, ROLE_ADMIN, ROLE_USER};
use crate::shared::deletion;
use crate::shared::query::filter::search_term;
use crate::shared::query::{Page, PageRequest, TrashPolicy, UserFilter};

/// Service for user account management
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    trash: TrashPolicy,
    default_admin_password: Option<String>,
}

impl UserService {
    pub fn new(
        repo: Arc<dyn UserRepository>,
        trash: TrashPolicy,
        default_admin_password: Option<String>,
    ) -> Self {
        Self {
            repo,
            trash,
            default_admin_password,
        }
    }

    pub async fn list(
        &self,
        ctx: &AuthContext,
        query: &UserListQuery,
    ) -> Result<Page<UserResponseDto>> {
        let filter = UserFilter {
            search: search_term(query.search.as_deref()),
            visibility: self.trash.resolve(ctx, query.deleted.unwrap_or(false))?,
        };
        let page = PageRequest::new(query.page, query.limit, query.sort);

        let users = self.repo.list(&filter, &page).await?;
        Ok(users.map(UserResponseDto::from))
    }

    /// Active users, for assignment forms
    pub async fn list_active(&self) -> Result<Vec<UserResponseDto>> {
        let users = self.repo.all_active().await?;
        Ok(users.into_iter().map(UserResponseDto::from).collect())
    }

    pub async fn get(
        &self,
        ctx: &AuthContext,
        id: i64,
        show_deleted: bool,
    ) -> Result<UserResponseDto> {
        let visibility = self.trash.resolve(ctx, show_deleted)?;

        self.repo
            .find(id)
            .await?
            .filter(|u| visibility.admits(u.deleted_at))
            .map(UserResponseDto::from)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    pub async fn create(&self, ctx: &AuthContext, dto: CreateUserDto) -> Result<UserResponseDto> {
        ensure_may_set_roles(ctx, dto.roles.as_deref())?;
        let password_hash = hash(&dto.password)?;

        let user = self
            .repo
            .create(NewUser {
                email: dto.email,
                username: dto.username,
                password_hash,
                roles: dto.roles.unwrap_or_else(|| vec![ROLE_USER.to_string()]),
            })
            .await?;

        tracing::info!("Created user {} ({})", user.id, user.email);
        Ok(user.into())
    }

    pub async fn update(
        &self,
        ctx: &AuthContext,
        id: i64,
        dto: UpdateUserDto,
    ) -> Result<UserResponseDto> {
        ensure_may_set_roles(ctx, dto.roles.as_deref())?;
        let password_hash = dto.password.as_deref().map(hash).transpose()?;

        let user = self
            .repo
            .update(
                id,
                UserChanges {
                    email: dto.email,
                    username: dto.username,
                    password_hash,
                    roles: dto.roles,
                },
            )
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        tracing::info!("Updated user {}", id);
        Ok(user.into())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        deletion::soft_delete(self.repo.as_ref(), id).await
    }

    /// Create `default@mail.com` as the first administrator.
    ///
    /// Only allowed while the users table is empty.
    pub async fn create_default(&self) -> Result<UserResponseDto> {
        if self.repo.count().await? > 0 {
            return Err(AppError::Conflict(
                "Users already exist; the default account can only be created once".to_string(),
            ));
        }

        let password = self.default_admin_password.as_deref().ok_or_else(|| {
            AppError::BadRequest("DEFAULT_ADMIN_PASSWORD is not configured".to_string())
        })?;

        let user = self
            .repo
            .create(NewUser {
                email: DEFAULT_ADMIN_EMAIL.to_string(),
                username: "default".to_string(),
                password_hash: hash(password)?,
                roles: vec![ROLE_ADMIN.to_string(), ROLE_USER.to_string()],
            })
            .await?;

        tracing::info!("Created default admin user {}", user.id);
        Ok(user.into())
    }
}

/// Only administrators may grant or change roles
fn ensure_may_set_roles(ctx: &AuthContext, roles: Option<&[String]>) -> Result<()> {
    if roles.is_some() && !ctx.is_admin() {
        return Err(AppError::Forbidden(
            "Only administrators can assign roles".to_string(),
        ));
    }
    Ok(())
}

fn hash(password: &str) -> Result<String> {
    hash_password(password).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        AppError::Internal(e.to_string())
    })
}
