use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::features::users::models::User;
use crate::shared::constants::{ROLE_ADMIN, ROLE_USER};
use crate::shared::types::{empty_string_as_none, SortDirection};

fn validate_roles(roles: &[String]) -> Result<(), ValidationError> {
    if roles.iter().all(|r| r == ROLE_ADMIN || r == ROLE_USER) {
        Ok(())
    } else {
        Err(ValidationError::new("unknown_role")
            .with_message(format!("Roles must be {} or {}", ROLE_ADMIN, ROLE_USER).into()))
    }
}

/// Request DTO for creating a user
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateUserDto {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 255, message = "Username must be 1-255 characters"))]
    pub username: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    /// Defaults to `["ROLE_USER"]`
    #[validate(custom(function = "validate_roles"))]
    pub roles: Option<Vec<String>>,
}

/// Request DTO for a partial user update
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateUserDto {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Username must be 1-255 characters"))]
    pub username: Option<String>,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,

    #[validate(custom(function = "validate_roles"))]
    pub roles: Option<Vec<String>>,
}

/// Response DTO for a user (never includes the password or token)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponseDto {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<User> for UserResponseDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            username: u.username,
            roles: u.roles,
            deleted_at: u.deleted_at,
        }
    }
}

/// Query parameters for listing users
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct UserListQuery {
    /// Substring of username or email
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub limit: Option<i64>,
    /// Show the trash instead of active users
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub deleted: Option<bool>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>)]
    pub sort: Option<SortDirection>,
}
