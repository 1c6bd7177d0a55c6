use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::core::error::Result;
use crate::core::extractor::AppJson;
use crate::features::auth::model::AuthContext;
use crate::features::users::dtos::{CreateUserDto, UpdateUserDto, UserListQuery, UserResponseDto};
use crate::features::users::services::UserService;
use crate::shared::types::{ApiResponse, DeletedQuery};

/// List users
#[utoipa::path(
    get,
    path = "/api/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Page of users", body = ApiResponse<Vec<UserResponseDto>>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "users",
    security(("api_key" = []))
)]
pub async fn list_users(
    ctx: AuthContext,
    State(service): State<Arc<UserService>>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<ApiResponse<Vec<UserResponseDto>>>> {
    let page = service.list(&ctx, &query).await?;
    let meta = page.meta();
    Ok(Json(ApiResponse::success(Some(page.items), None, Some(meta))))
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(
        ("id" = i64, Path, description = "User id"),
        DeletedQuery
    ),
    responses(
        (status = 200, description = "User found", body = ApiResponse<UserResponseDto>),
        (status = 404, description = "User not found")
    ),
    tag = "users",
    security(("api_key" = []))
)]
pub async fn get_user(
    ctx: AuthContext,
    State(service): State<Arc<UserService>>,
    Path(id): Path<i64>,
    Query(query): Query<DeletedQuery>,
) -> Result<Json<ApiResponse<UserResponseDto>>> {
    let user = service.get(&ctx, id, query.show_deleted()).await?;
    Ok(Json(ApiResponse::success(Some(user), None, None)))
}

/// Create a user
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserDto,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Only administrators can assign roles"),
        (status = 409, description = "Email already registered")
    ),
    tag = "users",
    security(("api_key" = []))
)]
pub async fn create_user(
    ctx: AuthContext,
    State(service): State<Arc<UserService>>,
    AppJson(dto): AppJson<CreateUserDto>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponseDto>>)> {
    dto.validate()?;

    let user = service.create(&ctx, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(user), None, None)),
    ))
}

/// Partially update a user
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUserDto,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Only administrators can assign roles"),
        (status = 404, description = "User not found")
    ),
    tag = "users",
    security(("api_key" = []))
)]
pub async fn update_user(
    ctx: AuthContext,
    State(service): State<Arc<UserService>>,
    Path(id): Path<i64>,
    AppJson(dto): AppJson<UpdateUserDto>,
) -> Result<Json<ApiResponse<UserResponseDto>>> {
    dto.validate()?;

    let user = service.update(&ctx, id, dto).await?;
    Ok(Json(ApiResponse::success(Some(user), None, None)))
}

/// Soft delete a user
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 204, description = "User moved to the trash"),
        (status = 404, description = "User not found")
    ),
    tag = "users",
    security(("api_key" = []))
)]
pub async fn delete_user(
    State(service): State<Arc<UserService>>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create the default administrator
///
/// Public, and only allowed while no user exists.
#[utoipa::path(
    post,
    path = "/api/users/default",
    responses(
        (status = 201, description = "Default admin created", body = ApiResponse<UserResponseDto>),
        (status = 409, description = "Users already exist")
    ),
    tag = "users"
)]
pub async fn create_default_user(
    State(service): State<Arc<UserService>>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponseDto>>)> {
    let user = service.create_default().await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(user), None, None)),
    ))
}
