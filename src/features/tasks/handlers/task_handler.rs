use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::core::error::Result;
use crate::core::extractor::AppJson;
use crate::features::auth::guards::RequireAdmin;
use crate::features::auth::model::AuthContext;
use crate::features::tasks::dtos::{
    AddAssigneesDto, AssignResultDto, AssignTasksDto, CreateTaskDto, TaskDetailDto,
    TaskListItemDto, TaskListQuery, TotalEstimatesDto, UpdateTaskDto,
};
use crate::features::tasks::services::TaskService;
use crate::shared::types::{ApiResponse, DeletedQuery};

/// List tasks
///
/// `meta.total_estimates` sums the estimates of every matching task, not just this page.
#[utoipa::path(
    get,
    path = "/api/tasks",
    params(TaskListQuery),
    responses(
        (status = 200, description = "Page of tasks", body = ApiResponse<Vec<TaskListItemDto>>),
        (status = 403, description = "Trash view requires admin")
    ),
    tag = "tasks",
    security(("api_key" = []))
)]
pub async fn list_tasks(
    ctx: AuthContext,
    State(service): State<Arc<TaskService>>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<ApiResponse<Vec<TaskListItemDto>>>> {
    let listing = service.list(&ctx, &query).await?;

    let mut meta = listing.page.meta();
    meta.total_estimates = Some(listing.total_estimates);

    Ok(Json(ApiResponse::success(
        Some(listing.page.items),
        None,
        Some(meta),
    )))
}

/// Sum of estimates over the filtered tasks
#[utoipa::path(
    get,
    path = "/api/tasks/estimates",
    params(TaskListQuery),
    responses(
        (status = 200, description = "Estimate total", body = ApiResponse<TotalEstimatesDto>),
    ),
    tag = "tasks",
    security(("api_key" = []))
)]
pub async fn task_estimates(
    ctx: AuthContext,
    State(service): State<Arc<TaskService>>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<ApiResponse<TotalEstimatesDto>>> {
    let total_estimates = service.total_estimates(&ctx, &query).await?;
    Ok(Json(ApiResponse::success(
        Some(TotalEstimatesDto { total_estimates }),
        None,
        None,
    )))
}

/// Get task by id
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    params(
        ("id" = i64, Path, description = "Task id"),
        DeletedQuery
    ),
    responses(
        (status = 200, description = "Task found", body = ApiResponse<TaskDetailDto>),
        (status = 404, description = "Task not found")
    ),
    tag = "tasks",
    security(("api_key" = []))
)]
pub async fn get_task(
    ctx: AuthContext,
    State(service): State<Arc<TaskService>>,
    Path(id): Path<i64>,
    Query(query): Query<DeletedQuery>,
) -> Result<Json<ApiResponse<TaskDetailDto>>> {
    let task = service.get(&ctx, id, query.show_deleted()).await?;
    Ok(Json(ApiResponse::success(Some(task), None, None)))
}

/// Create a task
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTaskDto,
    responses(
        (status = 201, description = "Task created", body = ApiResponse<TaskDetailDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Project not found"),
        (status = 409, description = "Slug already in use")
    ),
    tag = "tasks",
    security(("api_key" = []))
)]
pub async fn create_task(
    State(service): State<Arc<TaskService>>,
    AppJson(dto): AppJson<CreateTaskDto>,
) -> Result<(StatusCode, Json<ApiResponse<TaskDetailDto>>)> {
    dto.validate()?;

    let task = service.create(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(task), None, None)),
    ))
}

/// Partially update a task
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    params(("id" = i64, Path, description = "Task id")),
    request_body = UpdateTaskDto,
    responses(
        (status = 200, description = "Task updated", body = ApiResponse<TaskDetailDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Task not found")
    ),
    tag = "tasks",
    security(("api_key" = []))
)]
pub async fn update_task(
    State(service): State<Arc<TaskService>>,
    Path(id): Path<i64>,
    AppJson(dto): AppJson<UpdateTaskDto>,
) -> Result<Json<ApiResponse<TaskDetailDto>>> {
    dto.validate()?;

    let task = service.update(id, dto).await?;
    Ok(Json(ApiResponse::success(Some(task), None, None)))
}

/// Move a task to the trash
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(("id" = i64, Path, description = "Task id")),
    responses(
        (status = 204, description = "Task moved to the trash"),
        (status = 404, description = "Task not found")
    ),
    tag = "tasks",
    security(("api_key" = []))
)]
pub async fn delete_task(
    State(service): State<Arc<TaskService>>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    service.soft_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Restore a task from the trash
#[utoipa::path(
    post,
    path = "/api/tasks/{id}/restore",
    params(("id" = i64, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task restored", body = ApiResponse<TaskDetailDto>),
        (status = 404, description = "Task not found"),
        (status = 409, description = "An active task already uses this slug")
    ),
    tag = "tasks",
    security(("api_key" = []))
)]
pub async fn restore_task(
    State(service): State<Arc<TaskService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<TaskDetailDto>>> {
    let task = service.restore(id).await?;
    Ok(Json(ApiResponse::success(
        Some(task),
        Some("Task restored".to_string()),
        None,
    )))
}

/// Permanently delete a task (admin only)
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}/hard",
    params(("id" = i64, Path, description = "Task id")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Task not found")
    ),
    tag = "tasks",
    security(("api_key" = []))
)]
pub async fn hard_delete_task(
    RequireAdmin(_admin): RequireAdmin,
    State(service): State<Arc<TaskService>>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    service.hard_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Move tasks into a project
#[utoipa::path(
    post,
    path = "/api/tasks/assign",
    request_body = AssignTasksDto,
    responses(
        (status = 200, description = "Tasks assigned", body = ApiResponse<AssignResultDto>),
        (status = 404, description = "Project not found")
    ),
    tag = "tasks",
    security(("api_key" = []))
)]
pub async fn assign_tasks(
    State(service): State<Arc<TaskService>>,
    AppJson(dto): AppJson<AssignTasksDto>,
) -> Result<Json<ApiResponse<AssignResultDto>>> {
    dto.validate()?;

    let updated = service.assign_to_project(dto).await?;
    Ok(Json(ApiResponse::success(
        Some(AssignResultDto { updated }),
        None,
        None,
    )))
}

/// Add users as assignees of a task
#[utoipa::path(
    post,
    path = "/api/tasks/{id}/assignees",
    params(("id" = i64, Path, description = "Task id")),
    request_body = AddAssigneesDto,
    responses(
        (status = 200, description = "Assignees added", body = ApiResponse<AssignResultDto>),
        (status = 404, description = "Task not found")
    ),
    tag = "tasks",
    security(("api_key" = []))
)]
pub async fn add_task_assignees(
    State(service): State<Arc<TaskService>>,
    Path(id): Path<i64>,
    AppJson(dto): AppJson<AddAssigneesDto>,
) -> Result<Json<ApiResponse<AssignResultDto>>> {
    dto.validate()?;

    let updated = service.add_assignees(id, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(AssignResultDto { updated }),
        None,
        None,
    )))
}
