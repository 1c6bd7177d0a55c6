use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::auth::model::AuthContext;
use crate::features::projects::dtos::{
    CreateProjectDto, ProjectDetailDto, ProjectListQuery, ProjectSummaryDto, UpdateProjectDto,
};
use crate::features::projects::services::ProjectService;
use crate::shared::constants::PROJECT_API_PAGE_SIZE;
use crate::shared::types::ApiResponse;

/// `{"error":"Project not found"}` with 404
fn project_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Project not found" })),
    )
        .into_response()
}

/// A delete target of the form `softdelete-{id}` or `harddelete-{id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeleteTarget {
    Soft(i64),
    Hard(i64),
}

impl DeleteTarget {
    fn parse(target: &str) -> Option<Self> {
        if let Some(id) = target.strip_prefix("softdelete-") {
            return id.parse().ok().map(DeleteTarget::Soft);
        }
        if let Some(id) = target.strip_prefix("harddelete-") {
            return id.parse().ok().map(DeleteTarget::Hard);
        }
        None
    }
}

/// Create a project
#[utoipa::path(
    post,
    path = "/api/projects/create",
    request_body = CreateProjectDto,
    responses(
        (status = 200, description = "Project created", body = String, example = json!("OK")),
        (status = 400, description = "Validation error")
    ),
    tag = "projects",
    security(("api_key" = []))
)]
pub async fn create_project(
    State(service): State<Arc<ProjectService>>,
    AppJson(dto): AppJson<CreateProjectDto>,
) -> Result<Json<&'static str>> {
    dto.validate()?;

    service.create(dto).await?;
    Ok(Json("OK"))
}

/// List projects with their active task counts
#[utoipa::path(
    get,
    path = "/api/projects/get",
    params(ProjectListQuery),
    responses(
        (status = 200, description = "Page of projects", body = ApiResponse<Vec<ProjectSummaryDto>>),
    ),
    tag = "projects",
    security(("api_key" = []))
)]
pub async fn list_projects(
    ctx: AuthContext,
    State(service): State<Arc<ProjectService>>,
    Query(query): Query<ProjectListQuery>,
) -> Result<Json<ApiResponse<Vec<ProjectSummaryDto>>>> {
    let page = service.list(&ctx, &query, PROJECT_API_PAGE_SIZE).await?;
    let meta = page.meta();
    Ok(Json(ApiResponse::success(Some(page.items), None, Some(meta))))
}

/// Get a project with its tasks
///
/// Responds with a one-element array, or an empty array when the project does not exist.
#[utoipa::path(
    get,
    path = "/api/projects/get/{id}",
    params(("id" = i64, Path, description = "Project id")),
    responses(
        (status = 200, description = "Zero or one project", body = Vec<ProjectDetailDto>),
    ),
    tag = "projects",
    security(("api_key" = []))
)]
pub async fn get_project(
    State(service): State<Arc<ProjectService>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ProjectDetailDto>>> {
    let project = service.detail(id).await?;
    Ok(Json(project.into_iter().collect()))
}

/// Partially update a project
#[utoipa::path(
    put,
    path = "/api/projects/edit/{id}",
    params(("id" = i64, Path, description = "Project id")),
    request_body = UpdateProjectDto,
    responses(
        (status = 200, description = "Project updated", body = String, example = json!("OK")),
        (status = 404, description = "Project not found")
    ),
    tag = "projects",
    security(("api_key" = []))
)]
pub async fn edit_project(
    State(service): State<Arc<ProjectService>>,
    Path(id): Path<i64>,
    AppJson(dto): AppJson<UpdateProjectDto>,
) -> Result<Response> {
    dto.validate()?;

    match service.update(id, dto).await {
        Ok(_) => Ok(Json("OK").into_response()),
        Err(AppError::NotFound(_)) => Ok(project_not_found()),
        Err(e) => Err(e),
    }
}

/// Delete a project
///
/// `softdelete-{id}` moves the project to the trash. `harddelete-{id}` removes
/// it permanently and requires the admin role.
#[utoipa::path(
    delete,
    path = "/api/projects/{target}",
    params(("target" = String, Path, description = "`softdelete-{id}` or `harddelete-{id}`")),
    responses(
        (status = 200, description = "Project deleted", body = String, example = json!("Soft Delete Successful")),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Project not found")
    ),
    tag = "projects",
    security(("api_key" = []))
)]
pub async fn delete_project(
    ctx: AuthContext,
    State(service): State<Arc<ProjectService>>,
    Path(target): Path<String>,
) -> Result<Response> {
    let Some(target) = DeleteTarget::parse(&target) else {
        return Ok(project_not_found());
    };

    let (result, message) = match target {
        DeleteTarget::Soft(id) => (service.soft_delete(id).await, "Soft Delete Successful"),
        DeleteTarget::Hard(id) => {
            if !ctx.is_admin() {
                return Err(AppError::Forbidden("Admin access required".to_string()));
            }
            (service.hard_delete(id).await, "Hard Delete Successful")
        }
    };

    match result {
        Ok(()) => Ok(Json(message).into_response()),
        Err(AppError::NotFound(_)) => Ok(project_not_found()),
        Err(e) => Err(e),
    }
}
