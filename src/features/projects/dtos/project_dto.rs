use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::projects::models::{Project, ProjectSummary};
use crate::features::tasks::dtos::TaskListItemDto;
use crate::shared::types::{empty_string_as_none, SortDirection};

/// Request DTO for creating a project
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProjectDto {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    pub description: Option<String>,
}

/// Request DTO for a partial project update
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProjectDto {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    pub description: Option<String>,
}

/// Response DTO for project
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectResponseDto {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<Project> for ProjectResponseDto {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            deleted_at: p.deleted_at,
        }
    }
}

/// Project listing entry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectSummaryDto {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Active tasks only
    pub task_count: i64,
}

impl From<ProjectSummary> for ProjectSummaryDto {
    fn from(s: ProjectSummary) -> Self {
        Self {
            id: s.project.id,
            name: s.project.name,
            description: s.project.description,
            task_count: s.task_count,
        }
    }
}

/// Project with its active tasks
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectDetailDto {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub tasks: Vec<TaskListItemDto>,
}

/// Query parameters for listing projects
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ProjectListQuery {
    /// Case-insensitive substring of the name
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub limit: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub deleted: Option<bool>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>)]
    pub sort: Option<SortDirection>,
}
