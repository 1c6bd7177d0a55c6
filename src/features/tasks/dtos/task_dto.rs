use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::tasks::models::{TaskAssignee, TaskRow, TaskStatus};
use crate::shared::types::{empty_string_as_none, SortDirection};
use crate::shared::validation::{validate_no_banned_words, validate_slug};

/// Request DTO for creating a task
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateTaskDto {
    #[validate(
        length(min = 10, max = 255, message = "Title must be 10-255 characters"),
        custom(function = "validate_no_banned_words")
    )]
    pub title: String,

    /// Derived from the title when omitted
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    #[validate(range(min = 1, max = 10000, message = "Estimate must be between 1 and 10000"))]
    pub estimate: i32,

    pub due_date: Option<DateTime<Utc>>,

    /// Must reference an existing project
    pub project_id: Option<i64>,

    /// `todo`, `in_progress` or `done`; anything else is ignored
    pub status: Option<String>,

    pub category_id: Option<i64>,

    #[validate(length(max = 255, message = "Attachment name must be at most 255 characters"))]
    pub attachments: Option<String>,

    /// User ids; unknown ids are ignored
    #[serde(default)]
    pub assignees: Vec<i64>,
}

/// Request DTO for a partial task update
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateTaskDto {
    #[validate(
        length(min = 10, max = 255, message = "Title must be 10-255 characters"),
        custom(function = "validate_no_banned_words")
    )]
    pub title: Option<String>,

    /// Re-derived from a new title when omitted
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    #[validate(range(min = 1, max = 10000, message = "Estimate must be between 1 and 10000"))]
    pub estimate: Option<i32>,

    pub due_date: Option<DateTime<Utc>>,

    pub project_id: Option<i64>,

    pub status: Option<String>,

    pub category_id: Option<i64>,

    #[validate(length(max = 255, message = "Attachment name must be at most 255 characters"))]
    pub attachments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AssigneeDto {
    pub id: i64,
    pub username: String,
    pub email: String,
}

impl From<TaskAssignee> for AssigneeDto {
    fn from(a: TaskAssignee) -> Self {
        Self {
            id: a.user_id,
            username: a.username,
            email: a.email,
        }
    }
}

/// Task as shown in listings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskListItemDto {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub estimate: i32,
    pub status: Option<TaskStatus>,
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: Option<i64>,
    pub project_name: Option<String>,
    pub category_id: Option<i64>,
    pub assignees: Vec<AssigneeDto>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TaskListItemDto {
    pub fn from_row(row: TaskRow, assignees: Vec<AssigneeDto>) -> Self {
        let task = row.task;
        Self {
            id: task.id,
            title: task.title,
            slug: task.slug,
            estimate: task.estimate,
            status: task.status,
            due_date: task.due_date,
            project_id: task.project_id,
            project_name: row.project_name,
            category_id: task.category_id,
            assignees,
            created_at: task.created_at,
            deleted_at: task.deleted_at,
        }
    }
}

/// Full task representation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskDetailDto {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub estimate: i32,
    pub status: Option<TaskStatus>,
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: Option<i64>,
    pub project_name: Option<String>,
    pub category_id: Option<i64>,
    pub attachments: Option<String>,
    pub assignees: Vec<AssigneeDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TaskDetailDto {
    pub fn from_row(row: TaskRow, assignees: Vec<AssigneeDto>) -> Self {
        let task = row.task;
        Self {
            id: task.id,
            title: task.title,
            slug: task.slug,
            description: task.description,
            estimate: task.estimate,
            status: task.status,
            due_date: task.due_date,
            project_id: task.project_id,
            project_name: row.project_name,
            category_id: task.category_id,
            attachments: task.attachments,
            assignees,
            created_at: task.created_at,
            updated_at: task.updated_at,
            deleted_at: task.deleted_at,
        }
    }
}

/// Query parameters for task listings and estimate totals
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
pub struct TaskListQuery {
    /// Case-insensitive substring of the title
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub min_estimate: Option<i32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub max_estimate: Option<i32>,
    /// Project id, `0` for all
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub project: Option<i64>,
    /// Category id, `0` for all
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub category: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub limit: Option<i64>,
    /// Show the trash instead of active tasks
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub deleted: Option<bool>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>)]
    pub sort: Option<SortDirection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TotalEstimatesDto {
    pub total_estimates: i64,
}

/// Request DTO for moving tasks into a project
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AssignTasksDto {
    pub project_id: i64,

    #[validate(length(min = 1, message = "Select at least one task"))]
    pub task_ids: Vec<i64>,
}

/// Request DTO for adding assignees to a task
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AddAssigneesDto {
    #[validate(length(min = 1, message = "Select at least one user"))]
    pub user_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssignResultDto {
    /// Number of rows that changed
    pub updated: u64,
}
