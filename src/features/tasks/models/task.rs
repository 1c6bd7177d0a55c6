use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Task status enum matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown task status '{}'", s))
    }
}

/// Database model for task
#[derive(Debug, Clone, FromRow)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub estimate: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: Option<i64>,
    pub status: Option<TaskStatus>,
    pub category_id: Option<i64>,
    pub attachments: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Task joined with its project name
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    #[sqlx(flatten)]
    pub task: Task,
    pub project_name: Option<String>,
}

/// A user assigned to a task
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TaskAssignee {
    pub task_id: i64,
    pub user_id: i64,
    pub username: String,
    pub email: String,
}

/// Insert payload with the slug already derived
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub estimate: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: Option<i64>,
    pub status: Option<TaskStatus>,
    pub category_id: Option<i64>,
    pub attachments: Option<String>,
}

/// Partial update; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub estimate: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: Option<i64>,
    pub status: Option<TaskStatus>,
    pub category_id: Option<i64>,
    pub attachments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_names() {
        assert_eq!("in_progress".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert_eq!(TaskStatus::Done.to_string(), "done");
        assert!("archived".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_status_serde_matches_database_names() {
        let json = serde_json::to_value(TaskStatus::InProgress).unwrap();
        assert_eq!(json, "in_progress");
    }
}
