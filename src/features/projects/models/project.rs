use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for project
#[derive(Debug, Clone, FromRow)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Project with the number of its active tasks
#[derive(Debug, Clone, FromRow)]
pub struct ProjectSummary {
    #[sqlx(flatten)]
    pub project: Project,
    pub task_count: i64,
}
