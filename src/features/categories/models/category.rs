use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Database model for category
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// Slug of the name unless given explicitly
    pub label: String,
    pub deleted_at: Option<DateTime<Utc>>,
}
