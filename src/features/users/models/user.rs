use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for a user account
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    /// Argon2 PHC string, never serialized
    pub password: String,
    pub roles: Vec<String>,
    pub api_token: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Insert payload; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub roles: Vec<String>,
}

/// Partial update; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub roles: Option<Vec<String>>,
}
