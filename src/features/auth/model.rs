use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::constants::ROLE_ADMIN;

/// The caller of a request, resolved from its API token.
///
/// Handlers pass this explicitly into services that make role decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthContext {
    pub user_id: i64,
    pub email: String,
    pub username: String,
    pub roles: Vec<String>,
}

impl AuthContext {
    /// A visitor without a token (web pages only)
    pub fn anonymous() -> Self {
        Self {
            user_id: 0,
            email: String::new(),
            username: String::new(),
            roles: Vec::new(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id > 0
    }

    /// Check if user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }
}
