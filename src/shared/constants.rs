/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Default page size of the project API listing
pub const PROJECT_API_PAGE_SIZE: i64 = 100;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Upper bound for a task estimate, also the default `max_estimate` filter
pub const MAX_ESTIMATE: i32 = 10_000;

// =============================================================================
// ROLE CONSTANTS
// =============================================================================

/// Administrator - hard deletes and trash access
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";

/// Regular authenticated user
pub const ROLE_USER: &str = "ROLE_USER";

// =============================================================================
// AUTH
// =============================================================================

/// Header carrying the API token
pub const API_KEY_HEADER: &str = "x-binarybox-api-key";

/// Cookie holding the API token for the web pages
pub const AUTH_COOKIE: &str = "api_token";

/// Email of the bootstrap administrator
pub const DEFAULT_ADMIN_EMAIL: &str = "default@mail.com";

/// Words rejected in task titles (case-insensitive)
pub const BANNED_WORDS: &[&str] = &["spam", "viagra"];
