//! User accounts.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/users` | List users (`search`, `deleted`, paging) |
//! | POST | `/api/users` | Create a user |
//! | GET | `/api/users/{id}` | Get a user |
//! | PUT | `/api/users/{id}` | Partial update; a new password is re-hashed |
//! | DELETE | `/api/users/{id}` | Soft delete |
//! | POST | `/api/users/default` | Bootstrap the first admin (public) |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

pub use repositories::{PgUserRepository, UserRepository};
pub use services::UserService;
