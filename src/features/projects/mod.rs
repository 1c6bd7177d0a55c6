//! Projects and their task counts.
//!
//! The JSON API keeps the response bodies existing clients depend on:
//! plain strings for mutations and a one-element array for detail.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/api/projects/create` | Create, responds `"OK"` |
//! | GET | `/api/projects/get` | Paginated list with `task_count` |
//! | GET | `/api/projects/get/{id}` | `[detail]` or `[]` |
//! | PUT | `/api/projects/edit/{id}` | Partial update, responds `"OK"` |
//! | DELETE | `/api/projects/softdelete-{id}` | Soft delete |
//! | DELETE | `/api/projects/harddelete-{id}` | Permanent delete (admin) |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

pub use repositories::{PgProjectRepository, ProjectRepository};
pub use services::ProjectService;
