//! Tasks: CRUD, filtered listing with estimate totals, the trash, and
//! project/assignee workflows.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/tasks` | Filtered, paginated list; `meta.total_estimates` |
//! | POST | `/api/tasks` | Create a task |
//! | GET | `/api/tasks/estimates` | Sum of estimates for the same filters |
//! | GET | `/api/tasks/{id}` | Task detail |
//! | PUT | `/api/tasks/{id}` | Partial update |
//! | DELETE | `/api/tasks/{id}` | Soft delete |
//! | POST | `/api/tasks/{id}/restore` | Restore from the trash |
//! | DELETE | `/api/tasks/{id}/hard` | Permanent delete (admin) |
//! | POST | `/api/tasks/assign` | Move tasks into a project |
//! | POST | `/api/tasks/{id}/assignees` | Add assignees |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

pub use repositories::{PgTaskRepository, TaskRepository};
pub use services::TaskService;
