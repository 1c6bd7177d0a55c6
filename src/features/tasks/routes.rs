use crate::features::tasks::handlers;
use crate::features::tasks::services::TaskService;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

/// Token-protected task routes
pub fn routes(service: Arc<TaskService>) -> Router {
    Router::new()
        .route(
            "/api/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route("/api/tasks/estimates", get(handlers::task_estimates))
        .route("/api/tasks/assign", post(handlers::assign_tasks))
        .route(
            "/api/tasks/{id}",
            get(handlers::get_task)
                .put(handlers::update_task)
                .delete(handlers::delete_task),
        )
        .route("/api/tasks/{id}/restore", post(handlers::restore_task))
        .route("/api/tasks/{id}/hard", delete(handlers::hard_delete_task))
        .route(
            "/api/tasks/{id}/assignees",
            post(handlers::add_task_assignees),
        )
        .with_state(service)
}
