use crate::features::projects::handlers;
use crate::features::projects::services::ProjectService;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

/// Token-protected project routes
pub fn routes(service: Arc<ProjectService>) -> Router {
    Router::new()
        .route("/api/projects/create", post(handlers::create_project))
        .route("/api/projects/get", get(handlers::list_projects))
        .route("/api/projects/get/{id}", get(handlers::get_project))
        .route("/api/projects/edit/{id}", put(handlers::edit_project))
        .route("/api/projects/{target}", delete(handlers::delete_project))
        .with_state(service)
}
