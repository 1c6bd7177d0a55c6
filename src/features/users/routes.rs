use crate::features::users::handlers;
use crate::features::users::services::UserService;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Token-protected user management routes
pub fn routes(service: Arc<UserService>) -> Router {
    Router::new()
        .route(
            "/api/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/api/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .with_state(service)
}

/// Public bootstrap route
pub fn public_routes(service: Arc<UserService>) -> Router {
    Router::new()
        .route("/api/users/default", post(handlers::create_default_user))
        .with_state(service)
}
