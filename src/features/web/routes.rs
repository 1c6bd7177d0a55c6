use crate::core::middleware::optional_auth_middleware;
use crate::features::web::handlers::{self, WebState};
use axum::{
    middleware,
    response::Redirect,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Server-rendered pages; anonymous visitors may browse, mutations need a session
pub fn routes(state: Arc<WebState>) -> Router {
    let auth = state.auth.clone();

    Router::new()
        .route("/", get(|| async { Redirect::to("/tasks") }))
        .route(
            "/login",
            get(handlers::login_page).post(handlers::login_submit),
        )
        .route("/logout", post(handlers::logout))
        .route("/tasks", get(handlers::task_index))
        .route("/tasks/trashbin", get(handlers::task_trash))
        .route(
            "/tasks/create",
            get(handlers::task_create_page).post(handlers::task_create_submit),
        )
        .route("/tasks/restore/{id}", post(handlers::task_restore))
        .route("/tasks/{id}", get(handlers::task_show))
        .route(
            "/tasks/{id}/edit",
            get(handlers::task_edit_page).post(handlers::task_edit_submit),
        )
        .route("/tasks/{id}/delete", post(handlers::task_delete))
        .route("/projects", get(handlers::project_index))
        .route(
            "/projects/create",
            get(handlers::project_create_page).post(handlers::project_create_submit),
        )
        .route("/projects/{id}", get(handlers::project_show))
        .route("/projects/{id}/delete", post(handlers::project_delete))
        .route(
            "/assign-tasks",
            get(handlers::assign_tasks_form).post(handlers::assign_tasks_submit),
        )
        .route(
            "/assign-users",
            get(handlers::assign_users_form).post(handlers::assign_users_submit),
        )
        .with_state(state)
        .layer(middleware::from_fn_with_state(auth, optional_auth_middleware))
}
