use std::sync::Arc;

use axum::{http::StatusCode, middleware::from_fn_with_state, routing::get, Router};
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::core::config::AppConfig;
use crate::core::middleware;
use crate::features::auth::{routes as auth_routes, AuthService};
use crate::features::categories::{routes as categories_routes, CategoryService};
use crate::features::projects::{routes as projects_routes, ProjectService};
use crate::features::tasks::{routes as tasks_routes, TaskService};
use crate::features::users::{routes as users_routes, UserService};
use crate::features::web::{routes as web_routes, WebState};

/// Every service the HTTP layer talks to
#[derive(Clone)]
pub struct AppServices {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub projects: Arc<ProjectService>,
    pub tasks: Arc<TaskService>,
    pub categories: Arc<CategoryService>,
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// API, web pages and health check with the shared tower layers.
///
/// Swagger UI is merged separately by `main` because it depends on startup config.
pub fn build_router(services: AppServices, config: &AppConfig) -> Router {
    // Token-protected API routes
    let protected_routes = Router::new()
        .merge(users_routes::routes(Arc::clone(&services.users)))
        .merge(projects_routes::routes(Arc::clone(&services.projects)))
        .merge(tasks_routes::routes(Arc::clone(&services.tasks)))
        .merge(categories_routes::routes(Arc::clone(&services.categories)))
        .route_layer(from_fn_with_state(
            Arc::clone(&services.auth),
            middleware::auth_middleware,
        ));

    let public_routes = Router::new()
        .merge(auth_routes::public_routes(Arc::clone(&services.auth)))
        .merge(users_routes::public_routes(Arc::clone(&services.users)))
        .route("/health", get(health_check));

    let web = web_routes::routes(Arc::new(WebState {
        tasks: Arc::clone(&services.tasks),
        projects: Arc::clone(&services.projects),
        categories: Arc::clone(&services.categories),
        users: Arc::clone(&services.users),
        auth: Arc::clone(&services.auth),
        tasks_per_page: config.web_tasks_per_page,
        projects_per_page: config.web_projects_per_page,
    }));

    Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .merge(web)
        .layer(middleware::cors_layer(config.cors_allowed_origins.clone()))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::constants::{API_KEY_HEADER, ROLE_ADMIN, ROLE_USER};
    use crate::shared::query::TrashPolicy;
    use crate::shared::test_helpers::{auth_service, MemoryStore, TEST_PASSWORD};
    use axum::http::{header, HeaderName, HeaderValue, Method};
    use axum_test::TestServer;
    use fake::faker::internet::en::{SafeEmail, Username};
    use fake::Fake;
    use serde_json::{json, Value};

    fn services(store: &MemoryStore) -> AppServices {
        let trash = TrashPolicy::default();
        let tasks = Arc::new(TaskService::new(
            Arc::new(store.tasks()),
            Arc::new(store.projects()),
            trash,
        ));
        AppServices {
            auth: Arc::new(auth_service(store)),
            users: Arc::new(UserService::new(
                Arc::new(store.users()),
                trash,
                Some("bootstrap-password".to_string()),
            )),
            projects: Arc::new(ProjectService::new(
                Arc::new(store.projects()),
                Arc::clone(&tasks),
                trash,
            )),
            categories: Arc::new(CategoryService::new(Arc::new(store.categories()), trash)),
            tasks,
        }
    }

    fn app_config() -> AppConfig {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_allowed_origins: vec!["*".to_string()],
            trash_requires_admin: false,
            web_tasks_per_page: 10,
            web_projects_per_page: 10,
        }
    }

    fn server(store: &MemoryStore) -> TestServer {
        TestServer::new(build_router(services(store), &app_config())).unwrap()
    }

    fn api_key(token: &str) -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static(API_KEY_HEADER),
            HeaderValue::from_str(token).unwrap(),
        )
    }

    async fn login(server: &TestServer, email: &str) -> String {
        let response = server
            .post("/api/users/login")
            .json(&json!({ "email": email, "password": TEST_PASSWORD }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        response.json::<Value>()["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_health_check() {
        let store = MemoryStore::new();
        let response = server(&store).get("/health").await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_preflight_skips_auth() {
        let store = MemoryStore::new();

        let response = server(&store)
            .method(Method::OPTIONS, "/api/tasks")
            .add_header(header::ORIGIN, HeaderValue::from_static("https://board.example"))
            .add_header(
                header::ACCESS_CONTROL_REQUEST_METHOD,
                HeaderValue::from_static("POST"),
            )
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN), "*");
        assert_eq!(response.header(header::ACCESS_CONTROL_MAX_AGE), "3600");
    }

    #[tokio::test]
    async fn test_api_requires_token() {
        let store = MemoryStore::new();
        let server = server(&store);

        let response = server.get("/api/tasks").await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["success"], false);

        let (name, value) = api_key("not-a-token");
        let response = server.get("/api/tasks").add_header(name, value).await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_then_list_tasks_with_estimates() {
        let store = MemoryStore::new();
        let email: String = SafeEmail().fake();
        let username: String = Username().fake();
        store.insert_user(&email, &username, &[ROLE_USER]);
        store.insert_task("Write the quarterly report", 5);
        store.insert_task("Review the budget draft", 10);
        let server = server(&store);

        let token = login(&server, &email).await;
        let response = server
            .get("/api/tasks")
            .authorization_bearer(&token)
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body = response.json::<Value>();
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["meta"]["total"], 2);
        assert_eq!(body["meta"]["total_estimates"], 15);
    }

    #[tokio::test]
    async fn test_second_login_replaces_token() {
        let store = MemoryStore::new();
        store.insert_user("ann@example.com", "ann", &[ROLE_USER]);
        let server = server(&store);

        let first = login(&server, "ann@example.com").await;
        let second = login(&server, "ann@example.com").await;

        let (name, value) = api_key(&first);
        let response = server.get("/api/tasks").add_header(name, value).await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

        let (name, value) = api_key(&second);
        let response = server.get("/api/tasks").add_header(name, value).await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_credentials_body() {
        let store = MemoryStore::new();
        store.insert_user("ann@example.com", "ann", &[ROLE_USER]);

        let response = server(&store)
            .post("/api/users/login")
            .json(&json!({ "email": "ann@example.com", "password": "wrong" }))
            .await;

        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["message"], "Invalid credentials");
    }

    #[tokio::test]
    async fn test_project_endpoints_keep_plain_bodies() {
        let store = MemoryStore::new();
        store.insert_user("admin@example.com", "admin", &[ROLE_ADMIN, ROLE_USER]);
        let server = server(&store);
        let token = login(&server, "admin@example.com").await;

        let response = server
            .post("/api/projects/create")
            .authorization_bearer(&token)
            .json(&json!({ "name": "Website", "description": "Relaunch" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>(), json!("OK"));

        let response = server
            .put("/api/projects/edit/999")
            .authorization_bearer(&token)
            .json(&json!({ "name": "Other" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.json::<Value>(),
            json!({ "error": "Project not found" })
        );

        let response = server
            .get("/api/projects/get/999")
            .authorization_bearer(&token)
            .await;
        assert_eq!(response.json::<Value>(), json!([]));
    }

    #[tokio::test]
    async fn test_hard_delete_requires_admin() {
        let store = MemoryStore::new();
        store.insert_user("ann@example.com", "ann", &[ROLE_USER]);
        let task = store.insert_task("Write the quarterly report", 5);
        let server = server(&store);
        let token = login(&server, "ann@example.com").await;

        let response = server
            .delete(&format!("/api/tasks/{}/hard", task))
            .authorization_bearer(&token)
            .await;

        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        assert!(store.task(task).is_some());
    }

    #[tokio::test]
    async fn test_default_user_bootstrap_once() {
        let store = MemoryStore::new();
        let server = server(&store);

        let response = server.post("/api/users/default").await;
        assert_eq!(response.status_code(), StatusCode::CREATED);

        let response = server.post("/api/users/default").await;
        assert_eq!(response.status_code(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let store = MemoryStore::new();

        let response = server(&store)
            .get("/health")
            .add_header(
                HeaderName::from_static("x-request-id"),
                HeaderValue::from_static("req-123"),
            )
            .await;

        assert_eq!(response.header("x-request-id"), "req-123");
    }

    #[tokio::test]
    async fn test_user_cannot_grant_self_admin() {
        let store = MemoryStore::new();
        let user_id = store.insert_user("ann@example.com", "ann", &[ROLE_USER]);
        let task = store.insert_task("Write the quarterly report", 5);
        let server = server(&store);
        let token = login(&server, "ann@example.com").await;

        let response = server
            .put(&format!("/api/users/{}", user_id))
            .authorization_bearer(&token)
            .json(&json!({ "roles": [ROLE_ADMIN, ROLE_USER] }))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(store.user(user_id).unwrap().roles, vec![ROLE_USER.to_string()]);

        let response = server
            .delete(&format!("/api/tasks/{}/hard", task))
            .authorization_bearer(&token)
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        assert!(store.task(task).is_some());
    }

    #[tokio::test]
    async fn test_admin_grants_roles() {
        let store = MemoryStore::new();
        store.insert_user("admin@example.com", "admin", &[ROLE_ADMIN, ROLE_USER]);
        let user_id = store.insert_user("ann@example.com", "ann", &[ROLE_USER]);
        let server = server(&store);
        let token = login(&server, "admin@example.com").await;

        let response = server
            .put(&format!("/api/users/{}", user_id))
            .authorization_bearer(&token)
            .json(&json!({ "roles": [ROLE_ADMIN, ROLE_USER] }))
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        assert!(store.user(user_id).unwrap().roles.contains(&ROLE_ADMIN.to_string()));
    }

    #[tokio::test]
    async fn test_project_delete_outcomes() {
        let store = MemoryStore::new();
        store.insert_user("ann@example.com", "ann", &[ROLE_USER]);
        let project = store.insert_project("Website relaunch");
        let server = server(&store);
        let token = login(&server, "ann@example.com").await;

        let response = server
            .delete(&format!("/api/projects/harddelete-{}", project))
            .authorization_bearer(&token)
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

        let response = server
            .delete(&format!("/api/projects/softdelete-{}", project))
            .authorization_bearer(&token)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>(), json!("Soft Delete Successful"));

        for target in ["softdelete-999".to_string(), "archive-1".to_string()] {
            let response = server
                .delete(&format!("/api/projects/{}", target))
                .authorization_bearer(&token)
                .await;
            assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
            assert_eq!(
                response.json::<Value>(),
                json!({ "error": "Project not found" })
            );
        }
    }

    #[tokio::test]
    async fn test_admin_hard_deletes_project() {
        let store = MemoryStore::new();
        store.insert_user("admin@example.com", "admin", &[ROLE_ADMIN, ROLE_USER]);
        let project = store.insert_project("Website relaunch");
        let server = server(&store);
        let token = login(&server, "admin@example.com").await;

        let response = server
            .delete(&format!("/api/projects/harddelete-{}", project))
            .authorization_bearer(&token)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>(), json!("Hard Delete Successful"));

        let response = server
            .get(&format!("/api/projects/get/{}", project))
            .authorization_bearer(&token)
            .await;
        assert_eq!(response.json::<Value>(), json!([]));
    }

    #[tokio::test]
    async fn test_huge_page_is_clamped() {
        let store = MemoryStore::new();
        store.insert_user("ann@example.com", "ann", &[ROLE_USER]);
        store.insert_task("Write the quarterly report", 5);
        let server = server(&store);
        let token = login(&server, "ann@example.com").await;

        let response = server
            .get("/api/tasks")
            .add_query_param("page", i64::MAX)
            .authorization_bearer(&token)
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body = response.json::<Value>();
        assert_eq!(body["data"].as_array().unwrap().len(), 0);
        assert_eq!(body["meta"]["total"], 1);
    }
}

