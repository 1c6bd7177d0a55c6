use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use minijinja::{context, Value};
use serde::Deserialize;

use crate::core::error::AppError;
use crate::core::extractor::OptionalAuth;
use crate::features::auth::dtos::LoginRequestDto;
use crate::features::auth::model::AuthContext;
use crate::features::auth::AuthService;
use crate::features::categories::CategoryService;
use crate::features::projects::dtos::ProjectListQuery;
use crate::features::projects::ProjectService;
use crate::features::tasks::dtos::TaskListQuery;
use crate::features::tasks::models::TaskStatus;
use crate::features::tasks::TaskService;
use crate::features::users::UserService;
use crate::features::web::forms::{
    parse_assign_tasks, parse_assign_users, LoginForm, ProjectForm, TaskForm,
};
use crate::features::web::templates::{self, TemplateError};
use crate::shared::constants::{AUTH_COOKIE, MAX_PAGE_SIZE};
use crate::shared::deletion::DeleteMode;
use crate::shared::query::PageRequest;
use crate::shared::slug::{slugify, split_slug_id};

/// Services and page sizes shared by the web handlers
pub struct WebState {
    pub tasks: Arc<TaskService>,
    pub projects: Arc<ProjectService>,
    pub categories: Arc<CategoryService>,
    pub users: Arc<UserService>,
    pub auth: Arc<AuthService>,
    pub tasks_per_page: i64,
    pub projects_per_page: i64,
}

/// An `AppError` rendered as an HTML page instead of the JSON envelope.
///
/// Unauthenticated callers are sent to the login page.
#[derive(Debug)]
pub struct WebError(pub AppError);

impl From<AppError> for WebError {
    fn from(e: AppError) -> Self {
        WebError(e)
    }
}

impl From<TemplateError> for WebError {
    fn from(e: TemplateError) -> Self {
        WebError(AppError::Internal(e.to_string()))
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if let AppError::Unauthorized(_) = self.0 {
            return redirect_with_notice("/login", "Please log in first").into_response();
        }

        let status = self.0.status_code();
        let (message, errors) = self.0.public_message();
        let ctx = context! { status => status.as_u16(), message => &message, errors };

        match templates::render("error.html", ctx) {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!("Failed to render error page: {}", e);
                (status, message).into_response()
            }
        }
    }
}

type WebResult<T> = std::result::Result<T, WebError>;

#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    pub notice: Option<String>,
}

fn redirect_with_notice(path: &str, notice: &str) -> Redirect {
    Redirect::to(&format!("{}?notice={}", path, urlencoding::encode(notice)))
}

fn render(name: &str, ctx: Value) -> WebResult<Html<String>> {
    Ok(Html(templates::render(name, ctx)?))
}

fn require_user(auth: &OptionalAuth) -> WebResult<AuthContext> {
    auth.0
        .clone()
        .ok_or_else(|| WebError(AppError::Unauthorized("Login required".to_string())))
}

/// Errors that are shown next to the submitted form instead of on an error page
fn form_errors(e: &AppError) -> Option<Vec<String>> {
    match e {
        AppError::InvalidFields(errors) => Some(errors.clone()),
        AppError::Validation(msg)
        | AppError::BadRequest(msg)
        | AppError::Conflict(msg)
        | AppError::NotFound(msg) => Some(vec![msg.clone()]),
        _ => None,
    }
}

/// `key=value&` pairs for the active filters, prefixed to pagination links
fn filter_query(pairs: &[(&str, Option<String>)]) -> String {
    pairs
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| format!("{}={}&", key, urlencoding::encode(v)))
        })
        .collect()
}

fn session_cookie(token: &str) -> String {
    format!("{}={}; HttpOnly; SameSite=Lax; Path=/", AUTH_COOKIE, token)
}

fn expired_cookie() -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", AUTH_COOKIE)
}

// =============================================================================
// SESSION
// =============================================================================

pub async fn login_page(
    auth: OptionalAuth,
    Query(notice): Query<NoticeQuery>,
) -> WebResult<Response> {
    if auth.0.is_some() {
        return Ok(Redirect::to("/tasks").into_response());
    }

    Ok(render("login.html", context! { email => "", notice => notice.notice })?.into_response())
}

pub async fn login_submit(
    State(state): State<Arc<WebState>>,
    Form(form): Form<LoginForm>,
) -> WebResult<Response> {
    let dto = LoginRequestDto {
        email: form.email.trim().to_string(),
        password: form.password,
    };
    let email = dto.email.clone();

    match state.auth.login(dto).await {
        Ok(login) => Ok((
            [(header::SET_COOKIE, session_cookie(&login.token))],
            redirect_with_notice("/tasks", "Welcome back"),
        )
            .into_response()),
        Err(AppError::Unauthorized(message)) => {
            let page = render("login.html", context! { email, error => message })?;
            Ok((StatusCode::UNAUTHORIZED, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn logout(
    State(state): State<Arc<WebState>>,
    auth: OptionalAuth,
) -> WebResult<Response> {
    if let Some(ctx) = auth.0 {
        state.auth.logout(&ctx).await?;
    }

    Ok((
        [(header::SET_COOKIE, expired_cookie())],
        redirect_with_notice("/login", "Logged out"),
    )
        .into_response())
}

// =============================================================================
// TASKS
// =============================================================================

async fn task_index_page(
    state: &WebState,
    auth: &OptionalAuth,
    mut query: TaskListQuery,
    notice: Option<String>,
    trash: bool,
) -> WebResult<Html<String>> {
    let ctx = auth.context();
    query.project = None;
    query.deleted = Some(trash);

    let page = PageRequest::new(query.page, Some(state.tasks_per_page), None);
    let listing = state.tasks.list_with(&ctx, &query, page).await?;
    let categories = state.categories.list_active().await?;

    let page_query = filter_query(&[
        ("search", query.search.clone()),
        ("min_estimate", query.min_estimate.map(|v| v.to_string())),
        ("max_estimate", query.max_estimate.map(|v| v.to_string())),
        ("category", query.category.map(|v| v.to_string())),
    ]);

    render(
        "tasks/index.html",
        context! {
            user => &auth.0,
            is_admin => ctx.is_admin(),
            notice,
            trash,
            query,
            categories,
            total_pages => listing.page.total_pages(),
            page => listing.page,
            total_estimates => listing.total_estimates,
            page_query,
        },
    )
}

pub async fn task_index(
    State(state): State<Arc<WebState>>,
    auth: OptionalAuth,
    Query(query): Query<TaskListQuery>,
    Query(notice): Query<NoticeQuery>,
) -> WebResult<Html<String>> {
    task_index_page(&state, &auth, query, notice.notice, false).await
}

pub async fn task_trash(
    State(state): State<Arc<WebState>>,
    auth: OptionalAuth,
    Query(query): Query<TaskListQuery>,
    Query(notice): Query<NoticeQuery>,
) -> WebResult<Html<String>> {
    task_index_page(&state, &auth, query, notice.notice, true).await
}

/// `/tasks/{slug}-{id}`; a stale or missing slug redirects to the current one
pub async fn task_show(
    State(state): State<Arc<WebState>>,
    auth: OptionalAuth,
    Path(segment): Path<String>,
    Query(notice): Query<NoticeQuery>,
) -> WebResult<Response> {
    let (slug, id) = split_slug_id(&segment)
        .ok_or_else(|| AppError::NotFound(format!("No task at '{}'", segment)))?;

    let task = state.tasks.get(&auth.context(), id, false).await?;
    if task.slug != slug {
        return Ok(Redirect::permanent(&format!("/tasks/{}-{}", task.slug, task.id)).into_response());
    }

    Ok(render(
        "tasks/show.html",
        context! { user => &auth.0, notice => notice.notice, task },
    )?
    .into_response())
}

async fn task_form_page(
    state: &WebState,
    user: &AuthContext,
    form: &TaskForm,
    task_id: Option<i64>,
    error: Option<&AppError>,
) -> WebResult<Response> {
    let categories = state.categories.list_active().await?;
    let statuses: Vec<&str> = TaskStatus::ALL.iter().map(|s| s.as_str()).collect();

    let page = render(
        "tasks/form.html",
        context! {
            user,
            form,
            task_id,
            categories,
            statuses,
            errors => error.and_then(form_errors),
        },
    )?;
    let status = error.map(|e| e.status_code()).unwrap_or(StatusCode::OK);
    Ok((status, page).into_response())
}

pub async fn task_create_page(
    State(state): State<Arc<WebState>>,
    auth: OptionalAuth,
) -> WebResult<Response> {
    let user = require_user(&auth)?;
    task_form_page(&state, &user, &TaskForm::default(), None, None).await
}

pub async fn task_create_submit(
    State(state): State<Arc<WebState>>,
    auth: OptionalAuth,
    Form(form): Form<TaskForm>,
) -> WebResult<Response> {
    let user = require_user(&auth)?;

    let created = match form.to_create() {
        Ok(dto) => state.tasks.create(dto).await,
        Err(e) => Err(e),
    };

    match created {
        Ok(task) => Ok(redirect_with_notice(
            &format!("/tasks/{}-{}", task.slug, task.id),
            "Task created",
        )
        .into_response()),
        Err(e) if form_errors(&e).is_some() => {
            task_form_page(&state, &user, &form, None, Some(&e)).await
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn task_edit_page(
    State(state): State<Arc<WebState>>,
    auth: OptionalAuth,
    Path(id): Path<i64>,
) -> WebResult<Response> {
    let user = require_user(&auth)?;
    let task = state.tasks.get(&user, id, false).await?;
    task_form_page(&state, &user, &TaskForm::from_detail(&task), Some(id), None).await
}

pub async fn task_edit_submit(
    State(state): State<Arc<WebState>>,
    auth: OptionalAuth,
    Path(id): Path<i64>,
    Form(form): Form<TaskForm>,
) -> WebResult<Response> {
    let user = require_user(&auth)?;

    let updated = match form.to_update() {
        Ok(dto) => state.tasks.update(id, dto).await,
        Err(e) => Err(e),
    };

    match updated {
        Ok(task) => Ok(redirect_with_notice(
            &format!("/tasks/{}-{}", task.slug, task.id),
            "Task updated",
        )
        .into_response()),
        Err(e) if form_errors(&e).is_some() && !matches!(e, AppError::NotFound(_)) => {
            task_form_page(&state, &user, &form, Some(id), Some(&e)).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Admins purge, users move to the trash; only admins may touch trashed tasks
pub async fn task_delete(
    State(state): State<Arc<WebState>>,
    auth: OptionalAuth,
    Path(id): Path<i64>,
) -> WebResult<Redirect> {
    let user = require_user(&auth)?;

    let notice = match state.tasks.delete_for(&user, id).await? {
        DeleteMode::Soft => "Task moved to the trash",
        DeleteMode::Hard => "Task deleted permanently",
    };
    Ok(redirect_with_notice("/tasks", notice))
}

pub async fn task_restore(
    State(state): State<Arc<WebState>>,
    auth: OptionalAuth,
    Path(id): Path<i64>,
) -> WebResult<Redirect> {
    require_user(&auth)?;

    state.tasks.restore(id).await?;
    Ok(redirect_with_notice("/tasks/trashbin", "Task restored"))
}

// =============================================================================
// PROJECTS
// =============================================================================

pub async fn project_index(
    State(state): State<Arc<WebState>>,
    auth: OptionalAuth,
    Query(mut query): Query<ProjectListQuery>,
    Query(notice): Query<NoticeQuery>,
) -> WebResult<Html<String>> {
    let ctx = auth.context();
    query.limit = Some(state.projects_per_page);
    query.deleted = None;

    let page = state
        .projects
        .list(&ctx, &query, state.projects_per_page)
        .await?;
    let page_query = filter_query(&[("search", query.search.clone())]);

    render(
        "projects/index.html",
        context! {
            user => &auth.0,
            notice => notice.notice,
            search => query.search,
            total_pages => page.total_pages(),
            page,
            page_query,
        },
    )
}

/// `/projects/{name}-{id}`; redirects when the name part is stale
pub async fn project_show(
    State(state): State<Arc<WebState>>,
    auth: OptionalAuth,
    Path(segment): Path<String>,
) -> WebResult<Response> {
    let missing = || AppError::NotFound(format!("No project at '{}'", segment));

    let (slug, id) = split_slug_id(&segment).ok_or_else(missing)?;
    let project = state.projects.detail(id).await?.ok_or_else(missing)?;

    let canonical = slugify(&project.name);
    if canonical != slug {
        return Ok(Redirect::permanent(&format!("/projects/{}-{}", canonical, project.id)).into_response());
    }

    Ok(render("projects/show.html", context! { user => &auth.0, project })?.into_response())
}

pub async fn project_create_page(auth: OptionalAuth) -> WebResult<Html<String>> {
    let user = require_user(&auth)?;
    render(
        "projects/form.html",
        context! { user, form => ProjectForm::default() },
    )
}

pub async fn project_create_submit(
    State(state): State<Arc<WebState>>,
    auth: OptionalAuth,
    Form(form): Form<ProjectForm>,
) -> WebResult<Response> {
    let user = require_user(&auth)?;

    let created = match form.to_create() {
        Ok(dto) => state.projects.create(dto).await,
        Err(e) => Err(e),
    };

    match created {
        Ok(project) => Ok(redirect_with_notice(
            &format!("/projects/{}-{}", slugify(&project.name), project.id),
            "Project created",
        )
        .into_response()),
        Err(e) => match form_errors(&e) {
            Some(errors) => {
                let page = render("projects/form.html", context! { user, form, errors })?;
                Ok((e.status_code(), page).into_response())
            }
            None => Err(e.into()),
        },
    }
}

pub async fn project_delete(
    State(state): State<Arc<WebState>>,
    auth: OptionalAuth,
    Path(id): Path<i64>,
) -> WebResult<Redirect> {
    let user = require_user(&auth)?;

    let notice = match state.projects.delete_for(&user, id).await? {
        DeleteMode::Soft => "Project moved to the trash",
        DeleteMode::Hard => "Project deleted permanently",
    };
    Ok(redirect_with_notice("/projects", notice))
}

// =============================================================================
// ASSIGNMENT
// =============================================================================

async fn assign_tasks_page(
    state: &WebState,
    user: &AuthContext,
    notice: Option<String>,
    error: Option<&AppError>,
) -> WebResult<Response> {
    let tasks = state.tasks.unassigned().await?;
    let projects = state.projects.list_active().await?;

    let page = render(
        "assign_tasks.html",
        context! { user, notice, tasks, projects, errors => error.and_then(form_errors) },
    )?;
    let status = error.map(|e| e.status_code()).unwrap_or(StatusCode::OK);
    Ok((status, page).into_response())
}

pub async fn assign_tasks_form(
    State(state): State<Arc<WebState>>,
    auth: OptionalAuth,
    Query(notice): Query<NoticeQuery>,
) -> WebResult<Response> {
    let user = require_user(&auth)?;
    assign_tasks_page(&state, &user, notice.notice, None).await
}

pub async fn assign_tasks_submit(
    State(state): State<Arc<WebState>>,
    auth: OptionalAuth,
    Form(pairs): Form<Vec<(String, String)>>,
) -> WebResult<Response> {
    let user = require_user(&auth)?;

    let assigned = match parse_assign_tasks(&pairs) {
        Ok(dto) => state.tasks.assign_to_project(dto).await,
        Err(e) => Err(e),
    };

    match assigned {
        Ok(count) => Ok(redirect_with_notice(
            "/assign-tasks",
            &format!("{} task(s) assigned", count),
        )
        .into_response()),
        Err(e) if form_errors(&e).is_some() => {
            assign_tasks_page(&state, &user, None, Some(&e)).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn assign_users_page(
    state: &WebState,
    user: &AuthContext,
    notice: Option<String>,
    error: Option<&AppError>,
) -> WebResult<Response> {
    let everything = PageRequest::new(Some(1), Some(MAX_PAGE_SIZE), None);
    let tasks = state
        .tasks
        .list_with(user, &TaskListQuery::default(), everything)
        .await?
        .page
        .items;
    let users = state.users.list_active().await?;

    let page = render(
        "assign_users.html",
        context! { user, notice, tasks, users, errors => error.and_then(form_errors) },
    )?;
    let status = error.map(|e| e.status_code()).unwrap_or(StatusCode::OK);
    Ok((status, page).into_response())
}

pub async fn assign_users_form(
    State(state): State<Arc<WebState>>,
    auth: OptionalAuth,
    Query(notice): Query<NoticeQuery>,
) -> WebResult<Response> {
    let user = require_user(&auth)?;
    assign_users_page(&state, &user, notice.notice, None).await
}

pub async fn assign_users_submit(
    State(state): State<Arc<WebState>>,
    auth: OptionalAuth,
    Form(pairs): Form<Vec<(String, String)>>,
) -> WebResult<Response> {
    let user = require_user(&auth)?;

    let added = match parse_assign_users(&pairs) {
        Ok((task_id, dto)) => state.tasks.add_assignees(task_id, dto).await,
        Err(e) => Err(e),
    };

    match added {
        Ok(count) => Ok(redirect_with_notice(
            "/assign-users",
            &format!("{} user(s) added", count),
        )
        .into_response()),
        Err(e) if form_errors(&e).is_some() => {
            assign_users_page(&state, &user, None, Some(&e)).await
        }
        Err(e) => Err(e.into()),
    }
}
