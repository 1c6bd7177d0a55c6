//! In-memory repositories and request contexts for tests.
//!
//! `MemoryStore` mirrors the Postgres schema closely enough for service and
//! router tests: soft-delete columns, the partial unique index on active task
//! slugs, the unique user email and the `ON DELETE` actions of the foreign keys.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::Request, middleware::Next, response::Response, Router};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthContext;
use crate::features::auth::password::hash_password;
use crate::features::auth::token::JwtTokenManager;
use crate::features::auth::AuthService;
use crate::features::categories::models::Category;
use crate::features::categories::repositories::CategoryRepository;
use crate::features::projects::models::{Project, ProjectSummary};
use crate::features::projects::repositories::ProjectRepository;
use crate::features::tasks::models::{NewTask, Task, TaskAssignee, TaskChanges, TaskRow};
use crate::features::tasks::repositories::TaskRepository;
use crate::features::users::models::{NewUser, User, UserChanges};
use crate::features::users::repositories::UserRepository;
use crate::shared::constants::{ROLE_ADMIN, ROLE_USER};
use crate::shared::deletion::DeletableStore;
use crate::shared::query::{
    CategoryFilter, Page, PageRequest, ProjectFilter, TaskFilter, UserFilter,
};
use crate::shared::slug::slugify;

/// Password of every user created with [`MemoryStore::insert_user`]
pub const TEST_PASSWORD: &str = "correct horse battery";

pub const TEST_JWT_SECRET: &str = "test-secret";

lazy_static! {
    // Argon2 is slow; hash once per test binary
    static ref TEST_PASSWORD_HASH: String =
        hash_password(TEST_PASSWORD).expect("hash test password");
}

pub fn admin_context() -> AuthContext {
    AuthContext {
        user_id: 1,
        email: "admin@example.com".to_string(),
        username: "admin".to_string(),
        roles: vec![ROLE_ADMIN.to_string(), ROLE_USER.to_string()],
    }
}

pub fn user_context() -> AuthContext {
    AuthContext {
        user_id: 2,
        email: "user@example.com".to_string(),
        username: "user".to_string(),
        roles: vec![ROLE_USER.to_string()],
    }
}

/// An active task without project or category
pub fn task_fixture(id: i64, title: &str, estimate: i32) -> Task {
    let now = Utc::now();
    Task {
        id,
        title: title.to_string(),
        slug: slugify(title),
        description: None,
        estimate,
        created_at: now,
        updated_at: now,
        due_date: None,
        project_id: None,
        status: None,
        category_id: None,
        attachments: None,
        deleted_at: None,
    }
}

pub fn auth_service(store: &MemoryStore) -> AuthService {
    AuthService::new(
        Arc::new(store.users()),
        JwtTokenManager::new(TEST_JWT_SECRET, Duration::from_secs(3600)),
    )
}

async fn inject_context(ctx: AuthContext, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(ctx);
    next.run(request).await
}

/// Run every request of `router` as `ctx`, skipping token checks
pub fn with_auth(router: Router, ctx: AuthContext) -> Router {
    router.layer(axum::middleware::from_fn(
        move |request: Request, next: Next| inject_context(ctx.clone(), request, next),
    ))
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Default)]
struct State {
    next_id: i64,
    users: Vec<User>,
    projects: Vec<Project>,
    categories: Vec<Category>,
    tasks: Vec<Task>,
    /// `(task_id, user_id)`
    assignees: Vec<(i64, i64)>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn ensure_slug_free(&self, slug: &str, except: i64) -> Result<()> {
        let taken = self
            .tasks
            .iter()
            .any(|t| t.id != except && t.deleted_at.is_none() && t.slug == slug);
        if taken {
            return Err(AppError::Conflict("This slug is already in use.".to_string()));
        }
        Ok(())
    }

    fn ensure_email_free(&self, email: &str, except: i64) -> Result<()> {
        if self.users.iter().any(|u| u.id != except && u.email == email) {
            return Err(AppError::Conflict(
                "This email is already registered.".to_string(),
            ));
        }
        Ok(())
    }

    fn task_row(&self, task: &Task) -> TaskRow {
        let project_name = task
            .project_id
            .and_then(|id| self.projects.iter().find(|p| p.id == id))
            .map(|p| p.name.clone());
        TaskRow {
            task: task.clone(),
            project_name,
        }
    }

    fn link_assignees(&mut self, task_id: i64, user_ids: &[i64]) -> u64 {
        let mut added = 0;
        for &user_id in user_ids {
            let active = self
                .users
                .iter()
                .any(|u| u.id == user_id && u.deleted_at.is_none());
            if active && !self.assignees.contains(&(task_id, user_id)) {
                self.assignees.push((task_id, user_id));
                added += 1;
            }
        }
        added
    }
}

/// Shared in-memory database; repositories created from one store see the same rows
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn tasks(&self) -> MemoryTasks {
        MemoryTasks(self.clone())
    }

    pub fn users(&self) -> MemoryUsers {
        MemoryUsers(self.clone())
    }

    pub fn projects(&self) -> MemoryProjects {
        MemoryProjects(self.clone())
    }

    pub fn categories(&self) -> MemoryCategories {
        MemoryCategories(self.clone())
    }

    pub fn insert_task(&self, title: &str, estimate: i32) -> i64 {
        let mut state = self.lock();
        let id = state.next_id();
        state.tasks.push(task_fixture(id, title, estimate));
        id
    }

    /// Insert a user whose password is [`TEST_PASSWORD`]
    pub fn insert_user(&self, email: &str, username: &str, roles: &[&str]) -> i64 {
        let mut state = self.lock();
        let id = state.next_id();
        state.users.push(User {
            id,
            email: email.to_string(),
            username: username.to_string(),
            password: TEST_PASSWORD_HASH.clone(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            api_token: None,
            deleted_at: None,
        });
        id
    }

    pub fn insert_project(&self, name: &str) -> i64 {
        let mut state = self.lock();
        let id = state.next_id();
        state.projects.push(Project {
            id,
            name: name.to_string(),
            description: None,
            deleted_at: None,
        });
        id
    }

    pub fn insert_category(&self, name: &str) -> i64 {
        let mut state = self.lock();
        let id = state.next_id();
        state.categories.push(Category {
            id,
            name: name.to_string(),
            label: slugify(name),
            deleted_at: None,
        });
        id
    }

    pub fn move_task(&self, task_id: i64, project_id: i64) {
        let mut state = self.lock();
        if let Some(task) = state.tasks.iter_mut().find(|t| t.id == task_id) {
            task.project_id = Some(project_id);
        }
    }

    pub fn set_task_category(&self, task_id: i64, category_id: i64) {
        let mut state = self.lock();
        if let Some(task) = state.tasks.iter_mut().find(|t| t.id == task_id) {
            task.category_id = Some(category_id);
        }
    }

    pub fn soft_delete_user(&self, id: i64) {
        let mut state = self.lock();
        if let Some(user) = state.users.iter_mut().find(|u| u.id == id) {
            user.deleted_at = Some(Utc::now());
        }
    }

    pub fn task(&self, id: i64) -> Option<Task> {
        self.lock().tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn user(&self, id: i64) -> Option<User> {
        self.lock().users.iter().find(|u| u.id == id).cloned()
    }
}

// =============================================================================
// TASKS
// =============================================================================

pub struct MemoryTasks(MemoryStore);

#[async_trait]
impl DeletableStore for MemoryTasks {
    fn entity_name(&self) -> &'static str {
        "Task"
    }

    async fn is_deleted(&self, id: i64) -> Result<Option<bool>> {
        let state = self.0.lock();
        Ok(state
            .tasks
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.deleted_at.is_some()))
    }

    async fn set_deleted_at(&self, id: i64, deleted_at: Option<DateTime<Utc>>) -> Result<bool> {
        let mut state = self.0.lock();
        let Some(slug) = state.tasks.iter().find(|t| t.id == id).map(|t| t.slug.clone()) else {
            return Ok(false);
        };
        if deleted_at.is_none() {
            state.ensure_slug_free(&slug, id)?;
        }
        if let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) {
            task.deleted_at = deleted_at;
        }
        Ok(true)
    }

    async fn purge(&self, id: i64) -> Result<bool> {
        let mut state = self.0.lock();
        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != id);
        state.assignees.retain(|(task_id, _)| *task_id != id);
        Ok(state.tasks.len() < before)
    }
}

#[async_trait]
impl TaskRepository for MemoryTasks {
    async fn list(&self, filter: &TaskFilter, page: &PageRequest) -> Result<Page<TaskRow>> {
        let state = self.0.lock();
        let rows = state
            .tasks
            .iter()
            .filter(|t| filter.matches(t))
            .map(|t| state.task_row(t))
            .collect();
        Ok(Page::from_vec(rows, page, |row| row.task.id))
    }

    async fn total_estimates(&self, filter: &TaskFilter) -> Result<i64> {
        let state = self.0.lock();
        Ok(state
            .tasks
            .iter()
            .filter(|t| filter.matches(t))
            .map(|t| t.estimate as i64)
            .sum())
    }

    async fn find(&self, id: i64) -> Result<Option<TaskRow>> {
        let state = self.0.lock();
        Ok(state
            .tasks
            .iter()
            .find(|t| t.id == id)
            .map(|t| state.task_row(t)))
    }

    async fn assignees(&self, task_ids: &[i64]) -> Result<Vec<TaskAssignee>> {
        let state = self.0.lock();
        let mut assignees: Vec<TaskAssignee> = state
            .assignees
            .iter()
            .filter(|(task_id, _)| task_ids.contains(task_id))
            .filter_map(|&(task_id, user_id)| {
                state
                    .users
                    .iter()
                    .find(|u| u.id == user_id)
                    .map(|u| TaskAssignee {
                        task_id,
                        user_id,
                        username: u.username.clone(),
                        email: u.email.clone(),
                    })
            })
            .collect();
        assignees.sort_by_key(|a| (a.task_id, a.user_id));
        Ok(assignees)
    }

    async fn create(&self, task: NewTask, assignees: &[i64]) -> Result<Task> {
        let mut state = self.0.lock();
        state.ensure_slug_free(&task.slug, 0)?;

        let now = Utc::now();
        let id = state.next_id();
        let created = Task {
            id,
            title: task.title,
            slug: task.slug,
            description: task.description,
            estimate: task.estimate,
            created_at: now,
            updated_at: now,
            due_date: task.due_date,
            project_id: task.project_id,
            status: task.status,
            category_id: task.category_id,
            attachments: task.attachments,
            deleted_at: None,
        };
        state.tasks.push(created.clone());
        state.link_assignees(id, assignees);
        Ok(created)
    }

    async fn update(&self, id: i64, changes: TaskChanges) -> Result<Option<Task>> {
        let mut state = self.0.lock();
        let Some(current) = state.tasks.iter().find(|t| t.id == id) else {
            return Ok(None);
        };
        if let Some(slug) = &changes.slug {
            if current.deleted_at.is_none() {
                state.ensure_slug_free(slug, id)?;
            }
        }

        let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            task.title = title;
        }
        if let Some(slug) = changes.slug {
            task.slug = slug;
        }
        if let Some(estimate) = changes.estimate {
            task.estimate = estimate;
        }
        task.description = changes.description.or(task.description.take());
        task.due_date = changes.due_date.or(task.due_date);
        task.project_id = changes.project_id.or(task.project_id);
        task.status = changes.status.or(task.status);
        task.category_id = changes.category_id.or(task.category_id);
        task.attachments = changes.attachments.or(task.attachments.take());
        task.updated_at = Utc::now();
        Ok(Some(task.clone()))
    }

    async fn for_project(&self, project_id: i64) -> Result<Vec<TaskRow>> {
        let state = self.0.lock();
        Ok(state
            .tasks
            .iter()
            .filter(|t| t.project_id == Some(project_id) && t.deleted_at.is_none())
            .map(|t| state.task_row(t))
            .collect())
    }

    async fn unassigned(&self) -> Result<Vec<Task>> {
        let state = self.0.lock();
        Ok(state
            .tasks
            .iter()
            .filter(|t| t.project_id.is_none() && t.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn assign_to_project(&self, project_id: i64, task_ids: &[i64]) -> Result<u64> {
        let mut state = self.0.lock();
        let mut updated = 0;
        for task in state
            .tasks
            .iter_mut()
            .filter(|t| task_ids.contains(&t.id) && t.deleted_at.is_none())
        {
            task.project_id = Some(project_id);
            task.updated_at = Utc::now();
            updated += 1;
        }
        Ok(updated)
    }

    async fn add_assignees(&self, task_id: i64, user_ids: &[i64]) -> Result<u64> {
        let mut state = self.0.lock();
        Ok(state.link_assignees(task_id, user_ids))
    }
}

// =============================================================================
// USERS
// =============================================================================

pub struct MemoryUsers(MemoryStore);

#[async_trait]
impl DeletableStore for MemoryUsers {
    fn entity_name(&self) -> &'static str {
        "User"
    }

    async fn is_deleted(&self, id: i64) -> Result<Option<bool>> {
        let state = self.0.lock();
        Ok(state
            .users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.deleted_at.is_some()))
    }

    async fn set_deleted_at(&self, id: i64, deleted_at: Option<DateTime<Utc>>) -> Result<bool> {
        let mut state = self.0.lock();
        Ok(match state.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.deleted_at = deleted_at;
                true
            }
            None => false,
        })
    }

    async fn purge(&self, id: i64) -> Result<bool> {
        let mut state = self.0.lock();
        let before = state.users.len();
        state.users.retain(|u| u.id != id);
        state.assignees.retain(|(_, user_id)| *user_id != id);
        Ok(state.users.len() < before)
    }
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn list(&self, filter: &UserFilter, page: &PageRequest) -> Result<Page<User>> {
        let state = self.0.lock();
        let users = state
            .users
            .iter()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        Ok(Page::from_vec(users, page, |u| u.id))
    }

    async fn all_active(&self) -> Result<Vec<User>> {
        let state = self.0.lock();
        let mut users: Vec<User> = state
            .users
            .iter()
            .filter(|u| u.deleted_at.is_none())
            .cloned()
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn find(&self, id: i64) -> Result<Option<User>> {
        Ok(self.0.user(id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.0.lock();
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.0.lock().users.len() as i64)
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let mut state = self.0.lock();
        state.ensure_email_free(&user.email, 0)?;

        let id = state.next_id();
        let created = User {
            id,
            email: user.email,
            username: user.username,
            password: user.password_hash,
            roles: user.roles,
            api_token: None,
            deleted_at: None,
        };
        state.users.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<Option<User>> {
        let mut state = self.0.lock();
        if let Some(email) = &changes.email {
            state.ensure_email_free(email, id)?;
        }

        let Some(user) = state.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password = password_hash;
        }
        if let Some(roles) = changes.roles {
            user.roles = roles;
        }
        Ok(Some(user.clone()))
    }

    async fn set_api_token(&self, id: i64, token: Option<&str>) -> Result<()> {
        let mut state = self.0.lock();
        if let Some(user) = state.users.iter_mut().find(|u| u.id == id) {
            user.api_token = token.map(str::to_string);
        }
        Ok(())
    }
}

// =============================================================================
// PROJECTS
// =============================================================================

pub struct MemoryProjects(MemoryStore);

#[async_trait]
impl DeletableStore for MemoryProjects {
    fn entity_name(&self) -> &'static str {
        "Project"
    }

    async fn is_deleted(&self, id: i64) -> Result<Option<bool>> {
        let state = self.0.lock();
        Ok(state
            .projects
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.deleted_at.is_some()))
    }

    async fn set_deleted_at(&self, id: i64, deleted_at: Option<DateTime<Utc>>) -> Result<bool> {
        let mut state = self.0.lock();
        Ok(match state.projects.iter_mut().find(|p| p.id == id) {
            Some(project) => {
                project.deleted_at = deleted_at;
                true
            }
            None => false,
        })
    }

    async fn purge(&self, id: i64) -> Result<bool> {
        let mut state = self.0.lock();
        let before = state.projects.len();
        state.projects.retain(|p| p.id != id);
        for task in state.tasks.iter_mut().filter(|t| t.project_id == Some(id)) {
            task.project_id = None;
        }
        Ok(state.projects.len() < before)
    }
}

#[async_trait]
impl ProjectRepository for MemoryProjects {
    async fn list(
        &self,
        filter: &ProjectFilter,
        page: &PageRequest,
    ) -> Result<Page<ProjectSummary>> {
        let state = self.0.lock();
        let summaries = state
            .projects
            .iter()
            .filter(|p| filter.matches(p))
            .map(|p| ProjectSummary {
                project: p.clone(),
                task_count: state
                    .tasks
                    .iter()
                    .filter(|t| t.project_id == Some(p.id) && t.deleted_at.is_none())
                    .count() as i64,
            })
            .collect();
        Ok(Page::from_vec(summaries, page, |s| s.project.id))
    }

    async fn all_active(&self) -> Result<Vec<Project>> {
        let state = self.0.lock();
        let mut projects: Vec<Project> = state
            .projects
            .iter()
            .filter(|p| p.deleted_at.is_none())
            .cloned()
            .collect();
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }

    async fn find(&self, id: i64) -> Result<Option<Project>> {
        let state = self.0.lock();
        Ok(state.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn create(&self, name: &str, description: Option<&str>) -> Result<Project> {
        let mut state = self.0.lock();
        let id = state.next_id();
        let project = Project {
            id,
            name: name.to_string(),
            description: description.map(str::to_string),
            deleted_at: None,
        };
        state.projects.push(project.clone());
        Ok(project)
    }

    async fn update(
        &self,
        id: i64,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Option<Project>> {
        let mut state = self.0.lock();
        let Some(project) = state.projects.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(name) = name {
            project.name = name;
        }
        if description.is_some() {
            project.description = description;
        }
        Ok(Some(project.clone()))
    }
}

// =============================================================================
// CATEGORIES
// =============================================================================

pub struct MemoryCategories(MemoryStore);

#[async_trait]
impl DeletableStore for MemoryCategories {
    fn entity_name(&self) -> &'static str {
        "Category"
    }

    async fn is_deleted(&self, id: i64) -> Result<Option<bool>> {
        let state = self.0.lock();
        Ok(state
            .categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.deleted_at.is_some()))
    }

    async fn set_deleted_at(&self, id: i64, deleted_at: Option<DateTime<Utc>>) -> Result<bool> {
        let mut state = self.0.lock();
        Ok(match state.categories.iter_mut().find(|c| c.id == id) {
            Some(category) => {
                category.deleted_at = deleted_at;
                true
            }
            None => false,
        })
    }

    async fn purge(&self, id: i64) -> Result<bool> {
        let mut state = self.0.lock();
        let before = state.categories.len();
        state.categories.retain(|c| c.id != id);
        for task in state.tasks.iter_mut().filter(|t| t.category_id == Some(id)) {
            task.category_id = None;
        }
        Ok(state.categories.len() < before)
    }
}

#[async_trait]
impl CategoryRepository for MemoryCategories {
    async fn list(&self, filter: &CategoryFilter, page: &PageRequest) -> Result<Page<Category>> {
        let state = self.0.lock();
        let categories = state
            .categories
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        Ok(Page::from_vec(categories, page, |c| c.id))
    }

    async fn all_active(&self) -> Result<Vec<Category>> {
        let state = self.0.lock();
        let mut categories: Vec<Category> = state
            .categories
            .iter()
            .filter(|c| c.deleted_at.is_none())
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn find(&self, id: i64) -> Result<Option<Category>> {
        let state = self.0.lock();
        Ok(state.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn create(&self, name: &str, label: &str) -> Result<Category> {
        let mut state = self.0.lock();
        let id = state.next_id();
        let category = Category {
            id,
            name: name.to_string(),
            label: label.to_string(),
            deleted_at: None,
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn update(
        &self,
        id: i64,
        name: Option<String>,
        label: Option<String>,
    ) -> Result<Option<Category>> {
        let mut state = self.0.lock();
        let Some(category) = state.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(name) = name {
            category.name = name;
        }
        if let Some(label) = label {
            category.label = label;
        }
        Ok(Some(category.clone()))
    }
}
