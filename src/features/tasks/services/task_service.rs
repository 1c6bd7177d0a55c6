use std::collections::HashMap;
use std::sync::Arc;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthContext;
use crate::features::projects::repositories::ProjectRepository;
use crate::features::tasks::dtos::{
    AddAssigneesDto, AssignTasksDto, AssigneeDto, CreateTaskDto, TaskDetailDto, TaskListItemDto,
    TaskListQuery, UpdateTaskDto,
};
use crate::features::tasks::models::{NewTask, TaskChanges, TaskRow, TaskStatus};
use crate::features::tasks::repositories::TaskRepository;
use crate::shared::constants::MAX_ESTIMATE;
use crate::shared::deletion::{self, DeleteMode};
use crate::shared::query::filter::search_term;
use crate::shared::query::{Page, PageRequest, TaskFilter, TrashPolicy};
use crate::shared::slug::slugify;
use crate::shared::validation::validate_slug;

/// A page of tasks plus the estimate total over every matching task
#[derive(Debug)]
pub struct TaskListing {
    pub page: Page<TaskListItemDto>,
    pub total_estimates: i64,
}

/// Service for task operations
pub struct TaskService {
    repo: Arc<dyn TaskRepository>,
    projects: Arc<dyn ProjectRepository>,
    trash: TrashPolicy,
}

impl TaskService {
    pub fn new(
        repo: Arc<dyn TaskRepository>,
        projects: Arc<dyn ProjectRepository>,
        trash: TrashPolicy,
    ) -> Self {
        Self {
            repo,
            projects,
            trash,
        }
    }

    /// Translate query parameters into a filter for `ctx`
    pub fn filter(&self, ctx: &AuthContext, query: &TaskListQuery) -> Result<TaskFilter> {
        Ok(TaskFilter {
            search: search_term(query.search.as_deref()),
            min_estimate: query.min_estimate.unwrap_or(0),
            max_estimate: query.max_estimate.unwrap_or(MAX_ESTIMATE),
            project_id: query.project.unwrap_or(0),
            category_id: query.category.unwrap_or(0),
            visibility: self.trash.resolve(ctx, query.deleted.unwrap_or(false))?,
        })
    }

    pub async fn list(&self, ctx: &AuthContext, query: &TaskListQuery) -> Result<TaskListing> {
        self.list_with(ctx, query, PageRequest::new(query.page, query.limit, query.sort))
            .await
    }

    /// Same as [`TaskService::list`] with a caller-chosen page request
    pub async fn list_with(
        &self,
        ctx: &AuthContext,
        query: &TaskListQuery,
        page: PageRequest,
    ) -> Result<TaskListing> {
        let filter = self.filter(ctx, query)?;

        let rows = self.repo.list(&filter, &page).await?;
        let total_estimates = self.repo.total_estimates(&filter).await?;

        let items = self.attach_assignees(rows.items).await?;
        Ok(TaskListing {
            page: Page {
                items,
                total: rows.total,
                page: rows.page,
                limit: rows.limit,
            },
            total_estimates,
        })
    }

    pub async fn total_estimates(&self, ctx: &AuthContext, query: &TaskListQuery) -> Result<i64> {
        let filter = self.filter(ctx, query)?;
        self.repo.total_estimates(&filter).await
    }

    pub async fn get(&self, ctx: &AuthContext, id: i64, show_deleted: bool) -> Result<TaskDetailDto> {
        let visibility = self.trash.resolve(ctx, show_deleted)?;

        let row = self
            .repo
            .find(id)
            .await?
            .filter(|row| visibility.admits(row.task.deleted_at))
            .ok_or_else(|| not_found(id))?;

        self.detail(row).await
    }

    pub async fn create(&self, dto: CreateTaskDto) -> Result<TaskDetailDto> {
        let slug = derive_slug(&dto.title, dto.slug.as_deref())?;
        let project_id = self.existing_project(dto.project_id).await?;

        let task = self
            .repo
            .create(
                NewTask {
                    title: dto.title,
                    slug,
                    description: dto.description,
                    estimate: dto.estimate,
                    due_date: dto.due_date,
                    project_id,
                    status: parse_status(dto.status.as_deref()),
                    category_id: dto.category_id.filter(|id| *id > 0),
                    attachments: dto.attachments,
                },
                &dto.assignees,
            )
            .await?;

        tracing::info!("Created task {} ({})", task.id, task.slug);
        self.get_any(task.id).await
    }

    /// Partial update. A new title without an explicit slug re-derives the slug.
    pub async fn update(&self, id: i64, dto: UpdateTaskDto) -> Result<TaskDetailDto> {
        let slug = match (&dto.title, dto.slug.as_deref()) {
            (_, Some(slug)) => Some(derive_slug("", Some(slug))?),
            (Some(title), None) => Some(derive_slug(title, None)?),
            (None, None) => None,
        };
        let project_id = self.existing_project(dto.project_id).await?;

        let task = self
            .repo
            .update(
                id,
                TaskChanges {
                    title: dto.title,
                    slug,
                    description: dto.description,
                    estimate: dto.estimate,
                    due_date: dto.due_date,
                    project_id,
                    status: parse_status(dto.status.as_deref()),
                    category_id: dto.category_id.filter(|id| *id > 0),
                    attachments: dto.attachments,
                },
            )
            .await?
            .ok_or_else(|| not_found(id))?;

        tracing::info!("Updated task {}", task.id);
        self.get_any(task.id).await
    }

    pub async fn soft_delete(&self, id: i64) -> Result<()> {
        deletion::soft_delete(self.repo.as_ref(), id).await
    }

    pub async fn hard_delete(&self, id: i64) -> Result<()> {
        deletion::hard_delete(self.repo.as_ref(), id).await
    }

    pub async fn restore(&self, id: i64) -> Result<TaskDetailDto> {
        deletion::restore(self.repo.as_ref(), id).await?;
        self.get_any(id).await
    }

    /// Role-dependent delete used by the web pages
    pub async fn delete_for(&self, ctx: &AuthContext, id: i64) -> Result<DeleteMode> {
        deletion::delete_for(self.repo.as_ref(), ctx, id).await
    }

    /// Active tasks that do not belong to a project yet
    pub async fn unassigned(&self) -> Result<Vec<TaskListItemDto>> {
        let tasks = self.repo.unassigned().await?;
        Ok(tasks
            .into_iter()
            .map(|task| {
                TaskListItemDto::from_row(
                    TaskRow {
                        task,
                        project_name: None,
                    },
                    vec![],
                )
            })
            .collect())
    }

    /// Active tasks owned by a project, with their assignees
    pub async fn for_project(&self, project_id: i64) -> Result<Vec<TaskListItemDto>> {
        let rows = self.repo.for_project(project_id).await?;
        self.attach_assignees(rows).await
    }

    pub async fn assign_to_project(&self, dto: AssignTasksDto) -> Result<u64> {
        self.existing_project(Some(dto.project_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", dto.project_id)))?;

        let updated = self
            .repo
            .assign_to_project(dto.project_id, &dto.task_ids)
            .await?;

        tracing::info!("Assigned {} tasks to project {}", updated, dto.project_id);
        Ok(updated)
    }

    pub async fn add_assignees(&self, task_id: i64, dto: AddAssigneesDto) -> Result<u64> {
        self.repo
            .find(task_id)
            .await?
            .filter(|row| row.task.deleted_at.is_none())
            .ok_or_else(|| not_found(task_id))?;

        let added = self.repo.add_assignees(task_id, &dto.user_ids).await?;

        tracing::info!("Added {} assignees to task {}", added, task_id);
        Ok(added)
    }

    async fn get_any(&self, id: i64) -> Result<TaskDetailDto> {
        let row = self.repo.find(id).await?.ok_or_else(|| not_found(id))?;
        self.detail(row).await
    }

    async fn detail(&self, row: TaskRow) -> Result<TaskDetailDto> {
        let assignees = self
            .repo
            .assignees(&[row.task.id])
            .await?
            .into_iter()
            .map(AssigneeDto::from)
            .collect();

        Ok(TaskDetailDto::from_row(row, assignees))
    }

    async fn attach_assignees(&self, rows: Vec<TaskRow>) -> Result<Vec<TaskListItemDto>> {
        let ids: Vec<i64> = rows.iter().map(|row| row.task.id).collect();

        let mut by_task: HashMap<i64, Vec<AssigneeDto>> = HashMap::new();
        for assignee in self.repo.assignees(&ids).await? {
            by_task
                .entry(assignee.task_id)
                .or_default()
                .push(assignee.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let assignees = by_task.remove(&row.task.id).unwrap_or_default();
                TaskListItemDto::from_row(row, assignees)
            })
            .collect())
    }

    /// `Some(id)` of an active project, `None` when no project was given
    async fn existing_project(&self, project_id: Option<i64>) -> Result<Option<i64>> {
        let Some(project_id) = project_id.filter(|id| *id > 0) else {
            return Ok(None);
        };

        self.projects
            .find(project_id)
            .await?
            .filter(|p| p.deleted_at.is_none())
            .map(|p| Some(p.id))
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", project_id)))
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Task {} not found", id))
}

/// Unknown statuses are dropped rather than rejected
fn parse_status(raw: Option<&str>) -> Option<TaskStatus> {
    let raw = raw?;
    match raw.parse() {
        Ok(status) => Some(status),
        Err(e) => {
            tracing::debug!("Ignoring task status: {}", e);
            None
        }
    }
}

/// Use an explicit slug after validating it, otherwise slugify `title`.
///
/// Derived slugs only need to be non-empty; the title rules already ran.
fn derive_slug(title: &str, explicit: Option<&str>) -> Result<String> {
    let Some(slug) = explicit else {
        let slug = slugify(title);
        if slug.is_empty() {
            return Err(AppError::InvalidFields(vec![
                "slug: Title must contain letters or digits".to_string(),
            ]));
        }
        return Ok(slug);
    };

    validate_slug(slug).map_err(|e| {
        let message = e
            .message
            .map(|m| m.to_string())
            .unwrap_or_else(|| e.code.to_string());
        AppError::InvalidFields(vec![format!("slug: {}", message)])
    })?;

    Ok(slug.to_string())
}
