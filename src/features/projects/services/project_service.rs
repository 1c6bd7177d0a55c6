use std::sync::Arc;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthContext;
use crate::features::projects::dtos::{
    CreateProjectDto, ProjectDetailDto, ProjectListQuery, ProjectResponseDto, ProjectSummaryDto,
    UpdateProjectDto,
};
use crate::features::projects::repositories::ProjectRepository;
use crate::features::tasks::TaskService;
use crate::shared::deletion::{self, DeleteMode};
use crate::shared::query::filter::search_term;
use crate::shared::query::{Page, PageRequest, ProjectFilter, TrashPolicy};

/// Service for project operations
pub struct ProjectService {
    repo: Arc<dyn ProjectRepository>,
    tasks: Arc<TaskService>,
    trash: TrashPolicy,
}

impl ProjectService {
    pub fn new(repo: Arc<dyn ProjectRepository>, tasks: Arc<TaskService>, trash: TrashPolicy) -> Self {
        Self { repo, tasks, trash }
    }

    /// Projects with their active task counts; `default_limit` applies when the query has none
    pub async fn list(
        &self,
        ctx: &AuthContext,
        query: &ProjectListQuery,
        default_limit: i64,
    ) -> Result<Page<ProjectSummaryDto>> {
        let filter = ProjectFilter {
            search: search_term(query.search.as_deref()),
            visibility: self.trash.resolve(ctx, query.deleted.unwrap_or(false))?,
        };
        let page = PageRequest::new(
            query.page,
            Some(query.limit.unwrap_or(default_limit)),
            query.sort,
        );

        let projects = self.repo.list(&filter, &page).await?;
        Ok(projects.map(ProjectSummaryDto::from))
    }

    /// All active projects (flat list)
    pub async fn list_active(&self) -> Result<Vec<ProjectResponseDto>> {
        let projects = self.repo.all_active().await?;
        Ok(projects.into_iter().map(ProjectResponseDto::from).collect())
    }

    /// Active project with its active tasks, `None` when there is no such project
    pub async fn detail(&self, id: i64) -> Result<Option<ProjectDetailDto>> {
        let Some(project) = self.repo.find(id).await?.filter(|p| p.deleted_at.is_none()) else {
            return Ok(None);
        };

        let tasks = self.tasks.for_project(project.id).await?;
        Ok(Some(ProjectDetailDto {
            id: project.id,
            name: project.name,
            description: project.description,
            tasks,
        }))
    }

    pub async fn create(&self, dto: CreateProjectDto) -> Result<ProjectResponseDto> {
        let project = self
            .repo
            .create(&dto.name, dto.description.as_deref())
            .await?;

        tracing::info!("Created project {} ({})", project.id, project.name);
        Ok(project.into())
    }

    pub async fn update(&self, id: i64, dto: UpdateProjectDto) -> Result<ProjectResponseDto> {
        let project = self
            .repo
            .update(id, dto.name, dto.description)
            .await?
            .ok_or_else(|| not_found(id))?;

        tracing::info!("Updated project {}", id);
        Ok(project.into())
    }

    /// Tasks of a soft-deleted project keep their `project_id`
    pub async fn soft_delete(&self, id: i64) -> Result<()> {
        deletion::soft_delete(self.repo.as_ref(), id).await
    }

    /// Tasks of a purged project become unassigned
    pub async fn hard_delete(&self, id: i64) -> Result<()> {
        deletion::hard_delete(self.repo.as_ref(), id).await
    }

    pub async fn delete_for(&self, ctx: &AuthContext, id: i64) -> Result<DeleteMode> {
        deletion::delete_for(self.repo.as_ref(), ctx, id).await
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Project {} not found", id))
}
