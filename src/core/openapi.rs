use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::auth;
use crate::features::categories::{dtos as categories_dtos, handlers as categories_handlers};
use crate::features::projects::{dtos as projects_dtos, handlers as projects_handlers};
use crate::features::tasks::{
    dtos as tasks_dtos, handlers as tasks_handlers, models as tasks_models,
};
use crate::features::users::{dtos as users_dtos, handlers as users_handlers};
use crate::shared::constants::API_KEY_HEADER;
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        auth::handlers::login,
        // Users
        users_handlers::create_default_user,
        users_handlers::list_users,
        users_handlers::get_user,
        users_handlers::create_user,
        users_handlers::update_user,
        users_handlers::delete_user,
        // Projects
        projects_handlers::create_project,
        projects_handlers::list_projects,
        projects_handlers::get_project,
        projects_handlers::edit_project,
        projects_handlers::delete_project,
        // Tasks
        tasks_handlers::list_tasks,
        tasks_handlers::task_estimates,
        tasks_handlers::get_task,
        tasks_handlers::create_task,
        tasks_handlers::update_task,
        tasks_handlers::delete_task,
        tasks_handlers::restore_task,
        tasks_handlers::hard_delete_task,
        tasks_handlers::assign_tasks,
        tasks_handlers::add_task_assignees,
        // Categories
        categories_handlers::list_categories,
        categories_handlers::get_category,
        categories_handlers::create_category,
        categories_handlers::update_category,
        categories_handlers::delete_category,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Auth
            auth::dtos::LoginRequestDto,
            auth::dtos::LoginResponseDto,
            // Users
            users_dtos::CreateUserDto,
            users_dtos::UpdateUserDto,
            users_dtos::UserResponseDto,
            ApiResponse<users_dtos::UserResponseDto>,
            // Projects
            projects_dtos::CreateProjectDto,
            projects_dtos::UpdateProjectDto,
            projects_dtos::ProjectResponseDto,
            projects_dtos::ProjectSummaryDto,
            projects_dtos::ProjectDetailDto,
            // Tasks
            tasks_models::TaskStatus,
            tasks_dtos::CreateTaskDto,
            tasks_dtos::UpdateTaskDto,
            tasks_dtos::AssigneeDto,
            tasks_dtos::TaskListItemDto,
            tasks_dtos::TaskDetailDto,
            tasks_dtos::TotalEstimatesDto,
            tasks_dtos::AssignTasksDto,
            tasks_dtos::AddAssigneesDto,
            tasks_dtos::AssignResultDto,
            ApiResponse<tasks_dtos::TaskDetailDto>,
            // Categories
            categories_dtos::CreateCategoryDto,
            categories_dtos::UpdateCategoryDto,
            categories_dtos::CategoryResponseDto,
            ApiResponse<categories_dtos::CategoryResponseDto>,
        )
    ),
    tags(
        (name = "auth", description = "Login and token issuance"),
        (name = "users", description = "User management and bootstrap"),
        (name = "projects", description = "Projects and their tasks"),
        (name = "tasks", description = "Tasks, estimates, trash and assignment"),
        (name = "categories", description = "Task categories"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Taskboard API",
        version = "0.1.0",
        description = "API documentation for Taskboard",
    )
)]
pub struct ApiDoc;

/// Adds the API key header scheme to the OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(API_KEY_HEADER))),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
