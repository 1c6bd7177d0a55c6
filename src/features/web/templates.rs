//! HTML templates for the web pages, embedded at compile time.

use std::sync::OnceLock;

use minijinja::{Environment, Value};
use thiserror::Error;

use crate::shared::slug::slugify;

static TEMPLATE_ENV: OnceLock<Environment<'static>> = OnceLock::new();

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../../templates/web/base.html")),
    ("login.html", include_str!("../../../templates/web/login.html")),
    ("error.html", include_str!("../../../templates/web/error.html")),
    (
        "tasks/index.html",
        include_str!("../../../templates/web/tasks/index.html"),
    ),
    (
        "tasks/show.html",
        include_str!("../../../templates/web/tasks/show.html"),
    ),
    (
        "tasks/form.html",
        include_str!("../../../templates/web/tasks/form.html"),
    ),
    (
        "projects/index.html",
        include_str!("../../../templates/web/projects/index.html"),
    ),
    (
        "projects/show.html",
        include_str!("../../../templates/web/projects/show.html"),
    ),
    (
        "projects/form.html",
        include_str!("../../../templates/web/projects/form.html"),
    ),
    (
        "assign_tasks.html",
        include_str!("../../../templates/web/assign_tasks.html"),
    ),
    (
        "assign_users.html",
        include_str!("../../../templates/web/assign_users.html"),
    ),
];

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template '{0}' not found")]
    NotFound(String),

    #[error("Failed to render template: {0}")]
    RenderError(String),
}

fn init_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.add_filter("slugify", |value: String| slugify(&value));

    for &(name, source) in TEMPLATES {
        if let Err(e) = env.add_template(name, source) {
            tracing::warn!("Failed to load template {}: {}", name, e);
        }
    }

    env
}

fn environment() -> &'static Environment<'static> {
    TEMPLATE_ENV.get_or_init(init_environment)
}

/// Render a page template; `.html` templates are auto-escaped
pub fn render(name: &str, ctx: Value) -> Result<String, TemplateError> {
    let template = environment()
        .get_template(name)
        .map_err(|_| TemplateError::NotFound(name.to_string()))?;

    template
        .render(ctx)
        .map_err(|e| TemplateError::RenderError(e.to_string()))
}
