//! URL-encoded form bodies for the web pages and their conversion into DTOs.
//!
//! Browsers send empty strings for blank inputs, so every field arrives as a
//! `String` and is parsed here.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::projects::dtos::CreateProjectDto;
use crate::features::tasks::dtos::{
    AddAssigneesDto, AssignTasksDto, CreateTaskDto, TaskDetailDto, UpdateTaskDto,
};

/// `<input type="datetime-local">` value
const DATETIME_LOCAL: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskForm {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub estimate: String,
    pub due_date: String,
    pub status: String,
    pub category_id: String,
    pub attachments: String,
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn invalid(field: &str, message: &str) -> AppError {
    AppError::InvalidFields(vec![format!("{}: {}", field, message)])
}

fn parse_number<T: std::str::FromStr>(field: &str, raw: &str) -> Result<Option<T>> {
    match non_empty(raw) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| invalid(field, "Must be a number")),
    }
}

fn parse_due_date(raw: &str) -> Result<Option<DateTime<Utc>>> {
    match non_empty(raw) {
        None => Ok(None),
        Some(value) => NaiveDateTime::parse_from_str(&value, DATETIME_LOCAL)
            .map(|dt| Some(dt.and_utc()))
            .map_err(|_| invalid("due_date", "Invalid date")),
    }
}

impl TaskForm {
    /// Prefill the edit form
    pub fn from_detail(task: &TaskDetailDto) -> Self {
        Self {
            title: task.title.clone(),
            slug: task.slug.clone(),
            description: task.description.clone().unwrap_or_default(),
            estimate: task.estimate.to_string(),
            due_date: task
                .due_date
                .map(|d| d.format(DATETIME_LOCAL).to_string())
                .unwrap_or_default(),
            status: task.status.map(|s| s.to_string()).unwrap_or_default(),
            category_id: task.category_id.map(|c| c.to_string()).unwrap_or_default(),
            attachments: task.attachments.clone().unwrap_or_default(),
        }
    }

    /// Parse and validate into a create request
    pub fn to_create(&self) -> Result<CreateTaskDto> {
        let estimate = parse_number("estimate", &self.estimate)?
            .ok_or_else(|| invalid("estimate", "Estimate is required"))?;

        let dto = CreateTaskDto {
            title: self.title.trim().to_string(),
            slug: non_empty(&self.slug),
            description: non_empty(&self.description),
            estimate,
            due_date: parse_due_date(&self.due_date)?,
            project_id: None,
            status: non_empty(&self.status),
            category_id: parse_number("category_id", &self.category_id)?,
            attachments: non_empty(&self.attachments),
            assignees: vec![],
        };
        dto.validate()?;
        Ok(dto)
    }

    /// Parse and validate into a partial update; blank inputs keep the stored value
    pub fn to_update(&self) -> Result<UpdateTaskDto> {
        let dto = UpdateTaskDto {
            title: non_empty(&self.title),
            slug: non_empty(&self.slug),
            description: non_empty(&self.description),
            estimate: parse_number("estimate", &self.estimate)?,
            due_date: parse_due_date(&self.due_date)?,
            project_id: None,
            status: non_empty(&self.status),
            category_id: parse_number("category_id", &self.category_id)?,
            attachments: non_empty(&self.attachments),
        };
        dto.validate()?;
        Ok(dto)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectForm {
    pub name: String,
    pub description: String,
}

impl ProjectForm {
    pub fn to_create(&self) -> Result<CreateProjectDto> {
        let dto = CreateProjectDto {
            name: self.name.trim().to_string(),
            description: non_empty(&self.description),
        };
        dto.validate()?;
        Ok(dto)
    }
}

/// Every numeric value submitted under `key`, as sent by repeated checkboxes
fn ids(pairs: &[(String, String)], key: &str) -> Result<Vec<i64>> {
    pairs
        .iter()
        .filter(|(name, _)| name == key)
        .map(|(_, value)| {
            value
                .trim()
                .parse()
                .map_err(|_| AppError::BadRequest(format!("Invalid id '{}' for {}", value, key)))
        })
        .collect()
}

fn single_id(pairs: &[(String, String)], key: &str, message: &str) -> Result<i64> {
    ids(pairs, key)?
        .into_iter()
        .next()
        .ok_or_else(|| invalid(key, message))
}

/// `project_id=..&task_ids=..&task_ids=..`
pub fn parse_assign_tasks(pairs: &[(String, String)]) -> Result<AssignTasksDto> {
    let dto = AssignTasksDto {
        project_id: single_id(pairs, "project_id", "Select a project")?,
        task_ids: ids(pairs, "task_ids")?,
    };
    dto.validate()?;
    Ok(dto)
}

/// `task_id=..&user_ids=..&user_ids=..`
pub fn parse_assign_users(pairs: &[(String, String)]) -> Result<(i64, AddAssigneesDto)> {
    let task_id = single_id(pairs, "task_id", "Select a task")?;
    let dto = AddAssigneesDto {
        user_ids: ids(pairs, "user_ids")?,
    };
    dto.validate()?;
    Ok((task_id, dto))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn task_form() -> TaskForm {
        TaskForm {
            title: "Write the quarterly report".to_string(),
            estimate: "8".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_blank_inputs_become_none() {
        let dto = task_form().to_create().unwrap();
        assert_eq!(dto.estimate, 8);
        assert_eq!(dto.slug, None);
        assert_eq!(dto.category_id, None);
        assert_eq!(dto.due_date, None);
    }

    #[test]
    fn test_due_date_from_datetime_local() {
        let mut form = task_form();
        form.due_date = "2024-12-31T17:30".to_string();
        let dto = form.to_create().unwrap();
        assert_eq!(
            dto.due_date,
            Some(Utc.with_ymd_and_hms(2024, 12, 31, 17, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_bad_numbers_are_field_errors() {
        let mut form = task_form();
        form.estimate = "lots".to_string();
        match form.to_create() {
            Err(AppError::InvalidFields(errors)) => {
                assert_eq!(errors, vec!["estimate: Must be a number".to_string()])
            }
            other => panic!("unexpected {:?}", other),
        }

        form.estimate = String::new();
        assert!(matches!(form.to_create(), Err(AppError::InvalidFields(_))));
    }

    #[test]
    fn test_create_runs_dto_validation() {
        let mut form = task_form();
        form.title = "Too short".to_string();
        assert!(matches!(form.to_create(), Err(AppError::Validation(_) | AppError::InvalidFields(_))));
    }

    #[test]
    fn test_update_keeps_blank_fields() {
        let form = TaskForm {
            estimate: "12".to_string(),
            ..Default::default()
        };
        let dto = form.to_update().unwrap();
        assert_eq!(dto.title, None);
        assert_eq!(dto.estimate, Some(12));
    }

    #[test]
    fn test_parse_assign_tasks() {
        let dto = parse_assign_tasks(&pairs(&[
            ("project_id", "4"),
            ("task_ids", "1"),
            ("task_ids", "3"),
        ]))
        .unwrap();
        assert_eq!(dto.project_id, 4);
        assert_eq!(dto.task_ids, vec![1, 3]);

        assert!(parse_assign_tasks(&pairs(&[("task_ids", "1")])).is_err());
        assert!(parse_assign_tasks(&pairs(&[("project_id", "4")])).is_err());
        assert!(matches!(
            parse_assign_tasks(&pairs(&[("project_id", "4"), ("task_ids", "x")])),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_parse_assign_users() {
        let (task_id, dto) = parse_assign_users(&pairs(&[
            ("task_id", "9"),
            ("user_ids", "2"),
            ("user_ids", "5"),
        ]))
        .unwrap();
        assert_eq!(task_id, 9);
        assert_eq!(dto.user_ids, vec![2, 5]);
    }

    #[test]
    fn test_project_form() {
        let form = ProjectForm {
            name: "  Website  ".to_string(),
            description: " ".to_string(),
        };
        let dto = form.to_create().unwrap();
        assert_eq!(dto.name, "Website");
        assert_eq!(dto.description, None);

        assert!(ProjectForm::default().to_create().is_err());
    }
}
