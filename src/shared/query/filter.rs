use sqlx::{Postgres, QueryBuilder};

use crate::features::categories::models::Category;
use crate::features::projects::models::Project;
use crate::features::tasks::models::Task;
use crate::features::users::models::User;
use crate::shared::constants::MAX_ESTIMATE;
use crate::shared::query::visibility::Visibility;

/// A request filter that renders itself as a SQL `WHERE` clause.
///
/// The clause always starts with the visibility predicate, so filters can be
/// appended to any `SELECT ... FROM <table> <alias>` prefix.
pub trait SqlFilter: Send + Sync {
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>);
}

/// Trim a raw search term; blank terms mean "no search"
pub fn search_term(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `%term%` with LIKE metacharacters escaped so they match literally
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

// =============================================================================
// TASKS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFilter {
    pub search: Option<String>,
    pub min_estimate: i32,
    pub max_estimate: i32,
    /// `0` means no project filter
    pub project_id: i64,
    /// `0` means no category filter
    pub category_id: i64,
    pub visibility: Visibility,
}

impl Default for TaskFilter {
    fn default() -> Self {
        Self {
            search: None,
            min_estimate: 0,
            max_estimate: MAX_ESTIMATE,
            project_id: 0,
            category_id: 0,
            visibility: Visibility::Active,
        }
    }
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.visibility.admits(task.deleted_at)
            && self
                .search
                .as_deref()
                .is_none_or(|term| contains_ignore_case(&task.title, term))
            && (self.min_estimate..=self.max_estimate).contains(&task.estimate)
            && (self.project_id <= 0 || task.project_id == Some(self.project_id))
            && (self.category_id <= 0 || task.category_id == Some(self.category_id))
    }
}

impl SqlFilter for TaskFilter {
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE ");
        self.visibility.push(qb, "t.deleted_at");

        if let Some(term) = &self.search {
            qb.push(" AND t.title ILIKE ").push_bind(like_pattern(term));
        }

        qb.push(" AND t.estimate BETWEEN ")
            .push_bind(self.min_estimate)
            .push(" AND ")
            .push_bind(self.max_estimate);

        if self.project_id > 0 {
            qb.push(" AND t.project_id = ").push_bind(self.project_id);
        }

        if self.category_id > 0 {
            qb.push(" AND t.category_id = ").push_bind(self.category_id);
        }
    }
}

// =============================================================================
// PROJECTS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFilter {
    pub search: Option<String>,
    pub visibility: Visibility,
}

impl ProjectFilter {
    pub fn matches(&self, project: &Project) -> bool {
        self.visibility.admits(project.deleted_at)
            && self
                .search
                .as_deref()
                .is_none_or(|term| contains_ignore_case(&project.name, term))
    }
}

impl SqlFilter for ProjectFilter {
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE ");
        self.visibility.push(qb, "p.deleted_at");

        if let Some(term) = &self.search {
            qb.push(" AND p.name ILIKE ").push_bind(like_pattern(term));
        }
    }
}

// =============================================================================
// USERS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// Matched against username or email
    pub search: Option<String>,
    pub visibility: Visibility,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        self.visibility.admits(user.deleted_at)
            && self.search.as_deref().is_none_or(|term| {
                contains_ignore_case(&user.username, term) || contains_ignore_case(&user.email, term)
            })
    }
}

impl SqlFilter for UserFilter {
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE ");
        self.visibility.push(qb, "u.deleted_at");

        if let Some(term) = &self.search {
            let pattern = like_pattern(term);
            qb.push(" AND (u.username ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR u.email ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

// =============================================================================
// CATEGORIES
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFilter {
    pub search: Option<String>,
    pub visibility: Visibility,
}

impl CategoryFilter {
    pub fn matches(&self, category: &Category) -> bool {
        self.visibility.admits(category.deleted_at)
            && self
                .search
                .as_deref()
                .is_none_or(|term| contains_ignore_case(&category.name, term))
    }
}

impl SqlFilter for CategoryFilter {
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE ");
        self.visibility.push(qb, "c.deleted_at");

        if let Some(term) = &self.search {
            qb.push(" AND c.name ILIKE ").push_bind(like_pattern(term));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::task_fixture;

    fn sample_tasks() -> Vec<Task> {
        let mut tasks = vec![
            task_fixture(1, "Write the quarterly report", 5),
            task_fixture(2, "Review pull requests", 10),
            task_fixture(3, "Plan the team offsite", 15),
            task_fixture(4, "Report 100% coverage", 40),
        ];
        tasks[0].project_id = Some(1);
        tasks[1].project_id = Some(1);
        tasks[2].project_id = Some(2);
        tasks[1].category_id = Some(7);
        tasks[3].deleted_at = Some(chrono::Utc::now());
        tasks
    }

    fn ids(tasks: &[Task], filter: &TaskFilter) -> Vec<i64> {
        tasks
            .iter()
            .filter(|t| filter.matches(t))
            .map(|t| t.id)
            .collect()
    }

    #[test]
    fn test_search_term_trims_blank() {
        assert_eq!(search_term(Some("   ")), None);
        assert_eq!(search_term(None), None);
        assert_eq!(search_term(Some(" report ")), Some("report".to_string()));
    }

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("report"), "%report%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b\\c"), "%a\\_b\\\\c%");
    }

    #[test]
    fn test_default_filter_shows_active_tasks() {
        assert_eq!(ids(&sample_tasks(), &TaskFilter::default()), vec![1, 2, 3]);
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let filter = TaskFilter {
            search: Some("REPORT".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&sample_tasks(), &filter), vec![1]);
    }

    #[test]
    fn test_zero_foreign_keys_do_not_filter() {
        let filter = TaskFilter {
            project_id: 0,
            category_id: 0,
            ..Default::default()
        };
        assert_eq!(ids(&sample_tasks(), &filter), vec![1, 2, 3]);

        let filter = TaskFilter {
            project_id: 1,
            category_id: 7,
            ..Default::default()
        };
        assert_eq!(ids(&sample_tasks(), &filter), vec![2]);
    }

    #[test]
    fn test_adding_filters_never_grows_the_result() {
        let tasks = sample_tasks();
        let searches = [None, Some("re".to_string()), Some("plan".to_string())];
        let ranges = [(0, MAX_ESTIMATE), (8, 20), (0, 9)];
        let projects = [0, 1, 2];
        let categories = [0, 7];

        for search in &searches {
            for &(min, max) in &ranges {
                for &project_id in &projects {
                    for &category_id in &categories {
                        let filter = TaskFilter {
                            search: search.clone(),
                            min_estimate: min,
                            max_estimate: max,
                            project_id,
                            category_id,
                            visibility: Visibility::Active,
                        };
                        let narrowed = ids(&tasks, &filter);

                        let relaxed = [
                            TaskFilter { search: None, ..filter.clone() },
                            TaskFilter { min_estimate: 0, max_estimate: MAX_ESTIMATE, ..filter.clone() },
                            TaskFilter { project_id: 0, ..filter.clone() },
                            TaskFilter { category_id: 0, ..filter.clone() },
                        ];
                        for wider in relaxed {
                            let wider_ids = ids(&tasks, &wider);
                            assert!(
                                narrowed.iter().all(|id| wider_ids.contains(id)),
                                "{:?} is not a subset of {:?}",
                                narrowed,
                                wider_ids
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_task_filter_sql() {
        let filter = TaskFilter {
            search: Some("report".to_string()),
            min_estimate: 8,
            max_estimate: 20,
            project_id: 3,
            category_id: 0,
            visibility: Visibility::Active,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT t.id FROM tasks t");
        filter.push_conditions(&mut qb);

        assert_eq!(
            qb.sql(),
            "SELECT t.id FROM tasks t WHERE t.deleted_at IS NULL AND t.title ILIKE $1 \
             AND t.estimate BETWEEN $2 AND $3 AND t.project_id = $4"
        );
    }

    #[test]
    fn test_user_filter_sql_searches_username_or_email() {
        let filter = UserFilter {
            search: Some("ann".to_string()),
            visibility: Visibility::Trashed,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT u.id FROM users u");
        filter.push_conditions(&mut qb);

        assert_eq!(
            qb.sql(),
            "SELECT u.id FROM users u WHERE u.deleted_at IS NOT NULL \
             AND (u.username ILIKE $1 OR u.email ILIKE $2)"
        );
    }
}
