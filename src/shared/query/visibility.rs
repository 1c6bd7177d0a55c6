use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthContext;

/// Which side of the soft-delete line a query looks at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    /// `deleted_at IS NULL`
    #[default]
    Active,
    /// `deleted_at IS NOT NULL` (the trash view)
    Trashed,
}

impl Visibility {
    /// The explicit `deleted` flag always wins; the role does not gate the trash.
    pub fn resolve(is_admin: bool, show_deleted: bool) -> Self {
        match (is_admin, show_deleted) {
            (_, true) => Visibility::Trashed,
            (_, false) => Visibility::Active,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Visibility::Active => "IS NULL",
            Visibility::Trashed => "IS NOT NULL",
        }
    }

    /// Append `<column> IS [NOT] NULL`
    pub fn push(&self, qb: &mut QueryBuilder<'_, Postgres>, column: &str) {
        qb.push(column).push(" ").push(self.as_sql());
    }

    /// In-memory counterpart of [`Visibility::push`]
    pub fn admits(&self, deleted_at: Option<DateTime<Utc>>) -> bool {
        match self {
            Visibility::Active => deleted_at.is_none(),
            Visibility::Trashed => deleted_at.is_some(),
        }
    }
}

/// Deployment switch on top of [`Visibility::resolve`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TrashPolicy {
    pub requires_admin: bool,
}

impl TrashPolicy {
    pub fn new(requires_admin: bool) -> Self {
        Self { requires_admin }
    }

    pub fn resolve(&self, ctx: &AuthContext, show_deleted: bool) -> Result<Visibility> {
        if show_deleted && self.requires_admin && !ctx.is_admin() {
            return Err(AppError::Forbidden(
                "Admin access required to view deleted records".to_string(),
            ));
        }
        Ok(Visibility::resolve(ctx.is_admin(), show_deleted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{admin_context, user_context};

    #[test]
    fn test_visibility_table() {
        let cases = [
            (true, true, Visibility::Trashed),
            (true, false, Visibility::Active),
            (false, true, Visibility::Trashed),
            (false, false, Visibility::Active),
        ];

        for (is_admin, show_deleted, expected) in cases {
            assert_eq!(
                Visibility::resolve(is_admin, show_deleted),
                expected,
                "is_admin={} show_deleted={}",
                is_admin,
                show_deleted
            );
        }
    }

    #[test]
    fn test_as_sql() {
        assert_eq!(Visibility::Active.as_sql(), "IS NULL");
        assert_eq!(Visibility::Trashed.as_sql(), "IS NOT NULL");
    }

    #[test]
    fn test_admits() {
        assert!(Visibility::Active.admits(None));
        assert!(!Visibility::Active.admits(Some(Utc::now())));
        assert!(Visibility::Trashed.admits(Some(Utc::now())));
        assert!(!Visibility::Trashed.admits(None));
    }

    #[test]
    fn test_push_renders_predicate() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM tasks t WHERE ");
        Visibility::Trashed.push(&mut qb, "t.deleted_at");
        assert_eq!(qb.sql(), "SELECT * FROM tasks t WHERE t.deleted_at IS NOT NULL");
    }

    #[test]
    fn test_trash_policy_open_by_default() {
        let policy = TrashPolicy::default();
        assert_eq!(
            policy.resolve(&user_context(), true).unwrap(),
            Visibility::Trashed
        );
    }

    #[test]
    fn test_trash_policy_can_require_admin() {
        let policy = TrashPolicy::new(true);
        assert!(matches!(
            policy.resolve(&user_context(), true),
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(
            policy.resolve(&user_context(), false).unwrap(),
            Visibility::Active
        );
        assert_eq!(
            policy.resolve(&admin_context(), true).unwrap(),
            Visibility::Trashed
        );
    }
}
