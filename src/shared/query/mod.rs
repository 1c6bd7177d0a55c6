//! Filtered pagination over soft-deletable tables.
//!
//! A listing is built from three parts: a [`Visibility`] deciding whether
//! soft-deleted rows are shown, a filter adding the request's search and
//! foreign-key predicates, and [`paginate`] running the count and page queries.

pub mod filter;
pub mod pagination;
pub mod visibility;

pub use filter::{CategoryFilter, ProjectFilter, SqlFilter, TaskFilter, UserFilter};
pub use pagination::{paginate, Page, PageRequest, PagedQuery};
pub use visibility::{TrashPolicy, Visibility};
