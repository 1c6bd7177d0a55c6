use serde::Serialize;
use sqlx::{postgres::PgRow, FromRow, PgPool, Postgres, QueryBuilder};

use crate::core::error::{AppError, Result};
use crate::shared::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::shared::query::filter::SqlFilter;
use crate::shared::types::{Meta, SortDirection};

/// A 1-based page request with clamped bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
    pub sort: SortDirection,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            sort: SortDirection::Asc,
        }
    }
}

/// Highest page whose offset still fits in an `i64` at the largest page size
const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>, sort: Option<SortDirection>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            sort: sort.unwrap_or_default(),
        }
    }

    /// Calculate SQL OFFSET from page number
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.limit)
    }
}

/// One page of a filtered result set, with the total taken before slicing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> i64 {
        if self.total == 0 {
            0
        } else {
            (self.total + self.limit - 1) / self.limit
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }

    pub fn meta(&self) -> Meta {
        Meta {
            total: self.total,
            page: Some(self.page),
            limit: Some(self.limit),
            total_pages: Some(self.total_pages()),
            total_estimates: None,
        }
    }

    /// Slice an already filtered, unordered set (used by in-memory stores)
    pub fn from_vec(mut items: Vec<T>, request: &PageRequest, key: impl Fn(&T) -> i64) -> Self {
        items.sort_by_key(|item| key(item));
        if request.sort == SortDirection::Desc {
            items.reverse();
        }
        let total = items.len() as i64;
        let items = items
            .into_iter()
            .skip(usize::try_from(request.offset()).unwrap_or(usize::MAX))
            .take(request.limit as usize)
            .collect();

        Self {
            items,
            total,
            page: request.page,
            limit: request.limit,
        }
    }
}

/// SQL fragments for a paginated listing.
///
/// `select` and `count` are everything up to (not including) the `WHERE`
/// clause. Listings that join a one-to-many relation must count with
/// `COUNT(DISTINCT <id>)` so joined rows do not inflate the total.
#[derive(Debug, Clone, Copy)]
pub struct PagedQuery<'a> {
    pub select: &'a str,
    pub count: &'a str,
    pub group_by: Option<&'a str>,
    pub order_column: &'a str,
}

/// Run the count query and the page query for `filter`
pub async fn paginate<T, F>(
    pool: &PgPool,
    query: &PagedQuery<'_>,
    filter: &F,
    request: &PageRequest,
) -> Result<Page<T>>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    F: SqlFilter + ?Sized,
{
    let mut count = QueryBuilder::<Postgres>::new(query.count);
    filter.push_conditions(&mut count);

    let total = count
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to count rows: {:?}", e);
            AppError::Database(e)
        })?;

    let mut select = build_page_query(query, filter, request);
    let items = select
        .build_query_as::<T>()
        .fetch_all(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch page: {:?}", e);
            AppError::Database(e)
        })?;

    Ok(Page {
        items,
        total,
        page: request.page,
        limit: request.limit,
    })
}

fn build_page_query<'a, F>(
    query: &PagedQuery<'_>,
    filter: &F,
    request: &PageRequest,
) -> QueryBuilder<'a, Postgres>
where
    F: SqlFilter + ?Sized,
{
    let mut qb = QueryBuilder::<Postgres>::new(query.select);
    filter.push_conditions(&mut qb);

    if let Some(group_by) = query.group_by {
        qb.push(" GROUP BY ").push(group_by);
    }

    qb.push(" ORDER BY ")
        .push(query.order_column)
        .push(" ")
        .push(request.sort.as_sql())
        .push(" LIMIT ")
        .push_bind(request.limit)
        .push(" OFFSET ")
        .push_bind(request.offset());

    qb
}
