use std::sync::Arc;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthContext;
use crate::features::categories::dtos::{
    CategoryListQuery, CategoryResponseDto, CreateCategoryDto, UpdateCategoryDto,
};
use crate::features::categories::repositories::CategoryRepository;
use crate::shared::deletion;
use crate::shared::query::filter::search_term;
use crate::shared::query::{CategoryFilter, Page, PageRequest, TrashPolicy};
use crate::shared::slug::slugify;

/// Service for category operations
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    trash: TrashPolicy,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>, trash: TrashPolicy) -> Self {
        Self { repo, trash }
    }

    pub async fn list(
        &self,
        ctx: &AuthContext,
        query: &CategoryListQuery,
    ) -> Result<Page<CategoryResponseDto>> {
        let filter = CategoryFilter {
            search: search_term(query.search.as_deref()),
            visibility: self.trash.resolve(ctx, query.deleted.unwrap_or(false))?,
        };
        let page = PageRequest::new(query.page, query.limit, query.sort);

        let categories = self.repo.list(&filter, &page).await?;
        Ok(categories.map(CategoryResponseDto::from))
    }

    /// All active categories (flat list)
    pub async fn list_active(&self) -> Result<Vec<CategoryResponseDto>> {
        let categories = self.repo.all_active().await?;
        Ok(categories.into_iter().map(|c| c.into()).collect())
    }

    pub async fn get(
        &self,
        ctx: &AuthContext,
        id: i64,
        show_deleted: bool,
    ) -> Result<CategoryResponseDto> {
        let visibility = self.trash.resolve(ctx, show_deleted)?;

        self.repo
            .find(id)
            .await?
            .filter(|c| visibility.admits(c.deleted_at))
            .map(|c| c.into())
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))
    }

    pub async fn create(&self, dto: CreateCategoryDto) -> Result<CategoryResponseDto> {
        let label = label_for(&dto.name, dto.label.as_deref())?;
        let category = self.repo.create(&dto.name, &label).await?;

        tracing::info!("Created category {} ({})", category.id, category.label);
        Ok(category.into())
    }

    /// A new name without an explicit label re-derives the label
    pub async fn update(&self, id: i64, dto: UpdateCategoryDto) -> Result<CategoryResponseDto> {
        let label = match (&dto.name, dto.label.as_deref()) {
            (_, Some(label)) => Some(label_for(label, None)?),
            (Some(name), None) => Some(label_for(name, None)?),
            (None, None) => None,
        };

        let category = self
            .repo
            .update(id, dto.name, label)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;

        tracing::info!("Updated category {}", id);
        Ok(category.into())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        deletion::soft_delete(self.repo.as_ref(), id).await
    }
}

fn label_for(name: &str, label: Option<&str>) -> Result<String> {
    let label = slugify(label.unwrap_or(name));
    if label.is_empty() {
        return Err(AppError::InvalidFields(vec![
            "label: Label must contain at least one letter or digit".to_string(),
        ]));
    }
    Ok(label)
}
