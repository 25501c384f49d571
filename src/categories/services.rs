use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

use super::models::{
    Category, CategoryListParams, CategoryStatus, CreateCategoryRequest, PaginatedResponse,
    UpdateCategoryRequest,
};
use crate::common::helpers::trimmed_or_none;
use crate::common::{generate_category_id, ApiError, ValidationResult, Validator};
use crate::users::StoreError;

/// Highest numeric suffix tried when de-duplicating a slug
const MAX_SLUG_SUFFIX: u32 = 100;

const CATEGORY_COLUMNS: &str = "id, name, slug, description, image_url, sort_order, status, \
                                created_at, updated_at, deleted_at";

#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("category not found")]
    NotFound,

    #[error("slug already exists")]
    SlugAlreadyExists,

    #[error("could not generate unique slug for {0:?}")]
    SlugUnavailable(String),

    #[error("validation failed")]
    Validation(ValidationResult),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for CategoryError {
    fn from(err: sqlx::Error) -> Self {
        CategoryError::Store(err.into())
    }
}

impl From<CategoryError> for ApiError {
    fn from(err: CategoryError) -> Self {
        match err {
            CategoryError::NotFound | CategoryError::Store(StoreError::NotFound) => {
                ApiError::NotFound("category_not_found", "Category not found".into())
            }
            CategoryError::SlugAlreadyExists => {
                ApiError::Conflict("slug_exists", "Slug already exists".into())
            }
            CategoryError::SlugUnavailable(slug) => {
                ApiError::InternalServer(format!("could not generate unique slug for {}", slug))
            }
            CategoryError::Validation(result) => result.into(),
            CategoryError::Store(e) => e.into(),
        }
    }
}

/// URL-friendly form of `input`: lowercase ASCII letters, digits and single
/// hyphens, never starting or ending with a hyphen.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut last_hyphen = false;

    for c in input.trim().to_lowercase().chars() {
        let c = if c == ' ' || c == '_' { '-' } else { c };
        match c {
            'a'..='z' | '0'..='9' => {
                slug.push(c);
                last_hyphen = false;
            }
            '-' if !last_hyphen => {
                slug.push('-');
                last_hyphen = true;
            }
            _ => {}
        }
    }

    slug.trim_matches('-').to_string()
}

fn invalid_slug() -> CategoryError {
    let mut result = ValidationResult::new();
    result.add_error("slug", "Slug must contain at least one letter or digit");
    CategoryError::Validation(result)
}

pub struct CategoriesService {
    db: SqlitePool,
}

impl CategoriesService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<&str>) -> Result<bool, CategoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM categories WHERE slug = ? AND deleted_at IS NULL AND id != COALESCE(?, '')",
        )
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(&self.db)
        .await?;

        Ok(count > 0)
    }

    /// Returns `slug` itself or the first free `slug-N` for N in 2..=100.
    async fn ensure_unique_slug(&self, slug: &str) -> Result<String, CategoryError> {
        if !self.slug_exists(slug, None).await? {
            return Ok(slug.to_string());
        }

        for suffix in 2..=MAX_SLUG_SUFFIX {
            let candidate = format!("{}-{}", slug, suffix);
            if !self.slug_exists(&candidate, None).await? {
                return Ok(candidate);
            }
        }

        Err(CategoryError::SlugUnavailable(slug.to_string()))
    }

    pub async fn create(&self, request: CreateCategoryRequest) -> Result<Category, CategoryError> {
        let validation = request.validate(&request);
        if !validation.is_valid {
            return Err(CategoryError::Validation(validation));
        }

        let base_slug = match request.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => slugify(slug),
            _ => slugify(&request.name),
        };
        if base_slug.is_empty() {
            return Err(invalid_slug());
        }
        let slug = self.ensure_unique_slug(&base_slug).await?;

        let id = generate_category_id();
        let now = Utc::now().to_rfc3339();
        let status = request
            .status
            .as_deref()
            .and_then(CategoryStatus::parse)
            .unwrap_or(CategoryStatus::Active);

        sqlx::query(
            r#"
            INSERT INTO categories (
                id, name, slug, description, image_url, sort_order, status, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(request.name.trim())
        .bind(&slug)
        .bind(trimmed_or_none(request.description.as_deref()))
        .bind(trimmed_or_none(request.image_url.as_deref()))
        .bind(request.sort_order.unwrap_or(0))
        .bind(status)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .map_err(|e| match StoreError::from(e) {
            // Another request took the slug after the uniqueness check
            StoreError::Conflict(_) => CategoryError::SlugAlreadyExists,
            other => other.into(),
        })?;

        info!(category_id = %id, slug = %slug, "Created category");

        self.get_by_id(&id).await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Category, CategoryError> {
        sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories WHERE id = ? AND deleted_at IS NULL",
            CATEGORY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(CategoryError::NotFound)
    }

    pub async fn update(
        &self,
        id: &str,
        request: UpdateCategoryRequest,
    ) -> Result<Category, CategoryError> {
        let validation = request.validate(&request);
        if !validation.is_valid {
            return Err(CategoryError::Validation(validation));
        }

        let mut category = self.get_by_id(id).await?;

        if let Some(name) = &request.name {
            category.name = name.trim().to_string();
        }

        if let Some(slug) = request.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let new_slug = slugify(slug);
            if new_slug.is_empty() {
                return Err(invalid_slug());
            }
            if new_slug != category.slug {
                if self.slug_exists(&new_slug, Some(id)).await? {
                    warn!(category_id = %id, slug = %new_slug, "Slug update rejected: already in use");
                    return Err(CategoryError::SlugAlreadyExists);
                }
                category.slug = new_slug;
            }
        }

        if let Some(description) = &request.description {
            category.description = trimmed_or_none(Some(description));
        }

        if let Some(image_url) = &request.image_url {
            category.image_url = trimmed_or_none(Some(image_url));
        }

        if let Some(sort_order) = request.sort_order {
            category.sort_order = sort_order;
        }

        if let Some(status) = request.status.as_deref().and_then(CategoryStatus::parse) {
            category.status = status;
        }

        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            UPDATE categories
            SET name = ?, slug = ?, description = ?, image_url = ?, sort_order = ?, status = ?,
                updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(&category.image_url)
        .bind(category.sort_order)
        .bind(category.status)
        .bind(&now)
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::Conflict(_) => CategoryError::SlugAlreadyExists,
            other => other.into(),
        })?;

        if result.rows_affected() == 0 {
            return Err(CategoryError::NotFound);
        }

        info!(category_id = %id, "Updated category");

        category.updated_at = now;
        Ok(category)
    }

    /// Soft delete; the slug becomes available again.
    pub async fn delete(&self, id: &str) -> Result<(), CategoryError> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE categories SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CategoryError::NotFound);
        }

        info!(category_id = %id, "Deleted category");

        Ok(())
    }

    pub async fn list(
        &self,
        params: &CategoryListParams,
    ) -> Result<PaginatedResponse<Category>, CategoryError> {
        let filter = "deleted_at IS NULL \
                      AND (?1 IS NULL OR status = ?1) \
                      AND (?2 IS NULL OR name LIKE ?2 OR slug LIKE ?2)";

        let status = params.status.map(|s| s.as_str());
        let pattern = params.search.as_ref().map(|s| format!("%{}%", s));

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM categories WHERE {}",
            filter
        ))
        .bind(status)
        .bind(pattern.as_deref())
        .fetch_one(&self.db)
        .await?;

        // id breaks ties so pages never overlap
        let sql = format!(
            "SELECT {} FROM categories WHERE {} ORDER BY {} {}, id ASC LIMIT ?3 OFFSET ?4",
            CATEGORY_COLUMNS,
            filter,
            params.sort_by.column(),
            params.sort_dir.keyword()
        );

        let items = sqlx::query_as::<_, Category>(&sql)
            .bind(status)
            .bind(pattern.as_deref())
            .bind(params.page_size)
            .bind(params.offset())
            .fetch_all(&self.db)
            .await?;

        Ok(PaginatedResponse::new(
            items,
            total,
            params.page,
            params.page_size,
        ))
    }
}
