use super::models::{
    CategoryListParams, CategoryListQuery, CategoryStatus, CreateCategoryRequest, SortBy, SortDir,
    UpdateCategoryRequest,
};
use crate::common::validation::check_length;
use crate::common::{ValidationResult, Validator};

const MAX_PAGE_SIZE: i64 = 100;

fn check_optional_fields(
    result: &mut ValidationResult,
    slug: Option<&String>,
    description: Option<&String>,
    image_url: Option<&String>,
    sort_order: Option<i64>,
    status: Option<&String>,
) {
    if let Some(slug) = slug {
        if !slug.trim().is_empty() {
            check_length(result, "slug", slug.trim(), 2, 255);
        }
    }

    if let Some(description) = description {
        if description.trim().chars().count() > 2000 {
            result.add_error("description", "Description must not exceed 2000 characters");
        }
    }

    if let Some(image_url) = image_url {
        let image_url = image_url.trim();
        if !image_url.is_empty() {
            if !image_url.starts_with("http://") && !image_url.starts_with("https://") {
                result.add_error(
                    "image_url",
                    "Image URL must be a valid URL starting with http:// or https://",
                );
            } else if image_url.chars().count() > 500 {
                result.add_error("image_url", "Image URL must not exceed 500 characters");
            }
        }
    }

    if let Some(sort_order) = sort_order {
        if sort_order < 0 {
            result.add_error("sort_order", "Sort order must not be negative");
        }
    }

    if let Some(status) = status {
        if CategoryStatus::parse(status).is_none() {
            result.add_error("status", "Status must be 'active' or 'inactive'");
        }
    }
}

impl Validator<CreateCategoryRequest> for CreateCategoryRequest {
    fn validate(&self, data: &CreateCategoryRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.name.trim().is_empty() {
            result.add_error("name", "Category name is required");
        } else {
            check_length(&mut result, "name", data.name.trim(), 2, 255);
        }

        check_optional_fields(
            &mut result,
            data.slug.as_ref(),
            data.description.as_ref(),
            data.image_url.as_ref(),
            data.sort_order,
            data.status.as_ref(),
        );

        result
    }
}

impl Validator<UpdateCategoryRequest> for UpdateCategoryRequest {
    fn validate(&self, data: &UpdateCategoryRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Some(name) = &data.name {
            check_length(&mut result, "name", name.trim(), 2, 255);
        }

        check_optional_fields(
            &mut result,
            data.slug.as_ref(),
            data.description.as_ref(),
            data.image_url.as_ref(),
            data.sort_order,
            data.status.as_ref(),
        );

        result
    }
}

impl CategoryListQuery {
    /// Applies defaults and bounds; unknown filter or sort values are rejected.
    pub fn into_params(self) -> Result<CategoryListParams, ValidationResult> {
        let mut result = ValidationResult::new();
        let defaults = CategoryListParams::default();

        let page = self.page.unwrap_or(defaults.page);
        if page < 1 {
            result.add_error("page", "Page must be at least 1");
        }

        let page_size = self.page_size.unwrap_or(defaults.page_size);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            result.add_error("page_size", "Page size must be between 1 and 100");
        } else if page >= 1 && (page - 1).checked_mul(page_size).is_none() {
            result.add_error("page", "Page is out of range");
        }

        let status = match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => match CategoryStatus::parse(raw) {
                Some(status) => Some(status),
                None => {
                    result.add_error("status", "Status must be 'active' or 'inactive'");
                    None
                }
            },
            None => None,
        };

        let search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if let Some(search) = &search {
            if search.chars().count() > 255 {
                result.add_error("search", "Search must not exceed 255 characters");
            }
        }

        let sort_by = match self.sort_by.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => SortBy::parse(raw).unwrap_or_else(|| {
                result.add_error(
                    "sort_by",
                    "Sort by must be one of id, name, sort_order, created_at",
                );
                defaults.sort_by
            }),
            None => defaults.sort_by,
        };

        let sort_dir = match self.sort_dir.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => SortDir::parse(&raw.to_lowercase()).unwrap_or_else(|| {
                result.add_error("sort_dir", "Sort direction must be 'asc' or 'desc'");
                defaults.sort_dir
            }),
            None => defaults.sort_dir,
        };

        if !result.is_valid {
            return Err(result);
        }

        Ok(CategoryListParams {
            page,
            page_size,
            status,
            search,
            sort_by,
            sort_dir,
        })
    }
}
