use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::info;

use super::models::{
    CategoryListQuery, CreateCategoryRequest, MessageResponse, UpdateCategoryRequest,
};
use crate::auth::AdminUser;
use crate::common::{ApiError, AppState};

/// GET /api/v1/admin/categories - Paginated category list
pub async fn list_categories(
    Extension(state): Extension<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<CategoryListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let params = query.into_params().map_err(ApiError::from)?;

    let page = state.categories.list(&params).await?;

    Ok(Json(page))
}

/// POST /api/v1/admin/categories - Create a category
pub async fn create_category(
    Extension(state): Extension<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.categories.create(request).await?;

    info!(admin_id = %admin.id, category_id = %category.id, "Category created by admin");

    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /api/v1/admin/categories/:id
pub async fn get_category(
    Extension(state): Extension<Arc<AppState>>,
    _admin: AdminUser,
    Path(category_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.categories.get_by_id(&category_id).await?;

    Ok(Json(category))
}

/// PUT /api/v1/admin/categories/:id
pub async fn update_category(
    Extension(state): Extension<Arc<AppState>>,
    _admin: AdminUser,
    Path(category_id): Path<String>,
    Json(request): Json<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.categories.update(&category_id, request).await?;

    Ok(Json(category))
}

/// DELETE /api/v1/admin/categories/:id
pub async fn delete_category(
    Extension(state): Extension<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(category_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.categories.delete(&category_id).await?;

    info!(admin_id = %admin.id, category_id = %category_id, "Category deleted by admin");

    Ok(Json(MessageResponse {
        message: "Category deleted successfully".to_string(),
    }))
}
