use super::handlers;
use axum::{routing::get, Router};

/// Creates the category catalog router (admin only)
pub fn categories_routes() -> Router {
    Router::new()
        .route(
            "/api/v1/admin/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/api/v1/admin/categories/:id",
            get(handlers::get_category)
                .put(handlers::update_category)
                .delete(handlers::delete_category),
        )
}
