// src/profile/routes.rs

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use super::handlers::{avatar, profile};

/// Multipart framing allowance on top of the configured file size
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn profile_routes(max_upload_size: usize) -> Router {
    Router::new()
        .route(
            "/api/v1/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route(
            "/api/v1/profile/avatar",
            post(avatar::upload_avatar)
                .delete(avatar::delete_avatar)
                .layer(DefaultBodyLimit::max(max_upload_size + MULTIPART_OVERHEAD)),
        )
}
