// src/profile/handlers/profile.rs

use axum::extract::{Extension, Json};
use std::sync::Arc;
use tracing::info;

use crate::auth::models::UpdateProfileRequest;
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState};
use crate::users::UserResponse;

/// GET /api/v1/profile - Current user's public view
pub async fn get_profile(authed: AuthedUser) -> Json<UserResponse> {
    Json(UserResponse::from(&authed.user))
}

/// PUT /api/v1/profile - Update name, phone and address
pub async fn update_profile(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    info!(user_id = %authed.id, "Profile update request received");

    let user = state.auth.update_profile(&authed.id, request).await?;

    Ok(Json(UserResponse::from(&user)))
}
