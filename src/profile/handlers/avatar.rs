// src/profile/handlers/avatar.rs

use axum::extract::{Extension, Json, Multipart};
use std::sync::Arc;
use tracing::{info, warn};

use super::super::models::{AvatarResponse, MessageResponse};
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState};

/// Multipart form field carrying the image
const AVATAR_FIELD: &str = "avatar";

fn missing_avatar() -> ApiError {
    ApiError::BadRequest("invalid_request", "Avatar file is required".to_string())
}

/// POST /api/v1/profile/avatar - Upload avatar (multipart field `avatar`)
pub async fn upload_avatar(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
    mut multipart: Multipart,
) -> Result<Json<AvatarResponse>, ApiError> {
    info!(user_id = %authed.id, "Avatar upload initiated");

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!(user_id = %authed.id, error = %e, "Failed to read multipart body");
        ApiError::BadRequest("invalid_request", format!("Failed to read multipart field: {}", e))
    })? {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(|e| {
            ApiError::BadRequest("invalid_request", format!("Failed to read file data: {}", e))
        })?;

        let response = state
            .profile
            .upload_avatar(&authed.id, &filename, &data)
            .await?;

        return Ok(Json(response));
    }

    Err(missing_avatar())
}

/// DELETE /api/v1/profile/avatar - Remove avatar
pub async fn delete_avatar(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
) -> Result<Json<MessageResponse>, ApiError> {
    state.profile.delete_avatar(&authed.id).await?;

    Ok(Json(MessageResponse {
        message: "Avatar deleted successfully".to_string(),
    }))
}
