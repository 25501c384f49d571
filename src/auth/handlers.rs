//! Authentication handlers

use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::info;

use super::models::{LoginRequest, RegisterRequest};
use crate::common::{safe_email_log, ApiError, AppState};

/// POST /api/v1/auth/register
///
/// # Request Body
/// ```json
/// { "email": "user@example.com", "password": "secret123", "full_name": "Jane Doe" }
/// ```
///
/// # Response (201)
/// ```json
/// { "access_token": "<jwt>", "token_type": "Bearer", "expires_in": 86400, "user": { ... } }
/// ```
pub async fn register(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!(email = %safe_email_log(&request.email), "Received registration request");

    let response = state.auth.register(request).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/auth/login
pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!(email = %safe_email_log(&request.email), "Received login request");

    let response = state.auth.login(request).await?;

    Ok(Json(response))
}
