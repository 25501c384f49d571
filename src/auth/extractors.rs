//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::cookies::{read_cookie, ACCESS_TOKEN_COOKIE};
use super::service::{ensure_active, AuthError};
use crate::common::{safe_token_log, ApiError, AppState};
use crate::users::{User, UserRole};

/// Authenticated user extractor
///
/// Validates the `Authorization: Bearer <token>` header, or the
/// `access_token` cookie when no header is sent, then loads the user the
/// token was issued for and rejects accounts that are not active.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: String,
    pub email: String,
    pub role: UserRole,
    pub user: User,
}

impl AuthedUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// `AuthedUser` whose role is `admin`
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthedUser);

/// Pulls the token out of an `Authorization` header value.
pub(crate) fn bearer_token(header: Option<&str>) -> Result<&str, ApiError> {
    let header = match header.map(str::trim) {
        Some(h) if !h.is_empty() => h,
        _ => {
            return Err(ApiError::Unauthorized(
                "missing_token",
                "Authorization token is required".into(),
            ))
        }
    };

    let (scheme, token) = header.split_once(' ').unwrap_or((header, ""));
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(ApiError::Unauthorized(
            "invalid_token_type",
            "Invalid token type, expected Bearer token".into(),
        ));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::Unauthorized(
            "missing_token",
            "Authorization token is required".into(),
        ));
    }

    Ok(token)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(app_state): Extension<Arc<AppState>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());
        let cookie = read_cookie(&parts.headers, ACCESS_TOKEN_COOKIE);

        // The header wins; the cookie is what the OAuth redirect flow leaves behind
        let token = match (header, cookie.as_deref()) {
            (None, Some(cookie)) => cookie,
            _ => bearer_token(header).map_err(|e| {
                warn!(code = e.code(), "Authentication failed");
                e
            })?,
        };

        let claims = app_state.auth.validate_token(token).map_err(|e| {
            warn!(token = %safe_token_log(token), error = %e, "JWT token validation failed");
            ApiError::Unauthorized("invalid_token", "Token is invalid or has expired".into())
        })?;

        let user = match app_state.auth.get_user_by_id(&claims.sub).await {
            Ok(user) => user,
            Err(AuthError::UserNotFound) => {
                warn!(user_id = %claims.sub, "Authentication failed: user no longer exists");
                return Err(ApiError::Unauthorized(
                    "user_not_found",
                    "User associated with this token no longer exists".into(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        ensure_active(&user)?;

        debug!(user_id = %user.id, role = %user.role, "Request authenticated");

        Ok(AuthedUser {
            id: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            user,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let authed = AuthedUser::from_request_parts(parts, state).await?;

        if !authed.is_admin() {
            warn!(user_id = %authed.id, "Admin access denied");
            return Err(ApiError::Forbidden(
                "forbidden",
                "Admin access required".into(),
            ));
        }

        Ok(AdminUser(authed))
    }
}
