//! OAuth login handlers

use axum::{
    extract::{Extension, Path, Query},
    http::{header::SET_COOKIE, HeaderMap},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::cookies::{
    build_cookie, expired_cookie, is_secure_request, read_cookie, ACCESS_TOKEN_COOKIE,
    OAUTH_STATE_COOKIE, OAUTH_STATE_MAX_AGE,
};
use crate::auth::{AuthError, AuthResponse};
use crate::common::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

impl CallbackParams {
    fn required(&self) -> Option<(&str, &str)> {
        let code = self.code.as_deref().map(str::trim).filter(|c| !c.is_empty())?;
        let state = self.state.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((code, state))
    }
}

/// GET /api/v1/auth/oauth/providers
pub async fn list_providers(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "providers": state.oauth.supported_providers() }))
}

/// GET /api/v1/auth/oauth/:provider
///
/// Returns the provider authorization URL and stores the generated state in
/// a short-lived HttpOnly cookie for the callback to check.
pub async fn initiate(
    Extension(state): Extension<Arc<AppState>>,
    Path(provider): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let initiation = state.oauth.initiate(&provider)?;

    let secure = is_secure_request(&headers, state.config.secure_cookies);
    let cookie = build_cookie(
        OAUTH_STATE_COOKIE,
        &initiation.state,
        OAUTH_STATE_MAX_AGE,
        secure,
    );

    info!(provider = initiation.provider, "Starting OAuth flow");

    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Json(initiation)))
}

async fn run_callback(
    state: &AppState,
    provider: &str,
    params: &CallbackParams,
    headers: &HeaderMap,
) -> Result<AuthResponse, ApiError> {
    if !state.oauth.is_supported(provider) {
        return Err(AuthError::ProviderNotSupported(provider.to_string()).into());
    }

    let (code, presented_state) = params.required().ok_or_else(|| {
        ApiError::BadRequest(
            "invalid_request",
            "Missing required parameters (code and state)".into(),
        )
    })?;

    let stored_state = read_cookie(headers, OAUTH_STATE_COOKIE);

    let response = state
        .oauth
        .handle_callback(provider, code, presented_state, stored_state.as_deref())
        .await?;

    Ok(response)
}

/// GET /api/v1/auth/oauth/:provider/callback
///
/// Returns the token envelope as JSON. The state cookie is single-use and is
/// cleared whatever the outcome.
pub async fn callback(
    Extension(state): Extension<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Response {
    let secure = is_secure_request(&headers, state.config.secure_cookies);
    let clear_state = AppendHeaders([(SET_COOKIE, expired_cookie(OAUTH_STATE_COOKIE, secure))]);

    match run_callback(&state, &provider, &params, &headers).await {
        Ok(response) => (clear_state, Json(response)).into_response(),
        Err(e) => {
            warn!(provider = %provider, code = e.code(), "OAuth callback failed");
            (clear_state, e).into_response()
        }
    }
}

/// Error code reported to the frontend by the redirect callback
fn redirect_error_code(err: &ApiError) -> &'static str {
    match err.code() {
        "provider_not_supported" => "invalid_provider",
        "state_mismatch" => "invalid_state",
        code @ ("invalid_request" | "user_inactive" | "user_banned" | "email_required") => code,
        _ => "auth_failed",
    }
}

fn frontend_redirect(frontend_url: &str, query: &str) -> String {
    let separator = if frontend_url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", frontend_url, separator, query)
}

/// GET /api/v1/auth/oauth/:provider/callback/redirect
///
/// Browser variant: the access token travels only in an HttpOnly cookie and
/// the user is sent back to the frontend with `?auth=success` or
/// `?error=<code>`.
pub async fn callback_redirect(
    Extension(state): Extension<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Response {
    let secure = is_secure_request(&headers, state.config.secure_cookies);
    let clear_state = expired_cookie(OAUTH_STATE_COOKIE, secure);
    let frontend_url = &state.config.frontend_url;

    match run_callback(&state, &provider, &params, &headers).await {
        Ok(response) => {
            let token_cookie = build_cookie(
                ACCESS_TOKEN_COOKIE,
                &response.access_token,
                response.expires_in,
                secure,
            );
            info!(user_id = %response.user.id, provider = %provider, "OAuth redirect login succeeded");
            (
                AppendHeaders([(SET_COOKIE, clear_state), (SET_COOKIE, token_cookie)]),
                Redirect::temporary(&frontend_redirect(frontend_url, "auth=success")),
            )
                .into_response()
        }
        Err(e) => {
            let code = redirect_error_code(&e);
            warn!(provider = %provider, code, "OAuth redirect login failed");
            (
                AppendHeaders([(SET_COOKIE, clear_state)]),
                Redirect::temporary(&frontend_redirect(frontend_url, &format!("error={}", code))),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_error_codes() {
        let cases = [
            (AuthError::ProviderNotSupported("x".into()), "invalid_provider"),
            (AuthError::StateMismatch, "invalid_state"),
            (AuthError::UserBanned, "user_banned"),
            (AuthError::UserInactive, "user_inactive"),
            (AuthError::OAuthEmailRequired, "email_required"),
            (AuthError::CodeExchangeFailed("boom".into()), "auth_failed"),
        ];
        for (err, expected) in cases {
            assert_eq!(redirect_error_code(&err.into()), expected);
        }
    }

    #[test]
    fn test_frontend_redirect_separator() {
        assert_eq!(
            frontend_redirect("http://localhost:3000/auth/callback", "auth=success"),
            "http://localhost:3000/auth/callback?auth=success"
        );
        assert_eq!(
            frontend_redirect("http://app/cb?lang=en", "error=auth_failed"),
            "http://app/cb?lang=en&error=auth_failed"
        );
    }

    #[test]
    fn test_callback_params_require_code_and_state() {
        let full = CallbackParams {
            code: Some("c".into()),
            state: Some("s".into()),
        };
        assert_eq!(full.required(), Some(("c", "s")));

        let missing_state = CallbackParams {
            code: Some("c".into()),
            state: Some("  ".into()),
        };
        assert!(missing_state.required().is_none());
    }
}
