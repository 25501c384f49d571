//! OAuth routes

use axum::{routing::get, Router};

use super::handlers;

/// Creates and returns the OAuth router
///
/// # Routes
/// - `GET /api/v1/auth/oauth/providers` - Configured provider names
/// - `GET /api/v1/auth/oauth/:provider` - Authorization URL and state cookie
/// - `GET /api/v1/auth/oauth/:provider/callback` - JSON token response
/// - `GET /api/v1/auth/oauth/:provider/callback/redirect` - Cookie + frontend redirect
pub fn oauth_routes() -> Router {
    Router::new()
        .route("/api/v1/auth/oauth/providers", get(handlers::list_providers))
        .route("/api/v1/auth/oauth/:provider", get(handlers::initiate))
        .route("/api/v1/auth/oauth/:provider/callback", get(handlers::callback))
        .route(
            "/api/v1/auth/oauth/:provider/callback/redirect",
            get(handlers::callback_redirect),
        )
}
