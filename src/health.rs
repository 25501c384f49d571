//! Liveness endpoints

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Foods & Drinks API is running"
    }))
}

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the Foods & Drinks API",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(root))
}
