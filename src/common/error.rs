// Error handling types for the API

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::error;

use super::validation::ValidationResult;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// 401 with a machine-readable code (e.g. `invalid_credentials`)
    Unauthorized(&'static str, String),
    /// 403 with a machine-readable code (e.g. `user_banned`)
    Forbidden(&'static str, String),
    BadRequest(&'static str, String),
    NotFound(&'static str, String),
    Conflict(&'static str, String),
    ValidationError(BTreeMap<String, String>),
    UpstreamFailure(&'static str, String),
    InternalServer(String),
    DatabaseError(sqlx::Error),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized(code, msg) => write!(f, "Unauthorized ({}): {}", code, msg),
            ApiError::Forbidden(code, msg) => write!(f, "Forbidden ({}): {}", code, msg),
            ApiError::BadRequest(code, msg) => write!(f, "Bad Request ({}): {}", code, msg),
            ApiError::NotFound(code, msg) => write!(f, "Not Found ({}): {}", code, msg),
            ApiError::Conflict(code, msg) => write!(f, "Conflict ({}): {}", code, msg),
            ApiError::ValidationError(details) => {
                write!(f, "Validation Error: {} field(s) invalid", details.len())
            }
            ApiError::UpstreamFailure(code, msg) => {
                write!(f, "Upstream Failure ({}): {}", code, msg)
            }
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::DatabaseError(e) => write!(f, "Database Error: {}", e),
        }
    }
}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, String>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(..) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(..) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(..) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(..) => StatusCode::NOT_FOUND,
            ApiError::Conflict(..) => StatusCode::CONFLICT,
            ApiError::UpstreamFailure(..) => StatusCode::BAD_GATEWAY,
            ApiError::InternalServer(_) | ApiError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Machine-readable error code, also used as the `?error=` value
    /// of redirect-style OAuth callbacks.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(code, _)
            | ApiError::Forbidden(code, _)
            | ApiError::BadRequest(code, _)
            | ApiError::NotFound(code, _)
            | ApiError::Conflict(code, _)
            | ApiError::UpstreamFailure(code, _) => code,
            ApiError::ValidationError(_) => "validation_error",
            ApiError::InternalServer(_) => "internal_error",
            ApiError::DatabaseError(_) => "database_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let code = self.code().to_string();

        let (error_message, details) = match self {
            ApiError::Unauthorized(_, msg)
            | ApiError::Forbidden(_, msg)
            | ApiError::BadRequest(_, msg)
            | ApiError::NotFound(_, msg)
            | ApiError::Conflict(_, msg)
            | ApiError::UpstreamFailure(_, msg) => (msg, None),
            ApiError::ValidationError(details) => ("Validation failed".to_string(), Some(details)),
            ApiError::InternalServer(msg) => {
                error!(error = %msg, "Internal error occurred");
                ("An unexpected error occurred".to_string(), None)
            }
            ApiError::DatabaseError(e) => {
                error!(error = %e, "Database error occurred");
                ("Database operation failed".to_string(), None)
            }
        };

        let error_response = ErrorResponse {
            error: error_message,
            code,
            details,
        };

        (status, Json(error_response)).into_response()
    }
}

/// Helper function to convert ValidationResult to ApiError
impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        if result.is_valid {
            ApiError::InternalServer(
                "Validation result was valid but converted to error".to_string(),
            )
        } else {
            // First message per field wins
            let mut details = BTreeMap::new();
            for e in result.errors {
                details.entry(e.field).or_insert(e.message);
            }
            ApiError::ValidationError(details)
        }
    }
}
