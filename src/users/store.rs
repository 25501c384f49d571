//! Storage error type shared by all repositories

use thiserror::Error;

use crate::common::ApiError;

#[derive(Debug, Error)]
pub enum StoreError {
    /// No live (non-deleted) row matched
    #[error("record not found")]
    NotFound,

    /// A unique index rejected the write
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    /// Another connection held the write lock (SQLITE_BUSY / SQLITE_LOCKED)
    #[error("database busy: {0}")]
    Busy(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            sqlx::Error::Database(db) if is_busy_code(db.code().as_deref()) => {
                StoreError::Busy(db.message().to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

impl StoreError {
    /// Lost a race with a concurrent writer; the operation may be retried.
    pub fn is_contention(&self) -> bool {
        matches!(self, StoreError::Conflict(_) | StoreError::Busy(_))
    }
}

/// SQLite extended result codes whose primary code is BUSY (5) or LOCKED (6).
fn is_busy_code(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .map(|c| matches!(c & 0xff, 5 | 6))
        .unwrap_or(false)
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("not_found", "Resource not found".into()),
            StoreError::Conflict(msg) => ApiError::Conflict("conflict", msg),
            StoreError::Busy(msg) => ApiError::InternalServer(format!("database busy: {}", msg)),
            StoreError::Database(e) => ApiError::DatabaseError(e),
        }
    }
}
