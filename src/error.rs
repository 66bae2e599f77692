//! Error types for the storage layer
//!
//! Provides unified error handling using thiserror. Every driver reports key
//! absence through [`StorageError::KeyNotFound`] so callers never need to know
//! which backing store is active.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Response code for a successful shorten call (kept for old clients).
pub const CODE_SUCCESS_LEGACY: i32 = 1;
/// Response code for rejected request parameters.
pub const CODE_PARAMS_ERROR: i32 = 1001;
/// Response code for server-side failures.
pub const CODE_SERVER_ERROR: i32 = 1002;

// == Storage Error Enum ==
/// Unified error type for storage drivers.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Key absent or expired
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Caller asked for something the store cannot do (expire a missing key, zero TTL)
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Remote store failure
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Embedded store failure
    #[error("sqlite error: {0}")]
    Sqlite(sqlx::Error),

    /// Filesystem failure while preparing the embedded store
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Driver used after close
    #[error("storage driver is closed")]
    Closed,

    /// Unsupported or inconsistent configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl StorageError {
    /// Returns true when the error means "the key is not there".
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::KeyNotFound(_))
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => StorageError::Closed,
            other => StorageError::Sqlite(other),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for StorageError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            StorageError::KeyNotFound(_) => (StatusCode::NOT_FOUND, CODE_SERVER_ERROR),
            StorageError::InvalidOperation(_) => (StatusCode::BAD_REQUEST, CODE_PARAMS_ERROR),
            StorageError::Closed => (StatusCode::SERVICE_UNAVAILABLE, CODE_SERVER_ERROR),
            StorageError::Redis(_)
            | StorageError::Sqlite(_)
            | StorageError::Io(_)
            | StorageError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, CODE_SERVER_ERROR),
        };

        let body = Json(json!({
            "Code": code,
            "Message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the storage layer.
pub type Result<T> = std::result::Result<T, StorageError>;
