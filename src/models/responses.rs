//! Response DTOs for the HTTP API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::error::CODE_SUCCESS_LEGACY;

/// Response body for POST /short
///
/// Field names match what existing clients already parse.
#[derive(Debug, Clone, Serialize)]
pub struct ShortenResponse {
    #[serde(rename = "Code")]
    pub code: i32,
    #[serde(rename = "ShortUrl")]
    pub short_url: String,
}

impl ShortenResponse {
    pub fn new(short_url: impl Into<String>) -> Self {
        Self {
            code: CODE_SUCCESS_LEGACY,
            short_url: short_url.into(),
        }
    }
}

/// Response body for GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy"
    pub status: String,
    /// Service version
    pub version: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self::with_status("healthy")
    }

    pub fn unhealthy() -> Self {
        Self::with_status("unhealthy")
    }

    fn with_status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
