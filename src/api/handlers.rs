//! API Handlers
//!
//! HTTP request handlers for each endpoint. Handlers only talk to storage
//! through the [`Driver`](crate::storage::Driver) contract.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::{Result, StorageError};
use crate::models::{HealthResponse, ShortenRequest, ShortenResponse};
use crate::storage::{Driver, SharedDriver};

/// Lifetime of a newly created short link
pub const LINK_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Length of generated short keys
pub const SHORT_KEY_LENGTH: usize = 7;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: SharedDriver,
    pub server: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(storage: SharedDriver, server: ServerConfig) -> Self {
        Self {
            storage,
            server: Arc::new(server),
        }
    }
}

/// Generates a random alphanumeric short key.
pub fn generate_short_key(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

fn log_failure(err: StorageError) -> StorageError {
    if !err.is_not_found() {
        error!(error = %err, "Storage operation failed");
    }
    err
}

/// Handler for POST /short
///
/// Stores the long URL under the requested or a generated key. Keys that
/// already exist are refused rather than overwritten.
pub async fn shorten_handler(
    State(state): State<AppState>,
    Json(req): Json<ShortenRequest>,
) -> Result<Json<ShortenResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(StorageError::InvalidOperation(error_msg));
    }

    let short_key = match req.custom_key() {
        Some(key) => key.to_string(),
        None => generate_short_key(SHORT_KEY_LENGTH),
    };

    if state.storage.exists(&short_key).await.map_err(log_failure)? {
        info!(short_key = %short_key, "Short key already exists");
        return Err(StorageError::InvalidOperation(format!(
            "short key {} already exists, choose another one or leave it empty",
            short_key
        )));
    }

    state
        .storage
        .set_ex(&short_key, req.long_url.trim(), LINK_TTL)
        .await
        .map_err(log_failure)?;

    Ok(Json(ShortenResponse::new(state.server.short_url(&short_key))))
}

/// Handler for GET /:short_key
///
/// Redirects permanently to the stored URL; absent or expired keys yield 404.
pub async fn redirect_handler(
    State(state): State<AppState>,
    Path(short_key): Path<String>,
) -> Result<Response> {
    let long_url = state.storage.get(&short_key).await.map_err(log_failure)?;

    Ok((StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, long_url)]).into_response())
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.storage.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse::healthy())),
        Err(e) => {
            error!(error = %e, "Storage ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(HealthResponse::unhealthy()))
        }
    }
}
