//! API Routes
//!
//! Configures the Axum router with all service endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{health_handler, redirect_handler, shorten_handler, AppState};

/// Creates the main router with all endpoints configured.
///
/// `/health` is registered before the catch-all short key route so it is
/// never treated as a key.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/short", post(shorten_handler))
        .route("/:short_key", get(redirect_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
