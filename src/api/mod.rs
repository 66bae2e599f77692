//! API Module
//!
//! HTTP handlers and routing for the short-link service.
//!
//! # Endpoints
//! - `POST /short` - Create a short link
//! - `GET /:short_key` - Redirect to the stored URL
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
