//! MyUrls - short links backed by Redis or SQLite
//!
//! Binary entry point: loads configuration, builds the storage driver and
//! serves the HTTP API until a shutdown signal arrives.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use myurls::api::{create_router, AppState};
use myurls::config::Config;
use myurls::storage::{self, Driver};

/// Main entry point for the MyUrls server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect the configured storage driver (starts its sweeps)
/// 4. Serve the HTTP API on the configured port
/// 5. On SIGINT/SIGTERM, stop serving and close the driver
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "myurls=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting MyUrls server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: storage={}, cache_enabled={}, cache_size={}, cache_ttl={}s, port={}",
        config.storage.storage_type,
        config.storage.cache_enabled,
        config.storage.cache_size,
        config.storage.cache_ttl,
        config.server.port
    );

    let driver = storage::connect(&config.storage)
        .await
        .context("failed to initialize storage")?;
    driver
        .ping()
        .await
        .context("storage is not reachable")?;
    info!("Storage initialized");

    let state = AppState::new(driver.clone(), config.server.clone());
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Err(e) = driver.close().await {
        warn!(error = %e, "Failed to close storage cleanly");
    }
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
