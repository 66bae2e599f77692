//! Storage Manager
//!
//! Picks and builds the configured driver. The result is an owned handle that
//! the application passes to whatever needs storage.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::cache::TtlLruCache;
use crate::config::StorageConfig;
use crate::error::{Result, StorageError};
use crate::storage::{RedisDriver, SharedDriver, SqliteDriver};

/// Supported backing stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    Redis,
    Sqlite,
}

impl FromStr for StorageType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(StorageType::Redis),
            "sqlite" => Ok(StorageType::Sqlite),
            other => Err(StorageError::Config(format!(
                "unsupported storage type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::Redis => write!(f, "redis"),
            StorageType::Sqlite => write!(f, "sqlite"),
        }
    }
}

fn build_cache(config: &StorageConfig) -> Option<TtlLruCache> {
    config.cache_enabled.then(|| {
        TtlLruCache::with_sweep_interval(
            config.cache_size,
            config.cache_ttl(),
            config.cache_sweep_interval(),
        )
    })
}

/// Builds the driver selected by `config`.
///
/// An unknown storage type fails with [`StorageError::Config`] before any
/// connection is attempted.
pub async fn connect(config: &StorageConfig) -> Result<SharedDriver> {
    let storage_type: StorageType = config.storage_type.parse()?;
    info!(%storage_type, cache_enabled = config.cache_enabled, "Initializing storage");

    let driver: SharedDriver = match storage_type {
        StorageType::Redis => Arc::new(connect_redis(config).await?),
        StorageType::Sqlite => Arc::new(open_sqlite(config).await?),
    };

    Ok(driver)
}

/// Connects the Redis driver with the configured cache.
pub async fn connect_redis(config: &StorageConfig) -> Result<RedisDriver> {
    RedisDriver::connect_with(&config.redis_addr, &config.redis_password, build_cache(config))
        .await
}

/// Opens the SQLite driver with the configured cache and row sweep.
pub async fn open_sqlite(config: &StorageConfig) -> Result<SqliteDriver> {
    SqliteDriver::open_with(
        &config.sqlite_file,
        build_cache(config),
        config.row_sweep_interval(),
    )
    .await
}
