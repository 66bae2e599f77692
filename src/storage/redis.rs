//! Redis Driver
//!
//! Thin adapter over a Redis connection manager, optionally fronted by the
//! in-process TTL-LRU cache as a read-through/write-through layer.

use std::sync::Mutex as StdMutex;
use std::time::Duration;

use ::redis::aio::ConnectionManager;
use ::redis::AsyncCommands;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::cache::TtlLruCache;
use crate::error::{Result, StorageError};
use crate::storage::{Driver, KeyTtl};

/// Cache size used by [`RedisDriver::connect`].
pub const DEFAULT_CACHE_SIZE: usize = 128;
/// Cache TTL used by [`RedisDriver::connect`].
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Builds a connection URL from a `host:port` address and an optional password.
///
/// Addresses that already carry a `redis://` or `rediss://` scheme are used as-is.
pub fn connection_url(addr: &str, password: &str) -> String {
    if addr.starts_with("redis://") || addr.starts_with("rediss://") {
        return addr.to_string();
    }
    if password.is_empty() {
        format!("redis://{}/0", addr)
    } else {
        format!("redis://:{}@{}/0", urlencoding::encode(password), addr)
    }
}

// == Redis Driver ==
pub struct RedisDriver {
    /// `None` once the driver is closed
    conn: StdMutex<Option<ConnectionManager>>,
    cache: Option<TtlLruCache>,
}

impl RedisDriver {
    /// Connects with a small default cache in front.
    pub async fn connect(addr: &str, password: &str) -> Result<Self> {
        Self::connect_with_cache(addr, password, DEFAULT_CACHE_SIZE, DEFAULT_CACHE_TTL).await
    }

    pub async fn connect_without_cache(addr: &str, password: &str) -> Result<Self> {
        Self::connect_with(addr, password, None).await
    }

    pub async fn connect_with_cache(
        addr: &str,
        password: &str,
        cache_size: usize,
        cache_ttl: Duration,
    ) -> Result<Self> {
        let cache = TtlLruCache::new(cache_size, cache_ttl);
        Self::connect_with(addr, password, Some(cache)).await
    }

    /// Connects and fronts the connection with `cache`, if any.
    pub async fn connect_with(
        addr: &str,
        password: &str,
        cache: Option<TtlLruCache>,
    ) -> Result<Self> {
        let conn = open(addr, password).await?;
        info!(
            addr,
            cache_enabled = cache.is_some(),
            sweep_interval = ?cache.as_ref().map(TtlLruCache::sweep_interval),
            "Redis driver connected"
        );
        Ok(Self::from_parts(conn, cache))
    }

    /// Assembles a driver from an existing connection and optional cache.
    pub fn from_parts(conn: ConnectionManager, cache: Option<TtlLruCache>) -> Self {
        Self {
            conn: StdMutex::new(Some(conn)),
            cache,
        }
    }

    pub fn cache(&self) -> Option<&TtlLruCache> {
        self.cache.as_ref()
    }

    fn is_closed(&self) -> bool {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }

    /// Clones the multiplexed connection handle, failing once closed.
    fn conn(&self) -> Result<ConnectionManager> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or(StorageError::Closed)
    }
}

/// TTL to cache a read-through value with, given the store's PTTL reply.
///
/// Persistent keys, missing keys and failed lookups all map to zero, which the
/// cache replaces with its own default TTL. Nothing is cached forever.
fn cache_ttl_from_pttl(reply: ::redis::RedisResult<i64>) -> Duration {
    match reply {
        Ok(ms) => KeyTtl::from_millis(ms).remaining().unwrap_or(Duration::ZERO),
        Err(e) => {
            debug!(error = %e, "TTL lookup failed, caching with default TTL");
            Duration::ZERO
        }
    }
}

async fn open(addr: &str, password: &str) -> Result<ConnectionManager> {
    let client = ::redis::Client::open(connection_url(addr, password))?;
    Ok(ConnectionManager::new(client).await?)
}

#[async_trait]
impl Driver for RedisDriver {
    async fn get(&self, key: &str) -> Result<String> {
        let mut conn = self.conn()?;

        if let Some(cache) = &self.cache {
            if let Some(value) = cache.get(key).await {
                return Ok(value);
            }
        }

        let value: Option<String> = conn.get(key).await?;
        let value = value.ok_or_else(|| StorageError::KeyNotFound(key.to_string()))?;

        if let Some(cache) = &self.cache {
            let reply: ::redis::RedisResult<i64> = conn.pttl(key).await;
            let ttl = cache_ttl_from_pttl(reply);
            // No repopulating once closed.
            if !self.is_closed() {
                cache.set(key, &value, ttl).await;
            }
        }

        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            return Err(StorageError::InvalidOperation(format!(
                "zero TTL for key {}",
                key
            )));
        }
        let mut conn = self.conn()?;

        let millis = ttl.as_millis().min(u64::MAX as u128) as u64;
        let _: () = conn.pset_ex(key, value, millis).await?;

        if let Some(cache) = &self.cache {
            cache.set(key, value, ttl).await;
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn()?;

        if let Some(cache) = &self.cache {
            if cache.get(key).await.is_some() {
                return Ok(true);
            }
        }

        Ok(conn.exists(key).await?)
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let mut conn = self.conn()?;
        let millis: i64 = conn.pttl(key).await?;
        Ok(KeyTtl::from_millis(millis))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn()?;

        let millis = ttl.as_millis().min(i64::MAX as u128) as i64;
        let updated: bool = conn.pexpire(key, millis).await?;
        if !updated {
            return Err(StorageError::InvalidOperation(format!(
                "cannot expire missing key {}",
                key
            )));
        }

        if let Some(cache) = &self.cache {
            if ttl.is_zero() {
                cache.delete(key).await;
            } else {
                cache.refresh_ttl(key, ttl).await;
            }
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn()?;
        let _: String = ::redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        // Drop the connection first so no new read can start repopulating.
        let conn = self
            .conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(cache) = &self.cache {
            cache.shutdown().await;
        }
        if conn.is_some() {
            info!("Redis driver closed");
        }
        Ok(())
    }
}
