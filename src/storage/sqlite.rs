//! SQLite Driver
//!
//! Persists mappings in a single table and reproduces the remote store's TTL
//! rules on top of it: expired rows read as absent, `ttl` reports the same
//! sentinels, and `expire` on a missing key fails. Expired rows are deleted
//! lazily on read and by a periodic sweep.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info, warn};

use crate::cache::TtlLruCache;
use crate::error::{Result, StorageError};
use crate::storage::{Driver, KeyTtl};
use crate::tasks::{spawn_row_sweep, SweepHandle};

/// How often expired rows are purged unless configured otherwise.
pub const DEFAULT_ROW_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS url_mappings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    expires_at INTEGER,
    created_at INTEGER DEFAULT (strftime('%s', 'now'))
)
"#;

const CREATE_EXPIRY_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_expires_at ON url_mappings(expires_at)";

const UPSERT: &str = r#"
INSERT INTO url_mappings (key, value, expires_at) VALUES (?, ?, ?)
ON CONFLICT(key) DO UPDATE SET
    value = excluded.value,
    expires_at = excluded.expires_at,
    created_at = strftime('%s', 'now')
"#;

// `expires_at` is in whole seconds, rounded up from `now + ttl`, so a row lives
// at least its full TTL. Comparisons happen in milliseconds.
const DELETE_IF_EXPIRED: &str =
    "DELETE FROM url_mappings WHERE key = ? AND expires_at IS NOT NULL AND expires_at * 1000 <= ?";

const DELETE_ALL_EXPIRED: &str =
    "DELETE FROM url_mappings WHERE expires_at IS NOT NULL AND expires_at * 1000 <= ?";

const UPDATE_EXPIRY: &str = r#"
UPDATE url_mappings SET expires_at = ?
WHERE key = ? AND (expires_at IS NULL OR expires_at * 1000 > ?)
"#;

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Absolute expiry in epoch seconds for a TTL starting at `now_ms`.
///
/// Rounds up: the row may outlive its TTL by under a second, never fall short.
/// A zero TTL yields the current second, which already reads as expired.
fn expiry_secs(now_ms: i64, ttl: Duration) -> i64 {
    if ttl.is_zero() {
        return now_ms.div_euclid(1000);
    }
    let ttl_ms = ttl.as_millis().min(i64::MAX as u128) as i64;
    let expires_ms = now_ms.saturating_add(ttl_ms);
    expires_ms.div_euclid(1000) + i64::from(expires_ms.rem_euclid(1000) != 0)
}

/// Interprets a row's `expires_at` column the way the remote store reports TTLs.
///
/// Remaining time is reported in whole seconds, rounded down, so a freshly set
/// whole-second TTL never reads back larger than requested. Under a second
/// left, the exact remainder is reported.
fn row_ttl(expires_at: Option<i64>, now_ms: i64) -> KeyTtl {
    match expires_at {
        None => KeyTtl::Persistent,
        Some(secs) => {
            let expires_ms = secs.saturating_mul(1000);
            if now_ms >= expires_ms {
                return KeyTtl::Missing;
            }
            let remaining = expires_ms - now_ms;
            let reported = if remaining >= 1000 {
                remaining - remaining % 1000
            } else {
                remaining
            };
            KeyTtl::Expires(Duration::from_millis(reported as u64))
        }
    }
}

/// Deletes every row whose expiry has passed. Returns how many were removed.
pub(crate) async fn purge_expired_rows(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query(DELETE_ALL_EXPIRED)
        .bind(now_millis())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// == SQLite Driver ==
pub struct SqliteDriver {
    pool: SqlitePool,
    cache: Option<TtlLruCache>,
    sweep: SweepHandle,
}

impl SqliteDriver {
    /// Opens the store without a cache.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, None, DEFAULT_ROW_SWEEP_INTERVAL).await
    }

    pub async fn open_with_cache(
        path: impl AsRef<Path>,
        cache_size: usize,
        cache_ttl: Duration,
    ) -> Result<Self> {
        let cache = TtlLruCache::new(cache_size, cache_ttl);
        Self::open_with(path, Some(cache), DEFAULT_ROW_SWEEP_INTERVAL).await
    }

    /// Creates the parent directory and schema if needed, then starts the row sweep.
    pub async fn open_with(
        path: impl AsRef<Path>,
        cache: Option<TtlLruCache>,
        sweep_interval: Duration,
    ) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        sqlx::query(CREATE_EXPIRY_INDEX).execute(&pool).await?;

        let sweep = spawn_row_sweep(pool.clone(), sweep_interval);
        info!(
            path = %path.display(),
            cache_enabled = cache.is_some(),
            "SQLite driver opened"
        );

        Ok(Self { pool, cache, sweep })
    }

    pub fn cache(&self) -> Option<&TtlLruCache> {
        self.cache.as_ref()
    }

    /// Number of rows currently stored, expired ones included.
    pub async fn row_count(&self) -> Result<i64> {
        self.ensure_open()?;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM url_mappings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Runs one purge of expired rows immediately.
    pub async fn purge_expired(&self) -> Result<u64> {
        self.ensure_open()?;
        purge_expired_rows(&self.pool).await
    }

    fn ensure_open(&self) -> Result<()> {
        if self.pool.is_closed() {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }

    async fn fetch_expiry(&self, key: &str) -> Result<Option<Option<i64>>> {
        let row: Option<(Option<i64>,)> =
            sqlx::query_as("SELECT expires_at FROM url_mappings WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(expires_at,)| expires_at))
    }

    /// Deletes an expired row in the background. Failures are only logged.
    fn delete_expired_later(&self, key: &str) {
        let pool = self.pool.clone();
        let key = key.to_string();
        let now = now_millis();

        tokio::spawn(async move {
            match sqlx::query(DELETE_IF_EXPIRED)
                .bind(&key)
                .bind(now)
                .execute(&pool)
                .await
            {
                Ok(_) => debug!(key = %key, "Deleted expired row"),
                Err(e) => warn!(key = %key, error = %e, "Failed to delete expired row"),
            }
        });
    }
}

#[async_trait]
impl Driver for SqliteDriver {
    async fn get(&self, key: &str) -> Result<String> {
        self.ensure_open()?;

        if let Some(cache) = &self.cache {
            if let Some(value) = cache.get(key).await {
                return Ok(value);
            }
        }

        let row: Option<(String, Option<i64>)> =
            sqlx::query_as("SELECT value, expires_at FROM url_mappings WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        let (value, expires_at) = row.ok_or_else(|| StorageError::KeyNotFound(key.to_string()))?;

        let ttl = match row_ttl(expires_at, now_millis()) {
            KeyTtl::Missing => {
                self.delete_expired_later(key);
                return Err(StorageError::KeyNotFound(key.to_string()));
            }
            KeyTtl::Persistent => Duration::ZERO,
            KeyTtl::Expires(remaining) => remaining,
        };

        if let Some(cache) = &self.cache {
            cache.set(key, &value, ttl).await;
        }
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.ensure_open()?;
        if ttl.is_zero() {
            return Err(StorageError::InvalidOperation(format!(
                "zero TTL for key {}",
                key
            )));
        }

        sqlx::query(UPSERT)
            .bind(key)
            .bind(value)
            .bind(expiry_secs(now_millis(), ttl))
            .execute(&self.pool)
            .await?;

        if let Some(cache) = &self.cache {
            cache.set(key, value, ttl).await;
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;

        if let Some(cache) = &self.cache {
            if cache.get(key).await.is_some() {
                return Ok(true);
            }
        }

        match self.fetch_expiry(key).await? {
            None => Ok(false),
            Some(expires_at) => match row_ttl(expires_at, now_millis()) {
                KeyTtl::Missing => {
                    self.delete_expired_later(key);
                    Ok(false)
                }
                _ => Ok(true),
            },
        }
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        self.ensure_open()?;

        Ok(match self.fetch_expiry(key).await? {
            None => KeyTtl::Missing,
            Some(expires_at) => row_ttl(expires_at, now_millis()),
        })
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        self.ensure_open()?;

        let now = now_millis();
        let result = sqlx::query(UPDATE_EXPIRY)
            .bind(expiry_secs(now, ttl))
            .bind(key)
            .bind(now)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
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
        self.ensure_open()?;
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.sweep.stop().await;
        if let Some(cache) = &self.cache {
            cache.shutdown().await;
        }
        if !self.pool.is_closed() {
            self.pool.close().await;
            info!("SQLite driver closed");
        }
        Ok(())
    }
}
