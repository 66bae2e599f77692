//! TTL Cleanup Tasks
//!
//! Background tasks that periodically remove expired cache entries and rows.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::storage::sqlite::purge_expired_rows;

// == Sweep Handle ==
/// Owns a spawned sweep loop.
///
/// [`stop`](Self::stop) aborts the loop and waits for it to unwind, so once it
/// returns no further sweep runs. Dropping the handle aborts the loop as well.
#[derive(Debug)]
pub struct SweepHandle {
    name: &'static str,
    handle: StdMutex<Option<JoinHandle<()>>>,
}

impl SweepHandle {
    fn new(name: &'static str, handle: JoinHandle<()>) -> Self {
        Self {
            name,
            handle: StdMutex::new(Some(handle)),
        }
    }

    fn take(&self) -> Option<JoinHandle<()>> {
        self.handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    /// Aborts the loop and waits until it has finished. Idempotent.
    pub async fn stop(&self) {
        if let Some(handle) = self.take() {
            handle.abort();
            let _ = handle.await;
            debug!("{} sweep stopped", self.name);
        }
    }

    /// True once [`stop`](Self::stop) ran or the loop ended on its own.
    pub fn is_stopped(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.take() {
            handle.abort();
        }
    }
}

/// Spawns a background task that periodically drops expired cache entries.
///
/// The task sleeps for `interval` between runs and takes the cache lock only
/// for the duration of a single scan.
pub fn spawn_cache_sweep(cache: Arc<Mutex<CacheStore>>, interval: Duration) -> SweepHandle {
    let handle = tokio::spawn(async move {
        debug!("Starting cache sweep with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let (removed, stats) = {
                let mut store = cache.lock().await;
                (store.cleanup_expired(), store.stats())
            };

            if removed > 0 {
                info!("Cache sweep: removed {} expired entries", removed);
            }
            debug!(
                entries = stats.total_entries,
                hit_rate = stats.hit_rate(),
                evictions = stats.evictions,
                "Cache sweep finished"
            );
        }
    });

    SweepHandle::new("cache", handle)
}

/// Spawns a background task that periodically deletes expired rows.
///
/// Failures are logged and retried on the next tick.
pub fn spawn_row_sweep(pool: SqlitePool, interval: Duration) -> SweepHandle {
    let handle = tokio::spawn(async move {
        info!("Starting row sweep with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            match purge_expired_rows(&pool).await {
                Ok(0) => debug!("Row sweep: no expired rows found"),
                Ok(removed) => info!("Row sweep: deleted {} expired rows", removed),
                Err(e) => warn!(error = %e, "Row sweep failed"),
            }
        }
    });

    SweepHandle::new("row", handle)
}
