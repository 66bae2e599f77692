//! Shared TTL-LRU cache handle
//!
//! Wraps a [`CacheStore`] in a single exclusive lock and owns its sweep task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::cache::{CacheStats, CacheStore, DEFAULT_SWEEP_INTERVAL};
use crate::tasks::{spawn_cache_sweep, SweepHandle};

/// Thread-safe, bounded, TTL-aware LRU cache.
///
/// Every operation, lookups included, goes through one `Mutex` because a hit
/// reorders the recency list. Must be created inside a tokio runtime.
///
/// After [`shutdown`](Self::shutdown) the cache stays empty: writes are dropped.
#[derive(Debug)]
pub struct TtlLruCache {
    store: Arc<Mutex<CacheStore>>,
    sweep: SweepHandle,
    sweep_interval: Duration,
    closed: AtomicBool,
}

impl TtlLruCache {
    /// Creates a cache that sweeps expired entries once a minute.
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self::with_sweep_interval(capacity, default_ttl, DEFAULT_SWEEP_INTERVAL)
    }

    pub fn with_sweep_interval(capacity: usize, default_ttl: Duration, interval: Duration) -> Self {
        let store = Arc::new(Mutex::new(CacheStore::new(capacity, default_ttl)));
        let sweep = spawn_cache_sweep(store.clone(), interval);
        Self {
            store,
            sweep,
            sweep_interval: interval,
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the live value for `key`, promoting it to most recently used.
    pub async fn get(&self, key: &str) -> Option<String> {
        self.store.lock().await.get(key)
    }

    /// Inserts or overwrites `key`. A zero `ttl` applies the default TTL.
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) {
        let mut store = self.store.lock().await;
        // Checked under the lock so a write racing shutdown cannot land after the clear.
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        store.set(key.to_string(), value.to_string(), ttl);
    }

    /// Re-arms the expiry of a cached key so it tracks the backing store.
    ///
    /// Keys that are not cached stay uncached.
    pub async fn refresh_ttl(&self, key: &str, ttl: Duration) -> bool {
        self.store.lock().await.refresh_ttl(key, ttl)
    }

    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        self.store.lock().await.ttl(key)
    }

    pub async fn delete(&self, key: &str) {
        self.store.lock().await.delete(key);
    }

    pub async fn clear(&self) {
        self.store.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.store.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.lock().await.is_empty()
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.lock().await.stats()
    }

    /// Empties the cache for good and stops its sweep task.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        self.clear().await;
        self.sweep.stop().await;
    }

    pub fn is_sweeping(&self) -> bool {
        !self.sweep.is_stopped()
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }
}
