//! Cache Store Module
//!
//! Single-threaded cache engine combining HashMap storage with LRU tracking and
//! TTL expiration. Thread safety is layered on top by [`TtlLruCache`](super::TtlLruCache).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::cache::{CacheEntry, CacheStats, LruTracker};

// == Cache Store ==
/// Bounded key/value storage with LRU eviction and per-entry TTL.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed, at least 1
    capacity: usize,
    /// TTL applied when a caller passes a zero TTL
    default_ttl: Duration,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and default TTL.
    ///
    /// A capacity of zero is coerced to one.
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            capacity: capacity.max(1),
            default_ttl,
        }
    }

    fn effective_ttl(&self, ttl: Duration) -> Duration {
        if ttl.is_zero() {
            self.default_ttl
        } else {
            ttl
        }
    }

    // == Set ==
    /// Stores a key-value pair expiring after `ttl`.
    ///
    /// A zero `ttl` means "use the default TTL", never "keep forever".
    /// Overwrites update the entry in place. When the insert pushes the cache
    /// over capacity the least recently used entry is evicted.
    pub fn set(&mut self, key: String, value: String, ttl: Duration) {
        let ttl = Some(self.effective_ttl(ttl));

        match self.entries.get_mut(&key) {
            Some(entry) => entry.refresh(value, ttl),
            None => {
                self.entries.insert(key.clone(), CacheEntry::new(value, ttl));
            }
        }
        self.lru.touch(&key);

        while self.entries.len() > self.capacity {
            match self.lru.evict_oldest() {
                Some(evicted) => {
                    self.entries.remove(&evicted);
                    self.stats.record_eviction();
                }
                None => break,
            }
        }
    }

    // == Get ==
    /// Retrieves a live value by key and promotes it to most recently used.
    ///
    /// An expired entry is removed on the spot and reported as a miss.
    pub fn get(&mut self, key: &str) -> Option<String> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            return None;
        }

        self.lru.touch(key);
        self.stats.record_hit();
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Refresh TTL ==
    /// Moves the expiry horizon of a live entry without touching its value.
    ///
    /// Returns false if the key is absent or already expired.
    pub fn refresh_ttl(&mut self, key: &str, ttl: Duration) -> bool {
        let ttl = self.effective_ttl(ttl);
        match self.entries.get_mut(key) {
            Some(entry) if !entry.is_expired() => {
                entry.expires_at = Some(Instant::now() + ttl);
                self.lru.touch(key);
                true
            }
            Some(_) => {
                self.remove_entry(key);
                self.stats.record_expirations(1);
                false
            }
            None => false,
        }
    }

    /// Remaining TTL of a live entry, without promoting it.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .and_then(|entry| entry.ttl_remaining())
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether anything was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key)
    }

    // == Clear ==
    /// Drops every entry. Statistics counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        self.stats.record_expirations(expired_keys.len());
        expired_keys.len()
    }

    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Keys from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<String> {
        self.lru.keys()
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        self.lru.remove(key);
        removed
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_store_new() {
        let store = CacheStore::new(100, HOUR);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 100);
    }

    #[test]
    fn test_store_zero_capacity_coerced() {
        let mut store = CacheStore::new(0, HOUR);
        assert_eq!(store.capacity(), 1);

        store.set("a".to_string(), "1".to_string(), HOUR);
        store.set("b".to_string(), "2".to_string(), HOUR);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("b"), Some("2".to_string()));
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = CacheStore::new(100, HOUR);

        store.set("key1".to_string(), "value1".to_string(), HOUR);

        assert_eq!(store.get("key1"), Some("value1".to_string()));
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn test_store_overwrite_updates_in_place() {
        let mut store = CacheStore::new(100, HOUR);

        store.set("key1".to_string(), "value1".to_string(), Duration::from_secs(10));
        store.set("key1".to_string(), "value2".to_string(), HOUR);

        assert_eq!(store.get("key1"), Some("value2".to_string()));
        assert_eq!(store.len(), 1);
        assert!(store.ttl("key1").unwrap() > Duration::from_secs(10));
    }

    #[test]
    fn test_store_zero_ttl_uses_default() {
        let mut store = CacheStore::new(100, Duration::from_secs(300));

        store.set("key1".to_string(), "value1".to_string(), Duration::ZERO);

        let ttl = store.ttl("key1").unwrap();
        assert!(ttl > Duration::from_secs(299));
        assert!(ttl <= Duration::from_secs(300));
    }

    #[test]
    fn test_store_ttl_expiration() {
        let mut store = CacheStore::new(100, HOUR);

        store.set("key1".to_string(), "value1".to_string(), Duration::from_millis(50));
        assert!(store.get("key1").is_some());

        sleep(Duration::from_millis(80));

        assert_eq!(store.get("key1"), None);
        assert_eq!(store.len(), 0, "expired entry is dropped on lookup");
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_store_lru_eviction() {
        let mut store = CacheStore::new(3, HOUR);

        store.set("key1".to_string(), "value1".to_string(), HOUR);
        store.set("key2".to_string(), "value2".to_string(), HOUR);
        store.set("key3".to_string(), "value3".to_string(), HOUR);
        store.set("key4".to_string(), "value4".to_string(), HOUR);

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("key1"), None);
        assert!(store.get("key2").is_some());
        assert!(store.get("key3").is_some());
        assert!(store.get("key4").is_some());
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let mut store = CacheStore::new(2, HOUR);

        store.set("a".to_string(), "1".to_string(), HOUR);
        store.set("b".to_string(), "2".to_string(), HOUR);
        store.get("a");
        store.set("c".to_string(), "3".to_string(), HOUR);

        assert!(store.get("a").is_some());
        assert_eq!(store.get("b"), None);
        assert!(store.get("c").is_some());
    }

    #[test]
    fn test_store_refresh_ttl() {
        let mut store = CacheStore::new(10, HOUR);

        store.set("key1".to_string(), "value1".to_string(), Duration::from_secs(5));
        assert!(store.refresh_ttl("key1", Duration::from_secs(7200)));

        assert!(store.ttl("key1").unwrap() > HOUR);
        assert_eq!(store.get("key1"), Some("value1".to_string()));
        assert!(!store.refresh_ttl("missing", HOUR));
    }

    #[test]
    fn test_store_delete_and_clear() {
        let mut store = CacheStore::new(100, HOUR);

        store.set("key1".to_string(), "value1".to_string(), HOUR);
        store.set("key2".to_string(), "value2".to_string(), HOUR);

        assert!(store.delete("key1"));
        assert!(!store.delete("key1"));
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
        assert!(store.keys_by_recency().is_empty());
    }

    #[test]
    fn test_store_stats() {
        let mut store = CacheStore::new(100, HOUR);

        store.set("key1".to_string(), "value1".to_string(), HOUR);
        store.get("key1");
        store.get("nonexistent");

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_store_cleanup_expired() {
        let mut store = CacheStore::new(100, HOUR);

        store.set("key1".to_string(), "value1".to_string(), Duration::from_millis(50));
        store.set("key2".to_string(), "value2".to_string(), Duration::from_secs(10));

        sleep(Duration::from_millis(80));

        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.keys_by_recency(), vec!["key2"]);
        assert!(store.get("key2").is_some());
    }
}
