//! Storage Module
//!
//! The storage contract shared by every backing store, plus its two drivers.
//!
//! # Drivers
//! - [`RedisDriver`]: remote store with native TTL
//! - [`SqliteDriver`]: embedded table that emulates the remote store's TTL rules
//!
//! Both can be fronted by a [`TtlLruCache`](crate::cache::TtlLruCache).

pub mod manager;
pub mod redis;
pub mod sqlite;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use self::manager::{connect, StorageType};
pub use self::redis::RedisDriver;
pub use self::sqlite::SqliteDriver;

// == Key TTL ==
/// Remaining lifetime of a key as reported by [`Driver::ttl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// No such key, or the key already expired
    Missing,
    /// Key exists and never expires
    Persistent,
    /// Key exists and expires after the given duration
    Expires(Duration),
}

impl KeyTtl {
    /// Converts a remote-store PTTL reply: -2 missing, -1 persistent, else milliseconds.
    pub fn from_millis(millis: i64) -> Self {
        match millis {
            -1 => KeyTtl::Persistent,
            ms if ms < 0 => KeyTtl::Missing,
            ms => KeyTtl::Expires(Duration::from_millis(ms as u64)),
        }
    }

    /// Returns the remote store's integer convention (-2, -1, or seconds).
    pub fn as_secs(&self) -> i64 {
        match self {
            KeyTtl::Missing => -2,
            KeyTtl::Persistent => -1,
            KeyTtl::Expires(remaining) => remaining.as_secs() as i64,
        }
    }

    /// The remaining duration, if the key expires at all.
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            KeyTtl::Expires(remaining) => Some(*remaining),
            _ => None,
        }
    }
}

// == Driver Trait ==
/// Capability set every backing store implements identically.
///
/// Absence is always reported as [`StorageError::KeyNotFound`](crate::error::StorageError::KeyNotFound),
/// whatever the backend. Operations are cancelled by dropping their future,
/// e.g. through `tokio::time::timeout`.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Returns the value stored under `key`.
    async fn get(&self, key: &str) -> Result<String>;

    /// Stores `value` under `key`, expiring after `ttl`. Overwrites existing keys.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    async fn ttl(&self, key: &str) -> Result<KeyTtl>;

    /// Sets a new TTL on an existing key.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    async fn ping(&self) -> Result<()>;

    /// Releases the connection and stops background work. Later calls fail with `Closed`.
    async fn close(&self) -> Result<()>;
}

/// Handle shared by every component that needs storage.
pub type SharedDriver = Arc<dyn Driver>;
