//! MyUrls - short links backed by Redis or SQLite
//!
//! Provides a storage contract with two drivers, both optionally fronted by an
//! in-process TTL-aware LRU cache, and a thin HTTP API on top.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod tasks;

pub use api::AppState;
pub use cache::TtlLruCache;
pub use config::Config;
pub use error::{Result, StorageError};
pub use storage::{connect, Driver, KeyTtl, SharedDriver};
