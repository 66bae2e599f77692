//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Service configuration parameters.
///
/// All values can be configured via `MYURLS_*` environment variables with
/// sensible defaults. Unparseable values fall back to the default.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

/// HTTP-facing settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP server port
    pub port: u16,
    /// Public host used to build short links
    pub domain: String,
    /// Public scheme used to build short links
    pub proto: String,
}

/// Storage backend selection and cache tuning.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// `redis` or `sqlite`; validated when the driver is built
    pub storage_type: String,
    pub redis_addr: String,
    pub redis_password: String,
    pub sqlite_file: PathBuf,
    pub cache_enabled: bool,
    /// Maximum number of cached keys
    pub cache_size: usize,
    /// Default TTL in seconds for cached keys
    pub cache_ttl: u64,
    /// Cache sweep interval in seconds
    pub cache_sweep_interval: u64,
    /// Expired-row sweep interval in seconds
    pub row_sweep_interval: u64,
}

impl ServerConfig {
    /// Builds the public URL of a short key.
    pub fn short_url(&self, short_key: &str) -> String {
        format!("{}://{}/{}", self.proto, self.domain, short_key)
    }
}

impl StorageConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn cache_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache_sweep_interval)
    }

    pub fn row_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.row_sweep_interval)
    }
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MYURLS_PORT` - HTTP port (default: 8080)
    /// - `MYURLS_DOMAIN` - public host (default: localhost:8080)
    /// - `MYURLS_PROTO` - public scheme (default: https)
    /// - `MYURLS_STORAGE_TYPE` - `redis` or `sqlite` (default: redis)
    /// - `MYURLS_REDIS_CONN` - Redis address (default: localhost:6379)
    /// - `MYURLS_REDIS_PASSWORD` - Redis password (default: empty)
    /// - `MYURLS_SQLITE_FILE` - database file (default: ./data/myurls.db)
    /// - `MYURLS_CACHE_ENABLED` - front the store with a cache (default: true)
    /// - `MYURLS_CACHE_SIZE` - cache capacity (default: 1024)
    /// - `MYURLS_CACHE_TTL` - cache default TTL in seconds (default: 300)
    /// - `MYURLS_CACHE_SWEEP_INTERVAL` - seconds between cache sweeps (default: 60)
    /// - `MYURLS_ROW_SWEEP_INTERVAL` - seconds between row sweeps (default: 300)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let text = |name: &str, default: String| {
            lookup(name).filter(|v| !v.is_empty()).unwrap_or(default)
        };

        Self {
            server: ServerConfig {
                port: parse_or(&lookup, "MYURLS_PORT", defaults.server.port),
                domain: text("MYURLS_DOMAIN", defaults.server.domain),
                proto: text("MYURLS_PROTO", defaults.server.proto),
            },
            storage: StorageConfig {
                storage_type: text("MYURLS_STORAGE_TYPE", defaults.storage.storage_type)
                    .to_lowercase(),
                redis_addr: text("MYURLS_REDIS_CONN", defaults.storage.redis_addr),
                redis_password: lookup("MYURLS_REDIS_PASSWORD").unwrap_or_default(),
                sqlite_file: lookup("MYURLS_SQLITE_FILE")
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.sqlite_file),
                cache_enabled: parse_or(
                    &lookup,
                    "MYURLS_CACHE_ENABLED",
                    defaults.storage.cache_enabled,
                ),
                cache_size: positive_or(&lookup, "MYURLS_CACHE_SIZE", defaults.storage.cache_size),
                cache_ttl: positive_or(&lookup, "MYURLS_CACHE_TTL", defaults.storage.cache_ttl),
                cache_sweep_interval: positive_or(
                    &lookup,
                    "MYURLS_CACHE_SWEEP_INTERVAL",
                    defaults.storage.cache_sweep_interval,
                ),
                row_sweep_interval: positive_or(
                    &lookup,
                    "MYURLS_ROW_SWEEP_INTERVAL",
                    defaults.storage.row_sweep_interval,
                ),
            },
        }
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn positive_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + Default,
{
    lookup(name)
        .and_then(|v| v.trim().parse().ok())
        .filter(|v| *v > T::default())
        .unwrap_or(default)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            domain: "localhost:8080".to_string(),
            proto: "https".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: "redis".to_string(),
            redis_addr: "localhost:6379".to_string(),
            redis_password: String::new(),
            sqlite_file: PathBuf::from("./data/myurls.db"),
            cache_enabled: true,
            cache_size: 1024,
            cache_ttl: 300,
            cache_sweep_interval: 60,
            row_sweep_interval: 300,
        }
    }
}
