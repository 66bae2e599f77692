//! Integration Tests for Storage Drivers
//!
//! Runs the same contract checks against every driver configuration. The
//! Redis suite only runs when `MYURLS_TEST_REDIS` names a reachable server.

use std::time::Duration;

use myurls::cache::TtlLruCache;
use myurls::storage::{Driver, KeyTtl, RedisDriver, SqliteDriver};
use myurls::StorageError;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tempfile::TempDir;

const HOUR: Duration = Duration::from_secs(3600);

// == Helper Functions ==

async fn sqlite_plain() -> (SqliteDriver, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let driver = SqliteDriver::open(dir.path().join("plain.db")).await.unwrap();
    (driver, dir)
}

async fn sqlite_cached() -> (SqliteDriver, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let driver = SqliteDriver::open_with_cache(dir.path().join("cached.db"), 16, Duration::from_secs(60))
        .await
        .unwrap();
    (driver, dir)
}

/// Connects to the Redis server named by `MYURLS_TEST_REDIS`, if any.
async fn redis_driver() -> Option<RedisDriver> {
    let addr = std::env::var("MYURLS_TEST_REDIS").ok()?;
    let connect = RedisDriver::connect(&addr, "");
    match tokio::time::timeout(Duration::from_secs(2), connect).await {
        Ok(Ok(driver)) => Some(driver),
        _ => {
            eprintln!("skipping redis suite: {} is not reachable", addr);
            None
        }
    }
}

/// Keys unique to one test run, so a shared server can be reused.
fn unique_key(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    format!("myurls-test:{}:{}", prefix, suffix)
}

// == Contract Checks ==

async fn check_ping(driver: &dyn Driver) {
    driver.ping().await.unwrap();
}

async fn check_missing_key(driver: &dyn Driver) {
    let key = unique_key("missing");

    let err = driver.get(&key).await.unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {}", err);
    assert!(!driver.exists(&key).await.unwrap());
    assert_eq!(driver.ttl(&key).await.unwrap(), KeyTtl::Missing);
}

async fn check_set_then_get(driver: &dyn Driver) {
    let key = unique_key("abc123");

    driver.set_ex(&key, "https://example.com", HOUR).await.unwrap();

    assert_eq!(driver.get(&key).await.unwrap(), "https://example.com");
    assert!(driver.exists(&key).await.unwrap());
    let remaining = driver.ttl(&key).await.unwrap().remaining().unwrap();
    assert!(remaining > Duration::ZERO && remaining <= HOUR);
}

async fn check_overwrite(driver: &dyn Driver) {
    let key = unique_key("overwrite");

    driver.set_ex(&key, "https://first.example.com", HOUR).await.unwrap();
    driver.set_ex(&key, "https://second.example.com", HOUR).await.unwrap();

    assert_eq!(driver.get(&key).await.unwrap(), "https://second.example.com");
}

async fn check_sub_second_ttl_readable(driver: &dyn Driver) {
    for round in 0..20 {
        let key = unique_key(&format!("subsec{}", round));

        driver.set_ex(&key, "brief", Duration::from_millis(500)).await.unwrap();

        assert_eq!(driver.get(&key).await.unwrap(), "brief", "round {}", round);
        assert!(driver.exists(&key).await.unwrap(), "round {}", round);
        assert!(
            matches!(driver.ttl(&key).await.unwrap(), KeyTtl::Expires(_)),
            "round {}",
            round
        );
    }
}

async fn check_zero_ttl_rejected(driver: &dyn Driver) {
    let key = unique_key("zero");

    let err = driver.set_ex(&key, "v", Duration::ZERO).await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidOperation(_)));
    assert!(!driver.exists(&key).await.unwrap());
}

async fn check_expiry(driver: &dyn Driver) {
    let key = unique_key("short");

    driver.set_ex(&key, "short-lived", Duration::from_secs(2)).await.unwrap();
    assert_eq!(driver.get(&key).await.unwrap(), "short-lived");
    assert!(driver.exists(&key).await.unwrap());

    // Whole-second stores may keep the key up to a second past its TTL.
    tokio::time::sleep(Duration::from_millis(3100)).await;

    assert!(driver.get(&key).await.unwrap_err().is_not_found());
    assert!(!driver.exists(&key).await.unwrap());
    assert_eq!(driver.ttl(&key).await.unwrap(), KeyTtl::Missing);
}

async fn check_expire_extends(driver: &dyn Driver) {
    let key = unique_key("extend");

    driver.set_ex(&key, "https://example.com", HOUR).await.unwrap();
    driver.expire(&key, 2 * HOUR).await.unwrap();

    let remaining = driver.ttl(&key).await.unwrap().remaining().unwrap();
    assert!(remaining > HOUR && remaining <= 2 * HOUR);
    assert_eq!(driver.get(&key).await.unwrap(), "https://example.com");
}

async fn check_expire_missing(driver: &dyn Driver) {
    let key = unique_key("nope");

    let err = driver.expire(&key, HOUR).await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidOperation(_)));
}

async fn check_expire_zero_removes(driver: &dyn Driver) {
    let key = unique_key("drop");

    driver.set_ex(&key, "gone soon", HOUR).await.unwrap();
    driver.get(&key).await.unwrap();
    driver.expire(&key, Duration::ZERO).await.unwrap();

    assert!(driver.get(&key).await.unwrap_err().is_not_found());
}

async fn check_timeout_cancels(driver: &dyn Driver) {
    let key = unique_key("cancel");

    // A zero deadline drops the lookup at its first suspension point.
    let result = tokio::time::timeout(Duration::ZERO, driver.get(&key)).await;
    match result {
        Err(_elapsed) => {}
        Ok(lookup) => assert!(lookup.unwrap_err().is_not_found()),
    }

    driver.set_ex(&key, "still works", HOUR).await.unwrap();
    assert_eq!(driver.get(&key).await.unwrap(), "still works");
}

async fn check_close(driver: &dyn Driver) {
    driver.close().await.unwrap();

    assert!(matches!(driver.ping().await, Err(StorageError::Closed)));
    assert!(matches!(driver.get("any").await, Err(StorageError::Closed)));
    assert!(matches!(
        driver.set_ex("any", "v", HOUR).await,
        Err(StorageError::Closed)
    ));
    // Closing twice is harmless.
    driver.close().await.unwrap();
}

async fn run_contract(driver: &dyn Driver) {
    check_ping(driver).await;
    check_missing_key(driver).await;
    check_set_then_get(driver).await;
    check_overwrite(driver).await;
    check_sub_second_ttl_readable(driver).await;
    check_zero_ttl_rejected(driver).await;
    check_expire_extends(driver).await;
    check_expire_missing(driver).await;
    check_expire_zero_removes(driver).await;
    check_timeout_cancels(driver).await;
    check_expiry(driver).await;
    check_close(driver).await;
}

// == SQLite Suites ==

#[tokio::test]
async fn test_sqlite_contract_without_cache() {
    let (driver, _dir) = sqlite_plain().await;
    assert!(driver.cache().is_none());
    run_contract(&driver).await;
}

#[tokio::test]
async fn test_sqlite_contract_with_cache() {
    let (driver, _dir) = sqlite_cached().await;
    run_contract(&driver).await;
}

#[tokio::test]
async fn test_sqlite_cold_cache_reads_through() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");

    let writer = SqliteDriver::open(&path).await.unwrap();
    writer.set_ex("abc123", "https://example.com", HOUR).await.unwrap();

    let cache = TtlLruCache::new(8, Duration::from_secs(60));
    let reader = SqliteDriver::open_with(&path, Some(cache), Duration::from_secs(300))
        .await
        .unwrap();
    let cache = reader.cache().unwrap();
    assert!(cache.is_empty().await);

    assert_eq!(reader.get("abc123").await.unwrap(), "https://example.com");
    assert_eq!(cache.get("abc123").await.as_deref(), Some("https://example.com"));
    assert!(cache.ttl("abc123").await.unwrap() <= HOUR);

    writer.close().await.unwrap();
    reader.close().await.unwrap();
}

#[tokio::test]
async fn test_sqlite_cache_never_outlives_row() {
    let (driver, _dir) = sqlite_cached().await;
    let cache = driver.cache().unwrap();

    for round in 0..20 {
        let key = format!("brief{}", round);
        driver.set_ex(&key, "v", Duration::from_millis(500)).await.unwrap();

        let row = driver.ttl(&key).await.unwrap().remaining().unwrap();
        let cached = cache.ttl(&key).await.unwrap();
        assert!(cached <= Duration::from_millis(500));
        assert!(row >= Duration::from_millis(400), "round {}: row ttl {:?}", round, row);
    }
}

#[tokio::test]
async fn test_sqlite_close_stops_cache_sweep() {
    let (driver, _dir) = sqlite_cached().await;
    driver.set_ex("k", "v", HOUR).await.unwrap();
    let cache = driver.cache().unwrap();
    assert!(cache.is_sweeping());

    driver.close().await.unwrap();

    assert!(!cache.is_sweeping());
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_sqlite_purge_expired() {
    let (driver, _dir) = sqlite_plain().await;
    driver.set_ex("short", "v", Duration::from_secs(1)).await.unwrap();
    driver.set_ex("long", "v", HOUR).await.unwrap();

    assert_eq!(driver.purge_expired().await.unwrap(), 0);
    tokio::time::sleep(Duration::from_millis(2100)).await;

    assert_eq!(driver.purge_expired().await.unwrap(), 1);
    assert_eq!(driver.row_count().await.unwrap(), 1);
    assert!(driver.exists("long").await.unwrap());
}

#[tokio::test]
async fn test_sqlite_row_sweep_removes_expired_rows() {
    let dir = tempfile::tempdir().unwrap();
    let driver = SqliteDriver::open_with(
        dir.path().join("sweep.db"),
        None,
        Duration::from_millis(200),
    )
    .await
    .unwrap();

    driver.set_ex("short", "v", Duration::from_secs(1)).await.unwrap();
    driver.set_ex("long", "v", HOUR).await.unwrap();
    assert_eq!(driver.row_count().await.unwrap(), 2);

    // Never read "short", so only the sweep can remove it.
    tokio::time::sleep(Duration::from_millis(2500)).await;

    assert_eq!(driver.row_count().await.unwrap(), 1);
    driver.close().await.unwrap();
}

// == Redis Suite ==

#[tokio::test]
async fn test_redis_contract() {
    let Some(driver) = redis_driver().await else {
        return;
    };
    run_contract(&driver).await;
}

#[tokio::test]
async fn test_redis_contract_without_cache() {
    let Ok(addr) = std::env::var("MYURLS_TEST_REDIS") else {
        return;
    };
    let connect = RedisDriver::connect_without_cache(&addr, "");
    let Ok(Ok(driver)) = tokio::time::timeout(Duration::from_secs(2), connect).await else {
        eprintln!("skipping redis suite: {} is not reachable", addr);
        return;
    };
    run_contract(&driver).await;
}
