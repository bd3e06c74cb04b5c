//! In-memory cache implementation using moka
//!
//! Entries carry their own TTL through a moka `Expiry` policy, so callers can
//! cache short-lived values next to long-lived ones.

use super::CacheLayer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default maximum cache capacity (number of entries)
const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// Default TTL for cache entries
const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// JSON-serialised value plus the TTL it was stored with
#[derive(Clone)]
struct CacheEntry {
    data: Arc<String>,
    ttl: Duration,
}

impl CacheEntry {
    fn new<T: Serialize>(value: &T, ttl: Duration) -> Result<Self> {
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;
        Ok(Self {
            data: Arc::new(json),
            ttl,
        })
    }

    fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.data).context("Failed to deserialize cache value")
    }
}

/// Expires each entry after the TTL it was inserted with; overwrites restart the clock
struct EntryExpiry;

impl Expiry<String, CacheEntry> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, value: &CacheEntry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-memory cache using moka
pub struct MemoryCache {
    cache: Cache<String, CacheEntry>,
    default_ttl: Duration,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entry_count", &self.cache.entry_count())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl MemoryCache {
    /// Create a new memory cache with default settings
    pub fn new() -> Self {
        Self::with_capacity_and_ttl(DEFAULT_MAX_CAPACITY, DEFAULT_TTL)
    }

    /// Create a new memory cache with custom capacity and default TTL
    pub fn with_capacity_and_ttl(max_capacity: u64, default_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryExpiry)
            .build();

        Self { cache, default_ttl }
    }

    /// TTL used for entries cached with the configured lifetime
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheLayer for MemoryCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.cache.get(key).await {
            Some(entry) => Ok(Some(entry.deserialize()?)),
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(value, ttl)?;
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<()> {
        // moka's iter() yields (Arc<K>, V)
        let keys_to_delete: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| (*key).clone())
            .collect();

        for key in keys_to_delete {
            self.cache.invalidate(&key).await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Stats {
        total: i64,
        label: String,
    }

    #[tokio::test]
    async fn test_set_and_get_struct() {
        let cache = MemoryCache::new();
        let stats = Stats {
            total: 3,
            label: "articles".to_string(),
        };

        cache.set("stats", &stats, Duration::from_secs(60)).await.unwrap();

        let result: Option<Stats> = cache.get("stats").await.unwrap();
        assert_eq!(result, Some(stats));
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let cache = MemoryCache::new();
        let result: Option<String> = cache.get("missing").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_get_with_wrong_type_fails() {
        let cache = MemoryCache::new();
        cache.set("key", &"text".to_string(), Duration::from_secs(60)).await.unwrap();
        let result: Result<Option<i64>> = cache.get("key").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_entry_expires_after_its_ttl() {
        let cache = MemoryCache::new();
        cache.set("short", &1u8, Duration::from_millis(50)).await.unwrap();
        cache.set("long", &2u8, Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        let short: Option<u8> = cache.get("short").await.unwrap();
        let long: Option<u8> = cache.get("long").await.unwrap();
        assert_eq!(short, None);
        assert_eq!(long, Some(2));
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value_and_ttl() {
        let cache = MemoryCache::new();
        cache.set("a", &1u8, Duration::from_millis(50)).await.unwrap();
        cache.set("a", &2u8, Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(cache.get::<u8>("a").await.unwrap(), Some(2));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(20))]

            /// Deleting a prefix removes exactly the keys that start with it
            #[test]
            fn property_delete_prefix_is_exact(
                inside in proptest::collection::hash_set("[a-z]{1,8}", 1..6),
                outside in proptest::collection::hash_set("[a-z]{1,8}", 1..6),
            ) {
                let rt = tokio::runtime::Runtime::new().unwrap();
                rt.block_on(async {
                    let cache = MemoryCache::new();
                    let ttl = Duration::from_secs(60);
                    for key in &inside {
                        cache.set(&format!("t:1:{}", key), &1u8, ttl).await.unwrap();
                    }
                    for key in &outside {
                        cache.set(&format!("t:2:{}", key), &2u8, ttl).await.unwrap();
                    }

                    cache.delete_prefix("t:1:").await.unwrap();

                    for key in &inside {
                        let value: Option<u8> = cache.get(&format!("t:1:{}", key)).await.unwrap();
                        prop_assert!(value.is_none());
                    }
                    for key in &outside {
                        let value: Option<u8> = cache.get(&format!("t:2:{}", key)).await.unwrap();
                        prop_assert_eq!(value, Some(2));
                    }
                    Ok(())
                })?;
            }
        }
    }
}
