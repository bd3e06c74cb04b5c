//! Cache layer
//!
//! In-process cache for hot, tenant-scoped reads such as dashboard stats and
//! tenant lookups. Values are stored as JSON so any serialisable type fits.
//!
//! Keys are namespaced per tenant (`t:{tenant_id}:{name}`); writes that change
//! a tenant's data drop the whole namespace with [`invalidate_tenant`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use quillpress::cache::{create_cache, tenant_key, CacheLayer};
//! use quillpress::config::CacheConfig;
//!
//! let cache = create_cache(&CacheConfig::default());
//! cache.set(&tenant_key(1, "dashboard"), &stats, cache.default_ttl()).await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Cache layer trait
///
/// Generic methods keep this trait from being object safe; share the
/// concrete `MemoryCache` behind an `Arc` instead.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Get a value from cache
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Set a value in cache with TTL
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    /// Delete every value whose key starts with `prefix`
    async fn delete_prefix(&self, prefix: &str) -> Result<()>;
}

/// Key prefix shared by all entries of a tenant
pub fn tenant_prefix(tenant_id: i64) -> String {
    format!("t:{}:", tenant_id)
}

/// Cache key for a named entry of a tenant
pub fn tenant_key(tenant_id: i64, name: &str) -> String {
    format!("{}{}", tenant_prefix(tenant_id), name)
}

/// Drop every cached entry of a tenant
pub async fn invalidate_tenant<C: CacheLayer + ?Sized>(cache: &C, tenant_id: i64) -> Result<()> {
    cache.delete_prefix(&tenant_prefix(tenant_id)).await
}

/// Create the shared cache from configuration
pub fn create_cache(config: &CacheConfig) -> Arc<MemoryCache> {
    Arc::new(MemoryCache::with_capacity_and_ttl(
        config.max_capacity,
        Duration::from_secs(config.ttl_seconds),
    ))
}
