//! Fast cache tier: an expiring key-value store in front of the durable store.
//!
//! Two backends are provided:
//!
//! - [`MokaFastCache`]: in-process, bounded, per-entry TTL
//! - [`RedisFastCache`]: shared Redis instance, namespaced by key prefix
//!
//! Values are opaque bytes; the resolver stores record documents verbatim so
//! a cached entry is byte-identical to the durable copy it was written from.

pub mod moka;
pub mod redis;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::Error;
use crate::config::AppConfig;

pub use self::moka::MokaFastCache;
pub use self::redis::RedisFastCache;

/// Expiring key-value store.
#[async_trait]
pub trait FastCache: Send + Sync {
    /// Get a live entry. Expired entries read as `None`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;

    /// Insert or overwrite an entry; overwriting restarts its lifetime.
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), Error>;

    /// Keys of live entries starting with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, Error>;

    /// Drop every entry owned by this cache.
    async fn clear_all(&self) -> Result<(), Error>;

    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), Error> {
        Ok(())
    }
}

/// Cache key for an IP under the given namespace prefix.
pub fn cache_key(prefix: &str, ip: &str) -> String {
    format!("{prefix}{ip}")
}

/// Build the configured fast cache: Redis when `redis_url` is set, otherwise in-process.
pub async fn connect(config: &AppConfig) -> Result<Arc<dyn FastCache>, Error> {
    match config.redis_url.as_deref() {
        Some(url) => {
            let cache = RedisFastCache::connect(url, &config.cache_key_prefix).await?;
            tracing::info!(prefix = %config.cache_key_prefix, "using Redis fast cache");
            Ok(Arc::new(cache))
        }
        None => {
            tracing::info!(max_capacity = config.cache_max_capacity, "using in-process fast cache");
            Ok(Arc::new(MokaFastCache::new(config.cache_max_capacity)))
        }
    }
}
