//! In-process fast cache backed by moka.

use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::Expiry;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::FastCache;
use crate::Error;

#[derive(Clone)]
struct Entry {
    bytes: Arc<[u8]>,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self, _key: &String, value: &Entry, _updated_at: Instant, _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Bounded in-process cache with per-entry TTL.
pub struct MokaFastCache {
    inner: Cache<String, Entry>,
}

impl MokaFastCache {
    pub fn new(max_capacity: u64) -> Self {
        let inner = Cache::builder().max_capacity(max_capacity).expire_after(EntryExpiry).build();
        Self { inner }
    }
}

#[async_trait]
impl FastCache for MokaFastCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.inner.get(key).await.map(|entry| entry.bytes.to_vec()))
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), Error> {
        self.inner.insert(key.to_string(), Entry { bytes: Arc::from(value), ttl }).await;
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, Error> {
        Ok(self
            .inner
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.as_ref().clone())
            .collect())
    }

    async fn clear_all(&self) -> Result<(), Error> {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
        Ok(())
    }
}
