//! Redis-backed fast cache.
//!
//! Entries are written with `SET .. EX` so Redis owns expiry. The cache only
//! ever touches keys under its namespace prefix; `clear_all` deletes those
//! keys rather than flushing the whole database.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

use super::FastCache;
use crate::Error;

/// Keys deleted per DEL command when clearing.
const DELETE_BATCH: usize = 500;

/// Redis fast cache sharing one auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisFastCache {
    conn: ConnectionManager,
    namespace: String,
}

impl RedisFastCache {
    /// Connect to `url` and verify the server answers.
    pub async fn connect(url: &str, namespace: &str) -> Result<Self, Error> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        let cache = Self { conn, namespace: namespace.to_string() };
        cache.ping().await?;
        tracing::debug!(namespace, "Redis fast cache connected");
        Ok(cache)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, Error> {
        let mut conn = self.conn.clone();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(DELETE_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys)
    }
}

#[async_trait]
impl FastCache for RedisFastCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), Error> {
        let mut conn = self.conn.clone();
        // EX rejects 0, so sub-second TTLs round up to one second.
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds).await?;
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, Error> {
        self.scan(&format!("{prefix}*")).await
    }

    async fn clear_all(&self) -> Result<(), Error> {
        let keys = self.scan(&format!("{}*", self.namespace)).await?;
        let mut conn = self.conn.clone();
        for chunk in keys.chunks(DELETE_BATCH) {
            redis::cmd("DEL").arg(chunk).query_async::<()>(&mut conn).await?;
        }
        tracing::info!(deleted = keys.len(), namespace = %self.namespace, "cleared Redis fast cache");
        Ok(())
    }

    async fn ping(&self) -> Result<(), Error> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Connect under a namespace unique to this test run.
    async fn live_cache(name: &str) -> RedisFastCache {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let namespace = format!("ipscope-test:{}:{name}:", std::process::id());
        RedisFastCache::connect(&url, &namespace).await.unwrap()
    }

    #[tokio::test]
    async fn test_connect_invalid_url() {
        let result = RedisFastCache::connect("not a url", "ip:").await;
        assert!(matches!(result, Err(Error::FastCache(_))));
    }

    #[tokio::test]
    #[ignore = "requires a running Redis (REDIS_URL)"]
    async fn test_set_get_and_expiry() {
        let cache = live_cache("ttl").await;
        let key = format!("{}8.8.8.8", cache.namespace);

        cache.set_with_ttl(&key, b"doc", Duration::from_secs(1)).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(b"doc".to_vec()));

        let mut conn = cache.conn.clone();
        let ttl: i64 = conn.ttl(&key).await.unwrap();
        assert!((0..=1).contains(&ttl));

        tokio::time::sleep(Duration::from_millis(2_100)).await;
        assert_eq!(cache.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis (REDIS_URL)"]
    async fn test_sub_second_ttl_rounds_up() {
        let cache = live_cache("round").await;
        let key = format!("{}1.1.1.1", cache.namespace);

        cache.set_with_ttl(&key, b"doc", Duration::from_millis(10)).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(b"doc".to_vec()));
        cache.clear_all().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running Redis (REDIS_URL)"]
    async fn test_keys_with_prefix_counts_namespace() {
        let cache = live_cache("scan").await;
        for i in 1..=12 {
            let key = format!("{}10.0.0.{i}", cache.namespace);
            cache.set_with_ttl(&key, b"doc", Duration::from_secs(60)).await.unwrap();
        }

        let mut keys = cache.keys_with_prefix(&cache.namespace).await.unwrap();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 12);
        assert!(keys.iter().all(|k| k.starts_with(&cache.namespace)));

        cache.clear_all().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running Redis (REDIS_URL)"]
    async fn test_clear_all_leaves_foreign_keys() {
        let cache = live_cache("clear").await;
        let foreign = format!("ipscope-test:{}:foreign", std::process::id());
        let mut conn = cache.conn.clone();
        conn.set::<_, _, ()>(&foreign, "keep").await.unwrap();

        for ip in ["8.8.8.8", "1.1.1.1"] {
            let key = format!("{}{ip}", cache.namespace);
            cache.set_with_ttl(&key, b"doc", Duration::from_secs(60)).await.unwrap();
        }

        cache.clear_all().await.unwrap();

        assert!(cache.keys_with_prefix(&cache.namespace).await.unwrap().is_empty());
        let kept: Option<String> = conn.get(&foreign).await.unwrap();
        assert_eq!(kept.as_deref(), Some("keep"));

        conn.del::<_, ()>(&foreign).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running Redis (REDIS_URL)"]
    async fn test_ping() {
        let cache = live_cache("ping").await;
        assert!(cache.ping().await.is_ok());
    }
}
