//! Durable store tier: SQLite-backed document table keyed by IP.
//!
//! Holds the source of truth for successful lookups. Uses tokio-rusqlite so
//! queries run on a background thread, WAL mode for concurrent readers, and
//! versioned migrations.

pub mod connection;
pub mod migrations;
pub mod records;

use async_trait::async_trait;

use crate::Error;
use crate::record::GeoRecord;

pub use connection::GeoDb;

/// Document store keyed by IP with a uniqueness constraint on the key.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Exact-match lookup by IP.
    async fn find_one(&self, ip: &str) -> Result<Option<GeoRecord>, Error>;

    /// Insert the record, or replace the existing one for the same IP wholesale.
    async fn upsert_by_key(&self, record: &GeoRecord) -> Result<(), Error>;

    /// Number of stored records.
    async fn count(&self) -> Result<u64, Error>;

    /// Check the store is usable.
    async fn ping(&self) -> Result<(), Error> {
        self.count().await.map(|_| ())
    }
}

#[async_trait]
impl DurableStore for GeoDb {
    async fn find_one(&self, ip: &str) -> Result<Option<GeoRecord>, Error> {
        self.get_record(ip).await
    }

    async fn upsert_by_key(&self, record: &GeoRecord) -> Result<(), Error> {
        self.upsert_record(record).await
    }

    async fn count(&self) -> Result<u64, Error> {
        self.count_records().await
    }

    async fn ping(&self) -> Result<(), Error> {
        GeoDb::ping(self).await
    }
}
