//! Geo record CRUD operations.

use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::GeoDb;
use crate::Error;
use crate::record::GeoRecord;

/// Column format for timestamps; fixed width so text comparison orders by time.
fn column_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl GeoDb {
    /// Insert or replace the record for its IP.
    ///
    /// Uses UPSERT semantics on the `ip` primary key. Only successful lookups
    /// may be persisted; anything else is refused.
    pub async fn upsert_record(&self, record: &GeoRecord) -> Result<(), Error> {
        if !record.is_success() {
            return Err(Error::InvalidInput(format!(
                "refusing to persist {} lookup for {}",
                record.status.as_str(),
                record.ip
            )));
        }

        let document = String::from_utf8(record.to_document()?)
            .map_err(|e| Error::InvalidInput(format!("document is not UTF-8: {e}")))?;
        let ip = record.ip.clone();
        let status = record.status.as_str();
        let fetched_at = record.fetched_at.map(column_time);
        let updated_at = column_time(Utc::now());

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO geo_records (ip, status, document, fetched_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(ip) DO UPDATE SET
                        status = excluded.status,
                        document = excluded.document,
                        fetched_at = excluded.fetched_at,
                        updated_at = excluded.updated_at",
                    params![ip, status, document, fetched_at, updated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get the stored document text for an IP.
    pub async fn get_document(&self, ip: &str) -> Result<Option<String>, Error> {
        let ip = ip.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let mut stmt = conn.prepare("SELECT document FROM geo_records WHERE ip = ?1")?;

                match stmt.query_row(params![ip], |row| row.get(0)) {
                    Ok(doc) => Ok(Some(doc)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Get the record for an IP.
    ///
    /// Returns None if the IP has never been stored.
    pub async fn get_record(&self, ip: &str) -> Result<Option<GeoRecord>, Error> {
        match self.get_document(ip).await? {
            Some(doc) => Ok(Some(GeoRecord::from_document(doc.as_bytes())?)),
            None => Ok(None),
        }
    }

    /// Number of stored records.
    pub async fn count_records(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM geo_records", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete records whose original lookup happened before `cutoff`.
    ///
    /// Returns the number of deleted records.
    pub async fn purge_fetched_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let cutoff = column_time(cutoff);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM geo_records WHERE fetched_at IS NOT NULL AND fetched_at < ?1",
                    params![cutoff],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{GeoFields, LookupStatus};
    use chrono::Duration;

    fn make_record(ip: &str, country: &str) -> GeoRecord {
        GeoRecord {
            ip: ip.to_string(),
            status: LookupStatus::Success,
            message: None,
            fields: GeoFields { country: Some(country.to_string()), ..Default::default() },
            fetched_at: Some(Utc::now()),
            source: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let db = GeoDb::open_in_memory().await.unwrap();
        let record = make_record("8.8.8.8", "United States");

        db.upsert_record(&record).await.unwrap();

        let retrieved = db.get_record("8.8.8.8").await.unwrap().unwrap();
        assert_eq!(retrieved, record);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = GeoDb::open_in_memory().await.unwrap();
        assert!(db.get_record("1.2.3.4").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_wholesale() {
        let db = GeoDb::open_in_memory().await.unwrap();
        let mut first = make_record("8.8.8.8", "United States");
        first.fields.city = Some("Ashburn".into());
        db.upsert_record(&first).await.unwrap();

        let second = make_record("8.8.8.8", "Canada");
        db.upsert_record(&second).await.unwrap();

        let stored = db.get_record("8.8.8.8").await.unwrap().unwrap();
        assert_eq!(stored.fields.country.as_deref(), Some("Canada"));
        assert!(stored.fields.city.is_none());
        assert_eq!(db.count_records().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_refuses_failed_lookup() {
        let db = GeoDb::open_in_memory().await.unwrap();
        let mut record = make_record("10.0.0.1", "x");
        record.status = LookupStatus::Fail;

        let result = db.upsert_record(&record).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(db.count_records().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_document_matches_record_encoding() {
        let db = GeoDb::open_in_memory().await.unwrap();
        let record = make_record("1.1.1.1", "Australia");
        db.upsert_record(&record).await.unwrap();

        let doc = db.get_document("1.1.1.1").await.unwrap().unwrap();
        assert_eq!(doc.into_bytes(), record.to_document().unwrap());
    }

    #[tokio::test]
    async fn test_purge_fetched_before() {
        let db = GeoDb::open_in_memory().await.unwrap();
        let mut stale = make_record("1.1.1.1", "Australia");
        stale.fetched_at = Some(Utc::now() - Duration::days(40));
        db.upsert_record(&stale).await.unwrap();
        db.upsert_record(&make_record("8.8.8.8", "United States")).await.unwrap();

        let deleted = db.purge_fetched_before(Utc::now() - Duration::days(30)).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get_record("1.1.1.1").await.unwrap().is_none());
        assert!(db.get_record("8.8.8.8").await.unwrap().is_some());
    }
}
