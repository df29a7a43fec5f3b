//! Durable store schema setup.
//!
//! The applied schema version lives in SQLite's `user_version` pragma. Each
//! pending step runs in its own transaction together with the version bump.
//! Afterwards the `geo_records` columns are checked, so a file written by an
//! incompatible build is refused at open time instead of failing on first read.

use crate::Error;
use tokio_rusqlite::{Connection, rusqlite};

/// Schema steps; step `n` brings the database to `user_version = n + 1`.
const SCHEMA_STEPS: &[&str] = &[include_str!("../../migrations/001_geo_records.sql")];

/// Columns the record queries read and write.
const GEO_RECORD_COLUMNS: &[&str] = &["ip", "status", "document", "fetched_at", "updated_at"];

/// Bring the schema up to date and verify the record table.
///
/// # Errors
///
/// Returns `Error::MigrationFailed` if the database is newer than this build
/// or `geo_records` lacks a required column, and `Error::Database` if a step
/// fails to execute.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        let current = schema_version(conn)?;
        let latest = SCHEMA_STEPS.len() as i64;
        if current > latest {
            return Err(Error::MigrationFailed(format!(
                "database schema version {current} is newer than supported version {latest}"
            )));
        }

        for (version, sql) in (1..).zip(SCHEMA_STEPS).skip(current as usize) {
            let tx = conn.transaction()?;
            tx.execute_batch(sql)?;
            tx.pragma_update(None, "user_version", version)?;
            tx.commit()?;
            tracing::info!(version, "durable store schema upgraded");
        }

        check_geo_records(conn)
    })
    .await
    .map_err(Error::from)
}

fn schema_version(conn: &rusqlite::Connection) -> Result<i64, Error> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

fn check_geo_records(conn: &rusqlite::Connection) -> Result<(), Error> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('geo_records')")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let missing: Vec<&str> = GEO_RECORD_COLUMNS
        .iter()
        .copied()
        .filter(|wanted| !columns.iter().any(|have| have == wanted))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MigrationFailed(format!("geo_records is missing columns: {}", missing.join(", "))))
    }
}
