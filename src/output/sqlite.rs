//! SQLite sink for [`PageRecord`]s
//!
//! Each batch is written inside one transaction, so a failed `consume` leaves
//! nothing behind and the page can be retried cleanly.

use crate::output::schema::initialize_schema;
use crate::output::traits::{Sink, SinkResult};
use crate::source::PageRecord;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// SQLite-backed record sink
///
/// The connection is shared by all workers behind a mutex.
pub struct SqliteSink {
    conn: Mutex<Connection>,
}

impl SqliteSink {
    /// Opens (or creates) the output database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteSink)` - Successfully opened/created database
    /// * `Err(rusqlite::Error)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Returns the number of stored page records
    pub fn count_records(&self) -> Result<u64, rusqlite::Error> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM page_records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Returns the number of stored image URLs
    pub fn count_images(&self) -> Result<u64, rusqlite::Error> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM page_images", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl Sink<PageRecord> for SqliteSink {
    fn consume(&self, records: &[PageRecord]) -> SinkResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = conn.transaction()?;

        for record in records {
            tx.execute(
                "INSERT INTO page_records (url, final_url, status_code, title, description, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.url,
                    record.final_url,
                    record.status_code,
                    record.title,
                    record.description,
                    record.fetched_at.to_rfc3339(),
                ],
            )?;
            let record_id = tx.last_insert_rowid();

            for (position, image) in record.images.iter().enumerate() {
                tx.execute(
                    "INSERT INTO page_images (record_id, position, image_url) VALUES (?1, ?2, ?3)",
                    params![record_id, position as i64, image],
                )?;
            }
        }

        tx.commit()?;
        tracing::debug!("Stored {} page record(s)", records.len());
        Ok(())
    }
}
