//! Database schema for extracted page records

/// SQL schema for the output database
pub const SCHEMA_SQL: &str = r#"
-- One row per successfully processed page
CREATE TABLE IF NOT EXISTS page_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    final_url TEXT NOT NULL,
    status_code INTEGER NOT NULL,
    title TEXT,
    description TEXT,
    fetched_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_page_records_url ON page_records(url);

-- Images embedded in a page, in document order
CREATE TABLE IF NOT EXISTS page_images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    record_id INTEGER NOT NULL REFERENCES page_records(id),
    position INTEGER NOT NULL,
    image_url TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_page_images_record ON page_images(record_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
