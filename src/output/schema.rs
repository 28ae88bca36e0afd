//! Snapshot database schema
//!
//! One column per record field, plus a row per run.

/// SQL schema for the snapshot database
pub const SCHEMA_SQL: &str = r#"
-- One row per extracted product
CREATE TABLE IF NOT EXISTS products (
    url TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    sku TEXT,
    model_code TEXT,
    category TEXT,
    sub_category TEXT,
    price REAL,
    currency TEXT NOT NULL,
    availability TEXT,
    image_url TEXT,
    description TEXT,
    brand TEXT NOT NULL,
    extraction_timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_products_category ON products(category);

-- Run provenance
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    attempted INTEGER NOT NULL,
    succeeded INTEGER NOT NULL,
    failed INTEGER NOT NULL
);
"#;

/// Initializes the snapshot schema
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
