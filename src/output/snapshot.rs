//! SQLite snapshot of the harvested records
//!
//! The snapshot is rewritten on every run so it always mirrors the NDJSON
//! output of the same run.

use crate::crawler::HarvestReport;
use crate::output::schema::initialize_schema;
use crate::record::ProductRecord;
use crate::HarvestError;
use rusqlite::{params, Connection};
use std::path::Path;

/// Writes records and run provenance to a fresh SQLite file
///
/// # Arguments
///
/// * `path` - Snapshot file; replaced if it exists
/// * `report` - The finished harvest
/// * `config_hash` - Hash of the configuration the run used
pub fn write_snapshot(
    path: &Path,
    report: &HarvestReport,
    config_hash: &str,
) -> Result<(), HarvestError> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }

    let mut conn = Connection::open(path)?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = DELETE;
        PRAGMA synchronous = NORMAL;
    ",
    )?;
    initialize_schema(&conn)?;

    let tx = conn.transaction()?;
    {
        let mut insert = tx.prepare(
            "INSERT INTO products (url, name, sku, model_code, category, sub_category, price,
                currency, availability, image_url, description, brand, extraction_timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )?;
        for record in report.state.records() {
            insert_record(&mut insert, record)?;
        }
    }

    let state = &report.state;
    tx.execute(
        "INSERT INTO runs (started_at, finished_at, config_hash, attempted, succeeded, failed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            report.started_at.to_rfc3339(),
            report.finished_at.to_rfc3339(),
            config_hash,
            state.attempted() as i64,
            state.succeeded() as i64,
            state.failed() as i64,
        ],
    )?;
    tx.commit()?;

    tracing::debug!(
        "Wrote {} records to snapshot {}",
        state.succeeded(),
        path.display()
    );
    Ok(())
}

fn insert_record(
    insert: &mut rusqlite::Statement<'_>,
    record: &ProductRecord,
) -> Result<(), rusqlite::Error> {
    let availability = record
        .availability
        .and_then(|a| serde_json::to_value(a).ok())
        .and_then(|v| v.as_str().map(str::to_string));

    insert.execute(params![
        record.url,
        record.name,
        record.sku,
        record.model_code,
        record.category,
        record.sub_category,
        record.price,
        record.currency,
        availability,
        record.image_url,
        record.description,
        record.brand,
        record.extraction_timestamp.to_rfc3339(),
    ])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractionStrategy;
    use crate::record::Availability;
    use crate::state::CrawlState;
    use chrono::Utc;
    use tempfile::TempDir;

    fn report() -> HarvestReport {
        let mut state = CrawlState::new();
        let mut record = ProductRecord::new(
            "https://www.samsung.com/uk/tvs/qled-tv/qe55q80catxxu/",
            "55\" Q80C QLED",
            "Samsung",
            "GBP",
        )
        .unwrap();
        record.set_price(Some(899.0));
        record.availability = Some(Availability::InStock);
        state.detail_urls.insert(record.url.clone());
        state.detail_urls.insert("https://www.samsung.com/uk/tvs/qled-tv/x/".to_string());
        state.record_success(record, ExtractionStrategy::StaticStructuredData);
        state.record_failure("https://www.samsung.com/uk/tvs/qled-tv/x/");

        HarvestReport {
            state,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn test_snapshot_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("products.sqlite");
        write_snapshot(&path, &report(), "abc123").unwrap();

        let conn = Connection::open(&path).unwrap();
        let (name, price, availability): (String, f64, String) = conn
            .query_row(
                "SELECT name, price, availability FROM products",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(name, "55\" Q80C QLED");
        assert_eq!(price, 899.0);
        assert_eq!(availability, "in_stock");

        let (hash, succeeded, failed): (String, i64, i64) = conn
            .query_row("SELECT config_hash, succeeded, failed FROM runs", [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .unwrap();
        assert_eq!(hash, "abc123");
        assert_eq!(succeeded, 1);
        assert_eq!(failed, 1);
    }

    #[test]
    fn test_snapshot_is_rewritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("products.sqlite");
        write_snapshot(&path, &report(), "first").unwrap();
        write_snapshot(&path, &report(), "second").unwrap();

        let conn = Connection::open(&path).unwrap();
        let runs: i64 = conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))
            .unwrap();
        let products: i64 = conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
            .unwrap();
        assert_eq!(runs, 1);
        assert_eq!(products, 1);
    }
}
