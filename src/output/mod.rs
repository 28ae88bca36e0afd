//! Output module for persisting harvest results
//!
//! This module handles:
//! - Writing records as NDJSON and as a SQLite snapshot
//! - Writing the failure list and discovery metadata
//! - Printing the run summary

mod files;
mod schema;
mod snapshot;
pub mod stats;

pub use files::{write_failures, write_metadata, write_records};
pub use schema::{initialize_schema, SCHEMA_SQL};
pub use snapshot::write_snapshot;
pub use stats::{print_summary, RunStats};

use crate::config::OutputConfig;
use crate::crawler::HarvestReport;
use crate::HarvestError;

/// Writes every output artifact of a run
///
/// Creates the output directory if needed. Existing files are replaced.
/// Each artifact is written even if an earlier one failed; the first error
/// is returned.
///
/// # Arguments
///
/// * `config` - Output locations
/// * `report` - The finished harvest
/// * `config_hash` - Recorded in the snapshot's run row
pub fn write_outputs(
    config: &OutputConfig,
    report: &HarvestReport,
    config_hash: &str,
) -> Result<(), HarvestError> {
    std::fs::create_dir_all(&config.directory)?;
    let state = &report.state;
    let mut first_error = None;
    let mut check = |artifact: &str, result: Result<(), HarvestError>| {
        if let Err(e) = result {
            tracing::error!("Failed to write {}: {}", artifact, e);
            if first_error.is_none() {
                first_error = Some(e);
            }
        }
    };

    let records_path = config.records_path();
    check(
        "records",
        write_records(&records_path, state.records()).map(|written| {
            tracing::info!("Wrote {} records to {}", written, records_path.display());
        }),
    );

    check(
        "snapshot",
        write_snapshot(&config.snapshot_path(), report, config_hash),
    );

    let failures_path = config.failures_path();
    check("failure list", write_failures(&failures_path, &state.failed_urls));
    if !state.failed_urls.is_empty() {
        tracing::info!(
            "Wrote {} failed URLs to {}",
            state.failed_urls.len(),
            failures_path.display()
        );
    }

    check(
        "discovery metadata",
        write_metadata(&config.metadata_path(), &state.metadata),
    );

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractionStrategy;
    use crate::record::ProductRecord;
    use crate::state::CrawlState;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_write_outputs_creates_all_files() {
        let dir = TempDir::new().unwrap();
        let config = OutputConfig {
            directory: dir.path().join("nested/out"),
            ..OutputConfig::default()
        };

        let mut state = CrawlState::new();
        state.detail_urls.insert("https://x/uk/a/".to_string());
        state.record_success(
            ProductRecord::new("https://x/uk/a/", "A", "Samsung", "GBP").unwrap(),
            ExtractionStrategy::StaticHeuristic,
        );
        let report = HarvestReport {
            state,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };

        write_outputs(&config, &report, "defaults").unwrap();

        assert!(config.records_path().exists());
        assert!(config.snapshot_path().exists());
        assert!(config.failures_path().exists());
        assert!(config.metadata_path().exists());
        assert_eq!(
            std::fs::read_to_string(config.metadata_path()).unwrap().trim(),
            "{}"
        );
    }

    #[test]
    fn test_snapshot_failure_does_not_block_other_outputs() {
        let dir = TempDir::new().unwrap();
        let config = OutputConfig {
            directory: dir.path().to_path_buf(),
            ..OutputConfig::default()
        };
        // A directory where the snapshot file should go cannot be replaced
        std::fs::create_dir_all(config.snapshot_path().join("occupied")).unwrap();

        let mut state = CrawlState::new();
        state.detail_urls.insert("https://x/uk/a/".to_string());
        state.record_failure("https://x/uk/a/");
        let report = HarvestReport {
            state,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };

        let result = write_outputs(&config, &report, "defaults");

        assert!(matches!(result, Err(HarvestError::Io(_))));
        assert!(config.records_path().exists());
        assert_eq!(
            std::fs::read_to_string(config.failures_path()).unwrap(),
            "https://x/uk/a/\n"
        );
        assert!(config.metadata_path().exists());
    }
}
