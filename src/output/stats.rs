//! Run summary
//!
//! Counts only. Error text stays in the logs.

use crate::crawler::HarvestReport;
use crate::extract::ExtractionStrategy;
use std::collections::BTreeMap;

/// Harvest statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct RunStats {
    /// Detail URLs scheduled for extraction
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,

    pub listings_expanded: u64,
    pub listings_failed: u64,
    pub thin_listings: u64,

    /// Detail URLs found by listing expansion
    pub discovered: usize,

    /// Successes by the strategy that produced them
    pub by_strategy: BTreeMap<ExtractionStrategy, u64>,

    pub retries: u64,
    pub skipped_by_robots: u64,
    pub ambiguous_urls: u64,

    pub runtime_secs: f64,
}

impl RunStats {
    pub fn from_report(report: &HarvestReport) -> Self {
        let state = &report.state;
        let counters = &state.counters;
        Self {
            attempted: state.attempted(),
            succeeded: state.succeeded(),
            failed: state.failed(),
            listings_expanded: counters.listings_expanded,
            listings_failed: counters.listings_failed,
            thin_listings: counters.thin_listings,
            discovered: state.discovered_urls.len(),
            by_strategy: counters.by_strategy.clone(),
            retries: counters.retries,
            skipped_by_robots: counters.skipped_by_robots,
            ambiguous_urls: counters.ambiguous_urls,
            runtime_secs: report.elapsed().num_milliseconds().max(0) as f64 / 1000.0,
        }
    }

    /// Share of attempted URLs that produced a record, in percent
    pub fn success_rate(&self) -> f64 {
        if self.attempted > 0 {
            (self.succeeded as f64 / self.attempted as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Prints the run summary to stdout
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_summary(stats: &RunStats) {
    println!("=== Harvest Summary ===\n");

    println!("Overview:");
    println!("  Attempted: {}", stats.attempted);
    println!("  Succeeded: {}", stats.succeeded);
    println!("  Failed: {}", stats.failed);
    println!("  Runtime: {:.1}s", stats.runtime_secs);
    println!();

    println!("Discovery:");
    println!("  Listings expanded: {}", stats.listings_expanded);
    println!("  Listings failed: {}", stats.listings_failed);
    println!("  Thin listings: {}", stats.thin_listings);
    println!("  URLs discovered: {}", stats.discovered);
    println!();

    if !stats.by_strategy.is_empty() {
        println!("Records by Strategy:");
        for (strategy, count) in &stats.by_strategy {
            println!("  {}: {}", strategy, count);
        }
        println!();
    }

    println!("Politeness:");
    println!("  Retries: {}", stats.retries);
    println!("  Skipped by robots.txt: {}", stats.skipped_by_robots);
    println!("  Ambiguous classifications: {}", stats.ambiguous_urls);
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} detail pages)",
        stats.success_rate(),
        stats.succeeded,
        stats.attempted
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ProductRecord;
    use crate::state::CrawlState;
    use chrono::{Duration, Utc};

    #[test]
    fn test_stats_from_report() {
        let mut state = CrawlState::new();
        for url in ["https://x/uk/a/", "https://x/uk/b/", "https://x/uk/c/", "https://x/uk/d/"] {
            state.detail_urls.insert(url.to_string());
        }
        state.discovered_urls.insert("https://x/uk/a/".to_string());
        state.record_success(
            ProductRecord::new("https://x/uk/a/", "A", "Samsung", "GBP").unwrap(),
            ExtractionStrategy::StaticStructuredData,
        );
        state.record_success(
            ProductRecord::new("https://x/uk/b/", "B", "Samsung", "GBP").unwrap(),
            ExtractionStrategy::RenderedHeuristic,
        );
        state.record_success(
            ProductRecord::new("https://x/uk/c/", "C", "Samsung", "GBP").unwrap(),
            ExtractionStrategy::StaticStructuredData,
        );
        state.record_failure("https://x/uk/d/");
        state.counters.retries = 2;

        let started_at = Utc::now();
        let report = HarvestReport {
            state,
            started_at,
            finished_at: started_at + Duration::milliseconds(2500),
        };

        let stats = RunStats::from_report(&report);
        assert_eq!(stats.attempted, 4);
        assert_eq!(stats.succeeded, 3);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.discovered, 1);
        assert_eq!(stats.retries, 2);
        assert_eq!(stats.by_strategy[&ExtractionStrategy::StaticStructuredData], 2);
        assert_eq!(stats.by_strategy[&ExtractionStrategy::RenderedHeuristic], 1);
        assert_eq!(stats.runtime_secs, 2.5);
        assert_eq!(stats.success_rate(), 75.0);
    }

    #[test]
    fn test_empty_run_rate() {
        let report = HarvestReport {
            state: CrawlState::new(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };
        assert_eq!(RunStats::from_report(&report).success_rate(), 0.0);
    }
}
