use crate::extract::ExtractionStrategy;
use crate::record::ProductRecord;
use crate::state::DiscoveryMetadata;
use std::collections::{BTreeMap, BTreeSet};
use url::Url;

/// Counters that do not correspond to a URL set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub listings_expanded: u64,
    pub listings_failed: u64,
    /// Major listings that yielded fewer products than expected
    pub thin_listings: u64,
    pub retries: u64,
    pub skipped_by_robots: u64,
    pub ambiguous_urls: u64,
    pub by_strategy: BTreeMap<ExtractionStrategy, u64>,
}

/// Run-scoped aggregate of everything the harvest has learned
///
/// Owned by the coordinator and mutated only as tasks complete. All
/// collections are ordered so output is deterministic. A URL is never in
/// both `records` and `failed_urls`.
#[derive(Debug, Clone, Default)]
pub struct CrawlState {
    pub input_urls: BTreeSet<String>,
    pub listing_urls: BTreeSet<String>,
    /// Every detail URL scheduled for extraction
    pub detail_urls: BTreeSet<String>,
    /// Detail URLs found by listing expansion
    pub discovered_urls: BTreeSet<String>,
    pub records: BTreeMap<String, ProductRecord>,
    pub failed_urls: BTreeSet<String>,
    pub metadata: BTreeMap<String, DiscoveryMetadata>,
    pub counters: RunCounters,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges the output of one listing expansion
    ///
    /// Metadata is last-writer-wins for URLs several listings point to.
    pub fn record_discovery<'a, I>(&mut self, urls: I, metadata: &DiscoveryMetadata)
    where
        I: IntoIterator<Item = &'a Url>,
    {
        for url in urls {
            let key = url.as_str().to_string();
            self.discovered_urls.insert(key.clone());
            self.detail_urls.insert(key.clone());
            self.metadata.insert(key, metadata.clone());
        }
        self.counters.listings_expanded += 1;
    }

    pub fn record_success(&mut self, record: ProductRecord, strategy: ExtractionStrategy) {
        self.failed_urls.remove(&record.url);
        *self.counters.by_strategy.entry(strategy).or_insert(0) += 1;
        self.records.insert(record.url.clone(), record);
    }

    pub fn record_failure(&mut self, url: &str) {
        if !self.records.contains_key(url) {
            self.failed_urls.insert(url.to_string());
        }
    }

    /// Detail URLs that were scheduled
    pub fn attempted(&self) -> usize {
        self.detail_urls.len()
    }

    pub fn succeeded(&self) -> usize {
        self.records.len()
    }

    pub fn failed(&self) -> usize {
        self.failed_urls.len()
    }

    /// Records in URL order
    pub fn records(&self) -> impl Iterator<Item = &ProductRecord> {
        self.records.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DiscoveryMethod;

    fn record(url: &str) -> ProductRecord {
        ProductRecord::new(url, "Galaxy S24", "Samsung", "GBP").unwrap()
    }

    #[test]
    fn test_discovery_is_deduplicated() {
        let mut state = CrawlState::new();
        let a = Url::parse("https://www.samsung.com/uk/tvs/oled-tv/qe65s95datxxu/").unwrap();
        let b = Url::parse("https://www.samsung.com/uk/tvs/qled-tv/qe55q80catxxu/").unwrap();

        let first = DiscoveryMetadata::new("https://www.samsung.com/uk/tvs/all-tvs/", DiscoveryMethod::DynamicExpansion);
        let second = DiscoveryMetadata::new("https://www.samsung.com/uk/tvs/oled-tv/", DiscoveryMethod::StaticListing);

        state.record_discovery([&a, &b], &first);
        state.record_discovery([&a], &second);

        assert_eq!(state.discovered_urls.len(), 2);
        assert_eq!(state.counters.listings_expanded, 2);
        // Last writer wins
        assert_eq!(
            state.metadata[a.as_str()].source_listing_url,
            "https://www.samsung.com/uk/tvs/oled-tv/"
        );
        assert_eq!(state.metadata[a.as_str()].method, DiscoveryMethod::StaticListing);
    }

    #[test]
    fn test_success_and_failure_are_disjoint() {
        let mut state = CrawlState::new();
        state.record_failure("https://x/a/");
        state.record_success(record("https://x/a/"), ExtractionStrategy::StaticStructuredData);
        state.record_failure("https://x/a/");

        assert_eq!(state.succeeded(), 1);
        assert_eq!(state.failed(), 0);
        assert_eq!(
            state.counters.by_strategy[&ExtractionStrategy::StaticStructuredData],
            1
        );
    }

    #[test]
    fn test_one_record_per_url() {
        let mut state = CrawlState::new();
        state.record_success(record("https://x/a/"), ExtractionStrategy::StaticHeuristic);
        state.record_success(record("https://x/a/"), ExtractionStrategy::StaticHeuristic);
        assert_eq!(state.records().count(), 1);
    }
}
