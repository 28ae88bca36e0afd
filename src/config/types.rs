use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for the harvester
///
/// Every section and key is optional; missing values fall back to the
/// defaults below, so `Config::default()` is a complete configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub site: SiteConfig,
    pub browser: BrowserConfig,
    pub output: OutputConfig,
}

/// Concurrency, pacing, and retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of listing expansions or extractions in flight
    pub concurrency: u32,

    /// Delay after each completed extraction (milliseconds)
    pub politeness_delay_ms: u64,

    /// Delay after each completed listing expansion (milliseconds)
    pub expansion_delay_ms: u64,

    /// Attempts per detail URL, counting the first
    pub max_attempts: u32,

    /// First retry delay (milliseconds); doubles per attempt
    pub backoff_base_ms: u64,

    /// Upper bound on any single retry delay (milliseconds)
    pub backoff_max_ms: u64,

    /// Honour robots.txt disallow rules and crawl-delay
    pub respect_robots: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            politeness_delay_ms: 500,
            expansion_delay_ms: 2000,
            max_attempts: 3,
            backoff_base_ms: 2000,
            backoff_max_ms: 8000,
            respect_robots: true,
        }
    }
}

impl CrawlerConfig {
    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }

    pub fn expansion_delay(&self) -> Duration {
        Duration::from_millis(self.expansion_delay_ms)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,

    /// Email address for crawler-related contact
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "CatalogHarvester".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/catalog-harvester".to_string(),
            contact_email: "harvester@example.com".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Target site and record normalization settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Root of the regional site namespace, e.g. `https://www.samsung.com/uk/`
    pub base_url: String,

    /// Brand written onto every record
    pub brand: String,

    /// Currency used when structured data does not state one
    pub currency: String,

    /// Maximum description length in characters
    pub description_limit: usize,

    /// Sitemap page relative to `base_url`, used by `--sitemap`
    pub sitemap_path: String,

    /// Listing roots (relative to `base_url`) always added by `--sitemap`
    pub fallback_listings: Vec<String>,

    /// Listing URL fragments that enable the remediation control tier
    pub remediation_markers: Vec<String>,

    /// Listing URL fragments expected to yield many products
    pub major_listing_markers: Vec<String>,

    /// Product count below which a major listing is reported as thin
    pub min_expected_products: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            base_url: "https://www.samsung.com/uk/".to_string(),
            brand: "Samsung".to_string(),
            currency: "GBP".to_string(),
            description_limit: 500,
            sitemap_path: "info/sitemap/".to_string(),
            fallback_listings: strings(&[
                "smartphones/all-smartphones/",
                "tablets/all-tablets/",
                "watches/all-watches/",
                "tvs/all-tvs/",
                "monitors/all-monitors/",
                "audio-sound/all-audio-sound/",
                "refrigerators/all-refrigerators/",
                "washers-and-dryers/all-washers-and-dryers/",
                "vacuum-cleaners/all-vacuum-cleaners/",
                "dishwashers/all-dishwashers/",
                "cooking-appliances/all-microwave-ovens/",
                "computers/all-computers/",
                "projectors/all-projectors/",
            ]),
            remediation_markers: strings(&["galaxy-z", "all-computers"]),
            major_listing_markers: strings(&[
                "galaxy-s",
                "galaxy-a",
                "galaxy-z",
                "all-smartphones",
                "all-computers",
                "all-tablets",
                "tvs/",
                "monitors/",
                "audio",
                "soundbar",
                "galaxy-buds",
                "galaxy-book",
            ]),
            min_expected_products: 10,
        }
    }
}

/// Headless browser settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BrowserConfig {
    /// Launch a browser at all; when false every fetch is static
    pub enabled: bool,

    pub headless: bool,

    /// Explicit Chrome/Chromium binary; searched for when absent
    pub chrome_executable: Option<PathBuf>,

    /// Primary navigation timeout (seconds)
    pub navigation_timeout_secs: u64,

    /// Best-effort navigation timeout after the primary one expires (seconds)
    pub fallback_timeout_secs: u64,

    /// Wait after navigation before touching the DOM (milliseconds)
    pub initial_settle_ms: u64,

    /// Wait after each scroll (milliseconds)
    pub scroll_settle_ms: u64,

    /// Wait after clicking a load-more control (milliseconds)
    pub click_settle_ms: u64,

    /// Longer wait after clicking a product-finder control (milliseconds)
    pub finder_click_settle_ms: u64,

    /// Scroll iterations per lazy-load pass
    pub max_scroll_iterations: u32,

    /// Total load-more clicks per listing
    pub max_load_more_attempts: u32,

    /// Capture JSON responses while rendering detail pages
    pub intercept_payloads: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            headless: true,
            chrome_executable: None,
            navigation_timeout_secs: 30,
            fallback_timeout_secs: 15,
            initial_settle_ms: 2000,
            scroll_settle_ms: 1000,
            click_settle_ms: 3000,
            finder_click_settle_ms: 5000,
            max_scroll_iterations: 5,
            max_load_more_attempts: 15,
            intercept_payloads: true,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory all artifacts are written into
    pub directory: PathBuf,

    pub records_file: String,

    pub snapshot_file: String,

    pub failures_file: String,

    pub metadata_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            records_file: "products.ndjson".to_string(),
            snapshot_file: "products.sqlite".to_string(),
            failures_file: "failed_urls.txt".to_string(),
            metadata_file: "discovery_metadata.json".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn records_path(&self) -> PathBuf {
        self.directory.join(&self.records_file)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.directory.join(&self.snapshot_file)
    }

    pub fn failures_path(&self) -> PathBuf {
        self.directory.join(&self.failures_file)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.directory.join(&self.metadata_file)
    }
}
