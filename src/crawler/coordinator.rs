//! Harvest coordinator - main orchestration logic
//!
//! This module runs one harvest over a set of input URLs:
//! - Partitioning the input into listing and detail URLs
//! - Applying robots.txt rules and crawl delay
//! - Expanding every listing under bounded concurrency
//! - Extracting every detail URL with retry and backoff
//! - Merging results into a [`CrawlState`] as tasks complete

use crate::config::Config;
use crate::crawler::expander::{ExpansionOutcome, ExpansionSettings, ListingExpander};
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::page::PageRenderer;
use crate::crawler::scheduler::{RetryPolicy, Scheduler};
use crate::extract::{Extraction, ExtractionChain, RecordContext};
use crate::record::category_label;
use crate::robots::{fetch_robots, RobotsPolicy};
use crate::state::{CrawlState, DiscoveryMetadata};
use crate::url::{SiteScope, UrlClassifier};
use crate::HarvestError;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::task::JoinSet;
use url::Url;

/// Everything one harvest produced
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub state: CrawlState,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl HarvestReport {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Main harvest coordinator
pub struct Harvester {
    config: Arc<Config>,
    classifier: Arc<UrlClassifier>,
    fetcher: Arc<dyn PageFetcher>,
    renderer: Option<Arc<dyn PageRenderer>>,
}

impl Harvester {
    /// Creates a harvester
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `fetcher` - Static transport
    /// * `renderer` - Headless browser, or `None` for a static-only run
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Ready to run
    /// * `Err(HarvestError)` - The configured base URL is unusable
    pub fn new(
        config: Config,
        fetcher: Arc<dyn PageFetcher>,
        renderer: Option<Arc<dyn PageRenderer>>,
    ) -> Result<Self, HarvestError> {
        let scope = SiteScope::parse(&config.site.base_url)?;
        let classifier = UrlClassifier::new(scope)?;

        Ok(Self {
            config: Arc::new(config),
            classifier: Arc::new(classifier),
            fetcher,
            renderer,
        })
    }

    pub fn classifier(&self) -> &UrlClassifier {
        &self.classifier
    }

    /// Runs a complete harvest
    ///
    /// Per-URL failures are recorded in the report; they never abort the
    /// run.
    ///
    /// # Arguments
    ///
    /// * `input` - URLs from the input file
    /// * `seed_listings` - Additional listing URLs, e.g. from the sitemap
    pub async fn run(&self, input: &[Url], seed_listings: BTreeSet<Url>) -> HarvestReport {
        let started_at = Utc::now();
        let mut state = CrawlState::new();
        state.input_urls = input.iter().map(|u| u.to_string()).collect();

        tracing::info!("Starting harvest of {} input URLs", input.len());

        let robots = self.load_robots().await;
        let crawl_delay = robots.crawl_delay();
        if let Some(delay) = crawl_delay {
            tracing::info!("robots.txt requests a crawl delay of {}s", delay);
        }

        let partition = self.classifier.partition(input);
        state.counters.ambiguous_urls = partition.ambiguous.len() as u64;
        if !partition.unclassified.is_empty() {
            tracing::info!(
                "Ignoring {} input URLs that are neither listings nor products",
                partition.unclassified.len()
            );
        }

        let listings = self.allowed(
            partition.listings.into_iter().chain(seed_listings),
            &robots,
            &mut state,
        );
        let details = self.allowed(partition.details.into_iter(), &robots, &mut state);
        state.listing_urls = listings.iter().map(|u| u.to_string()).collect();
        state.detail_urls = details.iter().map(|u| u.to_string()).collect();

        let base = Scheduler::new(
            self.config.crawler.concurrency as usize,
            self.config.crawler.expansion_delay(),
        );
        let expansion_scheduler = base.respecting_crawl_delay(crawl_delay);
        let extraction_scheduler = base
            .with_pacing(self.config.crawler.politeness_delay())
            .respecting_crawl_delay(crawl_delay);

        self.expand_listings(listings, expansion_scheduler, &robots, &mut state)
            .await;

        let targets: BTreeSet<Url> = state
            .detail_urls
            .iter()
            .filter_map(|u| Url::parse(u).ok())
            .collect();
        self.extract_details(targets, extraction_scheduler, &mut state)
            .await;

        let finished_at = Utc::now();
        tracing::info!(
            "Harvest complete: {} attempted, {} succeeded, {} failed",
            state.attempted(),
            state.succeeded(),
            state.failed()
        );

        HarvestReport {
            state,
            started_at,
            finished_at,
        }
    }

    async fn load_robots(&self) -> RobotsPolicy {
        let agent = self.config.user_agent.crawler_name.as_str();
        if !self.config.crawler.respect_robots {
            return RobotsPolicy::allow_all(agent);
        }
        fetch_robots(self.fetcher.as_ref(), self.classifier.scope(), agent).await
    }

    /// Drops URLs robots.txt disallows, counting them
    fn allowed(
        &self,
        urls: impl Iterator<Item = Url>,
        robots: &RobotsPolicy,
        state: &mut CrawlState,
    ) -> BTreeSet<Url> {
        let mut kept = BTreeSet::new();
        for url in urls {
            if robots.is_allowed(&url) {
                kept.insert(url);
            } else {
                tracing::debug!("Skipping {} (disallowed by robots.txt)", url);
                state.counters.skipped_by_robots += 1;
            }
        }
        kept
    }

    async fn expand_listings(
        &self,
        listings: BTreeSet<Url>,
        scheduler: Scheduler,
        robots: &RobotsPolicy,
        state: &mut CrawlState,
    ) {
        if listings.is_empty() {
            return;
        }
        tracing::info!("Expanding {} listing pages", listings.len());

        let expander = Arc::new(ListingExpander::new(
            Arc::clone(&self.classifier),
            Arc::clone(&self.fetcher),
            self.renderer.clone(),
            ExpansionSettings::from_config(&self.config),
        ));

        let mut tasks = JoinSet::new();
        for listing in listings {
            let expander = Arc::clone(&expander);
            let scheduler = scheduler.clone();
            tasks.spawn(async move {
                let outcome = scheduler.run(expander.expand(&listing)).await;
                (listing, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((listing, Some(Ok(outcome)))) => {
                    self.merge_expansion(&listing, outcome, robots, state)
                }
                Ok((listing, Some(Err(e)))) => {
                    tracing::warn!("Failed to expand listing {}: {}", listing, e);
                    state.counters.listings_failed += 1;
                }
                Ok((listing, None)) => {
                    tracing::warn!("Listing {} was never scheduled", listing);
                    state.counters.listings_failed += 1;
                }
                Err(e) => {
                    tracing::error!("Listing task panicked: {}", e);
                    state.counters.listings_failed += 1;
                }
            }
        }
    }

    fn merge_expansion(
        &self,
        listing: &Url,
        outcome: ExpansionOutcome,
        robots: &RobotsPolicy,
        state: &mut CrawlState,
    ) {
        let category = self
            .classifier
            .scope()
            .category_segment(listing)
            .map(|s| category_label(&s));
        let metadata =
            DiscoveryMetadata::new(listing.as_str(), outcome.method).with_category(category);

        let urls = self.allowed(outcome.urls.into_iter(), robots, state);
        state.record_discovery(urls.iter(), &metadata);
        if outcome.thin {
            state.counters.thin_listings += 1;
        }
        state.counters.ambiguous_urls += outcome.ambiguous.len() as u64;
    }

    async fn extract_details(
        &self,
        targets: BTreeSet<Url>,
        scheduler: Scheduler,
        state: &mut CrawlState,
    ) {
        if targets.is_empty() {
            return;
        }
        tracing::info!("Extracting {} detail pages", targets.len());

        let chain = Arc::new(ExtractionChain::new(
            self.classifier.scope().clone(),
            Arc::clone(&self.fetcher),
            self.renderer.clone(),
            RecordContext::from_config(&self.config),
            self.config.browser.intercept_payloads,
        ));
        let policy = RetryPolicy::from_config(&self.config.crawler);

        let mut tasks = JoinSet::new();
        let mut in_flight = HashMap::new();
        for url in targets {
            let chain = Arc::clone(&chain);
            let scheduler = scheduler.clone();
            let task_url = url.clone();
            let handle = tasks.spawn(async move {
                let (result, retries) =
                    extract_with_retry(&chain, &scheduler, policy, &task_url).await;
                (task_url, result, retries)
            });
            in_flight.insert(handle.id(), url);
        }

        let mut completed = 0usize;
        while let Some(joined) = tasks.join_next_with_id().await {
            let (url, result, retries) = match joined {
                Ok((id, done)) => {
                    in_flight.remove(&id);
                    done
                }
                Err(e) => {
                    // Panicked tasks still land in the failure list
                    if let Some(url) = in_flight.remove(&e.id()) {
                        tracing::error!("Extraction task for {} panicked: {}", url, e);
                        state.record_failure(url.as_str());
                    } else {
                        tracing::error!("Extraction task panicked: {}", e);
                    }
                    continue;
                }
            };
            state.counters.retries += u64::from(retries);

            match result {
                Ok(extraction) => {
                    tracing::debug!("Extracted {} via {}", url, extraction.strategy);
                    state.record_success(extraction.record, extraction.strategy);
                }
                Err(e) => {
                    tracing::warn!("Giving up on {}: {}", url, e);
                    state.record_failure(url.as_str());
                }
            }

            completed += 1;
            if completed % 25 == 0 {
                tracing::info!(
                    "Progress: {} extracted, {} succeeded, {} failed",
                    completed,
                    state.succeeded(),
                    state.failed()
                );
            }
        }
    }
}

/// Extracts one URL, retrying transport failures with backoff
///
/// The backoff sleep happens outside the concurrency slot.
///
/// # Returns
///
/// The final result and the number of retries taken
async fn extract_with_retry(
    chain: &ExtractionChain,
    scheduler: &Scheduler,
    policy: RetryPolicy,
    url: &Url,
) -> (Result<Extraction, HarvestError>, u32) {
    let mut attempt = 1;
    loop {
        let result = scheduler
            .run(chain.extract(url))
            .await
            .unwrap_or_else(|| {
                Err(HarvestError::Transport {
                    url: url.to_string(),
                    message: "scheduler closed".to_string(),
                })
            });

        match result {
            Err(e) if e.is_retryable() && policy.should_retry(attempt) => {
                let delay = policy.delay(attempt);
                tracing::debug!(
                    "Attempt {} for {} failed ({}), retrying in {:?}",
                    attempt,
                    url,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return (other, attempt - 1),
        }
    }
}
