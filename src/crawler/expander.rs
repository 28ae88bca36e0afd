//! Listing expansion
//!
//! Turns one listing URL into the set of detail URLs it exposes. In the
//! browser the listing is scrolled until lazy loading stops and then paginated
//! through "load more" controls until the product count stops growing. Without
//! a browser the static HTML's anchors are used instead.
//!
//! # Termination
//!
//! Every click counts toward `max_load_more_attempts`. A click that does not
//! grow the product count abandons that control for the rest of the listing,
//! so a control that progresses N times is clicked at most N + 1 times.

use crate::config::Config;
use crate::crawler::controls::{ControlTier, ProgressProbe, FINDER_CLASS_MARKER};
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::page::{ControlInfo, PageRenderer, RenderError, RenderOptions, RenderedPage};
use crate::crawler::parser::parse_html;
use crate::state::DiscoveryMethod;
use crate::url::{UrlClass, UrlClassifier};
use crate::HarvestError;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Timing and ceilings for one expansion
#[derive(Debug, Clone)]
pub struct ExpansionSettings {
    pub scroll_settle: Duration,
    pub click_settle: Duration,
    pub finder_click_settle: Duration,
    pub max_scroll_iterations: u32,
    pub max_load_more_attempts: u32,
    pub remediation_markers: Vec<String>,
    pub major_listing_markers: Vec<String>,
    pub min_expected_products: usize,
}

impl ExpansionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scroll_settle: Duration::from_millis(config.browser.scroll_settle_ms),
            click_settle: Duration::from_millis(config.browser.click_settle_ms),
            finder_click_settle: Duration::from_millis(config.browser.finder_click_settle_ms),
            max_scroll_iterations: config.browser.max_scroll_iterations,
            max_load_more_attempts: config.browser.max_load_more_attempts,
            remediation_markers: config.site.remediation_markers.clone(),
            major_listing_markers: config.site.major_listing_markers.clone(),
            min_expected_products: config.site.min_expected_products,
        }
    }

    fn needs_remediation(&self, listing: &Url) -> bool {
        let url = listing.as_str().to_lowercase();
        self.remediation_markers.iter().any(|m| url.contains(m.as_str()))
    }

    fn is_major(&self, listing: &Url) -> bool {
        let url = listing.as_str().to_lowercase();
        self.major_listing_markers.iter().any(|m| url.contains(m.as_str()))
    }
}

/// Result of expanding one listing
#[derive(Debug, Clone)]
pub struct ExpansionOutcome {
    /// Detail URLs found on the listing
    pub urls: BTreeSet<Url>,
    pub method: DiscoveryMethod,
    /// Load-more clicks issued
    pub clicks: u32,
    /// A major listing yielded fewer products than expected
    pub thin: bool,
    /// Links that matched both listing and detail rules; kept as listings,
    /// so not expanded further and not extracted
    pub ambiguous: BTreeSet<Url>,
}

/// Expands listing pages into detail URLs
pub struct ListingExpander {
    classifier: Arc<UrlClassifier>,
    fetcher: Arc<dyn PageFetcher>,
    renderer: Option<Arc<dyn PageRenderer>>,
    settings: ExpansionSettings,
    probe: ProgressProbe,
}

impl ListingExpander {
    pub fn new(
        classifier: Arc<UrlClassifier>,
        fetcher: Arc<dyn PageFetcher>,
        renderer: Option<Arc<dyn PageRenderer>>,
        settings: ExpansionSettings,
    ) -> Self {
        Self {
            classifier,
            fetcher,
            renderer,
            settings,
            probe: ProgressProbe::default(),
        }
    }

    /// Expands a listing URL
    ///
    /// Browser failures part-way through keep whatever was collected. When
    /// the page cannot be rendered at all, the static HTML is used.
    ///
    /// # Returns
    ///
    /// * `Ok(ExpansionOutcome)` - Possibly empty set of detail URLs
    /// * `Err(HarvestError)` - Neither rendering nor the static fetch worked
    pub async fn expand(&self, listing: &Url) -> Result<ExpansionOutcome, HarvestError> {
        let mut outcome = match &self.renderer {
            Some(renderer) => match renderer.open(listing, RenderOptions::default()).await {
                Ok(page) => self.expand_rendered(page, listing).await,
                Err(e) => {
                    tracing::warn!(
                        "Could not render listing {}, falling back to static HTML: {}",
                        listing,
                        e
                    );
                    self.expand_static(listing).await?
                }
            },
            None => self.expand_static(listing).await?,
        };

        if self.settings.is_major(listing) && outcome.urls.len() < self.settings.min_expected_products
        {
            tracing::warn!(
                "Listing {} yielded only {} products (expected at least {})",
                listing,
                outcome.urls.len(),
                self.settings.min_expected_products
            );
            outcome.thin = true;
        }

        tracing::info!(
            "Expanded {} via {}: {} detail URLs after {} clicks",
            listing,
            outcome.method,
            outcome.urls.len(),
            outcome.clicks
        );
        Ok(outcome)
    }

    async fn expand_rendered(
        &self,
        mut page: Box<dyn RenderedPage>,
        listing: &Url,
    ) -> ExpansionOutcome {
        let mut expansion = Expansion {
            page: &mut page,
            settings: &self.settings,
            probe: &self.probe,
            remediation: self.settings.needs_remediation(listing),
            abandoned: HashSet::new(),
            clicks: 0,
            baseline: 0,
        };

        if let Err(e) = expansion.run().await {
            tracing::warn!("Expansion of {} stopped early: {}", listing, e);
        }
        let clicks = expansion.clicks;

        let hrefs = match page.anchor_hrefs().await {
            Ok(hrefs) => hrefs,
            Err(e) => {
                tracing::warn!("Could not read links from {}: {}", listing, e);
                Vec::new()
            }
        };
        page.close().await;

        let (urls, ambiguous) =
            self.detail_urls(listing, hrefs.iter().filter_map(|h| self.classifier.scope().resolve(h)));
        ExpansionOutcome {
            urls,
            method: DiscoveryMethod::DynamicExpansion,
            clicks,
            thin: false,
            ambiguous,
        }
    }

    async fn expand_static(&self, listing: &Url) -> Result<ExpansionOutcome, HarvestError> {
        let page = self
            .fetcher
            .fetch(listing)
            .await
            .map_err(|e| HarvestError::Transport {
                url: listing.to_string(),
                message: e.to_string(),
            })?;

        let parsed = parse_html(&page.body, &page.final_url);
        let (urls, ambiguous) = self.detail_urls(listing, parsed.links.into_iter());
        Ok(ExpansionOutcome {
            urls,
            method: DiscoveryMethod::StaticListing,
            clicks: 0,
            thin: false,
            ambiguous,
        })
    }

    /// Splits links into detail URLs and links both rule families claimed
    fn detail_urls(
        &self,
        listing: &Url,
        urls: impl Iterator<Item = Url>,
    ) -> (BTreeSet<Url>, BTreeSet<Url>) {
        let mut details = BTreeSet::new();
        let mut ambiguous = BTreeSet::new();
        for url in urls {
            let classification = self.classifier.classify_detailed(&url);
            if classification.is_ambiguous() {
                if !ambiguous.contains(&url) {
                    tracing::warn!(
                        "Link on {} matches both listing and detail rules, treating as listing: {}",
                        listing,
                        url
                    );
                    ambiguous.insert(url);
                }
            } else if classification.class() == UrlClass::DetailPage {
                details.insert(url);
            }
        }
        (details, ambiguous)
    }
}

/// Phases of the load-more state machine
#[derive(Debug)]
enum Phase {
    Scrolling,
    SeekingControl,
    Clicking(ControlInfo, ControlTier),
    Validating(ControlInfo),
    Done,
}

/// One in-browser expansion run
struct Expansion<'a> {
    page: &'a mut Box<dyn RenderedPage>,
    settings: &'a ExpansionSettings,
    probe: &'a ProgressProbe,
    remediation: bool,
    /// Controls whose last click did not add products
    abandoned: HashSet<String>,
    clicks: u32,
    /// Product count before the current click
    baseline: usize,
}

impl Expansion<'_> {
    async fn run(&mut self) -> Result<(), RenderError> {
        let mut phase = Phase::Scrolling;
        loop {
            phase = match phase {
                Phase::Scrolling => {
                    self.exhaust_scroll().await?;
                    self.baseline = self.product_count().await?;
                    tracing::debug!("Initial product count: {}", self.baseline);
                    Phase::SeekingControl
                }
                Phase::SeekingControl => {
                    if self.clicks >= self.settings.max_load_more_attempts {
                        tracing::debug!("Load-more ceiling of {} reached", self.clicks);
                        Phase::Done
                    } else {
                        match self.next_control().await? {
                            Some((control, tier)) => Phase::Clicking(control, tier),
                            None => Phase::Done,
                        }
                    }
                }
                Phase::Clicking(control, tier) => {
                    self.clicks += 1;
                    match self.page.click(&control).await {
                        Ok(()) => {
                            tokio::time::sleep(self.click_settle(&control, tier)).await;
                            self.exhaust_scroll().await?;
                            Phase::Validating(control)
                        }
                        Err(e) => {
                            tracing::debug!("Click on {} failed: {}", control.id, e);
                            self.abandoned.insert(control.id);
                            Phase::SeekingControl
                        }
                    }
                }
                Phase::Validating(control) => {
                    let count = self.product_count().await?;
                    if count > self.baseline {
                        tracing::debug!(
                            "Control {} loaded more products: {} -> {}",
                            control.id,
                            self.baseline,
                            count
                        );
                        self.baseline = count;
                    } else {
                        tracing::debug!("Control {} made no progress, abandoning", control.id);
                        self.abandoned.insert(control.id);
                    }
                    Phase::SeekingControl
                }
                Phase::Done => return Ok(()),
            };
        }
    }

    /// Scrolls to the bottom until the height stops growing, then back up
    async fn exhaust_scroll(&mut self) -> Result<(), RenderError> {
        let mut last_height = self.page.scroll_height().await?;
        for _ in 0..self.settings.max_scroll_iterations {
            self.page.scroll_to_bottom().await?;
            tokio::time::sleep(self.settings.scroll_settle).await;
            let height = self.page.scroll_height().await?;
            if height <= last_height {
                break;
            }
            last_height = height;
        }
        self.page.scroll_to_top().await
    }

    async fn product_count(&mut self) -> Result<usize, RenderError> {
        let hrefs = self.page.anchor_hrefs().await?;
        Ok(self.probe.count(&hrefs))
    }

    /// First acceptable, not yet abandoned control across the tiers
    async fn next_control(&mut self) -> Result<Option<(ControlInfo, ControlTier)>, RenderError> {
        for tier in ControlTier::ALL {
            if tier == ControlTier::Remediation && !self.remediation {
                continue;
            }
            for query in tier.queries() {
                let controls = self.page.find_controls(query).await?;
                if let Some(control) = controls
                    .into_iter()
                    .find(|c| !self.abandoned.contains(&c.id) && tier.accepts(c))
                {
                    return Ok(Some((control, tier)));
                }
            }
        }
        Ok(None)
    }

    fn click_settle(&self, control: &ControlInfo, tier: ControlTier) -> Duration {
        if tier == ControlTier::ProductFinder || control.class.contains(FINDER_CLASS_MARKER) {
            self.settings.finder_click_settle
        } else {
            self.settings.click_settle
        }
    }
}
