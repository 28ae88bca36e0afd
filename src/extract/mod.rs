//! Product extraction
//!
//! A detail URL is turned into a [`ProductRecord`] by an ordered chain of
//! strategies; the first one that yields a named product wins:
//!
//! 1. structured data (JSON-LD) in the statically fetched HTML
//! 2. per-field selector heuristics on the same HTML
//! 3. the rendered page: structured data, then intercepted JSON payloads,
//!    then heuristics
//!
//! Parsing is synchronous. Only fetching and rendering suspend.

mod heuristic;
mod payload;
mod structured;

pub use heuristic::extract_heuristic;
pub use payload::extract_from_payloads;
pub use structured::{extract_structured, product_nodes};

use crate::config::Config;
use crate::crawler::{
    FetchError, InterceptedPayload, PageFetcher, PageRenderer, RenderError, RenderOptions,
};
use crate::record::ProductRecord;
use crate::url::SiteScope;
use crate::HarvestError;
use scraper::Html;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// The strategy that produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    StaticStructuredData,
    StaticHeuristic,
    RenderedStructuredData,
    InterceptedPayload,
    RenderedHeuristic,
}

impl ExtractionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStrategy::StaticStructuredData => "static_structured_data",
            ExtractionStrategy::StaticHeuristic => "static_heuristic",
            ExtractionStrategy::RenderedStructuredData => "rendered_structured_data",
            ExtractionStrategy::InterceptedPayload => "intercepted_payload",
            ExtractionStrategy::RenderedHeuristic => "rendered_heuristic",
        }
    }
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record-level constants and limits shared by every strategy
#[derive(Debug, Clone)]
pub struct RecordContext {
    pub brand: String,
    /// Used when the page states no currency
    pub currency: String,
    /// Maximum description length in characters
    pub description_limit: usize,
}

impl RecordContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            brand: config.site.brand.clone(),
            currency: config.site.currency.clone(),
            description_limit: config.site.description_limit,
        }
    }

    /// A record with the constant fields filled in, or `None` for a blank name
    pub(crate) fn new_record(&self, url: &Url, name: &str) -> Option<ProductRecord> {
        ProductRecord::new(url.as_str(), name, self.brand.as_str(), self.currency.as_str())
    }
}

/// A successful extraction
#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: ProductRecord,
    pub strategy: ExtractionStrategy,
}

/// Runs the extraction strategies for detail URLs
pub struct ExtractionChain {
    scope: SiteScope,
    fetcher: Arc<dyn PageFetcher>,
    renderer: Option<Arc<dyn PageRenderer>>,
    context: RecordContext,
    render_options: RenderOptions,
}

impl ExtractionChain {
    pub fn new(
        scope: SiteScope,
        fetcher: Arc<dyn PageFetcher>,
        renderer: Option<Arc<dyn PageRenderer>>,
        context: RecordContext,
        intercept_payloads: bool,
    ) -> Self {
        Self {
            scope,
            fetcher,
            renderer,
            context,
            render_options: RenderOptions { intercept_payloads },
        }
    }

    /// Extracts a product record from a detail URL
    ///
    /// # Returns
    ///
    /// * `Ok(Extraction)` - The record and the strategy that produced it
    /// * `Err(HarvestError::Transport)` - The page could not be loaded at all;
    ///   worth retrying
    /// * `Err(HarvestError::ExtractionFailed)` - The page loaded but no
    ///   strategy found a product name
    pub async fn extract(&self, url: &Url) -> Result<Extraction, HarvestError> {
        let static_error = match self.fetcher.fetch(url).await {
            Ok(page) => {
                if let Some(found) = self.from_static(url, &page.body, &page.final_url) {
                    return Ok(found);
                }
                tracing::debug!("Static strategies found nothing for {}", url);
                None
            }
            Err(e) => {
                tracing::debug!("Static fetch failed for {}: {}", url, e);
                Some(e)
            }
        };

        let render_error = match &self.renderer {
            Some(renderer) => match self.from_rendered(renderer.as_ref(), url).await {
                Ok(Some(found)) => return Ok(found),
                Ok(None) => None,
                Err(e) => {
                    tracing::debug!(
                        "{}",
                        HarvestError::Render {
                            url: url.to_string(),
                            message: e.to_string(),
                        }
                    );
                    Some(e)
                }
            },
            None => None,
        };

        Err(failure(url, static_error, render_error, self.renderer.is_some()))
    }

    fn from_static(&self, url: &Url, html: &str, final_url: &Url) -> Option<Extraction> {
        let document = Html::parse_document(html);
        if let Some(record) = extract_structured(&document, url, final_url, &self.context) {
            return Some(Extraction {
                record,
                strategy: ExtractionStrategy::StaticStructuredData,
            });
        }
        extract_heuristic(&document, url, final_url, &self.scope, &self.context).map(|record| {
            Extraction {
                record,
                strategy: ExtractionStrategy::StaticHeuristic,
            }
        })
    }

    async fn from_rendered(
        &self,
        renderer: &dyn PageRenderer,
        url: &Url,
    ) -> Result<Option<Extraction>, RenderError> {
        let mut page = renderer.open(url, self.render_options).await?;
        let content = page.content().await;
        let payloads = page.intercepted_payloads().await;
        page.close().await;
        let html = content?;

        Ok(self.from_rendered_document(url, &html, &payloads))
    }

    fn from_rendered_document(
        &self,
        url: &Url,
        html: &str,
        payloads: &[InterceptedPayload],
    ) -> Option<Extraction> {
        let document = Html::parse_document(html);
        if let Some(record) = extract_structured(&document, url, url, &self.context) {
            return Some(Extraction {
                record,
                strategy: ExtractionStrategy::RenderedStructuredData,
            });
        }
        if let Some(record) = extract_from_payloads(payloads, url, &self.context) {
            return Some(Extraction {
                record,
                strategy: ExtractionStrategy::InterceptedPayload,
            });
        }
        extract_heuristic(&document, url, url, &self.scope, &self.context).map(|record| {
            Extraction {
                record,
                strategy: ExtractionStrategy::RenderedHeuristic,
            }
        })
    }
}

/// Classifies an exhausted chain
///
/// Only a page that never loaded is a transport failure: the static fetch
/// failed transiently and rendering either was unavailable or failed too.
fn failure(
    url: &Url,
    static_error: Option<FetchError>,
    render_error: Option<RenderError>,
    rendered: bool,
) -> HarvestError {
    match static_error {
        Some(e) if e.is_transient() && (!rendered || render_error.is_some()) => {
            HarvestError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
        _ => HarvestError::ExtractionFailed {
            url: url.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{ControlInfo, ControlQuery, FetchedPage, RenderedPage};
    use crate::Availability;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const STRUCTURED: &str = r#"<html><head>
        <title>Galaxy S24 | Samsung UK</title>
        <script type="application/ld+json">
        {"@context":"https://schema.org","@type":"Product","name":"Galaxy S24",
         "sku":"SM-S921BZKDEUB","offers":{"price":"799.00","priceCurrency":"GBP",
         "availability":"https://schema.org/InStock"}}
        </script></head><body></body></html>"#;

    const HEURISTIC: &str = r#"<html><head><title>Ignored | Samsung UK</title></head><body>
        <h1 class="pdp-product-name">Galaxy Tab S9</h1>
        <span class="price-current">£1,299.00</span>
        </body></html>"#;

    const PRICE_ONLY: &str = r#"<html><head></head><body>
        <span class="price-current">£199.00</span>
        </body></html>"#;

    enum StaticResponse {
        Html(&'static str),
        Fail(FetchError),
    }

    struct FakeFetcher(StaticResponse);

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
            match &self.0 {
                StaticResponse::Html(body) => Ok(FetchedPage {
                    final_url: url.clone(),
                    status_code: 200,
                    body: body.to_string(),
                }),
                StaticResponse::Fail(e) => Err(e.clone()),
            }
        }
    }

    struct FakePage {
        html: &'static str,
        payloads: Vec<InterceptedPayload>,
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RenderedPage for FakePage {
        async fn scroll_height(&mut self) -> Result<u64, RenderError> {
            Ok(0)
        }
        async fn scroll_to_bottom(&mut self) -> Result<(), RenderError> {
            Ok(())
        }
        async fn scroll_to_top(&mut self) -> Result<(), RenderError> {
            Ok(())
        }
        async fn find_controls(
            &mut self,
            _query: &ControlQuery,
        ) -> Result<Vec<ControlInfo>, RenderError> {
            Ok(Vec::new())
        }
        async fn click(&mut self, _control: &ControlInfo) -> Result<(), RenderError> {
            Ok(())
        }
        async fn anchor_hrefs(&mut self) -> Result<Vec<String>, RenderError> {
            Ok(Vec::new())
        }
        async fn content(&mut self) -> Result<String, RenderError> {
            Ok(self.html.to_string())
        }
        async fn intercepted_payloads(&mut self) -> Vec<InterceptedPayload> {
            std::mem::take(&mut self.payloads)
        }
        async fn close(self: Box<Self>) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeRenderer {
        html: Option<&'static str>,
        payloads: Mutex<Vec<InterceptedPayload>>,
        closed: Arc<AtomicUsize>,
    }

    impl FakeRenderer {
        fn new(html: Option<&'static str>) -> Self {
            Self {
                html,
                payloads: Mutex::new(Vec::new()),
                closed: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl PageRenderer for FakeRenderer {
        async fn open(
            &self,
            _url: &Url,
            _options: RenderOptions,
        ) -> Result<Box<dyn RenderedPage>, RenderError> {
            let html = self
                .html
                .ok_or_else(|| RenderError::Navigation("timeout".to_string()))?;
            let payloads = std::mem::take(&mut *self.payloads.lock().unwrap());
            Ok(Box::new(FakePage {
                html,
                payloads,
                closed: Arc::clone(&self.closed),
            }))
        }
    }

    fn chain(fetcher: StaticResponse, renderer: Option<Arc<FakeRenderer>>) -> ExtractionChain {
        ExtractionChain::new(
            SiteScope::parse("https://www.samsung.com/uk/").unwrap(),
            Arc::new(FakeFetcher(fetcher)),
            renderer.map(|r| r as Arc<dyn PageRenderer>),
            RecordContext {
                brand: "Samsung".to_string(),
                currency: "GBP".to_string(),
                description_limit: 500,
            },
            true,
        )
    }

    fn detail_url() -> Url {
        Url::parse("https://www.samsung.com/uk/tablets/galaxy-tab-s9/buy/galaxy-tab-s9-sm-x710nzaaeub/")
            .unwrap()
    }

    #[tokio::test]
    async fn test_static_structured_data_first() {
        let found = chain(StaticResponse::Html(STRUCTURED), None)
            .extract(&detail_url())
            .await
            .unwrap();

        assert_eq!(found.strategy, ExtractionStrategy::StaticStructuredData);
        assert_eq!(found.record.name, "Galaxy S24");
        assert_eq!(found.record.price, Some(799.0));
        assert_eq!(found.record.availability, Some(Availability::InStock));
        assert_eq!(found.record.url, detail_url().as_str());
    }

    #[tokio::test]
    async fn test_static_heuristics_without_structured_data() {
        let found = chain(StaticResponse::Html(HEURISTIC), None)
            .extract(&detail_url())
            .await
            .unwrap();

        assert_eq!(found.strategy, ExtractionStrategy::StaticHeuristic);
        assert_eq!(found.record.name, "Galaxy Tab S9");
        assert_eq!(found.record.price, Some(1299.0));
        assert_eq!(found.record.category.as_deref(), Some("Tablets"));
    }

    #[tokio::test]
    async fn test_rendered_structured_data_after_static_miss() {
        let renderer = Arc::new(FakeRenderer::new(Some(STRUCTURED)));
        let found = chain(StaticResponse::Html(PRICE_ONLY), Some(Arc::clone(&renderer)))
            .extract(&detail_url())
            .await
            .unwrap();

        assert_eq!(found.strategy, ExtractionStrategy::RenderedStructuredData);
        assert_eq!(renderer.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_intercepted_payload_before_rendered_heuristics() {
        let renderer = Arc::new(FakeRenderer::new(Some(HEURISTIC)));
        renderer.payloads.lock().unwrap().push(InterceptedPayload {
            url: "https://www.samsung.com/uk/api/product/detail".to_string(),
            body: serde_json::json!({
                "data": {"@type": "Product", "name": "Galaxy Tab S9 FE", "sku": "SM-X510"}
            }),
        });

        let found = chain(StaticResponse::Html(PRICE_ONLY), Some(renderer))
            .extract(&detail_url())
            .await
            .unwrap();

        assert_eq!(found.strategy, ExtractionStrategy::InterceptedPayload);
        assert_eq!(found.record.name, "Galaxy Tab S9 FE");
    }

    #[tokio::test]
    async fn test_rendered_heuristics_last() {
        let renderer = Arc::new(FakeRenderer::new(Some(HEURISTIC)));
        let found = chain(StaticResponse::Html(PRICE_ONLY), Some(renderer))
            .extract(&detail_url())
            .await
            .unwrap();

        assert_eq!(found.strategy, ExtractionStrategy::RenderedHeuristic);
        assert_eq!(found.record.name, "Galaxy Tab S9");
    }

    #[tokio::test]
    async fn test_price_without_name_is_definitive_failure() {
        let renderer = Arc::new(FakeRenderer::new(Some(PRICE_ONLY)));
        let err = chain(StaticResponse::Html(PRICE_ONLY), Some(renderer))
            .extract(&detail_url())
            .await
            .unwrap_err();

        assert!(matches!(err, HarvestError::ExtractionFailed { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_unreachable_page_is_retryable() {
        let err = chain(StaticResponse::Fail(FetchError::Timeout), None)
            .extract(&detail_url())
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        let renderer = Arc::new(FakeRenderer::new(None));
        let err = chain(StaticResponse::Fail(FetchError::Status(503)), Some(renderer))
            .extract(&detail_url())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_page_is_not_retried() {
        let err = chain(StaticResponse::Fail(FetchError::Status(404)), None)
            .extract(&detail_url())
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::ExtractionFailed { .. }));
    }

    #[tokio::test]
    async fn test_rendered_page_without_product_is_structural() {
        let renderer = Arc::new(FakeRenderer::new(Some(PRICE_ONLY)));
        let err = chain(StaticResponse::Fail(FetchError::Timeout), Some(renderer))
            .extract(&detail_url())
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::ExtractionFailed { .. }));
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(
            ExtractionStrategy::InterceptedPayload.to_string(),
            "intercepted_payload"
        );
    }
}
