//! Seed listing discovery from the site's HTML sitemap
//!
//! The sitemap page links to every category root. Those that classify as
//! listings, plus a configured set of known listing roots, seed the run.

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::parse_html;
use crate::url::{UrlClass, UrlClassifier};
use std::collections::BTreeSet;
use url::Url;

/// Collects listing URLs from the sitemap and the fallback roots
///
/// A sitemap that cannot be fetched is logged; the fallback roots are
/// still returned.
///
/// # Arguments
///
/// * `fetcher` - Transport for the sitemap request
/// * `classifier` - Decides which sitemap links are listings
/// * `sitemap_path` - Sitemap location relative to the namespace root
/// * `fallback_listings` - Listing paths relative to the namespace root
pub async fn discover_seed_listings(
    fetcher: &dyn PageFetcher,
    classifier: &UrlClassifier,
    sitemap_path: &str,
    fallback_listings: &[String],
) -> BTreeSet<Url> {
    let scope = classifier.scope();
    let mut listings = BTreeSet::new();

    match scope.join(sitemap_path) {
        Some(sitemap_url) => match fetcher.fetch(&sitemap_url).await {
            Ok(page) => {
                let parsed = parse_html(&page.body, &page.final_url);
                let before = listings.len();
                listings.extend(
                    parsed
                        .links
                        .into_iter()
                        .filter(|u| classifier.classify(u) == UrlClass::ListingPage),
                );
                tracing::info!(
                    "Sitemap {} yielded {} listing URLs",
                    sitemap_url,
                    listings.len() - before
                );
            }
            Err(e) => tracing::warn!("Could not fetch sitemap {}: {}", sitemap_url, e),
        },
        None => tracing::warn!("Invalid sitemap path: {}", sitemap_path),
    }

    for path in fallback_listings {
        match scope.join(path) {
            Some(url) if classifier.classify(&url) == UrlClass::ListingPage => {
                listings.insert(url);
            }
            _ => tracing::debug!("Skipping fallback listing that is not a listing: {}", path),
        }
    }

    listings
}
