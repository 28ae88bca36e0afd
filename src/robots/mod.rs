//! Robots.txt handling module
//!
//! The site's robots.txt is fetched once per run. Its disallow rules filter
//! URLs before any fetch and its crawl delay raises the pacing delay.

mod parser;

pub use parser::RobotsPolicy;

use crate::crawler::PageFetcher;
use crate::url::SiteScope;

/// Fetches robots.txt from the site origin
///
/// A missing or unreachable robots.txt allows everything.
///
/// # Arguments
///
/// * `fetcher` - Transport used for the request
/// * `scope` - The harvested site namespace
/// * `agent` - Our product token for `User-agent` matching
pub async fn fetch_robots(fetcher: &dyn PageFetcher, scope: &SiteScope, agent: &str) -> RobotsPolicy {
    let Ok(robots_url) = scope.base().join("/robots.txt") else {
        return RobotsPolicy::allow_all(agent);
    };

    match fetcher.fetch(&robots_url).await {
        Ok(page) => {
            tracing::info!("Loaded robots.txt from {}", robots_url);
            RobotsPolicy::from_content(&page.body, agent)
        }
        Err(e) => {
            tracing::info!("No usable robots.txt at {} ({}), allowing all", robots_url, e);
            RobotsPolicy::allow_all(agent)
        }
    }
}
