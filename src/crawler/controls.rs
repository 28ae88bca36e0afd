//! Load-more control tiers and the product progress probe
//!
//! Both are pure: they look at control snapshots and href lists, never at
//! the page itself.

use crate::crawler::page::{ControlInfo, ControlQuery};
use std::collections::HashSet;

const VIEW_MORE: &str = "View more";

const FINDER_QUERIES: &[ControlQuery] =
    &[ControlQuery::css(".pd19-product-finder__view-more-btn")];

const SCOPED_QUERIES: &[ControlQuery] = &[
    ControlQuery::with_text(".product-list button", VIEW_MORE),
    ControlQuery::with_text(".products button", VIEW_MORE),
    ControlQuery::with_text(".grid button", VIEW_MORE),
    ControlQuery::with_text("[class*=\"product\"] button", VIEW_MORE),
    ControlQuery::with_text("[data-testid*=\"product\"] button", VIEW_MORE),
    ControlQuery::with_text(".listing button", VIEW_MORE),
    ControlQuery::with_text("main button", VIEW_MORE),
    ControlQuery::with_text("section button", VIEW_MORE),
];

const REMEDIATION_QUERIES: &[ControlQuery] = &[
    ControlQuery::css(".pd19-product-finder__view-more-btn"),
    ControlQuery::css("button[class*=\"view-more\"]"),
    ControlQuery::css("button[class*=\"load-more\"]"),
    ControlQuery::css("[data-testid*=\"view-more\"]"),
    ControlQuery::css("[data-testid*=\"load-more\"]"),
];

const GENERIC_QUERIES: &[ControlQuery] = &[ControlQuery::with_text("button", VIEW_MORE)];

/// Ancestor markers of navigation chrome rather than the product grid
const CHROME_ANCESTRY: &[&str] = &["filter", "sidebar", "nav", "menu"];

/// Class marker of the product-finder widget
pub const FINDER_CLASS_MARKER: &str = "pd19";

/// Strategies for locating a load-more control, tried in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlTier {
    /// The site's product-finder "view more" button
    ProductFinder,
    /// "View more" buttons inside a product container
    ScopedViewMore,
    /// Broader selectors for listings known to hide their control
    Remediation,
    /// Any "View more" button outside navigation chrome
    Generic,
}

impl ControlTier {
    pub const ALL: [ControlTier; 4] = [
        ControlTier::ProductFinder,
        ControlTier::ScopedViewMore,
        ControlTier::Remediation,
        ControlTier::Generic,
    ];

    pub fn queries(&self) -> &'static [ControlQuery] {
        match self {
            ControlTier::ProductFinder => FINDER_QUERIES,
            ControlTier::ScopedViewMore => SCOPED_QUERIES,
            ControlTier::Remediation => REMEDIATION_QUERIES,
            ControlTier::Generic => GENERIC_QUERIES,
        }
    }

    /// Whether a located control may be clicked under this tier
    pub fn accepts(&self, control: &ControlInfo) -> bool {
        if !control.enabled {
            return false;
        }
        let class = control.class.to_lowercase();
        match self {
            // Filter panels reuse the finder styling
            ControlTier::ProductFinder => !class.contains("filter"),
            ControlTier::ScopedViewMore => control.visible,
            // Remediation tolerates controls not yet scrolled into view
            ControlTier::Remediation => true,
            ControlTier::Generic => {
                let ancestry = control.ancestry.to_lowercase();
                control.visible
                    && !class.contains("filter")
                    && !CHROME_ANCESTRY.iter().any(|m| ancestry.contains(m))
            }
        }
    }
}

/// Counts distinct product links among a page's hrefs
///
/// A product link carries a model-code token and a category fragment and
/// is not a fragment, collection, purchase, comparison, support, or query
/// link. The count is a cheap progress signal, not a classification.
#[derive(Debug, Clone)]
pub struct ProgressProbe {
    product_tokens: &'static [&'static str],
    category_fragments: &'static [&'static str],
    excluded: &'static [&'static str],
}

impl Default for ProgressProbe {
    fn default() -> Self {
        Self {
            product_tokens: &["-sm-", "-qe", "-hw-", "-np", "-ls", "-xe-", "-ww", "-rf"],
            category_fragments: &[
                "/smartphones/",
                "/computers/",
                "/tvs/",
                "/audio",
                "/monitors/",
                "/tablets/",
                "/watches/",
                "/refrigerators/",
                "/washers-and-dryers/",
            ],
            excluded: &["#", "/all-", "/buy", "/compare", "/support", "/?"],
        }
    }
}

impl ProgressProbe {
    pub fn is_product_link(&self, href: &str) -> bool {
        let href = href.to_lowercase();
        self.product_tokens.iter().any(|t| href.contains(t))
            && self.category_fragments.iter().any(|c| href.contains(c))
            && !self.excluded.iter().any(|x| href.contains(x))
    }

    pub fn count<S: AsRef<str>>(&self, hrefs: &[S]) -> usize {
        hrefs
            .iter()
            .map(|h| h.as_ref())
            .filter(|h| self.is_product_link(h))
            .collect::<HashSet<_>>()
            .len()
    }
}
