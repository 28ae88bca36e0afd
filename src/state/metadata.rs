use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a detail URL was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    /// Rendered, scrolled, and paginated in the browser
    DynamicExpansion,
    /// Anchors of the statically fetched listing HTML
    StaticListing,
}

impl fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DynamicExpansion => write!(f, "dynamic_expansion"),
            Self::StaticListing => write!(f, "static_listing"),
        }
    }
}

/// Provenance of a discovered detail URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryMetadata {
    pub source_listing_url: String,
    pub discovery_timestamp: DateTime<Utc>,
    pub method: DiscoveryMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl DiscoveryMetadata {
    pub fn new(source_listing_url: impl Into<String>, method: DiscoveryMethod) -> Self {
        Self {
            source_listing_url: source_listing_url.into(),
            discovery_timestamp: Utc::now(),
            method,
            category: None,
        }
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }
}
