//! Product records and field normalization
//!
//! A [`ProductRecord`] is the unit of output. It can only be built with a
//! non-empty name; every other field is optional and normalized on the way in.

mod availability;
mod normalize;

pub use availability::Availability;
pub use normalize::{category_label, parse_price, truncate_chars};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized product record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    /// Canonical detail URL; the dedup key
    pub url: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
    /// Finite and non-negative when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<Availability>,
    /// Absolute when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub brand: String,
    pub extraction_timestamp: DateTime<Utc>,
}

impl ProductRecord {
    /// Creates a record, or `None` when the name is blank
    pub fn new(
        url: impl Into<String>,
        name: &str,
        brand: impl Into<String>,
        currency: impl Into<String>,
    ) -> Option<Self> {
        let name = collapse_whitespace(name);
        if name.is_empty() {
            return None;
        }

        Some(Self {
            url: url.into(),
            name,
            sku: None,
            model_code: None,
            category: None,
            sub_category: None,
            price: None,
            currency: currency.into(),
            availability: None,
            image_url: None,
            description: None,
            brand: brand.into(),
            extraction_timestamp: Utc::now(),
        })
    }

    /// Sets the price, dropping negative and non-finite values
    pub fn set_price(&mut self, price: Option<f64>) {
        self.price = price.filter(|p| p.is_finite() && *p >= 0.0);
    }

    /// Field-wise equality ignoring the extraction timestamp
    pub fn same_content(&self, other: &Self) -> bool {
        let mut other = other.clone();
        other.extraction_timestamp = self.extraction_timestamp;
        *self == other
    }
}

/// Trims and collapses internal runs of whitespace
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the collapsed text, or `None` when nothing remains
pub(crate) fn non_empty(text: &str) -> Option<String> {
    let text = collapse_whitespace(text);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
