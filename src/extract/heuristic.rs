//! Selector heuristics for pages without structured data
//!
//! Each field has an ordered list of candidate selectors; the first one
//! that matches an element with non-empty text wins.

use super::RecordContext;
use crate::crawler::extract_title;
use crate::record::{
    category_label, non_empty, parse_price, truncate_chars, Availability, ProductRecord,
};
use crate::url::{resolve_href, SiteScope};
use scraper::{Html, Selector};
use url::Url;

const NAME_SELECTORS: &[&str] = &[
    r#"h1[data-testid="pdp-product-name"]"#,
    "h1.pdp-product-name",
    "h1.product-title",
    ".product-name h1",
    ".pdp-product-name",
    r#"h1[class*="product"]"#,
    r#"h1[id*="product"]"#,
];

const PRICE_SELECTORS: &[&str] = &[
    r#"[data-testid="price-current"]"#,
    ".price-current",
    ".current-price",
    ".price .current",
    ".product-price .current",
    ".price-value",
    r#"[class*="price"][class*="current"]"#,
];

const IMAGE_SELECTORS: &[&str] = &[
    ".pdp-gallery img[src]",
    ".product-image img[src]",
    ".hero-image img[src]",
    ".product-gallery img[src]",
    ".main-image img[src]",
    r#"[data-testid="pdp-gallery"] img[src]"#,
];

const SKU_SELECTORS: &[&str] = &[
    r#"[data-testid="model-code"]"#,
    ".model-code",
    ".product-sku",
    ".sku-value",
    r#"[class*="model-code"]"#,
    r#"[id*="model-code"]"#,
];

const DESCRIPTION_SELECTORS: &[&str] = &[
    ".product-description",
    ".pdp-description",
    ".product-overview",
    r#"[data-testid="product-description"]"#,
    ".product-details p",
];

const AVAILABILITY_SELECTORS: &[&str] = &[
    ".availability-status",
    ".stock-status",
    r#"[data-testid="availability"]"#,
    ".product-availability",
];

/// Separator between the product name and the site name in page titles
const TITLE_SEPARATOR: char = '|';

/// Builds a record from per-field selectors
///
/// Falls back to the page title (up to the first `|`) for the name and to
/// the URL's first meaningful path segment for the category. Returns `None`
/// when no name can be found.
pub fn extract_heuristic(
    document: &Html,
    url: &Url,
    page_url: &Url,
    scope: &SiteScope,
    context: &RecordContext,
) -> Option<ProductRecord> {
    let name = first_text(document, NAME_SELECTORS).or_else(|| {
        extract_title(document)
            .and_then(|title| title.split(TITLE_SEPARATOR).next().and_then(non_empty))
    });
    let Some(name) = name else {
        tracing::debug!("No product name found for {}", url);
        return None;
    };
    let mut record = context.new_record(url, &name)?;

    record.set_price(first_text(document, PRICE_SELECTORS).as_deref().and_then(parse_price));
    record.image_url = first_attr(document, IMAGE_SELECTORS, "src")
        .and_then(|src| resolve_href(page_url, &src))
        .map(String::from);
    record.sku = first_text(document, SKU_SELECTORS);
    record.model_code = record.sku.clone();
    record.description = first_text(document, DESCRIPTION_SELECTORS)
        .map(|d| truncate_chars(&d, context.description_limit));
    record.availability = first_text(document, AVAILABILITY_SELECTORS)
        .as_deref()
        .and_then(Availability::parse);
    record.category = scope.category_segment(url).map(|s| category_label(&s));

    Some(record)
}

fn first_text(document: &Html, selectors: &[&str]) -> Option<String> {
    selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| {
            document
                .select(&selector)
                .find_map(|element| non_empty(&element.text().collect::<String>()))
        })
}

fn first_attr(document: &Html, selectors: &[&str], attr: &str) -> Option<String> {
    selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| {
            document
                .select(&selector)
                .find_map(|element| element.value().attr(attr).and_then(non_empty))
        })
}
