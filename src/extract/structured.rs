//! JSON-LD product extraction
//!
//! Reads every `<script type="application/ld+json">` block and maps the first
//! schema.org `Product` found onto a record. Malformed blocks are skipped.

use super::RecordContext;
use crate::record::{non_empty, parse_price, truncate_chars, Availability, ProductRecord};
use crate::url::resolve_href;
use crate::HarvestError;
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

/// Nesting depth searched for product nodes inside one block
const MAX_DEPTH: usize = 4;

/// Extracts a product from the page's JSON-LD blocks
///
/// # Arguments
///
/// * `document` - The parsed page
/// * `url` - Canonical detail URL written onto the record
/// * `page_url` - URL the document was served from, for relative images
/// * `context` - Brand, default currency, and description limit
pub fn extract_structured(
    document: &Html,
    url: &Url,
    page_url: &Url,
    context: &RecordContext,
) -> Option<ProductRecord> {
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;

    for script in document.select(&selector) {
        let text = script.text().collect::<String>();
        if text.trim().is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(text.trim()) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(
                    "{}",
                    HarvestError::Parse {
                        url: url.to_string(),
                        message: e.to_string(),
                    }
                );
                continue;
            }
        };

        for node in product_nodes(&value) {
            if let Some(record) = record_from_product(node, url, page_url, context) {
                return Some(record);
            }
        }
    }
    None
}

/// Product nodes in a JSON-LD value, in document order
///
/// Accepts top-level arrays, `@graph` containers, `@type` given as a string or
/// an array, and `{"product": {...}}` wrappers.
pub fn product_nodes(value: &Value) -> Vec<&Value> {
    let mut nodes = Vec::new();
    collect_products(value, 0, &mut nodes);
    nodes
}

fn collect_products<'a>(value: &'a Value, depth: usize, nodes: &mut Vec<&'a Value>) {
    if depth > MAX_DEPTH {
        return;
    }
    match value {
        Value::Array(items) => {
            for item in items {
                collect_products(item, depth + 1, nodes);
            }
        }
        Value::Object(map) => {
            if is_product(value) {
                nodes.push(value);
                return;
            }
            if let Some(graph) = map.get("@graph") {
                collect_products(graph, depth + 1, nodes);
            }
            if let Some(product) = map.get("product").filter(|p| p.is_object()) {
                nodes.push(product);
            }
        }
        _ => {}
    }
}

/// Whether `@type` names a schema.org Product
pub(crate) fn is_product(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => is_product_type(t),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(is_product_type),
        _ => false,
    }
}

fn is_product_type(t: &str) -> bool {
    t == "Product" || t.ends_with("/Product")
}

/// Maps a product node onto a record; `None` without a usable name
pub(crate) fn record_from_product(
    node: &Value,
    url: &Url,
    page_url: &Url,
    context: &RecordContext,
) -> Option<ProductRecord> {
    let name = text_of(node.get("name"))?;
    let mut record = context.new_record(url, &name)?;

    record.sku = ["sku", "mpn", "productID"]
        .iter()
        .find_map(|key| text_of(node.get(*key)));
    record.model_code = model_code(node);

    if let Some(offer) = first_offer(node) {
        record.set_price(
            price_of(offer.get("price")).or_else(|| price_of(offer.get("lowPrice"))),
        );
        if let Some(currency) = text_of(offer.get("priceCurrency")) {
            record.currency = currency;
        }
        record.availability = text_of(offer.get("availability"))
            .as_deref()
            .and_then(Availability::parse);
    }

    record.image_url = image_of(node.get("image"))
        .and_then(|src| resolve_href(page_url, &src))
        .map(String::from);

    let (category, sub_category) = categories(node.get("category"));
    record.category = category;
    record.sub_category = sub_category;

    record.description = node
        .get("description")
        .or_else(|| node.get("text"))
        .and_then(joined_text)
        .map(|d| truncate_chars(&d, context.description_limit));

    Some(record)
}

/// Non-empty text of a string or number
fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn joined_text(value: &Value) -> Option<String> {
    match value {
        Value::Array(parts) => non_empty(
            &parts
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" "),
        ),
        other => text_of(Some(other)),
    }
}

fn model_code(node: &Value) -> Option<String> {
    let model = match node.get("model") {
        Some(Value::Object(model)) => text_of(model.get("name")),
        other => text_of(other),
    };
    model
        .or_else(|| text_of(node.get("modelCode")))
        .or_else(|| text_of(node.get("mpn")))
}

fn first_offer(node: &Value) -> Option<&Value> {
    match node.get("offers")? {
        Value::Array(offers) => offers.first(),
        offer @ Value::Object(_) => Some(offer),
        _ => None,
    }
}

fn price_of(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_price(s),
        _ => None,
    }
}

fn image_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => non_empty(s),
        Value::Array(images) => image_of(images.first()),
        Value::Object(image) => text_of(image.get("url")).or_else(|| text_of(image.get("@id"))),
        _ => None,
    }
}

/// Category and sub-category from an array, an `"A > B"` path, or a string
fn categories(value: Option<&Value>) -> (Option<String>, Option<String>) {
    match value {
        Some(Value::Array(items)) => (text_of(items.first()), text_of(items.get(1))),
        Some(Value::String(path)) if path.contains('>') => {
            let mut parts = path.split('>').filter_map(non_empty);
            (parts.next(), parts.next())
        }
        other => (text_of(other), None),
    }
}
