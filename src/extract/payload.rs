//! Intercepted payload mapping
//!
//! The site's product APIs have no published schema, so only payloads that
//! embed schema.org `Product` objects are understood. Anything else yields
//! nothing and the chain moves on to heuristics.

use super::structured::{is_product, record_from_product};
use super::RecordContext;
use crate::crawler::InterceptedPayload;
use crate::record::ProductRecord;
use serde_json::Value;
use url::Url;

/// Nesting depth searched inside one payload
const MAX_DEPTH: usize = 6;

/// Maps the first embedded `Product` object that yields a record
///
/// Products without a usable name are skipped in favour of later ones.
pub fn extract_from_payloads(
    payloads: &[InterceptedPayload],
    url: &Url,
    context: &RecordContext,
) -> Option<ProductRecord> {
    if payloads.is_empty() {
        return None;
    }
    tracing::debug!("Inspecting {} intercepted payloads for {}", payloads.len(), url);

    payloads.iter().find_map(|payload| {
        let mut products = Vec::new();
        collect_products(&payload.body, 0, &mut products);
        products
            .into_iter()
            .find_map(|node| record_from_product(node, url, url, context))
    })
}

/// Collects `Product` objects in document order, not descending into them
fn collect_products<'a>(value: &'a Value, depth: usize, out: &mut Vec<&'a Value>) {
    if depth > MAX_DEPTH {
        return;
    }
    match value {
        Value::Object(map) => {
            if is_product(value) {
                out.push(value);
                return;
            }
            for v in map.values() {
                collect_products(v, depth + 1, out);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect_products(v, depth + 1, out);
            }
        }
        _ => {}
    }
}
