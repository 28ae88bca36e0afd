use url::Url;

/// Href prefixes that never lead to a page
const SKIPPED_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:", "#"];

/// Resolves an href against a base URL and validates it
///
/// Relative and protocol-relative hrefs are joined to `base`. The fragment
/// is dropped so anchors into the same page collapse to one URL.
///
/// Returns `None` if the link should be excluded:
/// - empty hrefs and pure fragments
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - hrefs that fail to resolve
/// - non-HTTP(S) URLs after resolution
///
/// # Examples
///
/// ```
/// use catalog_harvester::url::resolve_href;
/// use url::Url;
///
/// let base = Url::parse("https://www.samsung.com/uk/").unwrap();
/// let url = resolve_href(&base, "/uk/tvs/all-tvs/#filters").unwrap();
/// assert_eq!(url.as_str(), "https://www.samsung.com/uk/tvs/all-tvs/");
///
/// assert!(resolve_href(&base, "javascript:void(0)").is_none());
/// ```
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    url.set_fragment(None);
    Some(url)
}
