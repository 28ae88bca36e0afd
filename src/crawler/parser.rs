//! HTML parser for extracting links and the page title
//!
//! Used for statically fetched listing pages and the sitemap.

use crate::url::resolve_href;
use scraper::{Html, Selector};
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Links found on the page, absolute and fragment-free, in document order
    pub links: Vec<Url>,
}

/// Parses HTML content and extracts links and the title
///
/// # Link Extraction Rules
///
/// **Include:** `<a href="...">` anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and data links
/// - fragment-only links
///
/// # Example
///
/// ```
/// use catalog_harvester::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>TVs</title></head><body><a href="/uk/tvs/all-tvs/">All</a></body></html>"#;
/// let base_url = Url::parse("https://www.samsung.com/uk/tvs/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title.as_deref(), Some("TVs"));
/// assert_eq!(parsed.links[0].as_str(), "https://www.samsung.com/uk/tvs/all-tvs/");
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, base_url),
    }
}

/// Extracts the page title from the HTML document
pub(crate) fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_href(base_url, href))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://www.samsung.com/uk/tvs/").unwrap()
    }

    #[test]
    fn test_extract_title_with_whitespace() {
        let html = r#"<html><head><title>  All TVs | Samsung UK  </title></head><body></body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(parsed.title.as_deref(), Some("All TVs | Samsung UK"));
    }

    #[test]
    fn test_no_title() {
        let parsed = parse_html("<html><head></head><body></body></html>", &base_url());
        assert_eq!(parsed.title, None);
    }

    #[test]
    fn test_relative_and_absolute_links() {
        let html = r#"<body>
            <a href="oled-tv/">OLED</a>
            <a href="/uk/monitors/">Monitors</a>
            <a href="https://www.samsung.com/uk/audio-sound/">Audio</a>
        </body>"#;
        let links: Vec<String> = parse_html(html, &base_url())
            .links
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            links,
            vec![
                "https://www.samsung.com/uk/tvs/oled-tv/",
                "https://www.samsung.com/uk/monitors/",
                "https://www.samsung.com/uk/audio-sound/",
            ]
        );
    }

    #[test]
    fn test_skips_download_and_special_links() {
        let html = r##"<body>
            <a href="/uk/manual.pdf" download>Manual</a>
            <a href="javascript:void(0)">JS</a>
            <a href="mailto:help@samsung.com">Mail</a>
            <a href="#compare">Compare</a>
            <a>No href</a>
        </body>"##;
        assert!(parse_html(html, &base_url()).links.is_empty());
    }
}
