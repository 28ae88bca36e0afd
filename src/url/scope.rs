use crate::url::normalize::resolve_href;
use crate::UrlError;
use url::Url;

/// Top-level namespaces under the site root that never hold catalog pages
const EXCLUDED_NAMESPACES: &[&str] = &[
    "info",
    "support",
    "business",
    "offer",
    "offers",
    "estore",
    "legal",
    "privacy",
    "sustainability",
    "mypage",
    "members",
    "account",
    "login",
    "register",
    "cart",
];

/// Path segments that never name a product category
const NON_CATEGORY_SEGMENTS: &[&str] = &["buy", "product", "products"];

/// The regional site namespace being harvested
///
/// A URL is in scope when it shares the base URL's host (ignoring a leading
/// `www.`) and port, and its path lies under the base path. Classification
/// rules are matched against the lowercased path relative to the base.
#[derive(Debug, Clone)]
pub struct SiteScope {
    base: Url,
    host: String,
    prefix: String,
}

impl SiteScope {
    /// Builds a scope from the configured base URL
    ///
    /// A missing trailing slash on the base path is added, so
    /// `https://www.samsung.com/uk` and `https://www.samsung.com/uk/` are the
    /// same namespace.
    pub fn parse(base_url: &str) -> Result<Self, UrlError> {
        let mut base = Url::parse(base_url).map_err(|e| UrlError::Parse(e.to_string()))?;

        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(UrlError::InvalidScheme(base.scheme().to_string()));
        }

        let host = base.host_str().map(bare_host).ok_or(UrlError::MissingDomain)?;

        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.set_query(None);
        base.set_fragment(None);

        let prefix = base.path().to_lowercase();
        Ok(Self { base, host, prefix })
    }

    /// The normalized base URL (always ends in `/`)
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Returns true if the URL lies under the site namespace
    pub fn contains(&self, url: &Url) -> bool {
        self.namespace_path(url).is_some()
    }

    /// Path relative to the namespace, lowercased, with a leading `/`
    ///
    /// Returns `None` for URLs outside the namespace or inside an excluded
    /// top-level namespace such as `/support/`.
    ///
    /// ```
    /// use catalog_harvester::url::SiteScope;
    /// use url::Url;
    ///
    /// let scope = SiteScope::parse("https://www.samsung.com/uk/").unwrap();
    /// let url = Url::parse("https://www.samsung.com/uk/TVs/oled-tv/").unwrap();
    /// assert_eq!(scope.relative_path(&url).as_deref(), Some("/tvs/oled-tv/"));
    ///
    /// let support = Url::parse("https://www.samsung.com/uk/support/contact/").unwrap();
    /// assert_eq!(scope.relative_path(&support), None);
    /// ```
    pub fn relative_path(&self, url: &Url) -> Option<String> {
        let relative = self.namespace_path(url)?;

        let first = relative
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default();
        if EXCLUDED_NAMESPACES.contains(&first) {
            return None;
        }

        Some(relative)
    }

    /// Resolves an href found on a page of this site
    pub fn resolve(&self, href: &str) -> Option<Url> {
        resolve_href(&self.base, href)
    }

    /// Resolves a path relative to the namespace root, e.g. `tvs/all-tvs/`
    pub fn join(&self, relative: &str) -> Option<Url> {
        self.base.join(relative.trim_start_matches('/')).ok()
    }

    /// The first meaningful path segment, used as a category label
    ///
    /// `buy` and `product` segments are skipped.
    pub fn category_segment(&self, url: &Url) -> Option<String> {
        let relative = self.namespace_path(url)?;
        relative
            .split('/')
            .filter(|s| !s.is_empty())
            .find(|s| !NON_CATEGORY_SEGMENTS.contains(s))
            .map(|s| s.to_string())
    }

    fn namespace_path(&self, url: &Url) -> Option<String> {
        let host = url.host_str().map(bare_host)?;
        if host != self.host || url.port_or_known_default() != self.base.port_or_known_default()
        {
            return None;
        }

        let path = url.path().to_lowercase();
        if path == self.prefix.trim_end_matches('/') {
            return Some("/".to_string());
        }

        path.strip_prefix(&self.prefix)
            .map(|rest| format!("/{}", rest))
    }
}

/// Lowercases a host and drops a leading `www.`
fn bare_host(host: &str) -> String {
    let host = host.to_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}
