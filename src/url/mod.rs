//! URL handling module
//!
//! This module scopes URLs to the harvested site namespace, resolves hrefs,
//! and classifies catalog URLs as listing pages, product detail pages, or
//! neither using a declarative rule table.

mod matcher;
mod normalize;
mod rules;
mod scope;

pub use matcher::{RuleHits, RuleSet};
pub use normalize::resolve_href;
pub use rules::{Rule, RuleKind, DEFAULT_RULES};
pub use scope::SiteScope;

use crate::UrlError;
use std::collections::BTreeSet;
use url::Url;

/// Classification of a catalog URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlClass {
    /// A category page that links to many products
    ListingPage,
    /// A single product page
    DetailPage,
    /// Out of scope, excluded, or matched by no rule
    Unclassified,
}

/// Both verdicts for a URL before precedence is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub listing: bool,
    pub detail: bool,
}

impl Classification {
    /// Both rule families claimed the URL
    pub fn is_ambiguous(&self) -> bool {
        self.listing && self.detail
    }

    /// Collapses the two verdicts; listing wins when both hold
    pub fn class(&self) -> UrlClass {
        if self.listing {
            UrlClass::ListingPage
        } else if self.detail {
            UrlClass::DetailPage
        } else {
            UrlClass::Unclassified
        }
    }
}

/// Input URLs split by class
#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub listings: BTreeSet<Url>,
    pub details: BTreeSet<Url>,
    pub unclassified: BTreeSet<Url>,
    /// URLs both rule families claimed (also present in `listings`)
    pub ambiguous: BTreeSet<Url>,
}

/// Classifies catalog URLs within a site namespace
///
/// Classification is a pure function of the URL string: no I/O, and the
/// same URL always yields the same class.
#[derive(Debug, Clone)]
pub struct UrlClassifier {
    scope: SiteScope,
    rules: RuleSet,
}

impl UrlClassifier {
    /// Builds a classifier with the default rule table
    pub fn new(scope: SiteScope) -> Result<Self, UrlError> {
        Self::with_rules(scope, DEFAULT_RULES)
    }

    pub fn with_rules(scope: SiteScope, rules: &[Rule]) -> Result<Self, UrlError> {
        Ok(Self {
            scope,
            rules: RuleSet::compile(rules)?,
        })
    }

    pub fn scope(&self) -> &SiteScope {
        &self.scope
    }

    /// Evaluates both rule families without applying precedence
    pub fn classify_detailed(&self, url: &Url) -> Classification {
        match self.scope.relative_path(url) {
            Some(path) => {
                let hits = self.rules.evaluate(&path);
                Classification {
                    listing: hits.is_listing(),
                    detail: hits.is_detail(),
                }
            }
            None => Classification {
                listing: false,
                detail: false,
            },
        }
    }

    /// Classifies a URL
    ///
    /// # Examples
    ///
    /// ```
    /// use catalog_harvester::url::{SiteScope, UrlClass, UrlClassifier};
    /// use url::Url;
    ///
    /// let scope = SiteScope::parse("https://www.samsung.com/uk/").unwrap();
    /// let classifier = UrlClassifier::new(scope).unwrap();
    ///
    /// let listing = Url::parse("https://www.samsung.com/uk/tvs/all-tvs/").unwrap();
    /// assert_eq!(classifier.classify(&listing), UrlClass::ListingPage);
    ///
    /// let foreign = Url::parse("https://www.example.com/uk/tvs/all-tvs/").unwrap();
    /// assert_eq!(classifier.classify(&foreign), UrlClass::Unclassified);
    /// ```
    pub fn classify(&self, url: &Url) -> UrlClass {
        self.classify_detailed(url).class()
    }

    /// Classifies a raw string; unparseable input is unclassified
    pub fn classify_str(&self, url: &str) -> UrlClass {
        Url::parse(url.trim())
            .map(|u| self.classify(&u))
            .unwrap_or(UrlClass::Unclassified)
    }

    /// Splits URLs into listing, detail, and unclassified sets
    ///
    /// Ambiguous URLs are treated as listings and logged.
    pub fn partition<'a, I>(&self, urls: I) -> Partition
    where
        I: IntoIterator<Item = &'a Url>,
    {
        let mut partition = Partition::default();
        for url in urls {
            let classification = self.classify_detailed(url);
            if classification.is_ambiguous() {
                tracing::warn!(
                    "URL matches both listing and detail rules, treating as listing: {}",
                    url
                );
                partition.ambiguous.insert(url.clone());
            }
            let bucket = match classification.class() {
                UrlClass::ListingPage => &mut partition.listings,
                UrlClass::DetailPage => &mut partition.details,
                UrlClass::Unclassified => &mut partition.unclassified,
            };
            bucket.insert(url.clone());
        }
        partition
    }
}
