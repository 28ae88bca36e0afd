use crate::url::rules::{Rule, RuleKind};
use crate::UrlError;
use regex::Regex;

/// Which rule families fired for a path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleHits {
    pub listing_match: bool,
    pub listing_exclude: bool,
    pub detail_match: bool,
    pub detail_exclude: bool,
}

impl RuleHits {
    pub fn is_listing(&self) -> bool {
        self.listing_match && !self.listing_exclude
    }

    pub fn is_detail(&self) -> bool {
        self.detail_match && !self.detail_exclude
    }
}

/// A compiled rule table
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<(RuleKind, Regex)>,
}

impl RuleSet {
    /// Compiles a rule table
    ///
    /// # Returns
    ///
    /// * `Ok(RuleSet)` - Every pattern compiled
    /// * `Err(UrlError::InvalidRule)` - The first pattern that failed
    pub fn compile(rules: &[Rule]) -> Result<Self, UrlError> {
        let rules = rules
            .iter()
            .map(|rule| {
                Regex::new(rule.pattern)
                    .map(|re| (rule.kind, re))
                    .map_err(|e| UrlError::InvalidRule {
                        pattern: rule.pattern.to_string(),
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Evaluates every rule against a relative path
    pub fn evaluate(&self, path: &str) -> RuleHits {
        let mut hits = RuleHits::default();
        for (kind, re) in &self.rules {
            let flag = match kind {
                RuleKind::ListingMatch => &mut hits.listing_match,
                RuleKind::ListingExclude => &mut hits.listing_exclude,
                RuleKind::DetailMatch => &mut hits.detail_match,
                RuleKind::DetailExclude => &mut hits.detail_exclude,
            };
            if !*flag && re.is_match(path) {
                *flag = true;
            }
        }
        hits
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
