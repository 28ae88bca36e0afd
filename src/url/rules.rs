//! The catalog URL rule table
//!
//! Patterns are matched against the lowercased path relative to the site
//! namespace, e.g. `/smartphones/all-smartphones/`.

/// What a matching rule says about a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Evidence that the URL is a listing page
    ListingMatch,
    /// Veto on the listing verdict
    ListingExclude,
    /// Evidence that the URL is a product detail page
    DetailMatch,
    /// Veto on the detail verdict
    DetailExclude,
}

/// One entry of the classification table
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub kind: RuleKind,
    pub pattern: &'static str,
}

const fn rule(kind: RuleKind, pattern: &'static str) -> Rule {
    Rule { kind, pattern }
}

use RuleKind::*;

/// Default rules for the catalog site
///
/// A URL is a listing when some `ListingMatch` rule fires and no
/// `ListingExclude` rule does; detail likewise.
pub const DEFAULT_RULES: &[Rule] = &[
    // "all products" collections: /smartphones/all-smartphones/
    rule(ListingMatch, r"/all-[^/]+/?$"),
    // Category roots
    rule(
        ListingMatch,
        r"^/(smartphones|tablets|watches|audio-sound|audio-video|galaxy-buds|computers|galaxy-book|home-appliances|tvs|monitors|refrigerators|washers-and-dryers|dishwashers|cooking-appliances|vacuum-cleaners|memory-storage|audio-devices|projectors|mobile-accessories)/?$",
    ),
    // Two-segment category paths: /tvs/oled-tv/
    rule(ListingMatch, r"^/[^/]+/[^/]+/$"),
    // Anything carrying a model code is a product, not a listing
    rule(ListingExclude, r"/[^/]+-[a-z]{2}-[a-z0-9]+/"),
    rule(ListingExclude, r"/[a-z]{2}\d+[a-z0-9]+/"),
    rule(ListingExclude, r"/hw-[a-z0-9-]+/"),
    rule(ListingExclude, r"/np\d+[a-z]+"),
    rule(ListingExclude, r"/vs\d+[a-z]+"),
    // Editorial sections
    rule(ListingExclude, r"/buying-guide/"),
    rule(ListingExclude, r"/learn/"),
    rule(ListingExclude, r"/compare/"),
    rule(ListingExclude, r"/help-me-choose/"),
    rule(ListingExclude, r"/highlights/"),
    // Slug ending in a long model code: ...-sm-s928bzkheub/
    rule(DetailMatch, r"/[^/]+-[a-z]{2}-[a-z0-9]{10,}/"),
    // Bare model-code slugs by product family
    rule(DetailMatch, r"/qe\d+[a-z]+\d+[a-z]+/"),
    rule(DetailMatch, r"/ls\d+[a-z]+\d+[a-z]+/"),
    rule(DetailMatch, r"/hw-[a-z0-9-]+/"),
    rule(DetailMatch, r"/np\d+[a-z]+-[a-z0-9]+/"),
    rule(DetailMatch, r"/vs\d+[a-z]+\d+[a-z]+/"),
    rule(DetailMatch, r"/sm-[a-z0-9]+-[a-z]+/"),
    rule(DetailMatch, r"/ww\d+[a-z]+\d+[a-z]+/"),
    rule(DetailMatch, r"/rl\d+[a-z]+\d+[a-z]+/"),
    // Descriptive slugs with product attributes
    rule(DetailMatch, r"/[^/]+-\d+[^/]*-inch-[^/]+/"),
    rule(DetailMatch, r"/[^/]+-\d+hz-[^/]+/"),
    rule(DetailMatch, r"/[^/]+-\d+gb-[^/]+/"),
    rule(DetailMatch, r"/[^/]+-ultra-[^/]+/"),
    rule(DetailMatch, r"/[^/]+-pro-[^/]+/"),
    rule(DetailMatch, r"/galaxy-[^/]+-[^/]+-[^/]+/"),
    rule(DetailMatch, r"/bespoke-[^/]+-[^/]+/"),
    rule(DetailExclude, r"/all-"),
    rule(DetailExclude, r"/buying-guide/"),
    rule(DetailExclude, r"/learn/"),
    rule(DetailExclude, r"/compare/"),
    rule(DetailExclude, r"/help-me-choose/"),
    rule(DetailExclude, r"/highlights/"),
    rule(DetailExclude, r"/why-"),
    rule(DetailExclude, r"/buy/?$"),
    // The namespace root and single-segment paths are never products
    rule(DetailExclude, r"^/[^/]*/?$"),
];
