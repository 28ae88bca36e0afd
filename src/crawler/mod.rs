//! Crawler module for page fetching, rendering, and harvest coordination
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching and HTML link extraction
//! - Headless browser rendering behind the [`PageRenderer`] seam
//! - Listing expansion through scroll and "load more" controls
//! - Concurrency limiting, pacing, and retry backoff
//! - Overall harvest coordination

mod browser;
mod controls;
mod coordinator;
mod discovery;
mod expander;
mod fetcher;
mod page;
mod parser;
mod scheduler;

pub use browser::ChromeRenderer;
pub use controls::{ControlTier, ProgressProbe, FINDER_CLASS_MARKER};
pub use coordinator::{HarvestReport, Harvester};
pub use discovery::discover_seed_listings;
pub use expander::{ExpansionOutcome, ExpansionSettings, ListingExpander};
pub use fetcher::{build_http_client, FetchError, FetchedPage, HttpFetcher, PageFetcher};
pub use page::{
    ControlInfo, ControlQuery, InterceptedPayload, PageRenderer, RenderError, RenderOptions,
    RenderedPage,
};
pub use parser::{parse_html, ParsedPage};
pub use scheduler::{Admission, RetryPolicy, Scheduler};

pub(crate) use parser::extract_title;
