//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `CrawlState`: run-scoped aggregate of URL sets, records, and failures
//! - `DiscoveryMetadata`: provenance of each discovered detail URL

mod crawl_state;
mod metadata;

pub use crawl_state::{CrawlState, RunCounters};
pub use metadata::{DiscoveryMetadata, DiscoveryMethod};
