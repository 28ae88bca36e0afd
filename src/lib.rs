//! Catalog Harvester: a catalog discovery and product extraction pipeline
//!
//! This crate classifies catalog URLs, expands paginated listing pages in a
//! headless browser, and extracts normalized product records through an
//! ordered chain of extraction strategies under bounded concurrency.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod record;
pub mod robots;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Network failure, timeout, or transient HTTP status. Retryable.
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Render error for {url}: {message}")]
    Render { url: String, message: String },

    #[error("Parse error for {url}: {message}")]
    Parse { url: String, message: String },

    /// Every extraction strategy ran without producing a named record
    #[error("No extraction strategy produced a product for {url}")]
    ExtractionFailed { url: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Snapshot database error: {0}")]
    Snapshot(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Returns true for errors the orchestrator should retry with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, HarvestError::Transport { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Failed to read input file {path}: {source}")]
    Input {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Invalid classification rule '{pattern}': {message}")]
    InvalidRule { pattern: String, message: String },
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use record::{Availability, ProductRecord};
pub use state::{CrawlState, DiscoveryMetadata, DiscoveryMethod};
pub use url::{SiteScope, UrlClass, UrlClassifier};
