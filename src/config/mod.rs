//! Configuration module for the harvester
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file, and reading the input URL list.
//!
//! # Example
//!
//! ```no_run
//! use catalog_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvester.toml")).unwrap();
//! println!("Harvesting with concurrency {}", config.crawler.concurrency);
//! ```

mod input;
mod parser;
mod types;
mod validation;

pub use types::{
    BrowserConfig, Config, CrawlerConfig, OutputConfig, SiteConfig, UserAgentConfig,
};

pub use input::{load_input_urls, parse_input_urls};
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_config, DEFAULT_CONFIG_HASH,
};
pub use validation::validate;
