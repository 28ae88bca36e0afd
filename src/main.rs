//! Catalog Harvester main entry point
//!
//! This is the command-line interface for the catalog harvester.

use anyhow::Context;
use catalog_harvester::config::{load_config_with_hash, load_input_urls, validate, Config};
use catalog_harvester::crawler::{
    discover_seed_listings, ChromeRenderer, Harvester, HttpFetcher, PageFetcher, PageRenderer,
};
use catalog_harvester::output::{print_summary, write_outputs, RunStats};
use catalog_harvester::url::{SiteScope, UrlClassifier};
use clap::Parser;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Catalog Harvester: turns a retailer's catalog into structured records
///
/// Listing pages are expanded in a headless browser to discover every
/// product page; product pages are extracted through structured data,
/// heuristics, and a rendered pass, under bounded, polite concurrency.
#[derive(Parser, Debug)]
#[command(name = "catalog-harvester")]
#[command(version = "1.0.0")]
#[command(about = "Harvests product records from a catalog site", long_about = None)]
struct Cli {
    /// Newline-delimited file of listing and product URLs
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Directory the output files are written to
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Maximum number of pages in flight
    #[arg(short, long, value_name = "N")]
    concurrency: Option<u32>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Skip the headless browser; expand and extract from static HTML only
    #[arg(long)]
    no_browser: bool,

    /// Seed additional listings from the site's HTML sitemap
    #[arg(long)]
    sitemap: bool,

    /// Classify the input and show what would be harvested, then exit
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = match load_configuration(&cli) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!("Failed to load configuration: {:#}", e);
            return Err(e);
        }
    };

    let scope = SiteScope::parse(&config.site.base_url)
        .with_context(|| format!("invalid base URL {}", config.site.base_url))?;

    let input = match load_input_urls(&cli.input, &scope) {
        Ok(urls) => urls,
        Err(e) => {
            tracing::error!("Failed to load input URLs: {}", e);
            return Err(e).context("could not read the input file");
        }
    };
    tracing::info!(
        "Loaded {} in-scope URLs from {}",
        input.len(),
        cli.input.display()
    );

    if cli.dry_run {
        return handle_dry_run(&config, scope, &input);
    }

    handle_harvest(config, &config_hash, &input, cli.sitemap).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_harvester=info,warn"),
            1 => EnvFilter::new("catalog_harvester=debug,info"),
            2 => EnvFilter::new("catalog_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (if any), applies CLI overrides, and validates
fn load_configuration(cli: &Cli) -> anyhow::Result<(Config, String)> {
    if let Some(path) = &cli.config {
        tracing::info!("Loading configuration from: {}", path.display());
    }
    let (mut config, config_hash) = load_config_with_hash(cli.config.as_deref())
        .context("could not load configuration")?;

    if let Some(dir) = &cli.output {
        config.output.directory = dir.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        config.crawler.concurrency = concurrency;
    }
    if cli.no_browser {
        config.browser.enabled = false;
    }

    validate(&config).context("invalid configuration")?;
    tracing::debug!("Configuration loaded (hash: {})", config_hash);
    Ok((config, config_hash))
}

/// Handles the --dry-run mode: shows how the input would be harvested
fn handle_dry_run(config: &Config, scope: SiteScope, input: &[Url]) -> anyhow::Result<()> {
    let classifier = UrlClassifier::new(scope).context("invalid classification rules")?;
    let partition = classifier.partition(input);

    println!("=== Catalog Harvester Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Brand: {}", config.site.brand);
    println!("  Currency: {}", config.site.currency);

    println!("\nCrawler:");
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Max attempts: {}", config.crawler.max_attempts);
    println!("  Browser: {}", if config.browser.enabled { "enabled" } else { "disabled" });

    println!("\nListing URLs ({}):", partition.listings.len());
    for url in &partition.listings {
        let marker = if partition.ambiguous.contains(url) { " (ambiguous)" } else { "" };
        println!("  - {}{}", url, marker);
    }

    println!("\nProduct URLs ({}):", partition.details.len());
    for url in &partition.details {
        println!("  - {}", url);
    }

    println!("\nIgnored URLs ({}):", partition.unclassified.len());
    for url in &partition.unclassified {
        println!("  - {}", url);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Output would be written to {}", config.output.directory.display());

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: Config,
    config_hash: &str,
    input: &[Url],
    use_sitemap: bool,
) -> anyhow::Result<()> {
    let fetcher: Arc<dyn PageFetcher> = Arc::new(
        HttpFetcher::from_config(&config.user_agent).context("could not build the HTTP client")?,
    );

    let browser = if config.browser.enabled {
        match ChromeRenderer::launch(&config.browser, &config.user_agent.header_value()).await {
            Ok(browser) => Some(Arc::new(browser)),
            Err(e) => {
                tracing::warn!("Browser unavailable, continuing with static HTML only: {}", e);
                None
            }
        }
    } else {
        tracing::info!("Browser disabled, expanding and extracting from static HTML only");
        None
    };
    let renderer = browser
        .clone()
        .map(|b| b as Arc<dyn PageRenderer>);

    let output = config.output.clone();
    let sitemap_path = config.site.sitemap_path.clone();
    let fallback_listings = config.site.fallback_listings.clone();
    let harvester = Harvester::new(config, fetcher.clone(), renderer)?;

    let seeds = if use_sitemap {
        discover_seed_listings(
            fetcher.as_ref(),
            harvester.classifier(),
            &sitemap_path,
            &fallback_listings,
        )
        .await
    } else {
        BTreeSet::new()
    };

    let report = harvester.run(input, seeds).await;

    if let Some(browser) = &browser {
        browser.shutdown().await;
    }

    if let Err(e) = write_outputs(&output, &report, config_hash) {
        tracing::error!("Failed to write outputs: {}", e);
        return Err(e).with_context(|| {
            format!("could not write outputs to {}", output.directory.display())
        });
    }

    print_summary(&RunStats::from_report(&report));
    tracing::info!("Harvest complete");
    Ok(())
}
