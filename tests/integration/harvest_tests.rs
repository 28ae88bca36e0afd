use catalog_harvester::config::Config;
use catalog_harvester::crawler::{Harvester, HttpFetcher, PageFetcher};
use catalog_harvester::extract::ExtractionStrategy;
use catalog_harvester::output::{write_outputs, RunStats};
use catalog_harvester::DiscoveryMethod;
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING: &str = "/uk/tvs/all-tvs/";
const OLED: &str = "/uk/tvs/oled-tv/qe65s95datxxu/";
const QLED: &str = "/uk/tvs/qled-tv/qe55q80catxxu/";
const OLED_LISTING: &str = "/uk/tvs/oled-tv/";
const NAMELESS: &str = "/uk/monitors/gaming/ls27dg602suxxu/";

/// Creates a test configuration pointed at the mock site
fn create_test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.site.base_url = format!("{}/uk/", server.uri());
    config.crawler.concurrency = 3;
    config.crawler.politeness_delay_ms = 0;
    config.crawler.expansion_delay_ms = 0;
    config.crawler.backoff_base_ms = 1;
    config.crawler.backoff_max_ms = 5;
    config.browser.enabled = false;
    config
}

fn structured_product(name: &str, price: &str) -> String {
    format!(
        r#"<html><head>
        <title>{name} | Samsung UK</title>
        <script type="application/ld+json">
        {{
            "@context": "https://schema.org",
            "@type": "Product",
            "name": "{name}",
            "sku": "SKU-{price}",
            "image": "/images/{price}.jpg",
            "offers": {{
                "@type": "Offer",
                "price": "{price}",
                "priceCurrency": "GBP",
                "availability": "https://schema.org/InStock"
            }}
        }}
        </script></head><body></body></html>"#
    )
}

fn heuristic_product(name: &str) -> String {
    format!(
        r#"<html><body>
        <h1 class="pdp-product-name">{name}</h1>
        <div class="price-current">£1,299.00</div>
        <div class="stock-status">Out of stock</div>
        </body></html>"#
    )
}

async fn mount_page(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

fn url(server: &MockServer, page: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), page)).expect("valid test URL")
}

fn harvester(config: Config) -> Harvester {
    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(reqwest::Client::new()));
    Harvester::new(config, fetcher, None).expect("valid harvester")
}

#[tokio::test]
async fn test_listing_and_detail_harvest() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(&server)
        .await;

    // The listing links to both products, one of them twice, plus a
    // product that is also given directly as input
    mount_page(
        &server,
        LISTING,
        format!(
            r#"<html><body>
            <a href="{OLED}">S95D</a>
            <a href="{QLED}">Q80C</a>
            <a href="{QLED}#reviews">Q80C again</a>
            <a href="/uk/support/">Support</a>
            <a href="https://elsewhere.example/uk/tvs/qled-tv/qe55q80catxxu/">Offsite</a>
            </body></html>"#
        ),
    )
    .await;
    mount_page(&server, OLED, structured_product("S95D OLED", "2499.00")).await;
    mount_page(&server, QLED, heuristic_product("Q80C QLED")).await;

    let harvester = harvester(create_test_config(&server));
    let input = vec![url(&server, LISTING), url(&server, OLED)];
    let report = harvester.run(&input, BTreeSet::new()).await;
    let state = &report.state;

    assert_eq!(state.attempted(), 2);
    assert_eq!(state.succeeded(), 2);
    assert_eq!(state.failed(), 0);
    assert_eq!(state.counters.listings_expanded, 1);

    let oled = &state.records[url(&server, OLED).as_str()];
    assert_eq!(oled.name, "S95D OLED");
    assert_eq!(oled.price, Some(2499.0));
    assert_eq!(oled.sku.as_deref(), Some("SKU-2499.00"));
    assert_eq!(
        oled.image_url.as_deref(),
        Some(format!("{}/images/2499.00.jpg", server.uri()).as_str())
    );

    let qled = &state.records[url(&server, QLED).as_str()];
    assert_eq!(qled.name, "Q80C QLED");
    assert_eq!(qled.price, Some(1299.0));
    assert_eq!(qled.category.as_deref(), Some("Tvs"));

    let stats = RunStats::from_report(&report);
    assert_eq!(stats.by_strategy[&ExtractionStrategy::StaticStructuredData], 1);
    assert_eq!(stats.by_strategy[&ExtractionStrategy::StaticHeuristic], 1);

    let meta = &state.metadata[url(&server, QLED).as_str()];
    assert_eq!(meta.source_listing_url, url(&server, LISTING).as_str());
    assert_eq!(meta.method, DiscoveryMethod::StaticListing);
}

#[tokio::test]
async fn test_product_shared_by_two_listings_is_harvested_once() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        LISTING,
        format!(r#"<a href="{OLED}">S95D</a><a href="{QLED}">Q80C</a>"#),
    )
    .await;
    mount_page(
        &server,
        OLED_LISTING,
        format!(r#"<a href="{OLED}">S95D OLED TV</a>"#),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(OLED))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(structured_product("S95D OLED", "2499.00"))
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, QLED, heuristic_product("Q80C QLED")).await;

    let harvester = harvester(create_test_config(&server));
    let input = vec![url(&server, LISTING), url(&server, OLED_LISTING)];
    let report = harvester.run(&input, BTreeSet::new()).await;
    let state = &report.state;

    assert_eq!(state.counters.listings_expanded, 2);
    assert_eq!(state.discovered_urls.len(), 2);
    assert_eq!(state.attempted(), 2);
    assert_eq!(state.succeeded(), 2);
    let oled_records = state
        .records()
        .filter(|r| r.url == url(&server, OLED).as_str())
        .count();
    assert_eq!(oled_records, 1);
}

#[tokio::test]
async fn test_transient_error_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(OLED))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, OLED, structured_product("S95D OLED", "2499.00")).await;

    let harvester = harvester(create_test_config(&server));
    let report = harvester.run(&[url(&server, OLED)], BTreeSet::new()).await;

    assert_eq!(report.state.succeeded(), 1);
    assert_eq!(report.state.counters.retries, 1);
}

#[tokio::test]
async fn test_persistent_server_error_is_bounded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(OLED))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let harvester = harvester(create_test_config(&server));
    let report = harvester.run(&[url(&server, OLED)], BTreeSet::new()).await;

    assert_eq!(report.state.failed(), 1);
    assert_eq!(report.state.counters.retries, 2);
    // Mock expectations are verified when the server is dropped
}

#[tokio::test]
async fn test_outputs_written_with_failures() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("temp dir");

    mount_page(
        &server,
        LISTING,
        format!(r#"<a href="{OLED}">S95D</a><a href="{NAMELESS}">Monitor</a>"#),
    )
    .await;
    mount_page(&server, OLED, structured_product("S95D OLED", "2499.00")).await;
    mount_page(
        &server,
        NAMELESS,
        "<html><body><p>Nothing to see</p></body></html>".to_string(),
    )
    .await;

    let mut config = create_test_config(&server);
    config.output.directory = dir.path().join("out");
    let output = config.output.clone();

    let harvester = harvester(config);
    let input = vec![url(&server, LISTING), url(&server, NAMELESS)];
    let report = harvester.run(&input, BTreeSet::new()).await;

    write_outputs(&output, &report, "test-hash").expect("outputs written");

    let records = std::fs::read_to_string(output.records_path()).expect("records file");
    let lines: Vec<serde_json::Value> = records
        .lines()
        .map(|l| serde_json::from_str(l).expect("valid JSON line"))
        .collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["name"], "S95D OLED");
    assert_eq!(lines[0]["availability"], "in_stock");
    assert_eq!(lines[0]["currency"], "GBP");

    let failures = std::fs::read_to_string(output.failures_path()).expect("failures file");
    assert_eq!(failures, format!("{}\n", url(&server, NAMELESS)));

    let metadata: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(output.metadata_path()).expect("metadata file"),
    )
    .expect("valid metadata JSON");
    assert_eq!(
        metadata[url(&server, OLED).as_str()]["method"],
        "static_listing"
    );

    let conn = rusqlite::Connection::open(output.snapshot_path()).expect("snapshot opens");
    let hash: String = conn
        .query_row("SELECT config_hash FROM runs", [], |row| row.get(0))
        .expect("run row");
    assert_eq!(hash, "test-hash");
}
