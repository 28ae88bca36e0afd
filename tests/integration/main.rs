//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the catalog site and run the
//! full pipeline end-to-end without a browser.

mod harvest_tests;
