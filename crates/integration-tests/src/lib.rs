//! Integration tests for Storeshelf.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p storeshelf-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `api_products` - Router-level tests of the JSON API over an in-memory
//!   product source
//! - `gumroad_client` - The real Gumroad client against a local stub server
//!
//! Nothing here needs network access or credentials.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::Value;
use storeshelf_core::Product;
use storeshelf_storefront::catalog::{ManualClock, ProductCatalog};
use storeshelf_storefront::config::CatalogConfig;
use storeshelf_storefront::state::AppState;
use storeshelf_storefront::testing::FakeSource;
use tower::ServiceExt;

/// Client IP sent with every request so the rate limiter has a key.
pub const TEST_CLIENT_IP: &str = "203.0.113.7";

/// Start of the manual clock used by every test app.
pub const CLOCK_START_MILLIS: i64 = 1_700_000_000_000;

/// A storefront router over an in-memory upstream.
pub struct TestApp {
    pub source: Arc<FakeSource>,
    pub clock: Arc<ManualClock>,
    pub catalog: ProductCatalog,
    pub config: CatalogConfig,
    router: Router,
}

impl TestApp {
    /// Build an app whose upstream serves `products`.
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        let config = CatalogConfig {
            upstream_timeout: Duration::from_millis(100),
            ..CatalogConfig::default()
        };
        let source = Arc::new(FakeSource::new(products));
        let clock = Arc::new(ManualClock::new(CLOCK_START_MILLIS));
        let catalog = ProductCatalog::with_clock(source.clone(), &config, clock.clone());
        let router = storeshelf_storefront::app(AppState::new(catalog.clone()));

        Self {
            source,
            clock,
            catalog,
            config,
            router,
        }
    }

    /// Send a GET request and return the status and raw body.
    pub async fn get_raw(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .uri(uri)
            .header("x-forwarded-for", TEST_CLIENT_IP)
            .body(Body::empty())
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    /// Send a GET request and parse the body as JSON.
    pub async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let (status, body) = self.get_raw(uri).await;
        (status, serde_json::from_slice(&body).unwrap())
    }
}

/// IDs of the products in a `{"products": [...]}` envelope, in order.
#[must_use]
pub fn product_ids(body: &Value) -> Vec<String> {
    body["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect()
}
