//! Router-level tests of the product JSON API.
//!
//! Each test builds the full storefront router (middleware included) over an
//! in-memory upstream and drives it with `tower::ServiceExt::oneshot`.

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use storeshelf_core::Product;
use storeshelf_integration_tests::{TestApp, product_ids};
use storeshelf_storefront::testing::{Failure, product, wait_for_refreshes};

/// a: free, b: $15 in Frontend, c: $60.
fn catalog_products() -> Vec<Product> {
    let mut b = product("b", 1500);
    b.categories.insert("Frontend".to_string());
    b.tags.insert("react".to_string());
    let mut c = product("c", 6000);
    c.tags.insert("react".to_string());
    vec![product("a", 0), b, c]
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_is_ok() {
    let app = TestApp::new(Vec::new());
    let (status, body) = app.get_raw("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn test_ready_once_listing_is_cached() {
    let app = TestApp::new(catalog_products());

    let (status, _) = app.get_raw("/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    app.catalog.prewarm().await.unwrap();
    let (status, _) = app.get_raw("/health/ready").await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_list_all_products() {
    let app = TestApp::new(catalog_products());
    let (status, body) = app.get_json("/api/products").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert!(body.get("error").is_none());
    assert_eq!(product_ids(&body), ["a", "b", "c"]);
}

#[tokio::test]
async fn test_list_filters_by_category() {
    let app = TestApp::new(catalog_products());
    let (_, body) = app.get_json("/api/products?categories=Frontend").await;
    assert_eq!(product_ids(&body), ["b"]);
}

#[tokio::test]
async fn test_list_filters_free() {
    let app = TestApp::new(catalog_products());
    let (_, body) = app.get_json("/api/products?price=free").await;
    assert_eq!(product_ids(&body), ["a"]);
}

#[tokio::test]
async fn test_list_price_ranges_are_ored() {
    let app = TestApp::new(catalog_products());
    let (_, body) = app.get_json("/api/products?price=free,over_50").await;
    assert_eq!(product_ids(&body), ["a", "c"]);
}

#[tokio::test]
async fn test_list_sorts_by_price_desc() {
    let app = TestApp::new(catalog_products());
    let (_, body) = app.get_json("/api/products?sort=price_desc").await;
    assert_eq!(product_ids(&body), ["c", "b", "a"]);
}

#[tokio::test]
async fn test_list_unknown_price_is_bad_request() {
    let app = TestApp::new(catalog_products());
    let (status, body) = app.get_json("/api/products?price=cheap").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("cheap"));
    assert_eq!(app.source.total_calls(), 0);
}

#[tokio::test]
async fn test_list_served_stale_when_upstream_hangs() {
    let app = TestApp::new(catalog_products());
    app.get_json("/api/products").await;

    app.source.fail_with(Failure::Hang);
    app.clock
        .advance(app.config.listing_ttl + Duration::from_secs(1));

    let (status, body) = app.get_json("/api/products?categories=Frontend").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product_ids(&body), ["b"]);

    wait_for_refreshes(&app.catalog).await;
    assert_eq!(app.catalog.stats().refresh_failures, 1);
}

#[tokio::test]
async fn test_list_cold_upstream_failure_is_500() {
    let app = TestApp::new(catalog_products());
    app.source.fail_with(Failure::Unavailable);

    let (status, body) = app.get_json("/api/products").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "success": false, "error": "Product service unavailable" })
    );
}

// ============================================================================
// Single product
// ============================================================================

#[tokio::test]
async fn test_show_by_slug() {
    let app = TestApp::new(catalog_products());
    let (status, body) = app.get_json("/api/products/b-slug").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["product"]["id"], json!("b"));
    assert_eq!(body["product"]["categories"], json!(["Frontend"]));
}

#[tokio::test]
async fn test_show_falls_back_to_id() {
    let app = TestApp::new(catalog_products());
    let (status, body) = app.get_json("/api/products/c").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["slug"], json!("c-slug"));
}

#[tokio::test]
async fn test_show_by_id_route() {
    let app = TestApp::new(catalog_products());
    let (status, body) = app.get_json("/api/products/id/a").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["id"], json!("a"));
    assert_eq!(app.source.by_slug_calls(), 0);
}

#[tokio::test]
async fn test_reserved_id_segment() {
    let mut reserved = product("p-1", 100);
    reserved.slug = "id".to_string();
    let mut related = product("related", 200);
    related.slug = "related-thing".to_string();
    let app = TestApp::new(vec![reserved, related]);

    let (status, body) = app.get_json("/api/products/id").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["id"], json!("p-1"));

    let (status, body) = app.get_json("/api/products/id/related").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["id"], json!("related"));
}

#[tokio::test]
async fn test_show_missing_is_404() {
    let app = TestApp::new(catalog_products());
    let (status, body) = app.get_json("/api/products/missing-slug").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({ "success": false, "error": "Product not found: missing-slug" })
    );
}

#[tokio::test]
async fn test_show_blank_key_is_400() {
    let app = TestApp::new(catalog_products());
    let (status, body) = app.get_json("/api/products/%20").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_show_malformed_upstream_is_500() {
    let app = TestApp::new(catalog_products());
    app.source.fail_with(Failure::Malformed);

    let (status, body) = app.get_json("/api/products/id/a").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("Product service unavailable"));
}

#[tokio::test]
async fn test_show_is_cached() {
    let app = TestApp::new(catalog_products());
    app.get_json("/api/products/b-slug").await;
    app.get_json("/api/products/b-slug").await;

    assert_eq!(app.source.total_calls(), 1);
}

#[tokio::test]
async fn test_show_serves_stale_after_expiry() {
    let app = TestApp::new(catalog_products());
    app.get_json("/api/products/b-slug").await;

    app.source.fail_with(Failure::Unavailable);
    app.clock
        .advance(app.config.product_ttl + Duration::from_secs(1));

    let (status, body) = app.get_json("/api/products/b-slug").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["id"], json!("b"));
    wait_for_refreshes(&app.catalog).await;
}

// ============================================================================
// Related products
// ============================================================================

#[tokio::test]
async fn test_related_by_shared_taxonomy() {
    let app = TestApp::new(catalog_products());
    let (status, body) = app.get_json("/api/products/b-slug/related").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(product_ids(&body), ["c"]);
}

#[tokio::test]
async fn test_related_falls_back_to_other_products() {
    let app = TestApp::new(catalog_products());
    let (_, body) = app.get_json("/api/products/a-slug/related?limit=1").await;
    assert_eq!(product_ids(&body), ["b"]);
}

#[tokio::test]
async fn test_related_invalid_limit_is_400() {
    let app = TestApp::new(catalog_products());
    let (status, _) = app.get_json("/api/products/a-slug/related?limit=zero").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_related_missing_product_is_404() {
    let app = TestApp::new(catalog_products());
    let (status, _) = app.get_json("/api/products/nope/related").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Stats and middleware
// ============================================================================

#[tokio::test]
async fn test_stats_reflect_cache_traffic() {
    let app = TestApp::new(catalog_products());
    app.get_json("/api/products").await;
    app.get_json("/api/products").await;

    let (status, body) = app.get_json("/api/catalog/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["misses"], json!(1));
    assert_eq!(body["fresh_hits"], json!(1));
    assert_eq!(body["upstream_calls"], json!(1));
}

#[tokio::test]
async fn test_api_is_rate_limited_per_ip() {
    let app = TestApp::new(Vec::new());

    let mut statuses = Vec::new();
    for _ in 0..60 {
        let (status, _) = app.get_raw("/api/catalog/stats").await;
        statuses.push(status);
    }

    assert_eq!(statuses.first(), Some(&StatusCode::OK));
    assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn test_health_is_not_rate_limited() {
    let app = TestApp::new(Vec::new());
    for _ in 0..60 {
        let (status, _) = app.get_raw("/health").await;
        assert_eq!(status, StatusCode::OK);
    }
}
