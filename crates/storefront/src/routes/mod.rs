//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Readiness (listing cache populated)
//!
//! # Product API (rate limited per IP)
//! GET  /api/products               - Filtered, sorted listing
//! GET  /api/products/{key}         - Product by slug, falling back to ID
//! GET  /api/products/id/{id}       - Product by ID
//! GET  /api/products/{key}/related - Related products (?limit, default 3, max 12)
//! GET  /api/catalog/stats          - Catalog cache counters
//! ```
//!
//! The slug `id` is reserved: `/api/products/id` still resolves the product
//! with that slug, but `/api/products/id/related` is the ID lookup for a
//! product whose ID is `related`, not the related list of slug `id`.

pub mod api;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::get,
};

use crate::middleware::api_rate_limiter;
use crate::state::AppState;

/// Create the product API routes router.
pub fn product_api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(api::products::index))
        .route("/id/{id}", get(api::products::show_by_id))
        .route("/{key}", get(api::products::show))
        .route("/{key}/related", get(api::products::related))
}

/// Create the `/api` router with its rate limiter.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product_api_routes())
        .route("/catalog/stats", get(api::products::stats))
        .layer(api_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check upstream.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable until the product listing has been
/// loaded into the catalog cache.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.catalog().has_listing() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
