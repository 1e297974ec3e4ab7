//! Upstream product API: the `ProductSource` seam and its Gumroad client.
//!
//! # Architecture
//!
//! - Gumroad is the source of truth for products - NO local sync
//! - The catalog cache depends on the `ProductSource` trait only, so tests
//!   and alternative backends can stand in for Gumroad
//! - `GumroadClient` talks to the Gumroad v2 REST API over `reqwest`
//!
//! # Example
//!
//! ```rust,ignore
//! use storeshelf_storefront::gumroad::{GumroadClient, ProductSource};
//!
//! let client = GumroadClient::new(&config.gumroad, config.catalog.upstream_timeout)?;
//! let products = client.fetch_all_products().await?;
//! ```

mod client;
mod conversions;
pub mod types;

pub use client::GumroadClient;

use async_trait::async_trait;
use storeshelf_core::Product;
use thiserror::Error;

/// Errors that can occur when talking to the upstream product API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// HTTP request failed (connect, TLS, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Upstream answered with a non-success HTTP status.
    #[error("Upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Rate limited by upstream.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Upstream reported `success: false` for a reason other than not-found.
    #[error("API error: {0}")]
    Api(String),

    /// Upstream data failed shape validation (e.g., missing `id`).
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Request URL could not be built from the configured base.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// A source of product data.
///
/// `Ok(None)` means upstream confirmed the product does not exist. Every
/// other failure is an `Err`.
#[async_trait]
pub trait ProductSource: Send + Sync + 'static {
    /// Look up one product by its upstream ID.
    async fn fetch_product_by_id(&self, id: &str) -> Result<Option<Product>, UpstreamError>;

    /// Look up one product by its slug (permalink).
    async fn fetch_product_by_slug(&self, slug: &str) -> Result<Option<Product>, UpstreamError>;

    /// Fetch every published product, newest first.
    async fn fetch_all_products(&self) -> Result<Vec<Product>, UpstreamError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_display() {
        let err = UpstreamError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "Upstream returned HTTP 502: bad gateway");
    }

    #[test]
    fn test_rate_limited_error() {
        let err = UpstreamError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }

    #[test]
    fn test_malformed_error() {
        let err = UpstreamError::Malformed("product is missing id".to_string());
        assert_eq!(err.to_string(), "Malformed response: product is missing id");
    }
}
