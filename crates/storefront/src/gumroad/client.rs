//! Gumroad v2 REST client.
//!
//! Uses `reqwest` with a client-wide request timeout. Gumroad has no slug
//! endpoint, so slug lookups scan the product list.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use storeshelf_core::Product;
use tracing::{debug, instrument};
use url::Url;

use super::conversions::convert_product;
use super::types::{GumroadProduct, ProductResponse, ProductsResponse};
use super::{ProductSource, UpstreamError};
use crate::config::GumroadConfig;

/// Characters of an upstream body kept in logs and errors.
const BODY_EXCERPT_LEN: usize = 200;

/// Client for the Gumroad products API.
#[derive(Clone)]
pub struct GumroadClient {
    inner: Arc<GumroadClientInner>,
}

struct GumroadClientInner {
    client: reqwest::Client,
    api_base: Url,
    access_token: SecretString,
}

impl GumroadClient {
    /// Create a new Gumroad API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &GumroadConfig, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            inner: Arc::new(GumroadClientInner {
                client,
                api_base: config.api_base.clone(),
                access_token: config.access_token.clone(),
            }),
        })
    }

    /// Build `{api_base}/v2/products[/{id}]?access_token=...`.
    fn products_url(&self, id: Option<&str>) -> Result<Url, UpstreamError> {
        let mut url = self.inner.api_base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                UpstreamError::InvalidUrl(format!(
                    "{} cannot be a base URL",
                    self.inner.api_base
                ))
            })?;
            segments.pop_if_empty().extend(["v2", "products"]);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        url.query_pairs_mut()
            .append_pair("access_token", self.inner.access_token.expose_secret());
        Ok(url)
    }

    /// Execute a GET request.
    ///
    /// Returns `Ok(None)` on HTTP 404.
    async fn execute<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, UpstreamError> {
        let response = self.inner.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(UpstreamError::RateLimited(retry_after));
        }

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        // Read as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %excerpt(&response_text),
                "Gumroad API returned non-success status"
            );
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: excerpt(&response_text),
            });
        }

        match serde_json::from_str(&response_text) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %excerpt(&response_text),
                    "Failed to parse Gumroad response"
                );
                Err(UpstreamError::Parse(e))
            }
        }
    }
}

#[async_trait]
impl ProductSource for GumroadClient {
    #[instrument(skip(self))]
    async fn fetch_product_by_id(&self, id: &str) -> Result<Option<Product>, UpstreamError> {
        let url = self.products_url(Some(id))?;
        let Some(body) = self.execute::<ProductResponse>(url).await? else {
            debug!("Gumroad product not found");
            return Ok(None);
        };

        if !body.success {
            return failure_or_not_found(body.message);
        }

        match body.product {
            Some(product) if product.is_listed() => convert_product(product).map(Some),
            Some(_) => {
                debug!("Gumroad product is unpublished");
                Ok(None)
            }
            None => Err(UpstreamError::Malformed(
                "success response without product".to_string(),
            )),
        }
    }

    #[instrument(skip(self))]
    async fn fetch_product_by_slug(&self, slug: &str) -> Result<Option<Product>, UpstreamError> {
        let products = self.fetch_all_products().await?;
        Ok(products.into_iter().find(|p| p.slug == slug))
    }

    #[instrument(skip(self))]
    async fn fetch_all_products(&self) -> Result<Vec<Product>, UpstreamError> {
        let url = self.products_url(None)?;
        let body = self
            .execute::<ProductsResponse>(url)
            .await?
            .ok_or_else(|| UpstreamError::Status {
                status: StatusCode::NOT_FOUND.as_u16(),
                body: "products endpoint not found".to_string(),
            })?;

        if !body.success {
            return Err(UpstreamError::Api(
                body.message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            ));
        }

        convert_listing(body.products)
    }
}

/// Convert a listing, dropping unlisted products and skipping malformed ones.
///
/// A non-empty listing in which every product is malformed is an error.
fn convert_listing(raw: Vec<GumroadProduct>) -> Result<Vec<Product>, UpstreamError> {
    let listed: Vec<GumroadProduct> = raw.into_iter().filter(GumroadProduct::is_listed).collect();
    let total = listed.len();

    let mut products = Vec::with_capacity(total);
    let mut last_error = None;
    for item in listed {
        match convert_product(item) {
            Ok(product) => products.push(product),
            Err(e) => {
                tracing::error!(error = %e, kind = "malformed", "Skipping malformed Gumroad product");
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if products.is_empty() => Err(e),
        _ => {
            debug!(count = products.len(), total, "Converted Gumroad listing");
            Ok(products)
        }
    }
}

/// Map a `success: false` envelope to not-found or an API error.
fn failure_or_not_found(message: Option<String>) -> Result<Option<Product>, UpstreamError> {
    let message = message.unwrap_or_else(|| "request was not successful".to_string());
    if message.to_lowercase().contains("not found") {
        Ok(None)
    } else {
        Err(UpstreamError::Api(message))
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_LEN).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> GumroadClient {
        let config = GumroadConfig {
            api_base: Url::parse(base).unwrap(),
            access_token: SecretString::from("tok3n+with/chars"),
        };
        GumroadClient::new(&config, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_products_url_listing() {
        let url = client("https://api.gumroad.com").products_url(None).unwrap();
        assert_eq!(url.path(), "/v2/products");
        assert!(url.query().unwrap().starts_with("access_token="));
    }

    #[test]
    fn test_products_url_escapes_id() {
        let url = client("https://api.gumroad.com/")
            .products_url(Some("A-m3C/DC5dl=="))
            .unwrap();
        assert_eq!(url.path(), "/v2/products/A-m3C%2FDC5dl==");
    }

    #[test]
    fn test_products_url_keeps_base_path() {
        let url = client("http://127.0.0.1:9000/proxy/")
            .products_url(Some("abc"))
            .unwrap();
        assert_eq!(url.path(), "/proxy/v2/products/abc");
    }

    #[test]
    fn test_failure_or_not_found() {
        assert!(matches!(
            failure_or_not_found(Some("The product was not found.".to_string())),
            Ok(None)
        ));
        assert!(matches!(
            failure_or_not_found(Some("The access token is invalid.".to_string())),
            Err(UpstreamError::Api(_))
        ));
    }

    #[test]
    fn test_convert_listing_skips_malformed_and_unlisted() {
        let good = GumroadProduct {
            id: Some("a".to_string()),
            ..Default::default()
        };
        let malformed = GumroadProduct::default();
        let unpublished = GumroadProduct {
            id: Some("b".to_string()),
            published: Some(false),
            ..Default::default()
        };

        let products = convert_listing(vec![good, malformed, unpublished]).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id.as_str(), "a");
    }

    #[test]
    fn test_convert_listing_all_malformed_is_error() {
        let result = convert_listing(vec![GumroadProduct::default()]);
        assert!(matches!(result, Err(UpstreamError::Malformed(_))));
        assert!(convert_listing(Vec::new()).unwrap().is_empty());
    }
}
