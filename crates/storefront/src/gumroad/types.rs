//! Wire types for the Gumroad v2 products API.
//!
//! These mirror the JSON Gumroad sends and are converted into
//! `storeshelf_core::Product` before leaving the `gumroad` module.

use serde::{Deserialize, Deserializer};

/// `GET /v2/products` response body.
#[derive(Debug, Deserialize)]
pub struct ProductsResponse {
    pub success: bool,
    #[serde(default)]
    pub products: Vec<GumroadProduct>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `GET /v2/products/:id` response body.
#[derive(Debug, Deserialize)]
pub struct ProductResponse {
    pub success: bool,
    #[serde(default)]
    pub product: Option<GumroadProduct>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A product as Gumroad describes it.
///
/// Every field is optional on the wire; shape validation happens during
/// conversion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GumroadProduct {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub custom_permalink: Option<String>,
    #[serde(default)]
    pub short_url: Option<String>,
    /// Price in minor units.
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub formatted_price: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub sales_count: Option<u64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub published: Option<bool>,
    #[serde(default)]
    pub deleted: Option<bool>,
}

impl GumroadProduct {
    /// Whether the product should be visible on the storefront.
    #[must_use]
    pub fn is_listed(&self) -> bool {
        self.published.unwrap_or(true) && !self.deleted.unwrap_or(false)
    }
}

/// Gumroad sends `sales_count` as a number or as a numeric string.
fn number_or_string<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sales_count_accepts_number_and_string() {
        let numeric: GumroadProduct = serde_json::from_str(r#"{"sales_count": 7}"#).unwrap();
        assert_eq!(numeric.sales_count, Some(7));

        let text: GumroadProduct = serde_json::from_str(r#"{"sales_count": "12"}"#).unwrap();
        assert_eq!(text.sales_count, Some(12));

        let missing: GumroadProduct = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.sales_count, None);
    }

    #[test]
    fn test_is_listed() {
        let mut product = GumroadProduct::default();
        assert!(product.is_listed());

        product.published = Some(false);
        assert!(!product.is_listed());

        product.published = Some(true);
        product.deleted = Some(true);
        assert!(!product.is_listed());
    }

    #[test]
    fn test_products_response_parses_failure_envelope() {
        let body = r#"{"success": false, "message": "The access token is invalid."}"#;
        let response: ProductsResponse = serde_json::from_str(body).unwrap();
        assert!(!response.success);
        assert!(response.products.is_empty());
        assert_eq!(
            response.message.as_deref(),
            Some("The access token is invalid.")
        );
    }
}
