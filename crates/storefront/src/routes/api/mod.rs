//! JSON API routes.
//!
//! Every product endpoint answers with the same envelope:
//!
//! ```json
//! { "success": true, "product": { ... } }
//! { "success": true, "products": [ ... ] }
//! { "success": false, "error": "Product not found: pencil" }
//! ```

pub mod products;

use serde::Serialize;
use storeshelf_core::Product;

/// Response envelope for the product API.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<Product>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    #[must_use]
    pub const fn product(product: Product) -> Self {
        Self {
            success: true,
            product: Some(product),
            products: None,
            error: None,
        }
    }

    #[must_use]
    pub const fn products(products: Vec<Product>) -> Self {
        Self {
            success: true,
            product: None,
            products: Some(products),
            error: None,
        }
    }

    #[must_use]
    pub const fn failure(error: String) -> Self {
        Self {
            success: false,
            product: None,
            products: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_envelope_omits_payload() {
        let json = serde_json::to_value(ApiResponse::failure("nope".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({ "success": false, "error": "nope" }));
    }

    #[test]
    fn test_products_envelope_omits_error() {
        let json = serde_json::to_value(ApiResponse::products(Vec::new())).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "products": [] }));
    }
}
