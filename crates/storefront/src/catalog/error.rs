//! Catalog error taxonomy.

use thiserror::Error;

use crate::gumroad::UpstreamError;

/// Errors returned by `ProductCatalog` operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// Upstream confirmed the product does not exist. Terminal.
    #[error("Product not found: {0}")]
    NotFound(String),

    /// Network, timeout, status or parse failure with no cached value to serve.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Upstream data failed shape validation. Propagates like `UpstreamUnavailable`.
    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),

    /// Lookup key was empty.
    #[error("Product key must not be empty")]
    InvalidKey,
}

impl CatalogError {
    /// Whether this error means upstream could not serve the request.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable(_) | Self::MalformedResponse(_)
        )
    }
}

impl From<UpstreamError> for CatalogError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Malformed(reason) => Self::MalformedResponse(reason),
            other => Self::UpstreamUnavailable(other.to_string()),
        }
    }
}
