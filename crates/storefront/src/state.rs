//! Application state shared across handlers.

use std::sync::Arc;

use crate::catalog::ProductCatalog;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Handlers only read products
/// through the catalog; they never write to its cache.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    catalog: ProductCatalog,
}

impl AppState {
    /// Create a new application state around a product catalog.
    #[must_use]
    pub fn new(catalog: ProductCatalog) -> Self {
        Self {
            inner: Arc::new(AppStateInner { catalog }),
        }
    }

    /// Get a reference to the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &ProductCatalog {
        &self.inner.catalog
    }
}
