//! Cache keys, values and freshness metadata.

use std::fmt;
use std::sync::Arc;

use storeshelf_core::Product;

/// Cache key for catalog entries.
///
/// Slug and ID entries live in separate key spaces so a reassigned slug
/// never overwrites identity data.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    /// Product looked up by slug (or by an ID passed where a slug was expected).
    Slug(String),
    /// Product looked up by upstream ID.
    Id(String),
    /// The full product listing.
    All,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slug(slug) => write!(f, "slug:{slug}"),
            Self::Id(id) => write!(f, "id:{id}"),
            Self::All => f.write_str("all"),
        }
    }
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Arc<Product>),
    Products(Arc<Vec<Product>>),
}

/// A cached value with the metadata needed to judge its freshness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<T> {
    pub value: T,
    pub stored_at_epoch_millis: i64,
    pub freshness_window_millis: i64,
}

impl<T> CacheEntry<T> {
    /// Create an entry stored at `now`.
    pub const fn new(value: T, now_millis: i64, freshness_window_millis: i64) -> Self {
        Self {
            value,
            stored_at_epoch_millis: now_millis,
            freshness_window_millis,
        }
    }

    /// Age of the entry at `now`. Never negative.
    #[must_use]
    pub const fn age_millis(&self, now_millis: i64) -> i64 {
        let age = now_millis.saturating_sub(self.stored_at_epoch_millis);
        if age < 0 { 0 } else { age }
    }

    /// Whether the entry is past its freshness window at `now`.
    ///
    /// An entry exactly at the edge of its window is still fresh.
    #[must_use]
    pub const fn is_expired(&self, now_millis: i64) -> bool {
        self.age_millis(now_millis) > self.freshness_window_millis
    }
}
