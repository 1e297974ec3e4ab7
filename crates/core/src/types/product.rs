//! The product model shared by the catalog and its consumers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::{CurrencyCode, Price};

/// One purchasable digital item.
///
/// `id` is the identity of a product. `slug` is a human-readable secondary
/// key that upstream may reassign, so it never participates in identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Opaque upstream identifier.
    pub id: ProductId,
    /// Human-readable permalink.
    pub slug: String,
    pub name: String,
    pub description: String,
    /// Price in minor units (cents).
    pub price_minor_units: i64,
    /// Price as formatted by upstream (e.g., "$15").
    pub formatted_price: String,
    #[serde(default)]
    pub currency: CurrencyCode,
    pub thumbnail_url: Option<String>,
    /// Public product page.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Average rating on a 0-5 scale.
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub sales_count: Option<u64>,
    #[serde(default = "default_published")]
    pub published: bool,
}

const fn default_published() -> bool {
    true
}

impl Product {
    /// Price in standard units.
    #[must_use]
    pub fn price(&self) -> Price {
        Price::from_minor_units(self.price_minor_units, self.currency)
    }

    /// Sales count with missing values treated as zero.
    #[must_use]
    pub fn popularity(&self) -> u64 {
        self.sales_count.unwrap_or(0)
    }

    /// Whether this product shares at least one category or tag with `other`.
    #[must_use]
    pub fn shares_taxonomy_with(&self, other: &Self) -> bool {
        !self.categories.is_disjoint(&other.categories) || !self.tags.is_disjoint(&other.tags)
    }
}
