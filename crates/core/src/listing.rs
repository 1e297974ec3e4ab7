//! Listing queries: filtering and sorting a product snapshot.
//!
//! Everything here is pure. A listing is recomputed per request from the
//! current full product list; nothing is cached at this level.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Product;

/// Default number of related products returned for a detail view.
pub const DEFAULT_RELATED_LIMIT: usize = 3;

/// Errors parsing a listing query from URL parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingParseError {
    #[error("Unknown price range: {0}")]
    UnknownPriceRange(String),
}

/// Selectable price band.
///
/// Bands are evaluated in standard currency units. `Under10` and `Free`
/// overlap at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceRange {
    /// `[0, 10)`
    Under10,
    /// `[10, 25]`
    TenTo25,
    /// `(25, 50]`
    TwentyFiveTo50,
    /// `(50, ∞)`
    Over50,
    /// Exactly zero.
    Free,
}

impl PriceRange {
    /// Whether `amount` falls in this band.
    #[must_use]
    pub fn contains(self, amount: Decimal) -> bool {
        let ten = Decimal::TEN;
        let twenty_five = Decimal::from(25);
        let fifty = Decimal::from(50);

        match self {
            Self::Under10 => amount >= Decimal::ZERO && amount < ten,
            Self::TenTo25 => amount >= ten && amount <= twenty_five,
            Self::TwentyFiveTo50 => amount > twenty_five && amount <= fifty,
            Self::Over50 => amount > fifty,
            Self::Free => amount.is_zero(),
        }
    }

    /// Parse from URL parameter value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "under_10" | "under-10" => Some(Self::Under10),
            "10_25" | "10-25" | "ten_to_25" => Some(Self::TenTo25),
            "25_50" | "25-50" | "twentyfive_to_50" => Some(Self::TwentyFiveTo50),
            "over_50" | "over-50" => Some(Self::Over50),
            "free" => Some(Self::Free),
            _ => None,
        }
    }

    /// Convert to URL parameter value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Under10 => "under_10",
            Self::TenTo25 => "10_25",
            Self::TwentyFiveTo50 => "25_50",
            Self::Over50 => "over_50",
            Self::Free => "free",
        }
    }
}

/// Listing sort order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Upstream order, which is newest first.
    #[default]
    Newest,
    Oldest,
    PriceAsc,
    PriceDesc,
    /// Sales count, highest first.
    Popularity,
}

impl SortOrder {
    /// Parse from URL parameter value. Unknown values fall back to `Newest`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "oldest" => Self::Oldest,
            "price_asc" | "price-ascending" => Self::PriceAsc,
            "price_desc" | "price-descending" => Self::PriceDesc,
            "popularity" | "popular" => Self::Popularity,
            _ => Self::Newest,
        }
    }

    /// Convert to URL parameter value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Popularity => "popularity",
        }
    }
}

/// A filtered and sorted view over the product list.
///
/// Empty `categories` or `price_ranges` mean "no filter".
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingQuery {
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub price_ranges: BTreeSet<PriceRange>,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl ListingQuery {
    /// Build a query from comma-separated URL parameters.
    ///
    /// # Errors
    ///
    /// Returns `ListingParseError::UnknownPriceRange` for an unrecognized
    /// price token. Unknown sort values fall back to `Newest`.
    pub fn from_params(
        categories: Option<&str>,
        price_ranges: Option<&str>,
        sort: Option<&str>,
    ) -> Result<Self, ListingParseError> {
        let categories = split_csv(categories).map(str::to_string).collect();

        let price_ranges = split_csv(price_ranges)
            .map(|token| {
                PriceRange::parse(token)
                    .ok_or_else(|| ListingParseError::UnknownPriceRange(token.to_string()))
            })
            .collect::<Result<BTreeSet<_>, _>>()?;

        let sort_order = sort.map(SortOrder::parse).unwrap_or_default();

        Ok(Self {
            categories,
            price_ranges,
            sort_order,
        })
    }

    /// Whether a single product passes the category and price filters.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if !self.categories.is_empty() && self.categories.is_disjoint(&product.categories) {
            return false;
        }

        if !self.price_ranges.is_empty() {
            let amount = product.price().amount;
            if !self.price_ranges.iter().any(|range| range.contains(amount)) {
                return false;
            }
        }

        true
    }
}

fn split_csv(value: Option<&str>) -> impl Iterator<Item = &str> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Apply `query` to a snapshot of the full product list.
///
/// All sorts are stable: products that compare equal keep their input order.
#[must_use]
pub fn apply(products: &[Product], query: &ListingQuery) -> Vec<Product> {
    let mut results: Vec<Product> = products
        .iter()
        .filter(|p| query.matches(p))
        .cloned()
        .collect();

    match query.sort_order {
        SortOrder::Newest => {}
        SortOrder::Oldest => results.reverse(),
        SortOrder::PriceAsc => results.sort_by_key(|p| p.price_minor_units),
        SortOrder::PriceDesc => {
            results.sort_by(|a, b| b.price_minor_units.cmp(&a.price_minor_units));
        }
        SortOrder::Popularity => results.sort_by(|a, b| b.popularity().cmp(&a.popularity())),
    }

    results
}

/// Products related to `product`, drawn from `all`.
///
/// Candidates share at least one category or tag and are never the product
/// itself. With no candidates, any other products are used instead. Results
/// keep list order and are capped at `limit`.
#[must_use]
pub fn related_products(product: &Product, all: &[Product], limit: usize) -> Vec<Product> {
    let others = || all.iter().filter(|p| p.id != product.id);

    let related: Vec<Product> = others()
        .filter(|p| p.shares_taxonomy_with(product))
        .take(limit)
        .cloned()
        .collect();

    if related.is_empty() {
        others().take(limit).cloned().collect()
    } else {
        related
    }
}
