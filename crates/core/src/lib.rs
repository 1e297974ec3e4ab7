//! Storeshelf Core - Shared types library.
//!
//! This crate provides the types used across Storeshelf components:
//! - `storefront` - Product catalog cache and JSON API
//! - `integration-tests` - Black-box tests of the storefront
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no caching. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Product model, type-safe IDs and prices
//! - [`listing`] - Listing queries, filter/sort evaluation, related products

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod listing;
pub mod types;

pub use listing::{DEFAULT_RELATED_LIMIT, ListingParseError, ListingQuery, PriceRange, SortOrder};
pub use types::*;
