//! Storeshelf Storefront library.
//!
//! This crate provides the product catalog cache and its JSON API as a
//! library, allowing it to be tested and reused.
//!
//! # Modules
//!
//! - [`gumroad`] - Upstream product API client
//! - [`catalog`] - Stale-while-revalidate product cache
//! - [`routes`] - Thin JSON handlers over the catalog

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod error;
pub mod gumroad;
pub mod middleware;
pub mod routes;
pub mod state;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

use axum::{Router, body::Body, http::Request};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the storefront router with its middleware stack.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::routes())
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
