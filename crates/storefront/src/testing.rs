//! Test support: an in-memory `ProductSource` and product builders.
//!
//! Compiled for unit tests and, via the `testing` feature, for the
//! integration-tests crate.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use storeshelf_core::{CurrencyCode, Product, ProductId};
use tokio::sync::Semaphore;

use crate::catalog::ProductCatalog;
use crate::gumroad::{ProductSource, UpstreamError};

/// How the fake upstream should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Respond with an HTTP 503 status error.
    Unavailable,
    /// Respond with a shape-validation error.
    Malformed,
    /// Never respond.
    Hang,
}

/// In-memory upstream with call counters, failure injection and a gate that
/// holds calls until released.
#[derive(Debug, Default)]
pub struct FakeSource {
    products: Mutex<Vec<Product>>,
    failure: Mutex<Option<Failure>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    by_id_calls: AtomicUsize,
    by_slug_calls: AtomicUsize,
    all_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FakeSource {
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: Mutex::new(products),
            ..Default::default()
        }
    }

    /// Replace the upstream product list.
    pub fn set_products(&self, products: Vec<Product>) {
        *lock(&self.products) = products;
    }

    pub fn fail_with(&self, failure: Failure) {
        *lock(&self.failure) = Some(failure);
    }

    pub fn recover(&self) {
        *lock(&self.failure) = None;
    }

    /// Hold every subsequent call until `release` is called.
    pub fn hold(&self) {
        *lock(&self.gate) = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let held calls (and future ones) through.
    pub fn release(&self) {
        if let Some(gate) = lock(&self.gate).take() {
            gate.close();
        }
    }

    #[must_use]
    pub fn by_id_calls(&self) -> usize {
        self.by_id_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn by_slug_calls(&self) -> usize {
        self.by_slug_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn all_calls(&self) -> usize {
        self.all_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.by_id_calls() + self.by_slug_calls() + self.all_calls()
    }

    async fn respond<T>(&self, answer: impl FnOnce(&[Product]) -> T) -> Result<T, UpstreamError> {
        let gate = lock(&self.gate).clone();
        if let Some(gate) = gate {
            // Closing the semaphore is the release signal
            let _ = gate.acquire().await;
        }

        let failure = *lock(&self.failure);
        match failure {
            Some(Failure::Unavailable) => Err(UpstreamError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            }),
            Some(Failure::Malformed) => Err(UpstreamError::Malformed(
                "product is missing id".to_string(),
            )),
            Some(Failure::Hang) => std::future::pending().await,
            None => Ok(answer(lock(&self.products).as_slice())),
        }
    }
}

#[async_trait]
impl ProductSource for FakeSource {
    async fn fetch_product_by_id(&self, id: &str) -> Result<Option<Product>, UpstreamError> {
        self.by_id_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(|products| products.iter().find(|p| p.id.as_str() == id).cloned())
            .await
    }

    async fn fetch_product_by_slug(&self, slug: &str) -> Result<Option<Product>, UpstreamError> {
        self.by_slug_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(|products| products.iter().find(|p| p.slug == slug).cloned())
            .await
    }

    async fn fetch_all_products(&self) -> Result<Vec<Product>, UpstreamError> {
        self.all_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(<[Product]>::to_vec).await
    }
}

/// Build a product with `slug = "{id}-slug"` and the given price in cents.
#[must_use]
pub fn product(id: &str, price_minor_units: i64) -> Product {
    Product {
        id: ProductId::new(id),
        slug: format!("{id}-slug"),
        name: id.to_uppercase(),
        description: format!("Description of {id}"),
        price_minor_units,
        formatted_price: format!("${}", price_minor_units / 100),
        currency: CurrencyCode::USD,
        thumbnail_url: None,
        url: None,
        categories: BTreeSet::new(),
        tags: BTreeSet::new(),
        rating: None,
        sales_count: None,
        published: true,
    }
}

/// Wait until no background refresh is in flight.
///
/// # Panics
///
/// Panics if refreshes are still running after two seconds.
pub async fn wait_for_refreshes(catalog: &ProductCatalog) {
    for _ in 0..400 {
        if catalog.refreshes_in_flight() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("background refresh did not finish");
}
