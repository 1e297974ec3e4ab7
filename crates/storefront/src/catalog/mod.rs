//! Product catalog cache.
//!
//! `ProductCatalog` mediates every product read between route handlers and
//! the upstream `ProductSource`. Entries are kept in a `moka` cache and
//! judged fresh or stale against their own freshness window:
//!
//! - fresh hit: served from memory, no upstream call
//! - stale hit: served from memory immediately, and one background refresh
//!   per key is spawned to replace it
//! - miss: one upstream lookup in the caller's path (slug, then ID)
//!
//! Background refresh failures and not-found answers are logged and the
//! stale value stays, re-stamped so the next attempt waits a full freshness
//! window. A caller that already has data never sees an upstream error.

mod clock;
mod entry;
mod error;
mod stats;

pub use clock::{Clock, ManualClock, SystemClock, duration_millis};
pub use entry::{CacheEntry, CacheKey, CacheValue};
pub use error::CatalogError;
pub use stats::CatalogStats;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use moka::future::Cache;
use storeshelf_core::listing::{self, ListingQuery};
use storeshelf_core::Product;
use tracing::{debug, error, info, instrument, warn};

use crate::config::CatalogConfig;
use crate::gumroad::{ProductSource, UpstreamError};

use stats::StatsCounters;

/// Result of looking a key up in the cache.
enum Lookup {
    Fresh(CacheValue),
    Stale(CacheValue),
    Miss,
}

/// Caching front for the upstream product API.
///
/// Cheaply cloneable; clones share the same cache.
#[derive(Clone)]
pub struct ProductCatalog {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    source: Arc<dyn ProductSource>,
    cache: Cache<CacheKey, CacheEntry<CacheValue>>,
    /// Keys with a background refresh running.
    refreshing: DashSet<CacheKey>,
    clock: Arc<dyn Clock>,
    product_ttl_millis: i64,
    listing_ttl_millis: i64,
    upstream_timeout: Duration,
    stats: StatsCounters,
}

/// Removes a key from the in-flight set when the refresh task ends.
struct RefreshGuard {
    inner: Arc<CatalogInner>,
    key: CacheKey,
}

impl RefreshGuard {
    /// Claim the refresh slot for `key`, or `None` if one is already running.
    fn claim(inner: &Arc<CatalogInner>, key: CacheKey) -> Option<Self> {
        inner.refreshing.insert(key.clone()).then(|| Self {
            inner: Arc::clone(inner),
            key,
        })
    }
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.inner.refreshing.remove(&self.key);
    }
}

impl ProductCatalog {
    /// Create a catalog over `source` using the system clock.
    #[must_use]
    pub fn new(source: Arc<dyn ProductSource>, config: &CatalogConfig) -> Self {
        Self::with_clock(source, config, Arc::new(SystemClock))
    }

    /// Create a catalog with an explicit clock.
    #[must_use]
    pub fn with_clock(
        source: Arc<dyn ProductSource>,
        config: &CatalogConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = Cache::builder().max_capacity(config.max_entries).build();

        Self {
            inner: Arc::new(CatalogInner {
                source,
                cache,
                refreshing: DashSet::new(),
                clock,
                product_ttl_millis: duration_millis(config.product_ttl),
                listing_ttl_millis: duration_millis(config.listing_ttl),
                upstream_timeout: config.upstream_timeout,
                stats: StatsCounters::default(),
            }),
        }
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Get a product by slug, falling back to treating `key` as an ID.
    ///
    /// # Errors
    ///
    /// - `InvalidKey` if `key` is blank
    /// - `NotFound` if neither the slug nor the ID lookup finds a product
    /// - `UpstreamUnavailable` / `MalformedResponse` on a cold miss when
    ///   upstream fails
    #[instrument(skip(self))]
    pub async fn get_product_by_slug_or_id(&self, key: &str) -> Result<Arc<Product>, CatalogError> {
        let key = normalize_key(key)?;
        let cache_key = CacheKey::Slug(key.to_string());

        if let Some(product) = self.cached_product(&cache_key).await {
            return Ok(product);
        }

        self.inner.stats.miss();
        self.load_by_slug_or_id(key)
            .await?
            .ok_or_else(|| CatalogError::NotFound(key.to_string()))
    }

    /// Get a product by its upstream ID.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_product_by_slug_or_id`], without the slug step.
    #[instrument(skip(self))]
    pub async fn get_product_by_id(&self, id: &str) -> Result<Arc<Product>, CatalogError> {
        let id = normalize_key(id)?;
        let cache_key = CacheKey::Id(id.to_string());

        if let Some(product) = self.cached_product(&cache_key).await {
            return Ok(product);
        }

        self.inner.stats.miss();
        self.load_by_id(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    /// Get the full product listing, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error only on a cold miss when upstream fails.
    #[instrument(skip(self))]
    pub async fn get_all_products(&self) -> Result<Arc<Vec<Product>>, CatalogError> {
        match self.lookup(&CacheKey::All).await {
            Lookup::Fresh(CacheValue::Products(products)) => {
                debug!("Cache hit for product listing");
                return Ok(products);
            }
            Lookup::Stale(CacheValue::Products(products)) => {
                self.spawn_refresh(CacheKey::All);
                return Ok(products);
            }
            _ => {}
        }

        self.inner.stats.miss();
        self.load_all().await
    }

    /// Filter and sort the full listing.
    ///
    /// # Errors
    ///
    /// Propagates a cold-miss failure of [`Self::get_all_products`].
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ListingQuery) -> Result<Vec<Product>, CatalogError> {
        let products = self.get_all_products().await?;
        Ok(listing::apply(&products, query))
    }

    /// Products related to `product` by shared category or tag.
    ///
    /// # Errors
    ///
    /// Propagates a cold-miss failure of [`Self::get_all_products`].
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn related_products(
        &self,
        product: &Product,
        limit: usize,
    ) -> Result<Vec<Product>, CatalogError> {
        let products = self.get_all_products().await?;
        Ok(listing::related_products(product, &products, limit))
    }

    /// Load the listing and seed per-product entries from it.
    ///
    /// Returns the number of products seeded.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be loaded.
    #[instrument(skip(self))]
    pub async fn prewarm(&self) -> Result<usize, CatalogError> {
        let products = self.get_all_products().await?;
        for product in products.iter() {
            self.store_product(Some(&product.slug), product.clone())
                .await;
        }
        info!(count = products.len(), "Product catalog prewarmed");
        Ok(products.len())
    }

    /// Whether the listing is cached (fresh or stale).
    #[must_use]
    pub fn has_listing(&self) -> bool {
        self.inner.cache.contains_key(&CacheKey::All)
    }

    /// Number of background refreshes currently running.
    #[must_use]
    pub fn refreshes_in_flight(&self) -> usize {
        self.inner.refreshing.len()
    }

    /// Snapshot of the catalog counters.
    #[must_use]
    pub fn stats(&self) -> CatalogStats {
        self.inner.stats.snapshot()
    }

    // =========================================================================
    // Cache Access
    // =========================================================================

    fn now(&self) -> i64 {
        self.inner.clock.now_millis()
    }

    async fn lookup(&self, key: &CacheKey) -> Lookup {
        let Some(entry) = self.inner.cache.get(key).await else {
            return Lookup::Miss;
        };

        let now = self.now();
        if entry.is_expired(now) {
            debug!(key = %key, age_millis = entry.age_millis(now), "Stale cache hit");
            self.inner.stats.stale_hit();
            Lookup::Stale(entry.value)
        } else {
            self.inner.stats.fresh_hit();
            Lookup::Fresh(entry.value)
        }
    }

    /// Serve a product entry, refreshing it in the background if stale.
    async fn cached_product(&self, key: &CacheKey) -> Option<Arc<Product>> {
        match self.lookup(key).await {
            Lookup::Fresh(CacheValue::Product(product)) => {
                debug!(key = %key, "Cache hit for product");
                Some(product)
            }
            Lookup::Stale(CacheValue::Product(product)) => {
                self.spawn_refresh(key.clone());
                Some(product)
            }
            _ => None,
        }
    }

    /// Store a product under its ID and, if given, under a slug key.
    async fn store_product(&self, slug_key: Option<&str>, product: Product) -> Arc<Product> {
        let product = Arc::new(product);
        let entry = CacheEntry::new(
            CacheValue::Product(Arc::clone(&product)),
            self.now(),
            self.inner.product_ttl_millis,
        );

        if let Some(slug) = slug_key {
            self.inner
                .cache
                .insert(CacheKey::Slug(slug.to_string()), entry.clone())
                .await;
        }
        self.inner
            .cache
            .insert(CacheKey::Id(product.id.to_string()), entry)
            .await;

        product
    }

    // =========================================================================
    // Upstream Loads
    // =========================================================================

    /// Run one upstream call under the configured timeout.
    async fn call<T>(
        &self,
        operation: &'static str,
        fetch: impl Future<Output = Result<T, UpstreamError>>,
    ) -> Result<T, CatalogError> {
        self.inner.stats.upstream_call();
        let timeout = self.inner.upstream_timeout;

        match tokio::time::timeout(timeout, fetch).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(UpstreamError::Malformed(reason))) => {
                error!(operation, kind = "malformed", reason = %reason, "Upstream returned malformed product data");
                Err(CatalogError::MalformedResponse(reason))
            }
            Ok(Err(e)) => {
                debug!(operation, error = %e, "Upstream call failed");
                Err(e.into())
            }
            Err(_) => Err(CatalogError::UpstreamUnavailable(format!(
                "{operation} timed out after {}ms",
                timeout.as_millis()
            ))),
        }
    }

    /// Slug lookup, then ID lookup with the same key.
    async fn load_by_slug_or_id(&self, key: &str) -> Result<Option<Arc<Product>>, CatalogError> {
        let source = &self.inner.source;

        if let Some(product) = self
            .call("fetch_product_by_slug", source.fetch_product_by_slug(key))
            .await?
        {
            return Ok(Some(self.store_product(Some(key), product).await));
        }

        debug!(key, "Slug lookup found nothing, trying as ID");
        if let Some(product) = self
            .call("fetch_product_by_id", source.fetch_product_by_id(key))
            .await?
        {
            return Ok(Some(self.store_product(Some(key), product).await));
        }

        Ok(None)
    }

    async fn load_by_id(&self, id: &str) -> Result<Option<Arc<Product>>, CatalogError> {
        let product = self
            .call(
                "fetch_product_by_id",
                self.inner.source.fetch_product_by_id(id),
            )
            .await?;

        match product {
            Some(product) => Ok(Some(self.store_product(None, product).await)),
            None => Ok(None),
        }
    }

    async fn load_all(&self) -> Result<Arc<Vec<Product>>, CatalogError> {
        let products = Arc::new(
            self.call(
                "fetch_all_products",
                self.inner.source.fetch_all_products(),
            )
            .await?,
        );

        let entry = CacheEntry::new(
            CacheValue::Products(Arc::clone(&products)),
            self.now(),
            self.inner.listing_ttl_millis,
        );
        self.inner.cache.insert(CacheKey::All, entry).await;

        Ok(products)
    }

    // =========================================================================
    // Background Refresh
    // =========================================================================

    /// Spawn a refresh for `key` unless one is already running.
    fn spawn_refresh(&self, key: CacheKey) {
        let Some(guard) = RefreshGuard::claim(&self.inner, key.clone()) else {
            debug!(key = %key, "Refresh already in flight");
            return;
        };

        self.inner.stats.refresh_started();
        let catalog = self.clone();

        tokio::spawn(async move {
            let _guard = guard;
            match catalog.refresh(&key).await {
                Ok(true) => info!(key = %key, "Refreshed stale cache entry"),
                Ok(false) => {
                    warn!(key = %key, "Product no longer found upstream, keeping stale entry");
                    catalog.restamp(&key).await;
                }
                Err(e) => {
                    catalog.inner.stats.refresh_failed();
                    warn!(key = %key, error = %e, "Background refresh failed, keeping stale entry");
                    catalog.restamp(&key).await;
                }
            }
        });
    }

    /// Re-store the current value of `key` as of now.
    ///
    /// The next refresh attempt then waits a full freshness window.
    async fn restamp(&self, key: &CacheKey) {
        if let Some(entry) = self.inner.cache.get(key).await {
            let entry = CacheEntry::new(entry.value, self.now(), entry.freshness_window_millis);
            self.inner.cache.insert(key.clone(), entry).await;
        }
    }

    /// Reload one key. `Ok(false)` means upstream no longer has it.
    async fn refresh(&self, key: &CacheKey) -> Result<bool, CatalogError> {
        match key {
            CacheKey::Slug(slug) => Ok(self.load_by_slug_or_id(slug).await?.is_some()),
            CacheKey::Id(id) => Ok(self.load_by_id(id).await?.is_some()),
            CacheKey::All => self.load_all().await.map(|_| true),
        }
    }
}

/// Trim a lookup key, rejecting blank keys.
fn normalize_key(key: &str) -> Result<&str, CatalogError> {
    let key = key.trim();
    if key.is_empty() {
        Err(CatalogError::InvalidKey)
    } else {
        Ok(key)
    }
}
