//! Catalog counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Point-in-time snapshot of catalog counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub fresh_hits: u64,
    pub stale_hits: u64,
    pub misses: u64,
    pub upstream_calls: u64,
    pub refreshes_started: u64,
    pub refresh_failures: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    fresh_hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
    upstream_calls: AtomicU64,
    refreshes_started: AtomicU64,
    refresh_failures: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn fresh_hit(&self) {
        self.fresh_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn stale_hit(&self) {
        self.stale_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn upstream_call(&self) {
        self.upstream_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn refresh_started(&self) {
        self.refreshes_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn refresh_failed(&self) {
        self.refresh_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CatalogStats {
        CatalogStats {
            fresh_hits: self.fresh_hits.load(Ordering::Relaxed),
            stale_hits: self.stale_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            upstream_calls: self.upstream_calls.load(Ordering::Relaxed),
            refreshes_started: self.refreshes_started.load(Ordering::Relaxed),
            refresh_failures: self.refresh_failures.load(Ordering::Relaxed),
        }
    }
}
