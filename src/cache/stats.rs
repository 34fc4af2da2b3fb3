//! Cache Statistics Module
//!
//! Tracks entity cache performance: hits, store fallbacks and full reloads.

use serde::Serialize;

// == Cache Stats ==
/// Snapshot of an entity cache's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cached set
    pub hits: u64,
    /// Lookups that fell through to the persistent store
    pub misses: u64,
    /// Full scans of the persistent store
    pub reloads: u64,
    /// Records in the current set
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Combine ==
    /// Sums the counters of two caches.
    pub fn combined(&self, other: &CacheStats) -> CacheStats {
        CacheStats {
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
            reloads: self.reloads + other.reloads,
            total_entries: self.total_entries + other.total_entries,
        }
    }

    // == Record Hit ==
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Reload ==
    pub fn record_reload(&mut self) {
        self.reloads += 1;
    }
}
