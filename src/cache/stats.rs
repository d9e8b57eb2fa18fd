//! Cache Statistics Module
//!
//! Tracks interceptor outcomes: cache hits and misses, network traffic, and
//! how often the offline notice had to be served.

use serde::Serialize;

// == Cache Stats ==
/// Tracks request handling metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Requests answered from the current generation
    pub hits: u64,
    /// Lookups that found nothing in the current generation
    pub misses: u64,
    /// Live fetches attempted
    pub network_fetches: u64,
    /// Live fetches that failed outright
    pub network_failures: u64,
    /// Responses written into the current generation
    pub stored: u64,
    /// Responses returned but refused for caching
    pub skipped: u64,
    /// Synthetic offline responses served
    pub offline_notices: u64,
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
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_fetch(&mut self) {
        self.network_fetches += 1;
    }

    pub fn record_failure(&mut self) {
        self.network_failures += 1;
    }

    pub fn record_store(&mut self) {
        self.stored += 1;
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn record_offline(&mut self) {
        self.offline_notices += 1;
    }
}
