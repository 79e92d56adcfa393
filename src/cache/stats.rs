//! Cache Statistics Module
//!
//! Tracks cache effectiveness: hits, misses, writes and swallowed failures.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of lookups answered from a valid entry
    pub hits: u64,
    /// Number of lookups with no valid entry (absent, expired or unreadable)
    pub misses: u64,
    /// Number of entries durably written
    pub writes: u64,
    /// Number of writes that failed and were swallowed
    pub write_failures: u64,
    /// Number of expired entries removed by sweeps
    pub purged: u64,
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

    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    pub fn record_write_failure(&mut self) {
        self.write_failures += 1;
    }

    pub fn record_purged(&mut self, count: usize) {
        self.purged += count as u64;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats, CacheStats::default());
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.write_failures, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_write_counters() {
        let mut stats = CacheStats::new();
        stats.record_write();
        stats.record_write_failure();
        stats.record_purged(3);
        stats.record_purged(2);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.write_failures, 1);
        assert_eq!(stats.purged, 5);
    }
}
