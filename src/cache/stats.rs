//! Cache Statistics Module
//!
//! Counts where reads were answered and how often a tier failed.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of the coordinator counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Reads answered by the fast tier
    pub fast_hits: u64,
    /// Reads answered by the durable tier
    pub durable_hits: u64,
    /// Reads confirmed absent or expired
    pub misses: u64,
    /// Reads where the durable tier could not be asked
    pub unavailable: u64,
    /// Fast-tier calls that failed
    pub fast_errors: u64,
    /// Durable-tier calls that failed
    pub durable_errors: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// hits / (hits + misses + unavailable), or 0.0 before the first read.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.fast_hits + self.durable_hits;
        let total = hits + self.misses + self.unavailable;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

// == Cache Counters ==
/// Lock-free counters updated by concurrent requests.
#[derive(Debug, Default)]
pub struct CacheCounters {
    fast_hits: AtomicU64,
    durable_hits: AtomicU64,
    misses: AtomicU64,
    unavailable: AtomicU64,
    fast_errors: AtomicU64,
    durable_errors: AtomicU64,
}

impl CacheCounters {
    pub fn record_fast_hit(&self) {
        self.fast_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_durable_hit(&self) {
        self.durable_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unavailable(&self) {
        self.unavailable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fast_error(&self) {
        self.fast_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_durable_error(&self) {
        self.durable_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            fast_hits: self.fast_hits.load(Ordering::Relaxed),
            durable_hits: self.durable_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            unavailable: self.unavailable.load(Ordering::Relaxed),
            fast_errors: self.fast_errors.load(Ordering::Relaxed),
            durable_errors: self.durable_errors.load(Ordering::Relaxed),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let counters = CacheCounters::default();
        counters.record_fast_hit();
        counters.record_durable_hit();
        counters.record_miss();
        counters.record_unavailable();

        let stats = counters.snapshot();
        assert_eq!(stats.fast_hits, 1);
        assert_eq!(stats.durable_hits, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_error_counters_do_not_affect_hit_rate() {
        let counters = CacheCounters::default();
        counters.record_fast_hit();
        counters.record_fast_error();
        counters.record_durable_error();

        let stats = counters.snapshot();
        assert_eq!(stats.fast_errors, 1);
        assert_eq!(stats.durable_errors, 1);
        assert_eq!(stats.hit_rate(), 1.0);
    }
}
