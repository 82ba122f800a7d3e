//! Fast Tier
//!
//! Low-latency key/value store with TTL expiry, used as the hot cache tier
//! and as the distributed backing of the rate limiter. Implementations:
//! [`RedisFastStore`](super::RedisFastStore),
//! [`MemoryFastStore`](super::MemoryFastStore) and the null object
//! [`DisabledFastStore`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};

/// Command surface the coordinators need from a fast tier.
///
/// `Ok(None)` always means "the store answered: no such key".
#[async_trait]
pub trait FastStore: Send + Sync {
    /// Short name used in logs and health output.
    fn name(&self) -> &'static str;

    /// Whether this tier is configured at all. Callers skip a disabled tier
    /// without issuing commands.
    fn is_enabled(&self) -> bool {
        true
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` under `key`, expiring after `ttl`.
    async fn set_px(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()>;

    /// Removes `key`; returns whether it existed.
    async fn del(&self, key: &str) -> StoreResult<bool>;

    /// Atomically increments the integer at `key`, creating it at 1 with no
    /// expiry when absent.
    async fn incr(&self, key: &str) -> StoreResult<u64>;

    /// Remaining lifetime of `key`, or `None` when the key is absent or has
    /// no expiry.
    async fn pttl(&self, key: &str) -> StoreResult<Option<Duration>>;

    /// Sets the expiry of an existing key.
    async fn pexpire(&self, key: &str, ttl: Duration) -> StoreResult<()>;

    async fn ping(&self) -> StoreResult<()>;

    /// Keys dropped to make room since startup. Stores without a capacity
    /// bound never evict.
    fn evictions(&self) -> u64 {
        0
    }
}

/// Shared handle to a fast tier.
pub type SharedFastStore = Arc<dyn FastStore>;

// == Disabled Fast Store ==
/// Stand-in used when no fast tier is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledFastStore;

impl DisabledFastStore {
    pub fn shared() -> SharedFastStore {
        Arc::new(DisabledFastStore)
    }

    fn refuse<T>() -> StoreResult<T> {
        Err(StoreError::Unavailable("fast tier is not configured".into()))
    }
}

#[async_trait]
impl FastStore for DisabledFastStore {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        Self::refuse()
    }

    async fn set_px(&self, _key: &str, _value: String, _ttl: Duration) -> StoreResult<()> {
        Self::refuse()
    }

    async fn del(&self, _key: &str) -> StoreResult<bool> {
        Self::refuse()
    }

    async fn incr(&self, _key: &str) -> StoreResult<u64> {
        Self::refuse()
    }

    async fn pttl(&self, _key: &str) -> StoreResult<Option<Duration>> {
        Self::refuse()
    }

    async fn pexpire(&self, _key: &str, _ttl: Duration) -> StoreResult<()> {
        Self::refuse()
    }

    async fn ping(&self) -> StoreResult<()> {
        Self::refuse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_store_reports_unavailable() {
        let store = DisabledFastStore;
        assert!(!store.is_enabled());
        assert!(matches!(store.get("k").await, Err(StoreError::Unavailable(_))));
        assert!(matches!(store.incr("k").await, Err(StoreError::Unavailable(_))));
        assert!(store.ping().await.is_err());
    }
}
