//! Test doubles for the storage tiers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::{CacheEntry, DurableStore, FastStore};
use crate::error::{StoreError, StoreResult};

/// Enabled fast tier whose every call fails, counting the attempts.
#[derive(Debug, Default)]
pub struct FailingFastStore {
    pub calls: AtomicU64,
}

impl FailingFastStore {
    fn fail<T>(&self) -> StoreResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("connection refused".into()))
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FastStore for FailingFastStore {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        self.fail()
    }

    async fn set_px(&self, _key: &str, _value: String, _ttl: Duration) -> StoreResult<()> {
        self.fail()
    }

    async fn del(&self, _key: &str) -> StoreResult<bool> {
        self.fail()
    }

    async fn incr(&self, _key: &str) -> StoreResult<u64> {
        self.fail()
    }

    async fn pttl(&self, _key: &str) -> StoreResult<Option<Duration>> {
        self.fail()
    }

    async fn pexpire(&self, _key: &str, _ttl: Duration) -> StoreResult<()> {
        self.fail()
    }

    async fn ping(&self) -> StoreResult<()> {
        self.fail()
    }
}

/// Durable tier whose every call times out.
#[derive(Debug, Default)]
pub struct FailingDurableStore;

#[async_trait]
impl DurableStore for FailingDurableStore {
    async fn find(&self, _key: &str) -> StoreResult<Option<CacheEntry>> {
        Err(StoreError::Timeout(Duration::from_millis(5)))
    }

    async fn upsert(&self, _entry: &CacheEntry) -> StoreResult<()> {
        Err(StoreError::Timeout(Duration::from_millis(5)))
    }

    async fn delete(&self, _key: &str) -> StoreResult<bool> {
        Err(StoreError::Timeout(Duration::from_millis(5)))
    }

    async fn purge_expired(&self, _now_ms: u64) -> StoreResult<u64> {
        Err(StoreError::Timeout(Duration::from_millis(5)))
    }

    async fn ping(&self) -> StoreResult<()> {
        Err(StoreError::Timeout(Duration::from_millis(5)))
    }
}
