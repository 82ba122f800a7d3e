//! Cache Coordinator
//!
//! Read-through / write-through over the fast and durable tiers.
//!
//! Reads try the fast tier, then the durable tier; a durable hit is copied
//! back into the fast tier. Writes go to both tiers. Each tier fails on its
//! own: an error from either is logged and counted, never returned, so a
//! degraded cache only ever costs latency. Writes are not atomic across
//! tiers; the read order resolves a copy present in one tier only.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{
    hash_subject, CacheCounters, CacheEntry, CacheStats, Lookup, SharedDurableStore,
    SharedFastStore, CACHE_PREFIX,
};
use crate::clock::SharedClock;
use crate::error::StoreResult;

pub struct CacheCoordinator {
    fast: SharedFastStore,
    durable: SharedDurableStore,
    ttl: Duration,
    clock: SharedClock,
    counters: CacheCounters,
}

impl CacheCoordinator {
    // == Constructor ==
    /// Creates a coordinator writing entries that live for `ttl`.
    pub fn new(
        fast: SharedFastStore,
        durable: SharedDurableStore,
        ttl: Duration,
        clock: SharedClock,
    ) -> Self {
        Self {
            fast,
            durable,
            ttl,
            clock,
            counters: CacheCounters::default(),
        }
    }

    /// Fast-tier key for a subject hash.
    pub fn fast_key(hash: &str) -> String {
        format!("{CACHE_PREFIX}{hash}")
    }

    // == Get ==
    /// Returns the live payload for `subject`, if any tier has one.
    pub async fn get<T: DeserializeOwned>(&self, subject: &str) -> Option<T> {
        self.lookup(subject).await.hit()
    }

    // == Lookup ==
    /// Resolves `subject` through both tiers, keeping "miss" and "could not
    /// ask" apart.
    pub async fn lookup<T: DeserializeOwned>(&self, subject: &str) -> Lookup<T> {
        let hash = hash_subject(subject);
        let fast_key = Self::fast_key(&hash);

        if self.fast.is_enabled() {
            match self.fast.get(&fast_key).await {
                Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                    Ok(payload) => {
                        debug!(key = %hash, tier = self.fast.name(), "cache hit");
                        self.counters.record_fast_hit();
                        return Lookup::Hit(payload);
                    }
                    Err(e) => {
                        warn!(key = %hash, error = %e, "undecodable fast-tier entry, reading durable tier");
                    }
                },
                Ok(None) => debug!(key = %hash, tier = self.fast.name(), "fast-tier miss"),
                Err(e) => {
                    warn!(key = %hash, tier = self.fast.name(), error = %e, "fast tier unavailable, reading durable tier");
                    self.counters.record_fast_error();
                }
            }
        }

        let now = self.clock.now_ms();
        let entry = match self.durable.find(&hash).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!(key = %hash, "cache miss");
                self.counters.record_miss();
                return Lookup::Miss;
            }
            Err(e) => {
                warn!(key = %hash, error = %e, "durable tier unavailable");
                self.counters.record_durable_error();
                self.counters.record_unavailable();
                return Lookup::Unavailable;
            }
        };

        if entry.is_expired_at(now) {
            debug!(key = %hash, expires_at = entry.expires_at, "durable entry expired");
            self.counters.record_miss();
            return Lookup::Miss;
        }

        let payload = match serde_json::from_value::<T>(entry.payload.clone()) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %hash, error = %e, "undecodable durable entry, treating as miss");
                self.counters.record_miss();
                return Lookup::Miss;
            }
        };

        debug!(key = %hash, tier = "durable", "cache hit");
        self.counters.record_durable_hit();
        self.repopulate(&fast_key, &entry, now).await;
        Lookup::Hit(payload)
    }

    /// Copies a durable hit into the fast tier for the rest of its lifetime.
    async fn repopulate(&self, fast_key: &str, entry: &CacheEntry, now_ms: u64) {
        if !self.fast.is_enabled() {
            return;
        }
        let remaining = entry.ttl_remaining_at(now_ms);
        let encoded = entry.payload.to_string();
        if let Err(e) = self.fast.set_px(fast_key, encoded, remaining).await {
            debug!(key = %entry.key, error = %e, "fast-tier repopulate skipped");
            self.counters.record_fast_error();
        }
    }

    // == Set ==
    /// Writes `payload` for `subject` to both tiers.
    ///
    /// Neither tier's failure is returned; both are logged.
    pub async fn set<T: Serialize>(&self, subject: &str, payload: &T) {
        let value = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(subject, error = %e, "payload not serializable, not caching");
                return;
            }
        };

        let entry = CacheEntry::new(subject, value, self.clock.now_ms(), self.ttl);

        if self.fast.is_enabled() {
            let fast_key = Self::fast_key(&entry.key);
            if let Err(e) = self
                .fast
                .set_px(&fast_key, entry.payload.to_string(), self.ttl)
                .await
            {
                warn!(key = %entry.key, tier = self.fast.name(), error = %e, "fast-tier write failed");
                self.counters.record_fast_error();
            }
        }

        if let Err(e) = self.durable.upsert(&entry).await {
            warn!(key = %entry.key, error = %e, "durable-tier write failed");
            self.counters.record_durable_error();
        }
    }

    // == Invalidate ==
    /// Deletes `subject` from both tiers. Absence is not an error.
    pub async fn invalidate(&self, subject: &str) {
        let hash = hash_subject(subject);

        if self.fast.is_enabled() {
            if let Err(e) = self.fast.del(&Self::fast_key(&hash)).await {
                warn!(key = %hash, tier = self.fast.name(), error = %e, "fast-tier delete failed");
                self.counters.record_fast_error();
            }
        }

        match self.durable.delete(&hash).await {
            Ok(existed) => debug!(key = %hash, existed, "cache entry invalidated"),
            Err(e) => {
                warn!(key = %hash, error = %e, "durable-tier delete failed");
                self.counters.record_durable_error();
            }
        }
    }

    // == Purge Expired ==
    /// Deletes expired durable rows. The fast tier expires on its own.
    pub async fn purge_expired(&self) -> StoreResult<u64> {
        self.durable.purge_expired(self.clock.now_ms()).await
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    pub fn fast(&self) -> &SharedFastStore {
        &self.fast
    }

    pub fn durable(&self) -> &SharedDurableStore {
        &self.durable
    }
}
