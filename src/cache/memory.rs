//! In-Process Fast Tier
//!
//! HashMap-backed fast tier with TTL expiration and LRU eviction, for
//! single-node deployments (`REDIS_URL=memory://`) and tests. Command
//! semantics follow Redis: `incr` creates a missing key at 1 without expiry,
//! `pttl` is `None` for a missing or persistent key.
//!
//! Counters created by `incr` are rate windows. They are not LRU-tracked and
//! do not count against `max_entries`; they leave only by expiry or `del`,
//! so cache churn can never restart a window early.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::cache::lru::RecencyIndex;
use crate::cache::FastStore;
use crate::clock::SharedClock;
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    expires_at: Option<u64>,
    /// Created by `incr`; exempt from eviction
    counter: bool,
}

impl Slot {
    fn is_expired(&self, now_ms: u64) -> bool {
        matches!(self.expires_at, Some(expires) if now_ms >= expires)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    slots: HashMap<String, Slot>,
    recency: RecencyIndex,
}

impl MemoryState {
    /// Returns the live slot for `key`, dropping it first if it has expired.
    fn live(&mut self, key: &str, now_ms: u64) -> Option<&mut Slot> {
        if self.slots.get(key).is_some_and(|slot| slot.is_expired(now_ms)) {
            self.slots.remove(key);
            self.recency.remove(key);
        }
        self.slots.get_mut(key)
    }
}

// == Memory Fast Store ==
#[derive(Debug)]
pub struct MemoryFastStore {
    state: Mutex<MemoryState>,
    max_entries: usize,
    evictions: AtomicU64,
    clock: SharedClock,
}

impl MemoryFastStore {
    // == Constructor ==
    /// Creates a store holding at most `max_entries` keys.
    pub fn new(max_entries: usize, clock: SharedClock) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            max_entries: max_entries.max(1),
            evictions: AtomicU64::new(0),
            clock,
        }
    }

    /// Inserts a slot. A new cached key that would exceed capacity evicts
    /// the least recently used cached key; counters bypass the bound.
    fn insert(&self, state: &mut MemoryState, key: &str, slot: Slot) {
        if slot.counter {
            state.recency.remove(key);
            state.slots.insert(key.to_string(), slot);
            return;
        }

        let replacing = state.slots.get(key).is_some_and(|existing| !existing.counter);
        if !replacing && state.recency.len() >= self.max_entries {
            if let Some(evicted) = state.recency.evict_oldest() {
                state.slots.remove(&evicted);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        state.slots.insert(key.to_string(), slot);
        state.recency.touch(key);
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut state = self.state.lock().await;

        let expired: Vec<String> = state
            .slots
            .iter()
            .filter(|(_, slot)| slot.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            state.slots.remove(key);
            state.recency.remove(key);
        }
        expired.len()
    }

    /// Number of keys physically held, counters and expired ones included.
    pub async fn len(&self) -> usize {
        self.state.lock().await.slots.len()
    }

    /// Number of cached (evictable) keys; never above `max_entries`.
    pub async fn cached_len(&self) -> usize {
        self.state.lock().await.recency.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl FastStore for MemoryFastStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock().await;
        let Some(slot) = state.live(key, now) else {
            return Ok(None);
        };
        let value = slot.value.clone();
        if !slot.counter {
            state.recency.touch(key);
        }
        Ok(Some(value))
    }

    async fn set_px(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()> {
        let now = self.clock.now_ms();
        let slot = Slot {
            value,
            expires_at: Some(now.saturating_add(ttl.as_millis() as u64)),
            counter: false,
        };
        let mut state = self.state.lock().await;
        self.insert(&mut state, key, slot);
        Ok(())
    }

    async fn del(&self, key: &str) -> StoreResult<bool> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock().await;
        let existed = state.live(key, now).is_some();
        state.slots.remove(key);
        state.recency.remove(key);
        Ok(existed)
    }

    async fn incr(&self, key: &str) -> StoreResult<u64> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock().await;

        if let Some(slot) = state.live(key, now) {
            let current: u64 = slot
                .value
                .parse()
                .map_err(|_| StoreError::codec(format!("value at {key} is not an integer")))?;
            let next = current + 1;
            slot.value = next.to_string();
            if !slot.counter {
                state.recency.touch(key);
            }
            return Ok(next);
        }

        let slot = Slot {
            value: "1".to_string(),
            expires_at: None,
            counter: true,
        };
        self.insert(&mut state, key, slot);
        Ok(1)
    }

    async fn pttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock().await;
        Ok(state
            .live(key, now)
            .and_then(|slot| slot.expires_at)
            .map(|expires| Duration::from_millis(expires.saturating_sub(now))))
    }

    async fn pexpire(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock().await;
        if let Some(slot) = state.live(key, now) {
            slot.expires_at = Some(now.saturating_add(ttl.as_millis() as u64));
        }
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
