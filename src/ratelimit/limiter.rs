//! Rate Limiter
//!
//! Fixed-window counter over the fast tier, falling back to the local
//! window store whenever the fast tier is disabled or fails.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::SharedFastStore;
use crate::clock::SharedClock;
use crate::error::StoreResult;
use crate::ratelimit::{LocalWindowStore, RateDecision, RateIdentity, RateLimitConfig, WindowCount};

pub struct RateLimiter {
    fast: SharedFastStore,
    local: Arc<LocalWindowStore>,
    clock: SharedClock,
}

impl RateLimiter {
    pub fn new(fast: SharedFastStore, local: Arc<LocalWindowStore>, clock: SharedClock) -> Self {
        Self { fast, local, clock }
    }

    pub fn local(&self) -> &Arc<LocalWindowStore> {
        &self.local
    }

    // == Check ==
    /// Counts this request against `identity` and decides whether it may
    /// proceed. Never fails: a store error moves the count to the local
    /// window.
    pub async fn check(&self, identity: &RateIdentity, config: &RateLimitConfig) -> RateDecision {
        let key = identity.window_key();

        let window = if self.fast.is_enabled() {
            match self.distributed_increment(&key, config).await {
                Ok(window) => window,
                Err(e) => {
                    warn!(identity = %identity, tier = self.fast.name(), error = %e, "rate window on fast tier failed, counting locally");
                    self.local.increment_and_get(&key, config.window)
                }
            }
        } else {
            self.local.increment_and_get(&key, config.window)
        };

        let decision = RateDecision::new(window.count, config.max, window.reset_at_ms, self.clock.now_ms());
        if !decision.allowed {
            debug!(
                identity = %identity,
                count = window.count,
                limit = config.max,
                retry_after = decision.retry_after,
                "rate limit exceeded"
            );
        }
        decision
    }

    /// INCR, then read back the TTL; a counter without one was just created
    /// (or lost its expiry) and gets the window length.
    async fn distributed_increment(&self, key: &str, config: &RateLimitConfig) -> StoreResult<WindowCount> {
        let count = self.fast.incr(key).await?;
        let ttl = self.fast.pttl(key).await?;
        let now = self.clock.now_ms();

        let remaining = match ttl {
            Some(ttl) => ttl,
            None => {
                self.fast.pexpire(key, config.window).await?;
                config.window
            }
        };

        Ok(WindowCount {
            count,
            reset_at_ms: now.saturating_add(remaining.as_millis() as u64),
        })
    }
}
