//! Rate Decision
//!
//! Result of one window check, with the observability headers every
//! response carries.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

pub const HEADER_LIMIT: &str = "x-ratelimit-limit";
pub const HEADER_REMAINING: &str = "x-ratelimit-remaining";
pub const HEADER_RESET: &str = "x-ratelimit-reset";

/// Outcome of [`RateLimiter::check`](super::RateLimiter::check).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Window end (Unix seconds, rounded up)
    pub reset_at: u64,
    /// Seconds until the window ends, rounded up; 0 when allowed
    pub retry_after: u64,
}

impl RateDecision {
    /// Builds the decision for the request that brought the window to
    /// `count`.
    ///
    /// The increment happens before the comparison, so the request moving
    /// the count from `max` to `max + 1` is the first one denied.
    pub fn new(count: u64, max: u32, reset_at_ms: u64, now_ms: u64) -> Self {
        let allowed = count <= u64::from(max);
        let remaining = u64::from(max).saturating_sub(count) as u32;
        let retry_after = if allowed {
            0
        } else {
            ceil_secs(reset_at_ms.saturating_sub(now_ms)).max(1)
        };

        Self {
            allowed,
            limit: max,
            remaining,
            reset_at: ceil_secs(reset_at_ms),
            retry_after,
        }
    }

    /// Writes the `X-RateLimit-*` headers.
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(HeaderName::from_static(HEADER_LIMIT), HeaderValue::from(self.limit));
        headers.insert(
            HeaderName::from_static(HEADER_REMAINING),
            HeaderValue::from(self.remaining),
        );
        headers.insert(HeaderName::from_static(HEADER_RESET), HeaderValue::from(self.reset_at));
    }
}

fn ceil_secs(ms: u64) -> u64 {
    ms.div_ceil(1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000_000;

    #[test]
    fn test_last_allowed_request_has_zero_remaining() {
        let decision = RateDecision::new(5, 5, NOW + 30_000, NOW);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.retry_after, 0);
    }

    #[test]
    fn test_first_denied_request() {
        let decision = RateDecision::new(6, 5, NOW + 30_500, NOW);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.retry_after, 31);
        assert_eq!(decision.reset_at, (NOW + 30_500).div_ceil(1000));
    }

    #[test]
    fn test_retry_after_is_never_zero_on_deny() {
        let decision = RateDecision::new(11, 10, NOW, NOW);
        assert_eq!(decision.retry_after, 1);
    }

    #[test]
    fn test_apply_headers() {
        let decision = RateDecision::new(3, 10, NOW + 60_000, NOW);
        let mut headers = HeaderMap::new();
        decision.apply_headers(&mut headers);

        assert_eq!(headers["x-ratelimit-limit"], "10");
        assert_eq!(headers["x-ratelimit-remaining"], "7");
        assert_eq!(
            headers["x-ratelimit-reset"],
            ((NOW + 60_000) / 1000).to_string().as_str()
        );
    }
}
