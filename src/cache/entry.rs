//! Cache Entry Module
//!
//! Defines the durable-tier record for a cached subject.

use std::time::Duration;

use serde_json::Value;

use super::hasher::hash_subject;

// == Cache Entry ==
/// One cached subject as held by the durable tier.
///
/// At most one entry exists per `key`; writes are upserts.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Hash of the subject, see [`hash_subject`]
    pub key: String,
    /// The subject the entry was written for (the URL)
    pub subject: String,
    /// Serialized payload
    pub payload: Value,
    /// Creation or last refresh timestamp (Unix milliseconds)
    pub fetched_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry fetched at `now_ms` that lives for `ttl`.
    pub fn new(subject: &str, payload: Value, now_ms: u64, ttl: Duration) -> Self {
        Self {
            key: hash_subject(subject),
            subject: subject.to_string(),
            payload,
            fetched_at: now_ms,
            expires_at: now_ms.saturating_add(ttl.as_millis() as u64),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// An entry is live only while `expires_at > now_ms`; at the boundary it
    /// is already expired.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    // == Time To Live ==
    /// Remaining lifetime at `now_ms`, zero once expired.
    pub fn ttl_remaining_at(&self, now_ms: u64) -> Duration {
        Duration::from_millis(self.expires_at.saturating_sub(now_ms))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: u64 = 1_700_000_000_000;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new(
            "https://a.test",
            json!({"title": "A"}),
            NOW,
            Duration::from_secs(60),
        );

        assert_eq!(entry.key, hash_subject("https://a.test"));
        assert_eq!(entry.fetched_at, NOW);
        assert_eq!(entry.expires_at, NOW + 60_000);
        assert!(!entry.is_expired_at(NOW));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new("s", json!(null), NOW, Duration::from_millis(10));

        assert!(!entry.is_expired_at(NOW + 9));
        assert!(entry.is_expired_at(NOW + 10), "Entry should be expired at boundary");
        assert!(entry.is_expired_at(NOW + 11));
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = CacheEntry::new("s", json!(null), NOW, Duration::from_secs(10));

        assert_eq!(entry.ttl_remaining_at(NOW + 4_000), Duration::from_secs(6));
        assert_eq!(entry.ttl_remaining_at(NOW + 20_000), Duration::ZERO);
    }
}
