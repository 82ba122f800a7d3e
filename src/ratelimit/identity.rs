//! Rate Identity and Policy
//!
//! Who a request is counted against, and how many requests that identity
//! gets per window.

use std::fmt;
use std::time::Duration;

use crate::auth::ApiKeyRecord;

/// Fast-tier key prefix for rate windows
pub const RATE_PREFIX: &str = "ratelimit:";

// == Rate Identity ==
/// The subject a window is counted for.
///
/// Namespaces differ per variant, so an API key and an address that happen
/// to share a value never share a window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateIdentity {
    /// A recognised API key, by record id
    ApiKey(String),
    /// An unauthenticated client, by address
    Address(String),
}

impl RateIdentity {
    pub fn namespace(&self) -> &'static str {
        match self {
            RateIdentity::ApiKey(_) => "key",
            RateIdentity::Address(_) => "ip",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            RateIdentity::ApiKey(id) | RateIdentity::Address(id) => id,
        }
    }

    /// Key of this identity's window, shared by the fast tier and the local
    /// fallback.
    pub fn window_key(&self) -> String {
        format!("{RATE_PREFIX}{}:{}", self.namespace(), self.value())
    }
}

impl fmt::Display for RateIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace(), self.value())
    }
}

// == Rate Limit Config ==
/// Window length and allowance for one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max: u32,
}

// == Rate Policy ==
/// Maps an authenticated caller (or its absence) onto an identity and an
/// allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub window: Duration,
    /// Allowance for address-based identities
    pub anonymous_max: u32,
    /// Allowance for keys whose own `rate_limit` is unset (0)
    pub default_max: u32,
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(60_000),
            anonymous_max: 10,
            default_max: 60,
        }
    }
}

impl RatePolicy {
    /// Resolves the identity and allowance for a request from `address`,
    /// authenticated as `record` if present.
    pub fn resolve(
        &self,
        record: Option<&ApiKeyRecord>,
        address: &str,
    ) -> (RateIdentity, RateLimitConfig) {
        match record {
            Some(record) => {
                let max = if record.rate_limit == 0 {
                    self.default_max
                } else {
                    record.rate_limit
                };
                (
                    RateIdentity::ApiKey(record.id.clone()),
                    RateLimitConfig {
                        window: self.window,
                        max,
                    },
                )
            }
            None => (
                RateIdentity::Address(address.to_string()),
                RateLimitConfig {
                    window: self.window,
                    max: self.anonymous_max,
                },
            ),
        }
    }
}
