//! Rate Limit Module
//!
//! Fixed-window request counting per identity, on the fast tier when it is
//! reachable and in process otherwise.

mod decision;
mod identity;
mod limiter;
mod local;

pub use decision::{RateDecision, HEADER_LIMIT, HEADER_REMAINING, HEADER_RESET};
pub use identity::{RateIdentity, RateLimitConfig, RatePolicy, RATE_PREFIX};
pub use limiter::RateLimiter;
pub use local::{LocalWindowStore, WindowCount};
