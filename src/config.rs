//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::ratelimit::RatePolicy;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Fast-tier URL; None disables the fast tier
    pub redis_url: Option<String>,
    /// Durable-tier SQLite URL
    pub database_url: String,
    /// Cache lifetime in hours
    pub cache_ttl_hours: u64,
    /// Rate-limit window length in milliseconds
    pub rate_window_ms: u64,
    /// Requests per window for address-based identities
    pub anon_rate_limit: u32,
    /// Requests per window for API keys without their own allowance
    pub default_rate_limit: u32,
    /// Local window sweep and in-process TTL cleanup interval in seconds
    pub sweep_interval: u64,
    /// Durable-tier expired-row purge interval in seconds
    pub durable_purge_interval: u64,
    /// Per-call bound on fast-tier commands in milliseconds
    pub store_timeout_ms: u64,
    /// Metadata fetch timeout in milliseconds
    pub fetch_timeout_ms: u64,
    /// Capacity of the in-process fast tier
    pub memory_cache_max_entries: usize,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_URL` - `redis://…`, `rediss://…` or `memory://` (default: unset, fast tier off)
    /// - `DATABASE_URL` - SQLite URL (default: `sqlite::memory:`)
    /// - `CACHE_TTL_HOURS` - cache lifetime (default: 24)
    /// - `RATE_LIMIT_WINDOW_MS` - window length (default: 60000)
    /// - `ANON_RATE_LIMIT` - anonymous requests per window (default: 10)
    /// - `DEFAULT_RATE_LIMIT` - API key requests per window (default: 60)
    /// - `SWEEP_INTERVAL_SECS` - sweep frequency (default: 60)
    /// - `DURABLE_PURGE_INTERVAL_SECS` - purge frequency (default: 3600)
    /// - `STORE_TIMEOUT_MS` - fast-tier call bound (default: 500)
    /// - `FETCH_TIMEOUT_MS` - origin fetch timeout (default: 10000)
    /// - `MEMORY_CACHE_MAX_ENTRIES` - in-process tier capacity (default: 10000)
    /// - `PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: env::var("REDIS_URL").ok().filter(|v| !v.trim().is_empty()),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            cache_ttl_hours: env_or("CACHE_TTL_HOURS", defaults.cache_ttl_hours),
            rate_window_ms: env_or("RATE_LIMIT_WINDOW_MS", defaults.rate_window_ms),
            anon_rate_limit: env_or("ANON_RATE_LIMIT", defaults.anon_rate_limit),
            default_rate_limit: env_or("DEFAULT_RATE_LIMIT", defaults.default_rate_limit),
            sweep_interval: env_or("SWEEP_INTERVAL_SECS", defaults.sweep_interval),
            durable_purge_interval: env_or(
                "DURABLE_PURGE_INTERVAL_SECS",
                defaults.durable_purge_interval,
            ),
            store_timeout_ms: env_or("STORE_TIMEOUT_MS", defaults.store_timeout_ms),
            fetch_timeout_ms: env_or("FETCH_TIMEOUT_MS", defaults.fetch_timeout_ms),
            memory_cache_max_entries: env_or(
                "MEMORY_CACHE_MAX_ENTRIES",
                defaults.memory_cache_max_entries,
            ),
            server_port: env_or("PORT", defaults.server_port),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours * 60 * 60)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn sweep_every(&self) -> Duration {
        Duration::from_secs(self.sweep_interval.max(1))
    }

    pub fn purge_every(&self) -> Duration {
        Duration::from_secs(self.durable_purge_interval.max(1))
    }

    /// Rate-limit policy derived from the window and allowance settings.
    pub fn rate_policy(&self) -> RatePolicy {
        RatePolicy {
            window: Duration::from_millis(self.rate_window_ms),
            anonymous_max: self.anon_rate_limit,
            default_max: self.default_rate_limit,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: None,
            database_url: "sqlite::memory:".to_string(),
            cache_ttl_hours: 24,
            rate_window_ms: 60_000,
            anon_rate_limit: 10,
            default_rate_limit: 60,
            sweep_interval: 60,
            durable_purge_interval: 3600,
            store_timeout_ms: 500,
            fetch_timeout_ms: 10_000,
            memory_cache_max_entries: 10_000,
            server_port: 3000,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
