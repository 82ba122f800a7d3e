//! Redis Fast Tier
//!
//! Builds a [`fred::clients::Pool`] for the URL in `REDIS_URL`. The pool
//! connects in the background with an exponential reconnect policy, so a
//! Redis that is down at startup (or later) only makes this tier report
//! `Unavailable` until it comes back.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use fred::clients::Pool;
use fred::interfaces::{ClientLike, KeysInterface};
use fred::types::config::{Config as FredConfig, ReconnectPolicy};
use fred::types::{Builder, Expiration};
use tracing::{info, warn};

use crate::cache::FastStore;
use crate::error::{StoreError, StoreResult};

const POOL_SIZE: usize = 4;

pub struct RedisFastStore {
    pool: Pool,
    /// Upper bound on every command, including the wait for a connection
    timeout: Duration,
}

impl RedisFastStore {
    /// Creates the pool and starts connecting.
    ///
    /// Waits up to `connect_wait` for the first connection. Not being
    /// connected by then is logged, not returned as an error; only an
    /// unparsable URL or an unbuildable pool fails.
    pub async fn connect(
        url: &str,
        timeout: Duration,
        connect_wait: Duration,
    ) -> StoreResult<Self> {
        let config = FredConfig::from_url(url).map_err(StoreError::unavailable)?;

        let mut builder = Builder::from_config(config);
        // Exponential reconnect: initial 0ms, base 100ms, max 30s, factor 2.
        builder.set_policy(ReconnectPolicy::new_exponential(0, 100, 30_000, 2));

        let pool = builder
            .build_pool(POOL_SIZE)
            .map_err(StoreError::unavailable)?;

        // The connection task runs for the lifetime of the pool.
        let _connection = pool.connect();

        match tokio::time::timeout(connect_wait, pool.wait_for_connect()).await {
            Ok(Ok(())) => info!(pool_size = POOL_SIZE, "Redis fast tier connected"),
            Ok(Err(e)) => warn!(error = %e, "Redis fast tier not connected; falling back until it is"),
            Err(_) => warn!(
                wait_ms = connect_wait.as_millis() as u64,
                "Redis fast tier not reachable yet; falling back until it is"
            ),
        }

        Ok(Self { pool, timeout })
    }

    async fn bounded<T, E, F>(&self, op: &'static str, call: F) -> StoreResult<T>
    where
        E: Display,
        F: Future<Output = Result<T, E>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StoreError::Unavailable(format!("{op}: {e}"))),
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }
}

fn as_millis_i64(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX).max(1)
}

#[async_trait]
impl FastStore for RedisFastStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.bounded("GET", self.pool.get::<Option<String>, _>(key))
            .await
    }

    async fn set_px(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()> {
        let expiry = Some(Expiration::PX(as_millis_i64(ttl)));
        self.bounded(
            "SET",
            self.pool.set::<(), _, _>(key, value, expiry, None, false),
        )
        .await
    }

    async fn del(&self, key: &str) -> StoreResult<bool> {
        let removed = self.bounded("DEL", self.pool.del::<i64, _>(key)).await?;
        Ok(removed > 0)
    }

    async fn incr(&self, key: &str) -> StoreResult<u64> {
        let count = self.bounded("INCR", self.pool.incr::<i64, _>(key)).await?;
        u64::try_from(count).map_err(|_| StoreError::codec(format!("negative counter at {key}")))
    }

    async fn pttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        // -2: no such key, -1: key without expiry
        let ttl = self.bounded("PTTL", self.pool.pttl::<i64, _>(key)).await?;
        Ok(u64::try_from(ttl).ok().map(Duration::from_millis))
    }

    async fn pexpire(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        self.bounded(
            "PEXPIRE",
            self.pool.pexpire::<bool, _>(key, as_millis_i64(ttl), None),
        )
        .await
        .map(|_| ())
    }

    async fn ping(&self) -> StoreResult<()> {
        self.bounded("PING", self.pool.ping::<String>(None))
            .await
            .map(|_| ())
    }
}
