//! Usage Module
//!
//! Records one row per authenticated request once its outcome is known.
//! Recording never fails a request.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::warn;

use crate::clock::SharedClock;
use crate::error::StoreResult;

/// Outcome of one request made with an API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageEvent {
    pub user_id: String,
    pub api_key_id: String,
    pub endpoint: String,
    pub url: Option<String>,
    pub status: u16,
    pub latency_ms: u64,
    pub cached: bool,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

#[async_trait]
pub trait UsageSink: Send + Sync {
    /// Stores the event. Failures are logged by the sink, not returned.
    async fn record(&self, event: UsageEvent);
}

pub type SharedUsageSink = Arc<dyn UsageSink>;

// == SQLite Usage Log ==
/// Usage sink over the `usage_logs` table; also stamps the key's
/// `last_used_at`.
#[derive(Debug, Clone)]
pub struct SqliteUsageLog {
    pool: SqlitePool,
    clock: SharedClock,
}

impl SqliteUsageLog {
    pub fn new(pool: SqlitePool, clock: SharedClock) -> Self {
        Self { pool, clock }
    }

    async fn insert(&self, event: &UsageEvent) -> StoreResult<()> {
        let now = self.clock.now_ms() as i64;

        sqlx::query(
            r#"
            INSERT INTO usage_logs
                (user_id, api_key_id, endpoint, url, status, latency_ms, cached, user_agent, ip, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&event.user_id)
        .bind(&event.api_key_id)
        .bind(&event.endpoint)
        .bind(&event.url)
        .bind(i64::from(event.status))
        .bind(event.latency_ms as i64)
        .bind(event.cached)
        .bind(&event.user_agent)
        .bind(&event.ip)
        .bind(now)
        .execute(&self.pool)
        .await?;

        sqlx::query("UPDATE api_keys SET last_used_at = ?1 WHERE id = ?2")
            .bind(now)
            .bind(&event.api_key_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Number of logged requests for `user_id`.
    pub async fn count_for_user(&self, user_id: &str) -> StoreResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM usage_logs WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl UsageSink for SqliteUsageLog {
    async fn record(&self, event: UsageEvent) {
        if let Err(e) = self.insert(&event).await {
            warn!(api_key_id = %event.api_key_id, endpoint = %event.endpoint, error = %e, "Failed to log usage");
        }
    }
}
