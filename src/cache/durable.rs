//! Durable Tier
//!
//! Persistent store for cache entries, keyed by subject hash with upsert
//! semantics. Stores return whatever row they hold; deciding whether it is
//! still live is the coordinator's job.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::cache::CacheEntry;
use crate::error::{StoreError, StoreResult};

#[async_trait]
pub trait DurableStore: Send + Sync {
    /// The row for `key`, expired or not.
    async fn find(&self, key: &str) -> StoreResult<Option<CacheEntry>>;

    /// Inserts the entry or overwrites the existing row for its key.
    async fn upsert(&self, entry: &CacheEntry) -> StoreResult<()>;

    /// Deletes the row for `key`; returns whether one existed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Deletes every row that has expired at `now_ms`.
    async fn purge_expired(&self, now_ms: u64) -> StoreResult<u64>;

    async fn ping(&self) -> StoreResult<()>;
}

pub type SharedDurableStore = Arc<dyn DurableStore>;

// == SQLite Durable Store ==
/// Durable tier over the `cached_metadata` table (see [`crate::db`]).
#[derive(Debug, Clone)]
pub struct SqliteDurableStore {
    pool: SqlitePool,
}

type EntryRow = (String, String, String, i64, i64);

impl SqliteDurableStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn from_row(row: EntryRow) -> StoreResult<CacheEntry> {
        let (key, subject, payload, fetched_at, expires_at) = row;
        Ok(CacheEntry {
            key,
            subject,
            payload: serde_json::from_str(&payload).map_err(StoreError::codec)?,
            fetched_at: fetched_at.max(0) as u64,
            expires_at: expires_at.max(0) as u64,
        })
    }
}

#[async_trait]
impl DurableStore for SqliteDurableStore {
    async fn find(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        let row: Option<EntryRow> = sqlx::query_as(
            r#"
            SELECT url_hash, url, payload, fetched_at, expires_at
            FROM cached_metadata
            WHERE url_hash = ?1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::from_row).transpose()
    }

    async fn upsert(&self, entry: &CacheEntry) -> StoreResult<()> {
        let payload = serde_json::to_string(&entry.payload).map_err(StoreError::codec)?;

        sqlx::query(
            r#"
            INSERT INTO cached_metadata (url_hash, url, payload, fetched_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (url_hash) DO UPDATE
            SET url = excluded.url,
                payload = excluded.payload,
                fetched_at = excluded.fetched_at,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(&entry.key)
        .bind(&entry.subject)
        .bind(payload)
        .bind(entry.fetched_at as i64)
        .bind(entry.expires_at as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM cached_metadata WHERE url_hash = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self, now_ms: u64) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM cached_metadata WHERE expires_at <= ?1")
            .bind(now_ms as i64)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
