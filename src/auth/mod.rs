//! Authentication Module
//!
//! API key records and their validation. A request without a key is
//! anonymous and rate limited by address; a request with a key must present
//! a valid one.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::error::{ApiError, StoreResult};

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";
/// Query parameter carrying the API key
pub const API_KEY_QUERY: &str = "api_key";

// == Api Key Record ==
/// An issued API key and what it may do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyRecord {
    pub id: String,
    pub user_id: String,
    pub key: String,
    /// Requests per window; 0 means the service default
    pub rate_limit: u32,
    /// Requests per day; stored, not enforced
    pub daily_limit: u32,
    pub can_extract: bool,
    /// Stored, not checked by any endpoint here
    pub can_generate: bool,
    pub active: bool,
    /// Expiry (Unix milliseconds), None = never
    pub expires_at: Option<u64>,
}

impl ApiKeyRecord {
    /// Checks that the key may call the extraction endpoints at `now_ms`.
    pub fn authorize(&self, now_ms: u64) -> Result<(), ApiError> {
        if !self.active {
            return Err(ApiError::Unauthorized("API key has been deactivated".into()));
        }
        if self.expires_at.is_some_and(|expires| expires < now_ms) {
            return Err(ApiError::Unauthorized("API key has expired".into()));
        }
        if !self.can_extract {
            return Err(ApiError::Forbidden(
                "API key does not have permission for extraction".into(),
            ));
        }
        Ok(())
    }
}

// == Api Key Directory ==
#[async_trait]
pub trait ApiKeyDirectory: Send + Sync {
    async fn find_by_key(&self, key: &str) -> StoreResult<Option<ApiKeyRecord>>;
}

pub type SharedApiKeyDirectory = Arc<dyn ApiKeyDirectory>;

/// Directory over the `api_keys` table (see [`crate::db`]).
#[derive(Debug, Clone)]
pub struct SqliteApiKeyDirectory {
    pool: SqlitePool,
}

type ApiKeyRow = (String, String, String, i64, i64, bool, bool, bool, Option<i64>);

impl SqliteApiKeyDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts or replaces a key record.
    pub async fn insert(&self, record: &ApiKeyRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO api_keys
                (id, user_id, key, rate_limit, daily_limit, can_extract, can_generate, active, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT (id) DO UPDATE
            SET user_id = excluded.user_id,
                key = excluded.key,
                rate_limit = excluded.rate_limit,
                daily_limit = excluded.daily_limit,
                can_extract = excluded.can_extract,
                can_generate = excluded.can_generate,
                active = excluded.active,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.key)
        .bind(i64::from(record.rate_limit))
        .bind(i64::from(record.daily_limit))
        .bind(record.can_extract)
        .bind(record.can_generate)
        .bind(record.active)
        .bind(record.expires_at.map(|ms| ms as i64))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn from_row(row: ApiKeyRow) -> ApiKeyRecord {
        let (id, user_id, key, rate_limit, daily_limit, can_extract, can_generate, active, expires_at) =
            row;
        ApiKeyRecord {
            id,
            user_id,
            key,
            rate_limit: rate_limit.clamp(0, i64::from(u32::MAX)) as u32,
            daily_limit: daily_limit.clamp(0, i64::from(u32::MAX)) as u32,
            can_extract,
            can_generate,
            active,
            expires_at: expires_at.map(|ms| ms.max(0) as u64),
        }
    }
}

#[async_trait]
impl ApiKeyDirectory for SqliteApiKeyDirectory {
    async fn find_by_key(&self, key: &str) -> StoreResult<Option<ApiKeyRecord>> {
        let row: Option<ApiKeyRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, key, rate_limit, daily_limit, can_extract, can_generate, active, expires_at
            FROM api_keys
            WHERE key = ?1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::from_row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000_000;

    fn record(id: &str) -> ApiKeyRecord {
        ApiKeyRecord {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            key: format!("og_live_{id}"),
            rate_limit: 60,
            daily_limit: 1000,
            can_extract: true,
            can_generate: true,
            active: true,
            expires_at: None,
        }
    }

    async fn directory() -> SqliteApiKeyDirectory {
        let pool = crate::db::connect("sqlite::memory:").await.unwrap();
        crate::db::migrate(&pool).await.unwrap();
        SqliteApiKeyDirectory::new(pool)
    }

    #[test]
    fn test_authorize_valid_key() {
        assert!(record("k1").authorize(NOW).is_ok());
    }

    #[test]
    fn test_authorize_inactive_key() {
        let mut key = record("k1");
        key.active = false;
        let err = key.authorize(NOW).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn test_authorize_expired_key() {
        let mut key = record("k1");
        key.expires_at = Some(NOW - 1);
        let err = key.authorize(NOW).unwrap_err();
        assert_eq!(err.to_string(), "API key has expired");
    }

    #[test]
    fn test_authorize_missing_permission() {
        let mut key = record("k1");
        key.can_extract = false;
        let err = key.authorize(NOW).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_insert_and_find_by_key() {
        let directory = directory().await;
        let mut key = record("k1");
        key.expires_at = Some(NOW + 86_400_000);
        directory.insert(&key).await.unwrap();

        let found = directory.find_by_key("og_live_k1").await.unwrap();
        assert_eq!(found, Some(key));
        assert_eq!(directory.find_by_key("og_live_nope").await.unwrap(), None);
    }
}
