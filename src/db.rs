//! Database Module
//!
//! SQLite pool shared by the durable cache tier, the API key directory and
//! the usage log, plus the schema they rely on.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Opens a pool for `url`, creating the database file if needed.
///
/// An in-memory database lives only as long as its connection, so memory
/// URLs get a single connection that is never recycled.
pub async fn connect(url: &str) -> Result<SqlitePool, sqlx::Error> {
    let in_memory = url.contains(":memory:") || url.contains("mode=memory");

    let mut options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(8)
    };

    pool_options
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS cached_metadata (
        url_hash   TEXT PRIMARY KEY NOT NULL,
        url        TEXT NOT NULL,
        payload    TEXT NOT NULL,
        fetched_at INTEGER NOT NULL,
        expires_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_cached_metadata_expires_at ON cached_metadata (expires_at)",
    r#"
    CREATE TABLE IF NOT EXISTS api_keys (
        id           TEXT PRIMARY KEY NOT NULL,
        user_id      TEXT NOT NULL,
        key          TEXT NOT NULL UNIQUE,
        rate_limit   INTEGER NOT NULL DEFAULT 60,
        daily_limit  INTEGER NOT NULL DEFAULT 1000,
        can_extract  INTEGER NOT NULL DEFAULT 1,
        can_generate INTEGER NOT NULL DEFAULT 1,
        active       INTEGER NOT NULL DEFAULT 1,
        expires_at   INTEGER,
        last_used_at INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS usage_logs (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id    TEXT NOT NULL,
        api_key_id TEXT NOT NULL,
        endpoint   TEXT NOT NULL,
        url        TEXT,
        status     INTEGER NOT NULL,
        latency_ms INTEGER NOT NULL,
        cached     INTEGER NOT NULL,
        user_agent TEXT,
        ip         TEXT,
        created_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_usage_logs_user_created ON usage_logs (user_id, created_at)",
];

/// Creates the tables if they do not exist yet.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
