//! Persistence layer.
//!
//! SQLite via `sqlx`. Subscription profiles, bankrolls, bets and the
//! payment ledger live in one database. `ensure_schema` creates tables for
//! local and test databases; production schema is managed outside this
//! crate.

pub mod ledger;
pub mod profiles;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use crate::types::SubscriptionProfile;

/// SQL form of `entitlement::effective_queries_used`. `?1` is today's UTC
/// date as `YYYY-MM-DD`.
pub const EFFECTIVE_QUERIES_USED_SQL: &str =
    "CASE WHEN last_ai_query_date = ?1 THEN ai_queries_today ELSE 0 END";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS subscription_profiles (
        user_id            TEXT PRIMARY KEY,
        plan_tier          TEXT NOT NULL,
        status             TEXT NOT NULL,
        valid_until        TEXT NOT NULL,
        ai_queries_today   INTEGER NOT NULL DEFAULT 0,
        last_ai_query_date TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bankrolls (
        id              TEXT PRIMARY KEY,
        user_id         TEXT NOT NULL,
        name            TEXT NOT NULL,
        initial_balance TEXT NOT NULL,
        stake_percent   REAL NOT NULL,
        created_at      TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_bankrolls_user ON bankrolls(user_id)",
    r#"
    CREATE TABLE IF NOT EXISTS bets (
        id          TEXT PRIMARY KEY,
        bankroll_id TEXT NOT NULL REFERENCES bankrolls(id),
        description TEXT NOT NULL,
        stake       TEXT NOT NULL,
        odds        REAL NOT NULL,
        status      TEXT NOT NULL,
        placed_at   TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_bets_bankroll ON bets(bankroll_id, placed_at)",
    r#"
    CREATE TABLE IF NOT EXISTS payments (
        reference TEXT PRIMARY KEY,
        user_id   TEXT NOT NULL,
        plan_tier TEXT NOT NULL,
        amount    TEXT NOT NULL,
        paid_at   TEXT NOT NULL
    )
    "#,
];

// ---------------------------------------------------------------------------
// Repository seam
// ---------------------------------------------------------------------------

/// Subscription lookups and the AI counter, keyed by account identity.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn fetch_profile(&self, user_id: Uuid) -> Result<Option<SubscriptionProfile>>;

    async fn count_bankrolls(&self, user_id: Uuid) -> Result<u32>;

    /// Atomically count one AI query for `today`, resetting the counter when
    /// the stored day differs. With a `limit`, the update only happens while
    /// the effective count is below it.
    ///
    /// Returns the new count, or `None` if the profile is missing or the
    /// limit was already reached.
    async fn try_consume_ai_query(
        &self,
        user_id: Uuid,
        today: NaiveDate,
        limit: Option<u32>,
    ) -> Result<Option<u32>>;

    /// Unconditional form of `try_consume_ai_query`.
    async fn increment_ai_query(&self, user_id: Uuid, today: NaiveDate) -> Result<Option<u32>> {
        self.try_consume_ai_query(user_id, today, None).await
    }
}

// ---------------------------------------------------------------------------
// SQLite store
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Connect to a SQLite database URL (`sqlite://banca.db`, `sqlite::memory:`).
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {database_url}"))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .context("Database connectivity check failed")?;

        Ok(Self { pool })
    }

    /// Single-connection in-memory database with the schema applied.
    pub async fn in_memory() -> Result<Self> {
        // The database lives only as long as its one connection; never recycle it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true))
            .await
            .context("Failed to open in-memory SQLite database")?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create tables and indexes if they don't exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to apply schema statement: {}", statement.trim()))?;
        }
        info!(tables = 4, "Database schema ready");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Column encoding
// ---------------------------------------------------------------------------

pub(crate) fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn decode_ts(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid timestamp in database: {raw}"))?
        .with_timezone(&Utc))
}

pub(crate) fn encode_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn decode_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Invalid date in database: {raw}"))
}

pub(crate) fn decode_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("Invalid UUID in database: {raw}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
