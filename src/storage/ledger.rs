//! Bankrolls and their bet history.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

use super::{decode_ts, decode_uuid, encode_ts, Store};
use crate::types::{Bankroll, Bet, BetStatus};

fn decode_decimal(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw).with_context(|| format!("Invalid decimal in database: {raw}"))
}

fn bankroll_from_row(row: &SqliteRow) -> Result<Bankroll> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;
    let initial_balance: String = row.try_get("initial_balance")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Bankroll {
        id: decode_uuid(&id)?,
        user_id: decode_uuid(&user_id)?,
        name: row.try_get("name")?,
        initial_balance: decode_decimal(&initial_balance)?,
        stake_percent: row.try_get("stake_percent")?,
        created_at: decode_ts(&created_at)?,
    })
}

fn bet_from_row(row: &SqliteRow) -> Result<Bet> {
    let id: String = row.try_get("id")?;
    let bankroll_id: String = row.try_get("bankroll_id")?;
    let stake: String = row.try_get("stake")?;
    let status: String = row.try_get("status")?;
    let placed_at: String = row.try_get("placed_at")?;

    Ok(Bet {
        id: decode_uuid(&id)?,
        bankroll_id: decode_uuid(&bankroll_id)?,
        description: row.try_get("description")?,
        stake: decode_decimal(&stake)?,
        odds: row.try_get("odds")?,
        status: BetStatus::from_str(&status)?,
        placed_at: decode_ts(&placed_at)?,
    })
}

impl Store {
    /// Insert a bankroll only while the owner is below `max_bankrolls`.
    ///
    /// Count and insert are one statement, so two concurrent creations
    /// cannot both slip under the limit. Returns whether it was inserted.
    pub async fn create_bankroll_within_limit(
        &self,
        bankroll: &Bankroll,
        max_bankrolls: Option<u32>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO bankrolls (id, user_id, name, initial_balance, stake_percent, created_at)
            SELECT ?1, ?2, ?3, ?4, ?5, ?6
            WHERE ?7 IS NULL
               OR (SELECT COUNT(*) FROM bankrolls WHERE user_id = ?2) < ?7
            "#,
        )
        .bind(bankroll.id.to_string())
        .bind(bankroll.user_id.to_string())
        .bind(bankroll.name.as_str())
        .bind(bankroll.initial_balance.to_string())
        .bind(bankroll.stake_percent)
        .bind(encode_ts(bankroll.created_at))
        .bind(max_bankrolls.map(i64::from))
        .execute(self.pool())
        .await
        .context("Failed to insert bankroll")?;

        let inserted = result.rows_affected() == 1;
        debug!(bankroll_id = %bankroll.id, user_id = %bankroll.user_id, inserted, "Bankroll insert");
        Ok(inserted)
    }

    pub async fn list_bankrolls(&self, user_id: Uuid) -> Result<Vec<Bankroll>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, name, initial_balance, stake_percent, created_at
            FROM bankrolls WHERE user_id = ?1 ORDER BY created_at
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(self.pool())
        .await
        .context("Failed to list bankrolls")?;

        rows.iter().map(bankroll_from_row).collect()
    }

    pub async fn get_bankroll(&self, id: Uuid) -> Result<Option<Bankroll>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, name, initial_balance, stake_percent, created_at
            FROM bankrolls WHERE id = ?1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(self.pool())
        .await
        .context("Failed to fetch bankroll")?;

        row.as_ref().map(bankroll_from_row).transpose()
    }

    pub async fn insert_bet(&self, bet: &Bet) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bets (id, bankroll_id, description, stake, odds, status, placed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(bet.id.to_string())
        .bind(bet.bankroll_id.to_string())
        .bind(bet.description.as_str())
        .bind(bet.stake.to_string())
        .bind(bet.odds)
        .bind(bet.status.as_str())
        .bind(encode_ts(bet.placed_at))
        .execute(self.pool())
        .await
        .context("Failed to insert bet")?;
        Ok(())
    }

    pub async fn get_bet(&self, id: Uuid) -> Result<Option<Bet>> {
        let row = sqlx::query(
            r#"
            SELECT id, bankroll_id, description, stake, odds, status, placed_at
            FROM bets WHERE id = ?1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(self.pool())
        .await
        .context("Failed to fetch bet")?;

        row.as_ref().map(bet_from_row).transpose()
    }

    /// Move a pending bet to its final status. Returns false if the bet
    /// doesn't exist or was already settled.
    pub async fn settle_bet(&self, id: Uuid, status: BetStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE bets SET status = ?1 WHERE id = ?2 AND status = 'pending'")
            .bind(status.as_str())
            .bind(id.to_string())
            .execute(self.pool())
            .await
            .context("Failed to settle bet")?;
        Ok(result.rows_affected() == 1)
    }

    /// Bets of a bankroll, oldest first, optionally only those placed at or
    /// after `since`.
    pub async fn list_bets(&self, bankroll_id: Uuid, since: Option<DateTime<Utc>>) -> Result<Vec<Bet>> {
        let rows = sqlx::query(
            r#"
            SELECT id, bankroll_id, description, stake, odds, status, placed_at
            FROM bets
            WHERE bankroll_id = ?1 AND (?2 IS NULL OR placed_at >= ?2)
            ORDER BY placed_at
            "#,
        )
        .bind(bankroll_id.to_string())
        .bind(since.map(encode_ts))
        .fetch_all(self.pool())
        .await
        .context("Failed to list bets")?;

        rows.iter().map(bet_from_row).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
