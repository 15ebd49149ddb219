//! Subscription profiles, the AI counter and the payment ledger.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use super::{decode_date, decode_ts, decode_uuid, encode_date, encode_ts, ProfileRepository, Store};
use crate::payments::{self, PaymentEvent};
use crate::types::SubscriptionProfile;

const PROFILE_COLUMNS: &str =
    "user_id, plan_tier, status, valid_until, ai_queries_today, last_ai_query_date";

fn profile_from_row(row: &SqliteRow) -> Result<SubscriptionProfile> {
    let user_id: String = row.try_get("user_id")?;
    let plan_tier: String = row.try_get("plan_tier")?;
    let status: String = row.try_get("status")?;
    let valid_until: String = row.try_get("valid_until")?;
    let ai_queries_today: i64 = row.try_get("ai_queries_today")?;
    let last_ai_query_date: Option<String> = row.try_get("last_ai_query_date")?;

    Ok(SubscriptionProfile {
        user_id: decode_uuid(&user_id)?,
        plan_tier: plan_tier.parse()?,
        status: status.parse()?,
        valid_until: decode_ts(&valid_until)?,
        ai_queries_today: u32::try_from(ai_queries_today)
            .context("Negative AI query counter in database")?,
        last_ai_query_date: last_ai_query_date.as_deref().map(decode_date).transpose()?,
    })
}

/// Outcome of applying a gateway confirmation.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    Applied(SubscriptionProfile),
    /// The reference was already recorded; nothing changed.
    Duplicate,
}

impl Store {
    /// Insert a profile unless one already exists. Returns whether it was created.
    pub async fn insert_profile(&self, profile: &SubscriptionProfile) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO subscription_profiles
                (user_id, plan_tier, status, valid_until, ai_queries_today, last_ai_query_date)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(profile.user_id.to_string())
        .bind(profile.plan_tier.as_str())
        .bind(profile.status.as_str())
        .bind(encode_ts(profile.valid_until))
        .bind(i64::from(profile.ai_queries_today))
        .bind(profile.last_ai_query_date.map(encode_date))
        .execute(self.pool())
        .await
        .context("Failed to insert subscription profile")?;

        Ok(result.rows_affected() == 1)
    }

    /// Record a payment and extend the payer's subscription in one
    /// transaction. Redelivered webhooks (same reference) are no-ops.
    pub async fn apply_payment(&self, event: &PaymentEvent) -> Result<PaymentOutcome> {
        let mut tx = self.pool().begin().await?;

        let recorded = sqlx::query(
            r#"
            INSERT OR IGNORE INTO payments (reference, user_id, plan_tier, amount, paid_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(event.reference.as_str())
        .bind(event.user_id.to_string())
        .bind(event.plan.as_str())
        .bind(event.amount.to_string())
        .bind(encode_ts(event.paid_at))
        .execute(&mut *tx)
        .await
        .context("Failed to record payment")?;

        if recorded.rows_affected() == 0 {
            tx.rollback().await?;
            debug!(reference = %event.reference, "Duplicate payment ignored");
            return Ok(PaymentOutcome::Duplicate);
        }

        let existing = fetch_profile_tx(&mut tx, event.user_id).await?;
        let updated = payments::apply_payment(existing.as_ref(), event)?;

        sqlx::query(
            r#"
            INSERT INTO subscription_profiles
                (user_id, plan_tier, status, valid_until, ai_queries_today, last_ai_query_date)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (user_id) DO UPDATE SET
                plan_tier = excluded.plan_tier,
                status = excluded.status,
                valid_until = excluded.valid_until
            "#,
        )
        .bind(updated.user_id.to_string())
        .bind(updated.plan_tier.as_str())
        .bind(updated.status.as_str())
        .bind(encode_ts(updated.valid_until))
        .bind(i64::from(updated.ai_queries_today))
        .bind(updated.last_ai_query_date.map(encode_date))
        .execute(&mut *tx)
        .await
        .context("Failed to update subscription profile")?;

        tx.commit().await?;

        info!(
            user_id = %updated.user_id,
            plan = %updated.plan_tier,
            valid_until = %updated.valid_until,
            reference = %event.reference,
            "Payment applied"
        );

        Ok(PaymentOutcome::Applied(updated))
    }
}

async fn fetch_profile_tx(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: Uuid,
) -> Result<Option<SubscriptionProfile>> {
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM subscription_profiles WHERE user_id = ?1");
    let row = sqlx::query(&sql)
        .bind(user_id.to_string())
        .fetch_optional(&mut **tx)
        .await?;
    row.as_ref().map(profile_from_row).transpose()
}

#[async_trait]
impl ProfileRepository for Store {
    async fn fetch_profile(&self, user_id: Uuid) -> Result<Option<SubscriptionProfile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM subscription_profiles WHERE user_id = ?1");
        let row = sqlx::query(&sql)
            .bind(user_id.to_string())
            .fetch_optional(self.pool())
            .await
            .context("Failed to fetch subscription profile")?;
        row.as_ref().map(profile_from_row).transpose()
    }

    async fn count_bankrolls(&self, user_id: Uuid) -> Result<u32> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bankrolls WHERE user_id = ?1")
            .bind(user_id.to_string())
            .fetch_one(self.pool())
            .await
            .context("Failed to count bankrolls")?;
        Ok(u32::try_from(count)?)
    }

    async fn try_consume_ai_query(
        &self,
        user_id: Uuid,
        today: NaiveDate,
        limit: Option<u32>,
    ) -> Result<Option<u32>> {
        let effective = super::EFFECTIVE_QUERIES_USED_SQL;
        // Single statement: SQLite serialises writers, so the limit check
        // and the increment cannot interleave with another request.
        let sql = format!(
            r#"
            UPDATE subscription_profiles
            SET ai_queries_today = {effective} + 1,
                last_ai_query_date = ?1
            WHERE user_id = ?2
              AND (?3 IS NULL OR {effective} < ?3)
            RETURNING ai_queries_today
            "#
        );

        let count: Option<i64> = sqlx::query_scalar(&sql)
            .bind(encode_date(today))
            .bind(user_id.to_string())
            .bind(limit.map(i64::from))
            .fetch_optional(self.pool())
            .await
            .context("Failed to increment AI query counter")?;

        count.map(u32::try_from).transpose().map_err(Into::into)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
