//! PIX payment confirmations.
//!
//! The gateway calls our webhook when a charge is paid. A confirmed payment
//! switches the account to the purchased plan and extends its paid period.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{PlanTier, SubscriptionProfile, SubscriptionStatus};

/// Length of one paid period.
pub const BILLING_PERIOD_DAYS: i64 = 30;

/// Webhook event that confirms a charge.
pub const CONFIRMED_EVENT: &str = "payment.confirmed";

#[derive(Debug, Error, PartialEq)]
pub enum PaymentError {
    #[error("the trial plan cannot be purchased")]
    TrialNotPurchasable,

    #[error("payment amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("payment reference is empty")]
    MissingReference,
}

/// Webhook body sent by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentWebhook {
    pub event: String,
    #[serde(flatten)]
    pub payment: PaymentEvent,
}

impl PaymentWebhook {
    pub fn is_confirmation(&self) -> bool {
        self.event == CONFIRMED_EVENT
    }
}

/// A confirmed charge.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentEvent {
    /// Gateway transaction id; unique per charge.
    pub reference: String,
    pub user_id: Uuid,
    pub plan: PlanTier,
    pub amount: Decimal,
    pub paid_at: DateTime<Utc>,
}

impl PaymentEvent {
    pub fn validate(&self) -> Result<(), PaymentError> {
        if self.reference.trim().is_empty() {
            return Err(PaymentError::MissingReference);
        }
        if self.plan == PlanTier::Trial {
            return Err(PaymentError::TrialNotPurchasable);
        }
        if self.amount <= Decimal::ZERO {
            return Err(PaymentError::NonPositiveAmount(self.amount));
        }
        Ok(())
    }
}

/// Profile after a confirmed payment.
///
/// The new period starts at the later of the current expiry and the payment
/// time, so early renewals stack and lapsed plans restart from the payment.
/// Daily AI counters are carried over.
pub fn apply_payment(
    existing: Option<&SubscriptionProfile>,
    event: &PaymentEvent,
) -> Result<SubscriptionProfile, PaymentError> {
    event.validate()?;

    let period = Duration::days(BILLING_PERIOD_DAYS);
    let profile = match existing {
        Some(current) => SubscriptionProfile {
            plan_tier: event.plan,
            status: SubscriptionStatus::Active,
            valid_until: current.valid_until.max(event.paid_at) + period,
            ..current.clone()
        },
        None => SubscriptionProfile {
            user_id: event.user_id,
            plan_tier: event.plan,
            status: SubscriptionStatus::Active,
            valid_until: event.paid_at + period,
            ai_queries_today: 0,
            last_ai_query_date: None,
        },
    };

    Ok(profile)
}
