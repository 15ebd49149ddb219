//! Shared types for BANCA.
//!
//! These types form the data model used across all modules.
//! Risk, entitlement, storage and API modules depend on them without
//! depending on each other.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Subscription plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Trial,
    Easy,
    Pro,
}

impl PlanTier {
    /// All known tiers (useful for iteration).
    pub const ALL: &'static [PlanTier] = &[PlanTier::Trial, PlanTier::Easy, PlanTier::Pro];

    /// Storage/wire identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Trial => "trial",
            PlanTier::Easy => "easy",
            PlanTier::Pro => "pro",
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanTier::Trial => write!(f, "Trial"),
            PlanTier::Easy => write!(f, "Easy"),
            PlanTier::Pro => write!(f, "Pro"),
        }
    }
}

/// Parse a plan tier (case-insensitive).
impl std::str::FromStr for PlanTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trial" => Ok(PlanTier::Trial),
            "easy" => Ok(PlanTier::Easy),
            "pro" => Ok(PlanTier::Pro),
            _ => Err(anyhow::anyhow!("Unknown plan tier: {s}")),
        }
    }
}

/// Billing status as reported by the payment flow.
///
/// Access is decided by `valid_until`, not by this field; a canceled plan
/// keeps working until the paid period ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    PastDue,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(SubscriptionStatus::Active),
            "canceled" | "cancelled" => Ok(SubscriptionStatus::Canceled),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "expired" => Ok(SubscriptionStatus::Expired),
            _ => Err(anyhow::anyhow!("Unknown subscription status: {s}")),
        }
    }
}

/// Lifecycle of a single bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    Pending,
    Won,
    Lost,
    /// Cancelled by the bookmaker; the stake is returned.
    Void,
}

impl BetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetStatus::Pending => "pending",
            BetStatus::Won => "won",
            BetStatus::Lost => "lost",
            BetStatus::Void => "void",
        }
    }

    /// Won or lost. Void bets are closed but carry no result.
    pub fn is_settled(&self) -> bool {
        matches!(self, BetStatus::Won | BetStatus::Lost)
    }
}

impl fmt::Display for BetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetStatus::Pending => write!(f, "PENDING"),
            BetStatus::Won => write!(f, "WON"),
            BetStatus::Lost => write!(f, "LOST"),
            BetStatus::Void => write!(f, "VOID"),
        }
    }
}

impl std::str::FromStr for BetStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(BetStatus::Pending),
            "won" | "win" => Ok(BetStatus::Won),
            "lost" | "loss" => Ok(BetStatus::Lost),
            "void" => Ok(BetStatus::Void),
            _ => Err(anyhow::anyhow!("Unknown bet status: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Subscription profile
// ---------------------------------------------------------------------------

/// Per-account subscription record. Read by every access check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionProfile {
    pub user_id: Uuid,
    pub plan_tier: PlanTier,
    pub status: SubscriptionStatus,
    pub valid_until: DateTime<Utc>,
    /// Only meaningful when `last_ai_query_date` is today (UTC).
    pub ai_queries_today: u32,
    pub last_ai_query_date: Option<NaiveDate>,
}

impl SubscriptionProfile {
    /// A fresh trial starting at `now`.
    pub fn trial(user_id: Uuid, now: DateTime<Utc>, trial_days: i64) -> Self {
        Self {
            user_id,
            plan_tier: PlanTier::Trial,
            status: SubscriptionStatus::Active,
            valid_until: now + Duration::days(trial_days),
            ai_queries_today: 0,
            last_ai_query_date: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Bankrolls & bets
// ---------------------------------------------------------------------------

/// A tracked pool of betting capital ("banca").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bankroll {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub initial_balance: Decimal,
    /// Percentage of the bankroll wagered per bet, in (0, 100].
    pub stake_percent: f64,
    pub created_at: DateTime<Utc>,
}

/// Largest initial balance accepted for a bankroll, in currency units.
pub const MAX_BALANCE_UNITS: i64 = 1_000_000_000_000;

/// Largest stake accepted for one bet, in currency units.
pub const MAX_STAKE_UNITS: i64 = 1_000_000_000;

/// Highest decimal odds accepted for one bet.
pub const MAX_ODDS: f64 = 1_000.0;

/// Rejected bet input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WagerError {
    #[error("stake must be positive, got {0}")]
    NonPositiveStake(Decimal),

    #[error("stake must not exceed {}, got {0}", MAX_STAKE_UNITS)]
    StakeTooLarge(Decimal),

    #[error("odds must be decimal odds above 1.0 and at most {}, got {0}", MAX_ODDS)]
    OddsOutOfRange(f64),
}

/// A single recorded wager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub id: Uuid,
    pub bankroll_id: Uuid,
    pub description: String,
    pub stake: Decimal,
    /// Decimal odds (payout per unit staked, including the stake).
    pub odds: f64,
    pub status: BetStatus,
    pub placed_at: DateTime<Utc>,
}

impl Bet {
    /// Check stake and odds before a bet is recorded.
    ///
    /// The bounds keep `profit` and the performance sums far inside
    /// `Decimal`'s range and keep odds exactly representable.
    pub fn validate_wager(stake: Decimal, odds: f64) -> Result<(), WagerError> {
        if stake <= Decimal::ZERO {
            return Err(WagerError::NonPositiveStake(stake));
        }
        if stake > Decimal::from(MAX_STAKE_UNITS) {
            return Err(WagerError::StakeTooLarge(stake));
        }
        if !odds.is_finite() || odds <= 1.0 || odds > MAX_ODDS {
            return Err(WagerError::OddsOutOfRange(odds));
        }
        Ok(())
    }

    /// Net result of the bet. Pending and void bets return zero.
    pub fn profit(&self) -> Decimal {
        match self.status {
            BetStatus::Won => {
                let odds = Decimal::try_from(self.odds).unwrap_or(Decimal::ONE);
                self.stake.saturating_mul(odds - Decimal::ONE)
            }
            BetStatus::Lost => -self.stake,
            BetStatus::Pending | BetStatus::Void => Decimal::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
