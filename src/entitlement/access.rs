//! Access evaluation against a subscription profile.
//!
//! Every check is recomputed from the profile and the current time; no
//! transition state is cached between calls.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;
use tracing::debug;

use super::plans::PlanLimits;
use crate::types::{PlanTier, SubscriptionProfile};

// ---------------------------------------------------------------------------
// Access state
// ---------------------------------------------------------------------------

/// Why access was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    TrialExpired,
    SubscriptionExpired,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::TrialExpired => write!(f, "trial_expired"),
            BlockReason::SubscriptionExpired => write!(f, "subscription_expired"),
        }
    }
}

/// Result of the access state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "access", rename_all = "snake_case")]
pub enum AccessStatus {
    Granted { plan: PlanTier, days_remaining: i64 },
    Blocked { reason: BlockReason },
}

impl AccessStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessStatus::Granted { .. })
    }
}

/// Evaluate access for a profile at `now`.
///
/// A missing profile is treated as an expired subscription.
pub fn check_access(profile: Option<&SubscriptionProfile>, now: DateTime<Utc>) -> AccessStatus {
    let Some(profile) = profile else {
        return AccessStatus::Blocked {
            reason: BlockReason::SubscriptionExpired,
        };
    };

    if now > profile.valid_until {
        let reason = match profile.plan_tier {
            PlanTier::Trial => BlockReason::TrialExpired,
            _ => BlockReason::SubscriptionExpired,
        };
        debug!(user_id = %profile.user_id, %reason, "Access blocked");
        return AccessStatus::Blocked { reason };
    }

    AccessStatus::Granted {
        plan: profile.plan_tier,
        days_remaining: days_remaining(profile.valid_until, now),
    }
}

/// Whole days left until `valid_until`, rounded up, never negative.
pub fn days_remaining(valid_until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let left = valid_until - now;
    if left <= Duration::zero() {
        return 0;
    }
    let whole = left.num_days();
    if left > Duration::days(whole) {
        whole + 1
    } else {
        whole
    }
}

// ---------------------------------------------------------------------------
// AI quota
// ---------------------------------------------------------------------------

/// Queries used today. The stored counter only counts for the UTC day in
/// `last_ai_query_date`; any other day reads as zero.
///
/// `storage::EFFECTIVE_QUERIES_USED_SQL` is the SQL form of this rule and
/// must stay in step with it.
pub fn effective_queries_used(profile: &SubscriptionProfile, today: NaiveDate) -> u32 {
    match profile.last_ai_query_date {
        Some(date) if date == today => profile.ai_queries_today,
        _ => 0,
    }
}

/// UTC calendar day used for quota accounting.
pub fn quota_day(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

const PLAN_EXPIRED: &str = "plan expired";

/// Outcome of a bankroll-creation check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankrollDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_allowed: Option<u32>,
}

impl BankrollDecision {
    fn allow(current_count: u32, max_allowed: Option<u32>) -> Self {
        Self {
            allowed: true,
            reason: None,
            current_count: Some(current_count),
            max_allowed,
        }
    }

    fn deny(reason: String, current_count: Option<u32>, max_allowed: Option<u32>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            current_count,
            max_allowed,
        }
    }
}

/// Outcome of an AI-assistant quota check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiQuotaDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queries_used: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queries_limit: Option<u32>,
}

pub fn can_create_bankroll(
    profile: Option<&SubscriptionProfile>,
    current_count: u32,
    now: DateTime<Utc>,
) -> BankrollDecision {
    let plan = match check_access(profile, now) {
        AccessStatus::Granted { plan, .. } => plan,
        AccessStatus::Blocked { .. } => {
            return BankrollDecision::deny(PLAN_EXPIRED.into(), None, None);
        }
    };

    let limits = PlanLimits::for_tier(plan);
    match limits.max_bankrolls {
        Some(max) if limits.bankroll_limit_reached(current_count) => BankrollDecision::deny(
            format!(
                "The {plan} plan allows up to {max} bankroll{}. Upgrade to create more.",
                if max == 1 { "" } else { "s" }
            ),
            Some(current_count),
            Some(max),
        ),
        max_allowed => BankrollDecision::allow(current_count, max_allowed),
    }
}

pub fn can_use_ai(profile: Option<&SubscriptionProfile>, now: DateTime<Utc>) -> AiQuotaDecision {
    let (profile, plan) = match (profile, check_access(profile, now)) {
        (Some(p), AccessStatus::Granted { plan, .. }) => (p, plan),
        _ => {
            return AiQuotaDecision {
                allowed: false,
                reason: Some(PLAN_EXPIRED.into()),
                queries_used: None,
                queries_limit: None,
            };
        }
    };

    let used = effective_queries_used(profile, quota_day(now));
    let limits = PlanLimits::for_tier(plan);
    let Some(limit) = limits.max_ai_queries_per_day else {
        return AiQuotaDecision {
            allowed: true,
            reason: None,
            queries_used: Some(used),
            queries_limit: None,
        };
    };

    if limits.ai_limit_reached(used) {
        return AiQuotaDecision {
            allowed: false,
            reason: Some(format!(
                "Daily limit of {limit} AI quer{} reached on the {plan} plan.",
                if limit == 1 { "y" } else { "ies" }
            )),
            queries_used: Some(used),
            queries_limit: Some(limit),
        };
    }

    AiQuotaDecision {
        allowed: true,
        reason: None,
        queries_used: Some(used),
        queries_limit: Some(limit),
    }
}

pub fn can_access_realtime(profile: Option<&SubscriptionProfile>, now: DateTime<Utc>) -> bool {
    match check_access(profile, now) {
        AccessStatus::Granted { plan, .. } => PlanLimits::for_tier(plan).can_access_realtime,
        AccessStatus::Blocked { .. } => false,
    }
}

pub fn can_access_full_history(profile: Option<&SubscriptionProfile>, now: DateTime<Utc>) -> bool {
    match check_access(profile, now) {
        AccessStatus::Granted { plan, .. } => PlanLimits::for_tier(plan).can_access_full_history,
        AccessStatus::Blocked { .. } => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
