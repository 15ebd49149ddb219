//! Per-plan limits.
//!
//! The single source of plan quotas. Server handlers, the access guard and
//! the `/api/plans` endpoint all read this table.

use serde::Serialize;

use crate::types::PlanTier;

/// Quotas and feature flags for a plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanLimits {
    pub tier: PlanTier,
    /// Maximum bankrolls. None = unlimited.
    pub max_bankrolls: Option<u32>,
    /// Maximum AI assistant queries per UTC day. None = unlimited.
    pub max_ai_queries_per_day: Option<u32>,
    pub can_access_realtime: bool,
    pub can_access_full_history: bool,
}

/// | Tier  | Bankrolls | AI/day    | Realtime | Full history |
/// |-------|-----------|-----------|----------|--------------|
/// | Trial | 1         | 3         | Yes      | No           |
/// | Easy  | 1         | 1         | No       | No           |
/// | Pro   | Unlimited | Unlimited | Yes      | Yes          |
static PLAN_TABLE: [PlanLimits; 3] = [
    PlanLimits {
        tier: PlanTier::Trial,
        max_bankrolls: Some(1),
        max_ai_queries_per_day: Some(3),
        can_access_realtime: true,
        can_access_full_history: false,
    },
    PlanLimits {
        tier: PlanTier::Easy,
        max_bankrolls: Some(1),
        max_ai_queries_per_day: Some(1),
        can_access_realtime: false,
        can_access_full_history: false,
    },
    PlanLimits {
        tier: PlanTier::Pro,
        max_bankrolls: None,
        max_ai_queries_per_day: None,
        can_access_realtime: true,
        can_access_full_history: true,
    },
];

impl PlanLimits {
    /// Limits for a tier.
    pub fn for_tier(tier: PlanTier) -> &'static PlanLimits {
        match tier {
            PlanTier::Trial => &PLAN_TABLE[0],
            PlanTier::Easy => &PLAN_TABLE[1],
            PlanTier::Pro => &PLAN_TABLE[2],
        }
    }

    /// Every plan, cheapest first.
    pub fn all() -> &'static [PlanLimits] {
        &PLAN_TABLE
    }

    /// False if unlimited or under the limit.
    pub fn bankroll_limit_reached(&self, current: u32) -> bool {
        self.max_bankrolls.map(|max| current >= max).unwrap_or(false)
    }

    pub fn ai_limit_reached(&self, used_today: u32) -> bool {
        self.max_ai_queries_per_day
            .map(|max| used_today >= max)
            .unwrap_or(false)
    }
}
