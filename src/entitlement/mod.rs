//! Subscription entitlements.
//!
//! - `plans`: the per-tier limit table.
//! - `access`: pure evaluators over a profile and the current time.
//! - `service`: the same checks backed by a `ProfileRepository`.

pub mod access;
pub mod plans;
pub mod service;

pub use access::{
    can_access_full_history, can_access_realtime, can_create_bankroll, can_use_ai, check_access,
    days_remaining, effective_queries_used, quota_day, AccessStatus, AiQuotaDecision,
    BankrollDecision, BlockReason,
};
pub use plans::PlanLimits;
pub use service::{EntitlementService, LookupFailurePolicy};
