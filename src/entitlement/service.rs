//! Repository-backed entitlement checks.
//!
//! Fetches the caller's profile and runs the pure evaluators in
//! `access`. The AI counter update is delegated to the repository's
//! atomic statement.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::access::{self, AccessStatus, AiQuotaDecision, BankrollDecision};
use super::plans::PlanLimits;
use crate::storage::ProfileRepository;

/// What the request guard does when the profile lookup itself fails.
///
/// The evaluator is always fail-closed for a *missing* profile; this only
/// covers lookup errors (database unavailable and the like).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LookupFailurePolicy {
    /// Let the request through.
    #[default]
    Allow,
    /// Refuse the request.
    Deny,
}

#[derive(Clone)]
pub struct EntitlementService {
    repo: Arc<dyn ProfileRepository>,
}

impl EntitlementService {
    pub fn new(repo: Arc<dyn ProfileRepository>) -> Self {
        Self { repo }
    }

    pub async fn check_access(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<AccessStatus> {
        let profile = self.repo.fetch_profile(user_id).await?;
        Ok(access::check_access(profile.as_ref(), now))
    }

    pub async fn can_create_bankroll(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<BankrollDecision> {
        let profile = self.repo.fetch_profile(user_id).await?;
        let count = self.repo.count_bankrolls(user_id).await?;
        let decision = access::can_create_bankroll(profile.as_ref(), count, now);
        if !decision.allowed {
            debug!(%user_id, count, reason = ?decision.reason, "Bankroll creation denied");
        }
        Ok(decision)
    }

    pub async fn can_use_ai(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<AiQuotaDecision> {
        let profile = self.repo.fetch_profile(user_id).await?;
        Ok(access::can_use_ai(profile.as_ref(), now))
    }

    /// Check the quota and, if allowed, count one AI query.
    ///
    /// The final admission is the repository's conditional update, so two
    /// requests racing for the last query cannot both be admitted.
    pub async fn consume_ai_query(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<AiQuotaDecision> {
        let profile = self.repo.fetch_profile(user_id).await?;
        let decision = access::can_use_ai(profile.as_ref(), now);
        let Some(profile) = profile.filter(|_| decision.allowed) else {
            return Ok(decision);
        };

        let limit = PlanLimits::for_tier(profile.plan_tier).max_ai_queries_per_day;
        let today = access::quota_day(now);

        match self.repo.try_consume_ai_query(user_id, today, limit).await? {
            Some(used) => {
                info!(%user_id, used, limit = ?limit, "AI query counted");
                Ok(AiQuotaDecision {
                    allowed: true,
                    reason: None,
                    queries_used: Some(used),
                    queries_limit: limit,
                })
            }
            None => {
                warn!(%user_id, limit = ?limit, "AI query refused at the counter");
                // The counter only refuses at the limit (or if the profile vanished);
                // re-read so the denial carries the current numbers.
                let refreshed = self.repo.fetch_profile(user_id).await?;
                let mut denied = access::can_use_ai(refreshed.as_ref(), now);
                denied.allowed = false;
                if denied.reason.is_none() {
                    denied.reason = Some("AI query quota unavailable, try again".into());
                }
                Ok(denied)
            }
        }
    }

    pub async fn can_access_realtime(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let profile = self.repo.fetch_profile(user_id).await?;
        Ok(access::can_access_realtime(profile.as_ref(), now))
    }

    pub async fn can_access_full_history(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let profile = self.repo.fetch_profile(user_id).await?;
        Ok(access::can_access_full_history(profile.as_ref(), now))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
