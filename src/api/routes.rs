//! API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<ApiState>`.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::ApiError;
use super::guard::CurrentUser;
use crate::config::AccessConfig;
use crate::entitlement::{AccessStatus, AiQuotaDecision, EntitlementService, PlanLimits};
use crate::payments::PaymentWebhook;
use crate::performance::{self, PerformanceSummary};
use crate::risk::{format_risk, BankrollSnapshot, RiskConfig, RiskLevel, RiskResult, RuinEngine};
use crate::storage::profiles::PaymentOutcome;
use crate::storage::Store;
use crate::types::{Bankroll, Bet, BetStatus, SubscriptionProfile, MAX_BALANCE_UNITS};

/// Header carrying the payment gateway's shared secret.
pub const WEBHOOK_TOKEN_HEADER: &str = "x-webhook-token";

/// History window for plans without full-history access.
pub const RECENT_HISTORY_DAYS: i64 = 30;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ApiState {
    pub store: Store,
    pub entitlements: EntitlementService,
    pub risk: RuinEngine,
    pub access: AccessConfig,
    /// None disables the payment webhook.
    pub webhook_token: Option<SecretString>,
}

impl ApiState {
    pub fn new(
        store: Store,
        risk: RiskConfig,
        access: AccessConfig,
        webhook_token: Option<SecretString>,
    ) -> Self {
        let entitlements = EntitlementService::new(Arc::new(store.clone()));
        Self {
            store,
            entitlements,
            risk: RuinEngine::new(risk),
            access,
            webhook_token,
        }
    }
}

pub type AppState = Arc<ApiState>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RiskResponse {
    #[serde(flatten)]
    pub result: RiskResult,
    pub real_level: RiskLevel,
    pub planned_level: RiskLevel,
    pub real_label: String,
    pub planned_label: String,
}

impl From<RiskResult> for RiskResponse {
    fn from(result: RiskResult) -> Self {
        Self {
            real_level: RiskLevel::classify(result.real_risk),
            planned_level: RiskLevel::classify(result.planned_risk),
            real_label: format_risk(result.real_risk),
            planned_label: format_risk(result.planned_risk),
            result,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBankrollRequest {
    pub name: String,
    pub initial_balance: Decimal,
    pub stake_percent: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceBetRequest {
    pub description: String,
    pub stake: Decimal,
    pub odds: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettleBetRequest {
    pub status: BetStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceResponse {
    pub bankroll_id: Uuid,
    pub full_history: bool,
    /// Start of the window when history is restricted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    pub summary: PerformanceSummary,
    /// Only reported when the whole history was read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_balance: Option<Decimal>,
    pub risk: RiskResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureAccess {
    pub allowed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<SubscriptionProfile>,
}

// ---------------------------------------------------------------------------
// Public handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /api/plans
pub async fn get_plans() -> Json<&'static [PlanLimits]> {
    Json(PlanLimits::all())
}

/// POST /api/risk/evaluate
pub async fn evaluate_risk(
    State(state): State<AppState>,
    Json(snapshot): Json<BankrollSnapshot>,
) -> Result<Json<RiskResponse>, ApiError> {
    let result = state.risk.evaluate(&snapshot)?;
    Ok(Json(result.into()))
}

/// POST /api/profile/trial
pub async fn start_trial(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<(StatusCode, Json<SubscriptionProfile>), ApiError> {
    let profile = SubscriptionProfile::trial(user_id, Utc::now(), state.access.trial_days);
    if !state.store.insert_profile(&profile).await? {
        return Err(ApiError::Conflict("subscription profile already exists".into()));
    }
    info!(%user_id, valid_until = %profile.valid_until, "Trial started");
    Ok((StatusCode::CREATED, Json(profile)))
}

/// GET /api/access
pub async fn get_access(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<AccessStatus>, ApiError> {
    Ok(Json(state.entitlements.check_access(user_id, Utc::now()).await?))
}

/// POST /webhooks/payment
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(hook): Json<PaymentWebhook>,
) -> Result<Json<WebhookAck>, ApiError> {
    let Some(expected) = state.webhook_token.as_ref() else {
        warn!("Payment webhook called but no webhook token is configured");
        return Err(ApiError::Unauthorized);
    };
    let presented = headers
        .get(WEBHOOK_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !token_matches(presented, expected.expose_secret()) {
        warn!(reference = %hook.payment.reference, "Payment webhook with bad token");
        return Err(ApiError::Unauthorized);
    }

    if !hook.is_confirmation() {
        info!(event = %hook.event, reference = %hook.payment.reference, "Ignoring payment event");
        return Ok(Json(WebhookAck { status: "ignored", profile: None }));
    }

    hook.payment.validate()?;

    match state.store.apply_payment(&hook.payment).await? {
        PaymentOutcome::Applied(profile) => Ok(Json(WebhookAck {
            status: "applied",
            profile: Some(profile),
        })),
        PaymentOutcome::Duplicate => Ok(Json(WebhookAck { status: "duplicate", profile: None })),
    }
}

/// Compare webhook tokens without short-circuiting on the first differing byte.
fn token_matches(presented: &str, expected: &str) -> bool {
    let (presented, expected) = (presented.as_bytes(), expected.as_bytes());
    presented.len() == expected.len()
        && presented
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

// ---------------------------------------------------------------------------
// Guarded handlers
// ---------------------------------------------------------------------------

/// Bankroll owned by the caller. Other users' bankrolls read as missing.
async fn owned_bankroll(state: &ApiState, user_id: Uuid, id: Uuid) -> Result<Bankroll, ApiError> {
    state
        .store
        .get_bankroll(id)
        .await?
        .filter(|b| b.user_id == user_id)
        .ok_or_else(|| ApiError::NotFound(format!("bankroll {id}")))
}

/// GET /api/bankrolls
pub async fn list_bankrolls(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<Bankroll>>, ApiError> {
    Ok(Json(state.store.list_bankrolls(user_id).await?))
}

/// POST /api/bankrolls
pub async fn create_bankroll(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<CreateBankrollRequest>,
) -> Result<(StatusCode, Json<Bankroll>), ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("bankroll name is required".into()));
    }
    if req.initial_balance <= Decimal::ZERO {
        return Err(ApiError::BadRequest("initial balance must be positive".into()));
    }
    if req.initial_balance > Decimal::from(MAX_BALANCE_UNITS) {
        return Err(ApiError::BadRequest(format!(
            "initial balance must not exceed {MAX_BALANCE_UNITS}"
        )));
    }
    // Rejects stakes outside (0, 100].
    state.risk.planned_risk(req.stake_percent)?;

    let decision = state.entitlements.can_create_bankroll(user_id, Utc::now()).await?;
    if !decision.allowed {
        let reason = decision.reason.unwrap_or_else(|| "bankroll limit reached".into());
        return Err(ApiError::Forbidden(reason));
    }

    let bankroll = Bankroll {
        id: Uuid::new_v4(),
        user_id,
        name: name.to_string(),
        initial_balance: req.initial_balance,
        stake_percent: req.stake_percent,
        created_at: Utc::now(),
    };

    // The decision above can race with another creation; the store re-checks.
    if !state
        .store
        .create_bankroll_within_limit(&bankroll, decision.max_allowed)
        .await?
    {
        return Err(ApiError::Forbidden("bankroll limit reached".into()));
    }

    info!(%user_id, bankroll_id = %bankroll.id, name = %bankroll.name, "Bankroll created");
    Ok((StatusCode::CREATED, Json(bankroll)))
}

/// POST /api/bankrolls/:id/bets
pub async fn place_bet(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(bankroll_id): Path<Uuid>,
    Json(req): Json<PlaceBetRequest>,
) -> Result<(StatusCode, Json<Bet>), ApiError> {
    let bankroll = owned_bankroll(&state, user_id, bankroll_id).await?;

    Bet::validate_wager(req.stake, req.odds)?;

    let bet = Bet {
        id: Uuid::new_v4(),
        bankroll_id: bankroll.id,
        description: req.description.trim().to_string(),
        stake: req.stake,
        odds: req.odds,
        status: BetStatus::Pending,
        placed_at: Utc::now(),
    };
    state.store.insert_bet(&bet).await?;

    info!(bankroll_id = %bankroll.id, bet_id = %bet.id, stake = %bet.stake, odds = bet.odds, "Bet placed");
    Ok((StatusCode::CREATED, Json(bet)))
}

/// POST /api/bets/:id/settle
pub async fn settle_bet(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(bet_id): Path<Uuid>,
    Json(req): Json<SettleBetRequest>,
) -> Result<Json<Bet>, ApiError> {
    if req.status == BetStatus::Pending {
        return Err(ApiError::BadRequest("a bet can only be settled as won, lost or void".into()));
    }

    let mut bet = state
        .store
        .get_bet(bet_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("bet {bet_id}")))?;
    owned_bankroll(&state, user_id, bet.bankroll_id)
        .await
        .map_err(|_| ApiError::NotFound(format!("bet {bet_id}")))?;

    if !state.store.settle_bet(bet_id, req.status).await? {
        return Err(ApiError::Conflict(format!("bet {bet_id} is already settled")));
    }

    bet.status = req.status;
    info!(%bet_id, status = %bet.status, profit = %bet.profit(), "Bet settled");
    Ok(Json(bet))
}

/// GET /api/bankrolls/:id/performance
pub async fn get_performance(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(bankroll_id): Path<Uuid>,
) -> Result<Json<PerformanceResponse>, ApiError> {
    let now = Utc::now();
    let bankroll = owned_bankroll(&state, user_id, bankroll_id).await?;
    let full_history = state.entitlements.can_access_full_history(user_id, now).await?;
    let since = (!full_history).then(|| now - Duration::days(RECENT_HISTORY_DAYS));

    let bets = state.store.list_bets(bankroll.id, since).await?;
    let summary = performance::summarize(&bets);
    let risk = state.risk.evaluate(&summary.snapshot(bankroll.stake_percent))?;
    let current_balance =
        full_history.then(|| performance::current_balance(bankroll.initial_balance, &summary));

    Ok(Json(PerformanceResponse {
        bankroll_id: bankroll.id,
        full_history,
        since,
        summary,
        current_balance,
        risk: risk.into(),
    }))
}

/// GET /api/ai/quota
pub async fn get_ai_quota(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<AiQuotaDecision>, ApiError> {
    Ok(Json(state.entitlements.can_use_ai(user_id, Utc::now()).await?))
}

/// POST /api/ai/queries
pub async fn consume_ai_query(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<AiQuotaDecision>, ApiError> {
    let decision = state.entitlements.consume_ai_query(user_id, Utc::now()).await?;
    if !decision.allowed {
        let reason = decision.reason.unwrap_or_else(|| "AI query limit reached".into());
        return Err(ApiError::QuotaExceeded(reason));
    }
    Ok(Json(decision))
}

/// GET /api/realtime/access
pub async fn get_realtime_access(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<FeatureAccess>, ApiError> {
    let allowed = state.entitlements.can_access_realtime(user_id, Utc::now()).await?;
    Ok(Json(FeatureAccess { allowed }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_response_flattens_result() {
        let result = RiskResult {
            real_risk: 22.0,
            planned_risk: 1.108,
            has_sufficient_data: true,
            is_warning: true,
        };
        let json = serde_json::to_value(RiskResponse::from(result)).unwrap();
        assert_eq!(json["real_risk"], 22.0);
        assert_eq!(json["is_warning"], true);
        assert_eq!(json["real_level"], "high");
        assert_eq!(json["planned_level"], "low");
        assert_eq!(json["planned_label"], "1.11%");
    }

    #[test]
    fn test_webhook_ack_omits_missing_profile() {
        let json = serde_json::to_value(WebhookAck { status: "duplicate", profile: None }).unwrap();
        assert_eq!(json["status"], "duplicate");
        assert!(json.get("profile").is_none());
    }

    #[test]
    fn test_token_matches() {
        assert!(token_matches("s3cret-token", "s3cret-token"));
        assert!(!token_matches("s3cret-tokem", "s3cret-token"));
        assert!(!token_matches("s3cret", "s3cret-token"));
        assert!(!token_matches("", "s3cret-token"));
        assert!(token_matches("", ""));
    }
}
