//! Caller identity and the subscription guard.
//!
//! Authentication happens upstream; the gateway forwards the account id in
//! `x-user-id`. The guard re-evaluates access on every request.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::error::ApiError;
use super::routes::AppState;
use crate::entitlement::{AccessStatus, LookupFailurePolicy};

pub const USER_ID_HEADER: &str = "x-user-id";

/// Account id of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

pub fn user_id_from_headers(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::Unauthorized)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        user_id_from_headers(&parts.headers).map(CurrentUser)
    }
}

/// Block requests from accounts without an active plan.
///
/// Blocked accounts get 402 with the block reason. If the profile can't be
/// looked up at all, `[access] on_lookup_error` decides.
pub async fn subscription_guard(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = user_id_from_headers(req.headers())?;

    match state.entitlements.check_access(user_id, Utc::now()).await {
        Ok(AccessStatus::Granted { plan, days_remaining }) => {
            debug!(%user_id, %plan, days_remaining, "Access granted");
            Ok(next.run(req).await)
        }
        Ok(AccessStatus::Blocked { reason }) => {
            debug!(%user_id, %reason, "Access blocked");
            Err(ApiError::PaymentRequired(reason.to_string()))
        }
        Err(e) => match state.access.on_lookup_error {
            LookupFailurePolicy::Allow => {
                warn!(%user_id, error = %e, "Subscription lookup failed, letting request through");
                Ok(next.run(req).await)
            }
            LookupFailurePolicy::Deny => {
                warn!(%user_id, error = %e, "Subscription lookup failed, refusing request");
                Err(ApiError::Unavailable)
            }
        },
    }
}
