//! In-process test harness.
//!
//! Wraps the real router over an in-memory SQLite store so tests can drive
//! the HTTP surface without binding a port.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use banca::api::{build_router, ApiState, AppState};
use banca::config::AccessConfig;
use banca::risk::RiskConfig;
use banca::storage::Store;
use banca::types::{PlanTier, SubscriptionProfile, SubscriptionStatus};

pub const WEBHOOK_TOKEN: &str = "test-webhook-token";

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        let store = Store::in_memory().await.unwrap();
        let state = Arc::new(ApiState::new(
            store,
            RiskConfig::default(),
            AccessConfig::default(),
            Some(SecretString::new(WEBHOOK_TOKEN.to_string())),
        ));
        let router = build_router(state.clone());
        Self { state, router }
    }

    /// Insert a profile directly, bypassing the API.
    pub async fn with_profile(&self, tier: PlanTier, valid_until: DateTime<Utc>) -> Uuid {
        let user_id = Uuid::new_v4();
        let profile = SubscriptionProfile {
            user_id,
            plan_tier: tier,
            status: SubscriptionStatus::Active,
            valid_until,
            ai_queries_today: 0,
            last_ai_query_date: None,
        };
        assert!(self.state.store.insert_profile(&profile).await.unwrap());
        user_id
    }

    pub async fn get(&self, uri: &str, user: Uuid) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .uri(uri)
                .header("x-user-id", user.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post(&self, uri: &str, user: Uuid, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("x-user-id", user.to_string())
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn webhook(&self, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/webhooks/payment")
                .header("x-webhook-token", token)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Create a bankroll through the API and return its id.
    pub async fn create_bankroll(&self, user: Uuid, name: &str, stake_percent: f64) -> Uuid {
        let (status, body) = self
            .post(
                "/api/bankrolls",
                user,
                json!({ "name": name, "initial_balance": 1000, "stake_percent": stake_percent }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create bankroll failed: {body}");
        body["id"].as_str().unwrap().parse().unwrap()
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }
}

pub fn payment(user_id: Uuid, plan: &str, reference: &str) -> Value {
    json!({
        "event": "payment.confirmed",
        "reference": reference,
        "user_id": user_id,
        "plan": plan,
        "amount": 30,
        "paid_at": Utc::now().to_rfc3339(),
    })
}
