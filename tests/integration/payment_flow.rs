//! PIX webhook flows.

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use banca::payments::BILLING_PERIOD_DAYS;
use banca::storage::ProfileRepository;
use banca::types::PlanTier;

use crate::harness::{payment, TestApp, WEBHOOK_TOKEN};

#[tokio::test]
async fn webhook_rejects_bad_token() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();

    let (status, body) = app.webhook("wrong", payment(user, "pro", "E2E-1")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert!(app.state.store.fetch_profile(user).await.unwrap().is_none());
}

#[tokio::test]
async fn payment_unblocks_expired_trial() {
    let app = TestApp::new().await;
    let user = app
        .with_profile(PlanTier::Trial, Utc::now() - Duration::days(1))
        .await;

    let (status, body) = app.get("/api/bankrolls", user).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "trial_expired");

    let (status, body) = app.webhook(WEBHOOK_TOKEN, payment(user, "pro", "E2E-2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "applied");
    assert_eq!(body["profile"]["plan_tier"], "pro");
    assert_eq!(body["profile"]["status"], "active");

    let (status, _) = app.get("/api/bankrolls", user).await;
    assert_eq!(status, StatusCode::OK);

    let (_, access) = app.get("/api/access", user).await;
    assert_eq!(access["plan"], "pro");
    assert_eq!(access["days_remaining"], BILLING_PERIOD_DAYS);
}

#[tokio::test]
async fn duplicate_reference_is_a_no_op() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();

    let (_, first) = app.webhook(WEBHOOK_TOKEN, payment(user, "easy", "E2E-3")).await;
    assert_eq!(first["status"], "applied");
    let valid_until = app
        .state
        .store
        .fetch_profile(user)
        .await
        .unwrap()
        .unwrap()
        .valid_until;

    let (status, second) = app.webhook(WEBHOOK_TOKEN, payment(user, "easy", "E2E-3")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["status"], "duplicate");

    let after = app.state.store.fetch_profile(user).await.unwrap().unwrap();
    assert_eq!(after.valid_until, valid_until);
}

#[tokio::test]
async fn renewal_stacks_on_remaining_period() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();

    app.webhook(WEBHOOK_TOKEN, payment(user, "easy", "E2E-4")).await;
    app.webhook(WEBHOOK_TOKEN, payment(user, "easy", "E2E-5")).await;

    let (_, access) = app.get("/api/access", user).await;
    let days = access["days_remaining"].as_i64().unwrap();
    assert!((2 * BILLING_PERIOD_DAYS - 1..=2 * BILLING_PERIOD_DAYS).contains(&days));
}

#[tokio::test]
async fn trial_cannot_be_bought_and_other_events_are_ignored() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();

    let (status, _) = app.webhook(WEBHOOK_TOKEN, payment(user, "trial", "E2E-6")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut refunded = payment(user, "pro", "E2E-7");
    refunded["event"] = json!("payment.refunded");
    let (status, body) = app.webhook(WEBHOOK_TOKEN, refunded).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ignored");
    assert!(app.state.store.fetch_profile(user).await.unwrap().is_none());
}
