//! End-to-end flows over the HTTP API.

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use banca::types::PlanTier;

use crate::harness::TestApp;

// ---------------------------------------------------------------------------
// Trial
// ---------------------------------------------------------------------------

#[tokio::test]
async fn trial_signup_grants_access_once() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();

    let (status, body) = app.post("/api/profile/trial", user, json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["plan_tier"], "trial");

    let (status, _) = app.post("/api/profile/trial", user, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.get("/api/access", user).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["access"], "granted");
    assert_eq!(body["plan"], "trial");
    assert_eq!(body["days_remaining"], 7);
}

#[tokio::test]
async fn trial_limits_bankrolls_and_ai() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    app.post("/api/profile/trial", user, json!({})).await;

    app.create_bankroll(user, "Futebol", 2.0).await;
    let (status, body) = app
        .post(
            "/api/bankrolls",
            user,
            json!({ "name": "Tênis", "initial_balance": 500, "stake_percent": 1.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("The Trial plan allows up to 1 bankroll."));

    for expected in 1..=3 {
        let (status, body) = app.post("/api/ai/queries", user, json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["queries_used"], expected);
        assert_eq!(body["queries_limit"], 3);
    }
    let (status, body) = app.post("/api/ai/queries", user, json!({})).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].as_str().unwrap().contains("Daily limit of 3 AI queries"));

    let (_, quota) = app.get("/api/ai/quota", user).await;
    assert_eq!(quota["allowed"], false);
    assert_eq!(quota["queries_used"], 3);

    let (_, realtime) = app.get("/api/realtime/access", user).await;
    assert_eq!(realtime["allowed"], true);
}

// ---------------------------------------------------------------------------
// Expiry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn expired_plan_is_blocked_but_can_see_status() {
    let app = TestApp::new().await;
    let user = app
        .with_profile(PlanTier::Easy, Utc::now() - Duration::hours(1))
        .await;

    let (status, body) = app.get("/api/bankrolls", user).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "subscription_expired");

    let (status, body) = app.post("/api/ai/queries", user, json!({})).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["success"], false);

    let (status, body) = app.get("/api/access", user).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["access"], "blocked");
    assert_eq!(body["reason"], "subscription_expired");
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

#[tokio::test]
async fn easy_plan_features() {
    let app = TestApp::new().await;
    let user = app.with_profile(PlanTier::Easy, Utc::now() + Duration::days(20)).await;

    let (_, realtime) = app.get("/api/realtime/access", user).await;
    assert_eq!(realtime["allowed"], false);

    let (status, _) = app.post("/api/ai/queries", user, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.post("/api/ai/queries", user, json!({})).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].as_str().unwrap().contains("1 AI query"));
}

#[tokio::test]
async fn pro_plan_is_unbounded() {
    let app = TestApp::new().await;
    let user = app.with_profile(PlanTier::Pro, Utc::now() + Duration::days(20)).await;

    for i in 0..5 {
        app.create_bankroll(user, &format!("Banca {i}"), 1.0).await;
    }
    let (_, list) = app.get("/api/bankrolls", user).await;
    assert_eq!(list.as_array().unwrap().len(), 5);

    for _ in 0..10 {
        let (status, body) = app.post("/api/ai/queries", user, json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.get("queries_limit").is_none());
    }
}

// ---------------------------------------------------------------------------
// Bets & performance
// ---------------------------------------------------------------------------

#[tokio::test]
async fn performance_reports_kpis_and_risk() {
    let app = TestApp::new().await;
    let user = app.with_profile(PlanTier::Pro, Utc::now() + Duration::days(20)).await;
    let bankroll = app.create_bankroll(user, "Main", 2.0).await;

    for i in 0..10 {
        let (status, bet) = app
            .post(
                &format!("/api/bankrolls/{bankroll}/bets"),
                user,
                json!({ "description": format!("Jogo {i}"), "stake": 10, "odds": 2.0 }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let outcome = if i < 6 { "won" } else { "lost" };
        let (status, _) = app
            .post(
                &format!("/api/bets/{}/settle", bet["id"].as_str().unwrap()),
                user,
                json!({ "status": outcome }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = app
        .get(&format!("/api/bankrolls/{bankroll}/performance"), user)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_history"], true);
    assert!(body.get("since").is_none());

    let summary = &body["summary"];
    assert_eq!(summary["wins"], 6);
    assert_eq!(summary["losses"], 4);
    assert!((summary["win_rate"].as_f64().unwrap() - 0.6).abs() < 1e-9);
    assert!((summary["profit"].as_f64().unwrap() - 20.0).abs() < 1e-9);
    assert!((body["current_balance"].as_f64().unwrap() - 1020.0).abs() < 1e-9);

    // 60% at 2.0 is a strong edge: real risk is far below the baseline.
    let risk = &body["risk"];
    assert_eq!(risk["has_sufficient_data"], true);
    assert_eq!(risk["is_warning"], false);
    assert_eq!(risk["real_label"], "<0.01%");
    assert_eq!(risk["real_level"], "low");
    assert!(risk["real_risk"].as_f64().unwrap() < risk["planned_risk"].as_f64().unwrap());
}

#[tokio::test]
async fn restricted_history_hides_balance() {
    let app = TestApp::new().await;
    let user = app.with_profile(PlanTier::Easy, Utc::now() + Duration::days(20)).await;
    let bankroll = app.create_bankroll(user, "Main", 2.0).await;

    let (status, body) = app
        .get(&format!("/api/bankrolls/{bankroll}/performance"), user)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_history"], false);
    assert!(body["since"].is_string());
    assert!(body.get("current_balance").is_none());
    // No settled bets: real risk falls back to planned.
    assert_eq!(body["risk"]["has_sufficient_data"], false);
    assert_eq!(body["risk"]["real_risk"], body["risk"]["planned_risk"]);
}

#[tokio::test]
async fn bets_settle_once_and_stay_private() {
    let app = TestApp::new().await;
    let owner = app.with_profile(PlanTier::Pro, Utc::now() + Duration::days(20)).await;
    let stranger = app.with_profile(PlanTier::Pro, Utc::now() + Duration::days(20)).await;
    let bankroll = app.create_bankroll(owner, "Main", 2.0).await;

    let (_, bet) = app
        .post(
            &format!("/api/bankrolls/{bankroll}/bets"),
            owner,
            json!({ "description": "Over 2.5", "stake": 20, "odds": 1.85 }),
        )
        .await;
    let settle = format!("/api/bets/{}/settle", bet["id"].as_str().unwrap());

    let (status, _) = app.post(&settle, owner, json!({ "status": "pending" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post(&settle, stranger, json!({ "status": "won" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.post(&settle, owner, json!({ "status": "void" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "void");

    let (status, _) = app.post(&settle, owner, json!({ "status": "won" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .get(&format!("/api/bankrolls/{bankroll}/performance"), stranger)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_bet_and_bankroll_inputs() {
    let app = TestApp::new().await;
    let user = app.with_profile(PlanTier::Pro, Utc::now() + Duration::days(20)).await;

    let (status, _) = app
        .post(
            "/api/bankrolls",
            user,
            json!({ "name": "Main", "initial_balance": 1000, "stake_percent": 0.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/bankrolls",
            user,
            json!({ "name": "  ", "initial_balance": 1000, "stake_percent": 2.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let bankroll = app.create_bankroll(user, "Main", 2.0).await;
    let (status, _) = app
        .post(
            &format!("/api/bankrolls/{bankroll}/bets"),
            user,
            json!({ "description": "x", "stake": 10, "odds": 1.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_wagers_are_rejected() {
    let app = TestApp::new().await;
    let user = app.with_profile(PlanTier::Pro, Utc::now() + Duration::days(20)).await;

    let (status, body) = app
        .post(
            "/api/bankrolls",
            user,
            json!({ "name": "Whale", "initial_balance": 1e20, "stake_percent": 2.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let bankroll = app.create_bankroll(user, "Main", 2.0).await;
    let bets = format!("/api/bankrolls/{bankroll}/bets");

    let (status, body) = app
        .post(&bets, user, json!({ "description": "x", "stake": 1e28, "odds": 2.0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("stake must not exceed"));

    let (status, body) = app
        .post(&bets, user, json!({ "description": "x", "stake": 10, "odds": 1e30 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("odds"));

    // The largest accepted wager settles and summarizes without overflow.
    let (status, bet) = app
        .post(&bets, user, json!({ "description": "x", "stake": 1_000_000_000, "odds": 1000.0 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .post(
            &format!("/api/bets/{}/settle", bet["id"].as_str().unwrap()),
            user,
            json!({ "status": "won" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get(&format!("/api/bankrolls/{bankroll}/performance"), user).await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["summary"]["profit"].as_f64().unwrap() - 999e9).abs() < 1.0);
}

// ---------------------------------------------------------------------------
// Risk calculator
// ---------------------------------------------------------------------------

#[tokio::test]
async fn risk_calculator_endpoint() {
    let app = TestApp::new().await;
    let anyone = Uuid::new_v4();

    let (status, body) = app
        .post(
            "/api/risk/evaluate",
            anyone,
            json!({ "win_rate": 0.55, "average_odds": 1.9, "stake_percent": 2.0, "total_settled_bets": 3 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["planned_risk"].as_f64().unwrap() - 1.108).abs() < 0.01);
    assert_eq!(body["real_risk"], body["planned_risk"]);
    assert_eq!(body["has_sufficient_data"], false);
    assert_eq!(body["planned_label"], "1.11%");

    let (status, body) = app
        .post(
            "/api/risk/evaluate",
            anyone,
            json!({ "win_rate": 0.55, "average_odds": 1.9, "stake_percent": 0.0, "total_settled_bets": 3 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}
