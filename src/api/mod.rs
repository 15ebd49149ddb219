//! HTTP API. Axum server in front of the risk engine and entitlements.
//!
//! Routes that touch account data sit behind the subscription guard.
//! CORS enabled for the web client.

pub mod error;
pub mod guard;
pub mod routes;

use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::ApiError;
pub use routes::{ApiState, AppState};

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/health", get(routes::health))
        .route("/api/plans", get(routes::get_plans))
        .route("/api/risk/evaluate", post(routes::evaluate_risk))
        .route("/api/profile/trial", post(routes::start_trial))
        .route("/api/access", get(routes::get_access))
        .route("/webhooks/payment", post(routes::payment_webhook));

    let guarded = Router::new()
        // Bankrolls
        .route("/api/bankrolls", get(routes::list_bankrolls).post(routes::create_bankroll))
        .route("/api/bankrolls/:id/bets", post(routes::place_bet))
        .route("/api/bankrolls/:id/performance", get(routes::get_performance))
        .route("/api/bets/:id/settle", post(routes::settle_bet))
        // AI assistant
        .route("/api/ai/quota", get(routes::get_ai_quota))
        .route("/api/ai/queries", post(routes::consume_ai_query))
        // Realtime feed
        .route("/api/realtime/access", get(routes::get_realtime_access))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guard::subscription_guard,
        ));

    public
        .merge(guarded)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API until Ctrl+C.
pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API address {addr}"))?;
    info!(%addr, "BANCA API listening on http://{addr}");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received.");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
