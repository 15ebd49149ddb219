//! BANCA — bankroll risk-of-ruin and subscription entitlement service
//!
//! Entry point. Loads configuration, initialises structured logging,
//! opens the database and serves the HTTP API until Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use banca::api::{self, ApiState};
use banca::config;
use banca::storage::Store;

const BANNER: &str = r#"
 ____    _    _   _  ____    _
| __ )  / \  | \ | |/ ___|  / \
|  _ \ / _ \ |  \| | |     / _ \
| |_) / ___ \| |\  | |___ / ___ \
|____/_/   \_\_| \_|\____/_/   \_\

  Bankroll risk & subscription entitlements
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::var("BANCA_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let cfg = config::AppConfig::load(&config_path)?;

    init_logging();

    println!("{BANNER}");
    info!(
        config = %config_path,
        addr = %cfg.bind_addr(),
        database = %cfg.database.url,
        trial_days = cfg.access.trial_days,
        on_lookup_error = ?cfg.access.on_lookup_error,
        "BANCA starting up"
    );

    let store = Store::connect(&cfg.database.url, cfg.database.max_connections).await?;
    store.ensure_schema().await?;

    let webhook_token = match cfg.webhook_token() {
        Ok(token) => Some(token),
        Err(e) => {
            warn!(error = %e, "Payment webhook disabled");
            None
        }
    };

    let state = Arc::new(ApiState::new(
        store,
        cfg.risk.clone(),
        cfg.access.clone(),
        webhook_token,
    ));

    api::serve(state, &cfg.bind_addr()).await?;

    info!("BANCA shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("banca=info,tower_http=info"));

    let json_logging = std::env::var("BANCA_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
