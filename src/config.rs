//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (the payment webhook token) are referenced by env-var name in
//! the config and resolved at runtime.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;

use crate::entitlement::LookupFailurePolicy;
use crate::risk::RiskConfig;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub access: AccessConfig,
    pub payments: PaymentsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AccessConfig {
    /// Length of the free trial granted on sign-up.
    #[serde(default = "default_trial_days")]
    pub trial_days: i64,
    /// Guard behaviour when the profile lookup errors.
    #[serde(default)]
    pub on_lookup_error: LookupFailurePolicy,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            trial_days: default_trial_days(),
            on_lookup_error: LookupFailurePolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentsConfig {
    /// Env var holding the shared secret sent in `x-webhook-token`.
    pub webhook_token_env: String,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_max_connections() -> u32 {
    5
}

fn default_trial_days() -> i64 {
    7
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.risk.validate()?;
        if config.access.trial_days <= 0 {
            anyhow::bail!("access.trial_days must be positive, got {}", config.access.trial_days);
        }
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// Shared secret the payment gateway must present.
    pub fn webhook_token(&self) -> Result<SecretString> {
        let token = Self::resolve_env(&self.payments.webhook_token_env)?;
        if token.trim().is_empty() {
            anyhow::bail!("{} is empty", self.payments.webhook_token_env);
        }
        Ok(SecretString::new(token))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
