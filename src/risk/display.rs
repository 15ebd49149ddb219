//! Presentation helpers for ruin-risk values.

use serde::Serialize;

/// Display tier for a ruin-risk percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// low < 5% ≤ medium < 15% ≤ high
    pub fn classify(risk_percent: f64) -> Self {
        if risk_percent < 5.0 {
            RiskLevel::Low
        } else if risk_percent < 15.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

/// Human-readable risk label: "<0.01%" floor, "100%" ceiling.
pub fn format_risk(risk_percent: f64) -> String {
    if risk_percent < 0.01 {
        "<0.01%".to_string()
    } else if risk_percent >= 100.0 {
        "100%".to_string()
    } else {
        format!("{:.2}%", risk_percent)
    }
}
