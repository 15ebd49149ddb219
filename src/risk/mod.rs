//! Bankroll risk: risk-of-ruin math and its presentation.

pub mod display;
pub mod ruin;

pub use display::{format_risk, RiskLevel};
pub use ruin::{
    calculate_planned_risk, calculate_ruin_risk, evaluate_risk, BankrollSnapshot, RiskConfig,
    RiskInputError, RiskResult, RuinEngine,
};
