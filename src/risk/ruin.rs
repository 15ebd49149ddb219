//! Risk-of-ruin calculation.
//!
//! Closed-form gambler's-ruin approximation over fixed-fraction staking,
//! plus the real-vs-planned blend used by the bankroll dashboard.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Risk evaluation configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Win rate assumed when there is no usable track record.
    pub baseline_win_rate: f64,
    /// Average decimal odds assumed when there is no usable track record.
    pub baseline_odds: f64,
    /// Settled bets required before the observed win rate is trusted.
    pub min_settled_bets: u32,
    /// Real risk above `planned * warning_multiplier` raises a warning.
    pub warning_multiplier: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            baseline_win_rate: 0.55,
            baseline_odds: 1.90,
            min_settled_bets: 10,
            warning_multiplier: 2.0,
        }
    }
}

impl RiskConfig {
    /// Reject baselines the ruin formula can't use.
    pub fn validate(&self) -> Result<(), RiskInputError> {
        validate_win_rate(self.baseline_win_rate)?;
        validate_odds(self.baseline_odds)?;
        if !self.warning_multiplier.is_finite() {
            return Err(RiskInputError::NonFinite { field: "warning_multiplier" });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Inputs & outputs
// ---------------------------------------------------------------------------

/// Rejected risk inputs. Raised instead of letting NaN/Infinity leak out.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskInputError {
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },

    #[error("stake percent must be in (0, 100], got {0}")]
    StakeOutOfRange(f64),

    #[error("win rate must be in [0, 1], got {0}")]
    WinRateOutOfRange(f64),

    #[error("average odds must not be negative, got {0}")]
    NegativeOdds(f64),
}

/// Aggregate statistics for one bankroll, computed per request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BankrollSnapshot {
    /// Fraction of settled bets won (0–1).
    pub win_rate: f64,
    /// Mean decimal odds across settled bets.
    pub average_odds: f64,
    /// Stake per bet as a percentage of the bankroll.
    pub stake_percent: f64,
    pub total_settled_bets: u32,
}

/// Outcome of a risk evaluation. All risks are percentages (0–100).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    pub real_risk: f64,
    pub planned_risk: f64,
    pub has_sufficient_data: bool,
    pub is_warning: bool,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RuinEngine {
    config: RiskConfig,
}

impl RuinEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Access the risk configuration.
    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Probability of ruin, in percent.
    ///
    /// edge = p·o − 1, q = (1 − edge) / (1 + edge), risk = q^(100 / stake%).
    /// A non-positive edge is certain ruin.
    pub fn ruin_risk(
        &self,
        win_rate: f64,
        average_odds: f64,
        stake_percent: f64,
    ) -> Result<f64, RiskInputError> {
        validate_stake(stake_percent)?;
        validate_win_rate(win_rate)?;
        validate_odds(average_odds)?;

        let edge = win_rate * average_odds - 1.0;
        if edge <= 0.0 {
            return Ok(100.0);
        }

        let units_in_bankroll = 100.0 / stake_percent;
        // edge >= 1 makes q non-positive; ruin is then impossible.
        let q = ((1.0 - edge) / (1.0 + edge)).max(0.0);
        let risk = (q.powf(units_in_bankroll) * 100.0).clamp(0.0, 100.0);

        debug!(
            win_rate,
            average_odds,
            stake_percent,
            edge = format!("{:.4}", edge),
            risk = format!("{:.4}%", risk),
            "Ruin risk computed"
        );

        Ok(risk)
    }

    /// Risk under the conservative baseline (no track record).
    pub fn planned_risk(&self, stake_percent: f64) -> Result<f64, RiskInputError> {
        self.ruin_risk(
            self.config.baseline_win_rate,
            self.config.baseline_odds,
            stake_percent,
        )
    }

    /// Blend observed and baseline risk for a bankroll.
    ///
    /// With fewer than `min_settled_bets` settled bets, or a degenerate
    /// track record, the real risk falls back to the planned risk.
    pub fn evaluate(&self, snapshot: &BankrollSnapshot) -> Result<RiskResult, RiskInputError> {
        validate_win_rate(snapshot.win_rate)?;
        validate_odds(snapshot.average_odds)?;

        let planned_risk = self.planned_risk(snapshot.stake_percent)?;
        let has_sufficient_data = snapshot.total_settled_bets >= self.config.min_settled_bets;

        let real_risk =
            if has_sufficient_data && snapshot.win_rate > 0.0 && snapshot.average_odds > 0.0 {
                self.ruin_risk(snapshot.win_rate, snapshot.average_odds, snapshot.stake_percent)?
            } else {
                planned_risk
            };

        let is_warning =
            has_sufficient_data && real_risk > planned_risk * self.config.warning_multiplier;

        Ok(RiskResult {
            real_risk,
            planned_risk,
            has_sufficient_data,
            is_warning,
        })
    }
}

impl Default for RuinEngine {
    fn default() -> Self {
        Self::new(RiskConfig::default())
    }
}

/// Ruin risk with explicit inputs, using the default configuration.
pub fn calculate_ruin_risk(
    win_rate: f64,
    average_odds: f64,
    stake_percent: f64,
) -> Result<f64, RiskInputError> {
    RuinEngine::default().ruin_risk(win_rate, average_odds, stake_percent)
}

/// Ruin risk at the baseline 55% win rate and 1.90 odds.
pub fn calculate_planned_risk(stake_percent: f64) -> Result<f64, RiskInputError> {
    RuinEngine::default().planned_risk(stake_percent)
}

pub fn evaluate_risk(snapshot: &BankrollSnapshot) -> Result<RiskResult, RiskInputError> {
    RuinEngine::default().evaluate(snapshot)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_stake(stake_percent: f64) -> Result<(), RiskInputError> {
    if !stake_percent.is_finite() {
        return Err(RiskInputError::NonFinite { field: "stake_percent" });
    }
    if stake_percent <= 0.0 || stake_percent > 100.0 {
        return Err(RiskInputError::StakeOutOfRange(stake_percent));
    }
    Ok(())
}

fn validate_win_rate(win_rate: f64) -> Result<(), RiskInputError> {
    if !win_rate.is_finite() {
        return Err(RiskInputError::NonFinite { field: "win_rate" });
    }
    if !(0.0..=1.0).contains(&win_rate) {
        return Err(RiskInputError::WinRateOutOfRange(win_rate));
    }
    Ok(())
}

fn validate_odds(average_odds: f64) -> Result<(), RiskInputError> {
    if !average_odds.is_finite() {
        return Err(RiskInputError::NonFinite { field: "average_odds" });
    }
    if average_odds < 0.0 {
        return Err(RiskInputError::NegativeOdds(average_odds));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
