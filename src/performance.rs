//! Performance KPIs (win rate, ROI, profit) from a bankroll's bet history.
//!
//! The summary also produces the `BankrollSnapshot` consumed by the
//! risk engine.

use rust_decimal::prelude::*;
use serde::Serialize;

use crate::risk::BankrollSnapshot;
use crate::types::{Bet, BetStatus};

/// Aggregated bet-history statistics for one bankroll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub total_bets: u32,
    pub settled_bets: u32,
    pub pending_bets: u32,
    pub wins: u32,
    pub losses: u32,
    pub voids: u32,
    /// Wins / settled (0–1). Zero with no settled bets.
    pub win_rate: f64,
    /// Mean decimal odds over settled bets. Zero with no settled bets.
    pub average_odds: f64,
    /// Stake placed on settled bets.
    pub total_staked: Decimal,
    /// Stake still at risk on pending bets.
    pub open_stake: Decimal,
    pub profit: Decimal,
    pub roi_pct: f64,
}

impl PerformanceSummary {
    /// Snapshot for the risk engine at the bankroll's configured stake.
    pub fn snapshot(&self, stake_percent: f64) -> BankrollSnapshot {
        BankrollSnapshot {
            win_rate: self.win_rate,
            average_odds: self.average_odds,
            stake_percent,
            total_settled_bets: self.settled_bets,
        }
    }
}

/// Summarise a bet history.
pub fn summarize(bets: &[Bet]) -> PerformanceSummary {
    let mut wins = 0u32;
    let mut losses = 0u32;
    let mut voids = 0u32;
    let mut pending = 0u32;
    let mut odds_sum = 0.0;
    let mut total_staked = Decimal::ZERO;
    let mut open_stake = Decimal::ZERO;
    let mut profit = Decimal::ZERO;

    for bet in bets {
        match bet.status {
            BetStatus::Won => wins += 1,
            BetStatus::Lost => losses += 1,
            BetStatus::Void => voids += 1,
            BetStatus::Pending => {
                pending += 1;
                open_stake = open_stake.saturating_add(bet.stake);
            }
        }
        if bet.status.is_settled() {
            odds_sum += bet.odds;
            total_staked = total_staked.saturating_add(bet.stake);
            profit = profit.saturating_add(bet.profit());
        }
    }

    let settled = wins + losses;
    let (win_rate, average_odds) = if settled > 0 {
        (wins as f64 / settled as f64, odds_sum / settled as f64)
    } else {
        (0.0, 0.0)
    };

    let roi_pct = if total_staked > Decimal::ZERO {
        profit
            .checked_div(total_staked)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .and_then(|pct| pct.to_f64())
            .unwrap_or(0.0)
    } else {
        0.0
    };

    PerformanceSummary {
        total_bets: bets.len() as u32,
        settled_bets: settled,
        pending_bets: pending,
        wins,
        losses,
        voids,
        win_rate,
        average_odds,
        total_staked,
        open_stake,
        profit,
        roi_pct,
    }
}

/// Available balance: initial capital plus realised profit, minus stake
/// locked in pending bets.
pub fn current_balance(initial_balance: Decimal, summary: &PerformanceSummary) -> Decimal {
    initial_balance
        .saturating_add(summary.profit)
        .saturating_sub(summary.open_stake)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
