//! Backtest metrics: pure functions over a list of simulated trades.
//!
//! Trades are treated as a chain: each one compounds on the result of the
//! one before, in the order given. Callers pass trades sorted by entry time.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

use picklab_core::domain::{ExitReason, SimulatedTrade};

/// Trading days per year used to annualize the Sharpe ratio.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Gross wins over gross losses, with the degenerate cases named.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ProfitFactor {
    Finite(f64),
    /// Winners and no losers.
    Unbounded,
    /// No trades, or no trade made or lost anything.
    Undefined,
}

impl ProfitFactor {
    pub fn value(&self) -> Option<f64> {
        match self {
            ProfitFactor::Finite(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ProfitFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfitFactor::Finite(v) => write!(f, "{v:.2}"),
            ProfitFactor::Unbounded => f.write_str("unbounded"),
            ProfitFactor::Undefined => f.write_str("undefined"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitReasonCounts {
    pub stop: usize,
    pub target: usize,
    pub horizon_expiry: usize,
    pub end_of_data: usize,
}

impl ExitReasonCounts {
    pub fn from_trades(trades: &[SimulatedTrade]) -> Self {
        let mut counts = Self::default();
        for t in trades {
            match t.exit_reason {
                ExitReason::Stop => counts.stop += 1,
                ExitReason::Target => counts.target += 1,
                ExitReason::HorizonExpiry => counts.horizon_expiry += 1,
                ExitReason::EndOfData => counts.end_of_data += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.stop + self.target + self.horizon_expiry + self.end_of_data
    }
}

/// Aggregate statistics for one backtest. Returns are fractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub trade_count: usize,
    pub win_rate: f64,
    /// Mean return per trade.
    pub expectancy: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    /// Compounded return of the chained trades.
    pub total_return: f64,
    /// Negative fraction, e.g. -0.15 for a 15% peak-to-trough loss.
    pub max_drawdown: f64,
    pub sharpe: f64,
    pub profit_factor: ProfitFactor,
    pub avg_bars_held: f64,
    pub avg_holding_days: f64,
    pub max_consecutive_losses: usize,
    pub exit_reasons: ExitReasonCounts,
}

impl BacktestMetrics {
    pub fn compute(trades: &[SimulatedTrade]) -> Self {
        let returns: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();
        let curve = equity_curve(&returns);
        Self {
            trade_count: trades.len(),
            win_rate: win_rate(trades),
            expectancy: mean_f64(&returns),
            avg_win: avg_where(&returns, |r| r > 0.0),
            avg_loss: avg_where(&returns, |r| r < 0.0),
            best_trade: extreme(&returns, f64::NEG_INFINITY, f64::max),
            worst_trade: extreme(&returns, f64::INFINITY, f64::min),
            total_return: curve.last().map_or(0.0, |eq| eq - 1.0),
            max_drawdown: max_drawdown(&curve),
            sharpe: sharpe_ratio(trades),
            profit_factor: profit_factor(&returns),
            avg_bars_held: mean_f64(&trades.iter().map(|t| t.bars_held as f64).collect::<Vec<_>>()),
            avg_holding_days: avg_holding_days(trades),
            max_consecutive_losses: max_consecutive_losses(trades),
            exit_reasons: ExitReasonCounts::from_trades(trades),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Fraction of trades with a positive return.
pub fn win_rate(trades: &[SimulatedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Equity after each trade, starting from 1.0 before the first.
pub fn equity_curve(returns: &[f64]) -> Vec<f64> {
    let mut curve = Vec::with_capacity(returns.len() + 1);
    let mut eq = 1.0;
    curve.push(eq);
    for r in returns {
        eq *= 1.0 + r;
        curve.push(eq);
    }
    curve
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if equity never falls below a prior peak.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        peak = peak.max(eq);
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

/// Per-trade Sharpe ratio annualized by holding period.
///
/// ```text
/// sharpe = mean(r) / stdev(r) * sqrt(252 / avg_holding_days)
/// ```
///
/// Returns 0.0 with fewer than two trades or zero dispersion.
pub fn sharpe_ratio(trades: &[SimulatedTrade]) -> f64 {
    if trades.len() < 2 {
        return 0.0;
    }
    let returns: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    let holding = avg_holding_days(trades).max(1.0);
    mean_f64(&returns) / std * (TRADING_DAYS_PER_YEAR / holding).sqrt()
}

pub fn profit_factor(returns: &[f64]) -> ProfitFactor {
    let gross_win: f64 = returns.iter().filter(|r| **r > 0.0).sum();
    let gross_loss: f64 = returns.iter().filter(|r| **r < 0.0).map(|r| r.abs()).sum();
    match (gross_win > 0.0, gross_loss > 0.0) {
        (_, true) => ProfitFactor::Finite(gross_win / gross_loss),
        (true, false) => ProfitFactor::Unbounded,
        (false, false) => ProfitFactor::Undefined,
    }
}

/// Mean trading days between entry and exit, counting at least one per trade.
pub fn avg_holding_days(trades: &[SimulatedTrade]) -> f64 {
    let days: Vec<f64> = trades
        .iter()
        .map(|t| holding_days(t.entry_timestamp.date(), t.exit_timestamp.date()) as f64)
        .collect();
    mean_f64(&days)
}

/// Weekdays in `(entry, exit]`, at least 1. Same-day trades count as one day.
pub fn holding_days(entry: NaiveDate, exit: NaiveDate) -> u32 {
    let weekdays = entry
        .iter_days()
        .skip(1)
        .take_while(|d| *d <= exit)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .count();
    (weekdays as u32).max(1)
}

pub fn max_consecutive_losses(trades: &[SimulatedTrade]) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for trade in trades {
        if trade.is_winner() {
            current = 0;
        } else {
            current += 1;
            max_streak = max_streak.max(current);
        }
    }
    max_streak
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Largest or smallest return; 0.0 with no trades.
fn extreme(values: &[f64], init: f64, pick: fn(f64, f64) -> f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().copied().fold(init, pick)
}

fn avg_where(values: &[f64], keep: impl Fn(f64) -> bool) -> f64 {
    let picked: Vec<f64> = values.iter().copied().filter(|v| keep(*v)).collect();
    mean_f64(&picked)
}
