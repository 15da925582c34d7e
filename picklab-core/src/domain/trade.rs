//! Simulated trade: the immutable output of the trade outcome model.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::strategy::StrategyKind;

/// Which terminal condition closed the trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Stop,
    Target,
    HorizonExpiry,
    /// Bars ran out before the horizon elapsed.
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::Stop => "stop",
            ExitReason::Target => "target",
            ExitReason::HorizonExpiry => "horizon_expiry",
            ExitReason::EndOfData => "end_of_data",
        };
        f.write_str(s)
    }
}

/// A closed long trade.
///
/// `return_pct`, `mfe` and `mae` are fractions of the entry price
/// (0.05 = 5%). `mae` is zero or negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedTrade {
    pub symbol: String,
    pub strategy: StrategyKind,
    pub entry_timestamp: NaiveDateTime,
    pub exit_timestamp: NaiveDateTime,
    pub entry_price: f64,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    pub return_pct: f64,
    pub mfe: f64,
    pub mae: f64,
    pub bars_held: usize,
}

impl SimulatedTrade {
    pub fn is_winner(&self) -> bool {
        self.return_pct > 0.0
    }

    pub fn hit_target(&self) -> bool {
        self.exit_reason == ExitReason::Target
    }

    pub fn hit_stop(&self) -> bool {
        self.exit_reason == ExitReason::Stop
    }

    /// Whether `[entry, exit]` intersects the other trade's interval.
    pub fn overlaps(&self, other: &SimulatedTrade) -> bool {
        self.entry_timestamp <= other.exit_timestamp && other.entry_timestamp <= self.exit_timestamp
    }
}
