//! Backtest report: the trades of one run, their metrics, and every symbol
//! that could not be tested.

use serde::{Deserialize, Serialize};

use picklab_core::collaborators::DateRange;
use picklab_core::domain::{SimulatedTrade, StrategyKind, TrendState};
use picklab_core::features::FeaturePattern;
use picklab_core::learning::{LearningPhase, OutcomeRecord};
use picklab_core::strategy::StrategyParams;

use crate::metrics::BacktestMetrics;

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// A simulated trade plus the scoring context it was entered with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestTrade {
    #[serde(flatten)]
    pub trade: SimulatedTrade,
    pub regime: TrendState,
    pub patterns: Vec<FeaturePattern>,
    pub conviction: f64,
}

impl BacktestTrade {
    /// The learning record this trade contributes.
    pub fn outcome_record(&self) -> OutcomeRecord {
        OutcomeRecord::from_trade(&self.trade, self.regime, self.patterns.clone())
    }
}

/// A symbol left out of the run, with why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolIssue {
    pub symbol: String,
    pub reason: String,
}

impl SymbolIssue {
    pub fn new(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub strategy: StrategyKind,
    pub period: DateRange,
    pub symbols_requested: Vec<String>,
    /// Sorted by entry time, then symbol.
    pub trades: Vec<BacktestTrade>,
    pub metrics: BacktestMetrics,
    /// Symbols with too little history to evaluate.
    pub skipped: Vec<SymbolIssue>,
    /// Symbols whose data could not be fetched.
    pub failed: Vec<SymbolIssue>,
    /// Fired entries whose trade plan was invalid.
    pub rejected_signals: usize,
    /// Learning phase of the view the run scored with.
    pub learning_phase: LearningPhase,
}

impl BacktestReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn simulated_trades(&self) -> Vec<SimulatedTrade> {
        self.trades.iter().map(|t| t.trade.clone()).collect()
    }

    /// Trades for one symbol, in order.
    pub fn trades_for<'a>(&'a self, symbol: &'a str) -> impl Iterator<Item = &'a BacktestTrade> + 'a {
        self.trades.iter().filter(move |t| t.trade.symbol == symbol)
    }
}

/// Content hash of everything that determines a run's output.
///
/// Two runs with the same strategy, parameters, universe, period and
/// conviction floor share an id.
pub fn run_id(
    strategy: StrategyKind,
    params: &StrategyParams,
    symbols: &[String],
    period: DateRange,
    min_conviction: Option<f64>,
) -> String {
    let canonical = serde_json::json!({
        "strategy": strategy.tag(),
        "params": params,
        "symbols": symbols,
        "period": period,
        "min_conviction": min_conviction,
    });
    blake3::hash(canonical.to_string().as_bytes()).to_hex().to_string()
}
