//! PickLab Runner: backtest orchestration, live scans, metrics, config
//! and persistence.
//!
//! This crate builds on `picklab-core` to provide:
//! - Multi-symbol backtests over an injected price provider, in parallel
//! - Backtest metrics (win rate, drawdown, Sharpe, profit factor)
//! - The live scan: filter, score, gate, rank and size the day's picks
//! - Pick settlement back into the learning store
//! - TOML configuration for every tunable
//! - A file-backed key/value store for learning state
//! - JSON, CSV and Markdown export of reports

pub mod backtest;
pub mod config;
pub mod export;
pub mod metrics;
pub mod providers;
pub mod report;
pub mod scan;
pub mod store;

pub use backtest::{ingest_report, timeframe_for, BacktestConfig, BacktestError, Backtester};
pub use config::{ConfigError, PickLabConfig};
pub use metrics::{BacktestMetrics, ExitReasonCounts, ProfitFactor};
pub use providers::{FixedRegime, InMemoryPrices, RegimeCalendar, StaticSentiment};
pub use report::{BacktestReport, BacktestTrade, SymbolIssue, SCHEMA_VERSION};
pub use scan::{
    compute_pick_outcome, rank_picks, settle_pick, Pick, ScanCandidate, ScanConfig, ScanReport, Scanner,
    SettleError,
};
pub use store::JsonFileStore;
