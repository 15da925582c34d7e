//! Backtesting engine: replays an entry rule over historical bars and
//! settles each entry with the shared trade outcome model.
//!
//! Per symbol the walk is strictly sequential and holds at most one trade:
//! after an entry the walk resumes on the bar after the exit. Symbols are
//! independent, so they run in parallel and are merged back in the order
//! they were requested.

use chrono::Duration;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use picklab_core::collaborators::{
    DateRange, PriceHistoryProvider, RegimeProvider, SentimentProvider, Timeframe,
};
use picklab_core::domain::{Bar, StrategyKind};
use picklab_core::indicators::{IndicatorFrame, IndicatorPeriods};
use picklab_core::learning::{LearningPhase, LearningStore, LearningView};
use picklab_core::scoring::CompositeScorer;
use picklab_core::strategy::{entry_rule, EntryContext};
use picklab_core::{simulate_trade, CoreError};

use crate::metrics::BacktestMetrics;
use crate::report::{run_id, BacktestReport, BacktestTrade, SymbolIssue, SCHEMA_VERSION};

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("invalid backtest period {0}: start is after end")]
    InvalidPeriod(DateRange),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Run symbols on the rayon pool.
    pub parallel: bool,
    /// Entries scoring below this conviction are not taken.
    pub min_conviction: Option<f64>,
    /// Liquidity floor passed to the liquidity dimension.
    pub min_avg_volume: f64,
    /// Calendar days fetched before the period start so indicators are warm
    /// on its first bar.
    pub warmup_days: i64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            min_conviction: None,
            min_avg_volume: 100_000.0,
            warmup_days: 120,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(min) = self.min_conviction {
            if !(0.0..=100.0).contains(&min) {
                return Err(format!("min_conviction must be within [0, 100], got {min}"));
            }
        }
        if self.min_avg_volume < 0.0 {
            return Err("min_avg_volume must be non-negative".into());
        }
        if self.warmup_days < 0 {
            return Err("warmup_days must be non-negative".into());
        }
        Ok(())
    }
}

/// Bar size a strategy is evaluated on.
pub fn timeframe_for(strategy: StrategyKind) -> Timeframe {
    if strategy.is_intraday() {
        Timeframe::Intraday5m
    } else {
        Timeframe::Daily
    }
}

/// How one symbol's run ended.
enum SymbolRun {
    Traded {
        trades: Vec<BacktestTrade>,
        rejected: usize,
    },
    Skipped(SymbolIssue),
    Failed(SymbolIssue),
}

pub struct Backtester<'a> {
    prices: &'a dyn PriceHistoryProvider,
    regime: &'a dyn RegimeProvider,
    sentiment: Option<&'a dyn SentimentProvider>,
    scorer: CompositeScorer,
    periods: IndicatorPeriods,
    config: BacktestConfig,
    view: Option<LearningView>,
}

impl<'a> Backtester<'a> {
    pub fn new(prices: &'a dyn PriceHistoryProvider, regime: &'a dyn RegimeProvider) -> Self {
        Self {
            prices,
            regime,
            sentiment: None,
            scorer: CompositeScorer::default(),
            periods: IndicatorPeriods::default(),
            config: BacktestConfig::default(),
            view: None,
        }
    }

    pub fn with_sentiment(mut self, sentiment: &'a dyn SentimentProvider) -> Self {
        self.sentiment = Some(sentiment);
        self
    }

    pub fn with_scorer(mut self, scorer: CompositeScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_periods(mut self, periods: IndicatorPeriods) -> Self {
        self.periods = periods;
        self
    }

    pub fn with_config(mut self, config: BacktestConfig) -> Self {
        self.config = config;
        self
    }

    /// Scores every entry against this learned state. The view is fixed for
    /// the whole run; outcomes of the run itself are not fed back mid-run.
    pub fn with_learning(mut self, view: LearningView) -> Self {
        self.view = Some(view);
        self
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Fetches each symbol's history and backtests `strategy` over `period`.
    pub fn run_backtest(
        &self,
        strategy: StrategyKind,
        symbols: &[String],
        period: DateRange,
    ) -> Result<BacktestReport, BacktestError> {
        if !period.is_valid() {
            return Err(BacktestError::InvalidPeriod(period));
        }
        info!(
            strategy = %strategy,
            symbols = symbols.len(),
            period = %period,
            "backtest started"
        );
        let fetch = DateRange::new(period.start - Duration::days(self.config.warmup_days), period.end);
        let timeframe = timeframe_for(strategy);

        let runs: Vec<SymbolRun> = if self.config.parallel {
            symbols
                .par_iter()
                .map(|symbol| self.fetch_and_run(strategy, symbol, timeframe, fetch, period))
                .collect()
        } else {
            symbols
                .iter()
                .map(|symbol| self.fetch_and_run(strategy, symbol, timeframe, fetch, period))
                .collect()
        };

        Ok(self.assemble(strategy, symbols.to_vec(), period, runs))
    }

    /// Backtests `strategy` over bars already in memory. No provider calls
    /// are made for prices.
    pub fn run_on_bars(
        &self,
        strategy: StrategyKind,
        series: &[(String, Vec<Bar>)],
        period: DateRange,
    ) -> Result<BacktestReport, BacktestError> {
        if !period.is_valid() {
            return Err(BacktestError::InvalidPeriod(period));
        }
        info!(
            strategy = %strategy,
            symbols = series.len(),
            period = %period,
            "backtest started on preloaded bars"
        );

        let runs: Vec<SymbolRun> = if self.config.parallel {
            series
                .par_iter()
                .map(|(symbol, bars)| self.run_symbol(strategy, symbol, bars, period))
                .collect()
        } else {
            series
                .iter()
                .map(|(symbol, bars)| self.run_symbol(strategy, symbol, bars, period))
                .collect()
        };

        let symbols = series.iter().map(|(s, _)| s.clone()).collect();
        Ok(self.assemble(strategy, symbols, period, runs))
    }

    /// Runs every strategy over the same symbols and period.
    pub fn compare_strategies(
        &self,
        strategies: &[StrategyKind],
        symbols: &[String],
        period: DateRange,
    ) -> Result<Vec<BacktestReport>, BacktestError> {
        strategies
            .iter()
            .map(|s| self.run_backtest(*s, symbols, period))
            .collect()
    }

    fn fetch_and_run(
        &self,
        strategy: StrategyKind,
        symbol: &str,
        timeframe: Timeframe,
        fetch: DateRange,
        period: DateRange,
    ) -> SymbolRun {
        match self.prices.get_bars(symbol, timeframe, fetch) {
            Ok(bars) => self.run_symbol(strategy, symbol, &bars, period),
            Err(err) => {
                warn!(symbol, error = %err, "price fetch failed, symbol excluded");
                SymbolRun::Failed(SymbolIssue::new(symbol, err.to_string()))
            }
        }
    }

    fn run_symbol(&self, strategy: StrategyKind, symbol: &str, bars: &[Bar], period: DateRange) -> SymbolRun {
        let frame = IndicatorFrame::compute(bars, &self.periods);
        let warmup = frame.warmup();
        if bars.len() <= warmup {
            let err = CoreError::insufficient(symbol, warmup + 1, bars.len());
            warn!(symbol, error = %err, "skipping symbol");
            return SymbolRun::Skipped(SymbolIssue::new(symbol, err.to_string()));
        }

        let first = bars.iter().position(|b| b.date() >= period.start);
        let last = bars.iter().rposition(|b| b.date() <= period.end);
        let (Some(first), Some(last)) = (first, last) else {
            warn!(symbol, period = %period, "no bars inside the period, skipping symbol");
            return SymbolRun::Skipped(SymbolIssue::new(symbol, format!("no bars inside {period}")));
        };

        let rule = entry_rule(strategy);
        let params = self.scorer.params();
        let sentiment = self.sentiment.and_then(|s| s.get_sentiment(symbol));
        let mut trades = Vec::new();
        let mut rejected = 0;

        let mut i = first.max(warmup);
        while i < last {
            let Some(ctx) = EntryContext::new(symbol, bars, i, &frame, params) else {
                break;
            };
            let ctx = ctx
                .with_sentiment(sentiment)
                .with_min_avg_volume(self.config.min_avg_volume);
            let Some(setup) = rule(&ctx) else {
                i += 1;
                continue;
            };

            let regime = self.regime.get_regime(bars[i].date());
            let snapshot = ctx.snapshot(setup, regime);
            let scored = match self.scorer.score(&snapshot, self.view.as_ref()) {
                Ok(scored) => scored,
                Err(err) => {
                    debug!(symbol, at = %bars[i].timestamp, error = %err, "rejected trade plan");
                    rejected += 1;
                    i += 1;
                    continue;
                }
            };
            if self.config.min_conviction.is_some_and(|min| scored.conviction < min) {
                i += 1;
                continue;
            }

            let trade = match simulate_trade(symbol, strategy, bars[i].timestamp, &scored.plan, &bars[i + 1..=last]) {
                Ok(trade) => trade,
                Err(err) => {
                    debug!(symbol, error = %err, "no bars left to settle entry");
                    break;
                }
            };
            i += trade.bars_held + 1;
            trades.push(BacktestTrade {
                trade,
                regime: regime.trend,
                patterns: scored.patterns,
                conviction: scored.conviction,
            });
        }

        debug!(symbol, trades = trades.len(), rejected, "symbol done");
        SymbolRun::Traded { trades, rejected }
    }

    fn assemble(
        &self,
        strategy: StrategyKind,
        symbols_requested: Vec<String>,
        period: DateRange,
        runs: Vec<SymbolRun>,
    ) -> BacktestReport {
        let mut trades = Vec::new();
        let mut skipped = Vec::new();
        let mut failed = Vec::new();
        let mut rejected_signals = 0;
        for run in runs {
            match run {
                SymbolRun::Traded { trades: t, rejected } => {
                    trades.extend(t);
                    rejected_signals += rejected;
                }
                SymbolRun::Skipped(issue) => skipped.push(issue),
                SymbolRun::Failed(issue) => failed.push(issue),
            }
        }
        trades.sort_by(|a, b| {
            a.trade
                .entry_timestamp
                .cmp(&b.trade.entry_timestamp)
                .then_with(|| a.trade.symbol.cmp(&b.trade.symbol))
        });

        let simulated: Vec<_> = trades.iter().map(|t| t.trade.clone()).collect();
        let metrics = BacktestMetrics::compute(&simulated);
        let run_id = run_id(
            strategy,
            self.scorer.params(),
            &symbols_requested,
            period,
            self.config.min_conviction,
        );

        info!(
            strategy = %strategy,
            trades = trades.len(),
            skipped = skipped.len(),
            failed = failed.len(),
            rejected = rejected_signals,
            "backtest finished"
        );

        BacktestReport {
            schema_version: SCHEMA_VERSION,
            run_id,
            strategy,
            period,
            symbols_requested,
            trades,
            metrics,
            skipped,
            failed,
            rejected_signals,
            learning_phase: self.view.as_ref().map_or(LearningPhase::Cold, |v| v.phase),
        }
    }
}

/// Feeds every trade of a report to the learning store. Returns how many
/// outcomes were recorded.
pub fn ingest_report(store: &mut LearningStore, report: &BacktestReport) -> usize {
    let n = store.ingest(report.trades.iter().map(BacktestTrade::outcome_record));
    info!(run = %report.run_id, outcomes = n, phase = %store.phase(), "backtest outcomes ingested");
    n
}
