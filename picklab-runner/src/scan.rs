//! Live scan: score the latest bar of each symbol, gate it on risk and
//! publish a short ranked list of picks.
//!
//! The best setup per symbol is dampened when the daily, weekly and
//! monthly trends of its history line up bearish.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use picklab_core::collaborators::{
    DateRange, PriceHistoryProvider, SentimentProvider, Timeframe,
};
use picklab_core::domain::{
    Bar, PickId, Regime, SentimentReading, SimulatedTrade, StrategyKind,
};
use picklab_core::indicators::{IndicatorFrame, IndicatorPeriods};
use picklab_core::learning::{LearningError, LearningPhase, LearningStore, LearningView, PickRecord};
use picklab_core::risk::{ExposureState, RiskGate, RiskVerdict};
use picklab_core::scoring::{CompositeResult, CompositeScorer, TimeframeAlignment};
use picklab_core::strategy::{entry_rule, EntryContext};
use picklab_core::{simulate_trade, CoreError};

use crate::report::SymbolIssue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Strategies evaluated on every symbol. HVB is opt-in.
    pub strategies: Vec<StrategyKind>,
    pub min_price: f64,
    pub max_price: f64,
    pub min_avg_volume: f64,
    pub min_conviction: f64,
    pub max_hvb_picks: usize,
    pub top_n: usize,
    /// Symbols with news polarity below this are dropped.
    pub negative_sentiment_cutoff: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            strategies: vec![
                StrategyKind::Orb,
                StrategyKind::VwapPullback,
                StrategyKind::MomentumSwing,
                StrategyKind::EarningsDrift,
            ],
            min_price: 50.0,
            max_price: 5_000.0,
            min_avg_volume: 100_000.0,
            min_conviction: 60.0,
            max_hvb_picks: 1,
            top_n: 3,
            negative_sentiment_cutoff: -0.3,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.strategies.is_empty() {
            return Err("at least one strategy must be enabled".into());
        }
        if !(self.min_price >= 0.0 && self.min_price <= self.max_price) {
            return Err(format!(
                "price filter must satisfy 0 <= min ({}) <= max ({})",
                self.min_price, self.max_price
            ));
        }
        if !(0.0..=100.0).contains(&self.min_conviction) {
            return Err("min_conviction must be within [0, 100]".into());
        }
        if self.top_n == 0 {
            return Err("top_n must be at least 1".into());
        }
        if !(-1.0..=1.0).contains(&self.negative_sentiment_cutoff) {
            return Err("negative_sentiment_cutoff must be within [-1, 1]".into());
        }
        Ok(())
    }

    pub fn with_hvb(mut self) -> Self {
        if !self.strategies.contains(&StrategyKind::HighVolatilityBreakout) {
            self.strategies.push(StrategyKind::HighVolatilityBreakout);
        }
        self
    }
}

/// One symbol's recent history and news.
#[derive(Debug, Clone)]
pub struct ScanCandidate {
    pub symbol: String,
    pub bars: Vec<Bar>,
    pub sentiment: Option<SentimentReading>,
}

/// A published recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub id: PickId,
    pub rank: usize,
    /// Shares sized so a stop-out loses the per-trade risk budget.
    pub position_size: f64,
    pub regime: Regime,
    pub result: CompositeResult,
}

impl Pick {
    /// What the learning store needs to attribute later outcomes.
    pub fn record(&self) -> PickRecord {
        PickRecord {
            id: self.id.clone(),
            symbol: self.result.symbol.clone(),
            strategy: self.result.strategy,
            regime: self.regime.trend,
            patterns: self.result.patterns.clone(),
            conviction: self.result.conviction,
            plan: self.result.plan.clone(),
            issued_at: self.result.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub regime: Regime,
    pub picks: Vec<Pick>,
    /// Symbols where at least one strategy fired and scored.
    pub scored: usize,
    pub skipped: Vec<SymbolIssue>,
    pub failed: Vec<SymbolIssue>,
    pub rejected_signals: usize,
    /// Set when an account-wide limit stopped the scan.
    pub blocked: Option<RiskVerdict>,
    pub learning_phase: LearningPhase,
}

impl ScanReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Attaches symbols whose history could not be fetched.
    pub fn with_failed(mut self, failed: Vec<SymbolIssue>) -> Self {
        self.failed.extend(failed);
        self
    }

    /// Registers every pick so outcomes and feedback can be attributed.
    pub fn register(&self, store: &mut LearningStore) {
        for pick in &self.picks {
            store.register_pick(pick.record());
        }
    }
}

#[derive(Debug, Error)]
pub enum SettleError {
    #[error(transparent)]
    Outcome(#[from] CoreError),

    #[error(transparent)]
    Learning(#[from] LearningError),
}

enum SymbolScan {
    Scored {
        best: Option<CompositeResult>,
        rejected: usize,
    },
    Skipped(SymbolIssue),
}

pub struct Scanner {
    scorer: CompositeScorer,
    periods: IndicatorPeriods,
    gate: RiskGate,
    config: ScanConfig,
}

impl Scanner {
    pub fn new(scorer: CompositeScorer, periods: IndicatorPeriods, gate: RiskGate, config: ScanConfig) -> Self {
        Self {
            scorer,
            periods,
            gate,
            config,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Fetches history and sentiment for `symbols`. Symbols whose history
    /// cannot be fetched come back as failures.
    pub fn fetch_candidates(
        prices: &dyn PriceHistoryProvider,
        sentiment: Option<&dyn SentimentProvider>,
        symbols: &[String],
        timeframe: Timeframe,
        range: DateRange,
    ) -> (Vec<ScanCandidate>, Vec<SymbolIssue>) {
        let mut candidates = Vec::new();
        let mut failed = Vec::new();
        for symbol in symbols {
            match prices.get_bars(symbol, timeframe, range) {
                Ok(bars) => candidates.push(ScanCandidate {
                    symbol: symbol.clone(),
                    bars,
                    sentiment: sentiment.and_then(|s| s.get_sentiment(symbol)),
                }),
                Err(err) => {
                    warn!(symbol = %symbol, error = %err, "price fetch failed, symbol excluded");
                    failed.push(SymbolIssue::new(symbol.as_str(), err.to_string()));
                }
            }
        }
        (candidates, failed)
    }

    /// Scores every candidate at its latest bar and ranks the survivors.
    pub fn scan(
        &self,
        candidates: &[ScanCandidate],
        regime: Regime,
        view: Option<&LearningView>,
        exposure: &ExposureState,
    ) -> ScanReport {
        let learning_phase = view.map_or(LearningPhase::Cold, |v| v.phase);
        let account = self.gate.check_account(exposure);
        if !account.is_allowed() {
            warn!(verdict = %account, "scan blocked by account limits");
            return ScanReport {
                regime,
                picks: Vec::new(),
                scored: 0,
                skipped: Vec::new(),
                failed: Vec::new(),
                rejected_signals: 0,
                blocked: Some(account),
                learning_phase,
            };
        }

        let mut results = Vec::new();
        let mut skipped = Vec::new();
        let mut rejected_signals = 0;
        for candidate in candidates {
            match self.scan_symbol(candidate, regime, view, exposure) {
                SymbolScan::Scored { best, rejected } => {
                    rejected_signals += rejected;
                    results.extend(best);
                }
                SymbolScan::Skipped(issue) => {
                    debug!(symbol = %issue.symbol, reason = %issue.reason, "symbol filtered");
                    skipped.push(issue);
                }
            }
        }

        let scored = results.len();
        let picks = rank_picks(results, &self.config)
            .into_iter()
            .enumerate()
            .map(|(i, result)| Pick {
                id: PickId::derive(&result.symbol, result.strategy, result.timestamp),
                rank: i + 1,
                position_size: self.gate.position_size(&result.plan),
                regime,
                result,
            })
            .collect::<Vec<_>>();

        info!(
            candidates = candidates.len(),
            scored,
            picks = picks.len(),
            skipped = skipped.len(),
            rejected = rejected_signals,
            "scan finished"
        );

        ScanReport {
            regime,
            picks,
            scored,
            skipped,
            failed: Vec::new(),
            rejected_signals,
            blocked: None,
            learning_phase,
        }
    }

    fn scan_symbol(
        &self,
        candidate: &ScanCandidate,
        regime: Regime,
        view: Option<&LearningView>,
        exposure: &ExposureState,
    ) -> SymbolScan {
        let symbol = candidate.symbol.as_str();
        let bars = &candidate.bars;
        let frame = IndicatorFrame::compute(bars, &self.periods);
        if bars.len() <= frame.warmup() {
            let err = CoreError::insufficient(symbol, frame.warmup() + 1, bars.len());
            return SymbolScan::Skipped(SymbolIssue::new(symbol, err.to_string()));
        }
        let last = bars.len() - 1;
        let price = bars[last].close;
        if price < self.config.min_price || price > self.config.max_price {
            return SymbolScan::Skipped(SymbolIssue::new(
                symbol,
                format!("price {price:.2} outside [{}, {}]", self.config.min_price, self.config.max_price),
            ));
        }
        match frame.row(last).avg_volume {
            Some(v) if v >= self.config.min_avg_volume => {}
            other => {
                return SymbolScan::Skipped(SymbolIssue::new(
                    symbol,
                    format!("average volume {:.0} below {}", other.unwrap_or(0.0), self.config.min_avg_volume),
                ));
            }
        }
        if let Some(s) = candidate.sentiment {
            if s.polarity < self.config.negative_sentiment_cutoff {
                return SymbolScan::Skipped(SymbolIssue::new(
                    symbol,
                    format!("negative news (polarity {:.2})", s.polarity),
                ));
            }
        }

        let params = self.scorer.params();
        let mut best: Option<CompositeResult> = None;
        let mut rejected = 0;
        for &strategy in &self.config.strategies {
            let Some(ctx) = EntryContext::new(symbol, bars, last, &frame, params) else {
                continue;
            };
            let ctx = ctx
                .with_sentiment(candidate.sentiment)
                .with_min_avg_volume(self.config.min_avg_volume);
            let Some(setup) = entry_rule(strategy)(&ctx) else {
                continue;
            };
            let snapshot = ctx.snapshot(setup, regime);
            let verdict = self.gate.check(exposure, &snapshot);
            if !verdict.is_allowed() {
                return SymbolScan::Skipped(SymbolIssue::new(symbol, verdict.to_string()));
            }
            match self.scorer.score(&snapshot, view) {
                Ok(result) => {
                    if best.as_ref().map_or(true, |b| result.conviction > b.conviction) {
                        best = Some(result);
                    }
                }
                Err(err) => {
                    debug!(symbol, strategy = %strategy, error = %err, "rejected trade plan");
                    rejected += 1;
                }
            }
        }

        if let Some(result) = best.as_mut() {
            if let Some(alignment) = TimeframeAlignment::analyze(bars) {
                let before = result.conviction;
                if self.scorer.apply_alignment(result, &alignment) {
                    debug!(
                        symbol,
                        strength = alignment.strength,
                        before,
                        after = result.conviction,
                        "higher timeframes bearish, conviction dampened"
                    );
                }
            }
        }
        SymbolScan::Scored { best, rejected }
    }
}

/// Orders scored setups into the published list.
///
/// Drops anything under the conviction floor, sorts by conviction (highest
/// first, ties by symbol), admits at most `max_hvb_picks` HVB setups and
/// keeps the top `top_n`.
pub fn rank_picks(mut results: Vec<CompositeResult>, config: &ScanConfig) -> Vec<CompositeResult> {
    results.retain(|r| r.conviction >= config.min_conviction);
    results.sort_by(|a, b| {
        b.conviction
            .total_cmp(&a.conviction)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });

    let mut hvb = 0;
    let mut ranked = Vec::new();
    for result in results {
        if ranked.len() == config.top_n {
            break;
        }
        if result.strategy == StrategyKind::HighVolatilityBreakout {
            if hvb >= config.max_hvb_picks {
                continue;
            }
            hvb += 1;
        }
        ranked.push(result);
    }
    ranked
}

/// Settles a pick against the bars that followed it, with the same rules a
/// backtest uses. Bars at or before the pick's timestamp are ignored.
pub fn compute_pick_outcome(pick: &Pick, bars: &[Bar]) -> Result<SimulatedTrade, CoreError> {
    let issued = pick.result.timestamp;
    let start = bars.partition_point(|b| b.timestamp <= issued);
    simulate_trade(
        &pick.result.symbol,
        pick.result.strategy,
        issued,
        &pick.result.plan,
        &bars[start..],
    )
}

/// Settles a pick and feeds the outcome to the learning store.
pub fn settle_pick(store: &mut LearningStore, pick: &Pick, bars: &[Bar]) -> Result<SimulatedTrade, SettleError> {
    let trade = compute_pick_outcome(pick, bars)?;
    store.record_pick_outcome(&pick.id, &trade)?;
    info!(
        pick = %pick.id,
        symbol = %trade.symbol,
        exit = %trade.exit_reason,
        return_pct = trade.return_pct,
        "pick settled"
    );
    Ok(trade)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use picklab_core::domain::{Horizon, RiskLabel, TradePlan, TrendState};
    use picklab_core::scoring::DimensionScores;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(16, 0, 0)
            .unwrap()
    }

    fn result(symbol: &str, strategy: StrategyKind, conviction: f64) -> CompositeResult {
        CompositeResult {
            symbol: symbol.into(),
            timestamp: ts(),
            strategy,
            base_score: conviction,
            conviction,
            risk_score: 50.0,
            plan: TradePlan::new(100.0, 95.0, vec![110.0], Horizon::Bars(10), RiskLabel::Medium).unwrap(),
            dimensions: DimensionScores::uniform(conviction),
            adjustments: vec![],
            learning_phase: LearningPhase::Cold,
            patterns: vec![],
        }
    }

    #[test]
    fn ranking_applies_floor_and_top_n() {
        let results = vec![
            result("A", StrategyKind::MomentumSwing, 61.0),
            result("B", StrategyKind::Orb, 90.0),
            result("C", StrategyKind::VwapPullback, 59.9),
            result("D", StrategyKind::EarningsDrift, 75.0),
            result("E", StrategyKind::MomentumSwing, 70.0),
        ];
        let ranked = rank_picks(results, &ScanConfig::default());
        let symbols: Vec<_> = ranked.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["B", "D", "E"]);
    }

    #[test]
    fn ranking_caps_hvb() {
        let results = vec![
            result("H1", StrategyKind::HighVolatilityBreakout, 95.0),
            result("H2", StrategyKind::HighVolatilityBreakout, 94.0),
            result("H3", StrategyKind::HighVolatilityBreakout, 93.0),
            result("M", StrategyKind::MomentumSwing, 65.0),
        ];
        let ranked = rank_picks(results, &ScanConfig::default());
        let symbols: Vec<_> = ranked.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["H1", "M"]);
    }

    #[test]
    fn ties_break_by_symbol() {
        let results = vec![
            result("Z", StrategyKind::Orb, 80.0),
            result("A", StrategyKind::Orb, 80.0),
        ];
        let ranked = rank_picks(results, &ScanConfig::default());
        assert_eq!(ranked[0].symbol, "A");
    }

    #[test]
    fn account_limit_blocks_scan() {
        let scanner = Scanner::new(
            CompositeScorer::default(),
            IndicatorPeriods::default(),
            RiskGate::default(),
            ScanConfig::default(),
        );
        let exposure = ExposureState {
            open_positions: 0,
            realized_loss_today: 30.0,
        };
        let report = scanner.scan(&[], Regime::default(), None, &exposure);
        assert!(matches!(report.blocked, Some(RiskVerdict::KillSwitch { .. })));
        assert!(report.picks.is_empty());
    }

    #[test]
    fn pick_outcome_ignores_earlier_bars() {
        let pick = Pick {
            id: PickId::derive("ABC", StrategyKind::MomentumSwing, ts()),
            rank: 1,
            position_size: 2.0,
            regime: Regime::new(TrendState::Bullish, 50.0),
            result: result("ABC", StrategyKind::MomentumSwing, 70.0),
        };
        let bar = |hours: i64, low: f64, high: f64| Bar {
            timestamp: ts() + chrono::Duration::hours(hours),
            open: 100.0,
            high,
            low,
            close: 100.0,
            volume: 1_000,
        };
        // The first bar would stop the pick out, but it is the entry bar.
        let bars = vec![bar(0, 90.0, 101.0), bar(24, 99.0, 111.0)];
        let trade = compute_pick_outcome(&pick, &bars).unwrap();
        assert!(trade.hit_target());
        assert_eq!(trade.bars_held, 1);

        let record = pick.record();
        assert_eq!(record.regime, TrendState::Bullish);
        assert_eq!(record.issued_at, ts());
    }

    #[test]
    fn default_config_leaves_hvb_off() {
        let config = ScanConfig::default();
        assert!(!config.strategies.contains(&StrategyKind::HighVolatilityBreakout));
        assert!(config.clone().with_hvb().strategies.contains(&StrategyKind::HighVolatilityBreakout));
        assert!(config.validate().is_ok());
    }
}
