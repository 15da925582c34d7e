//! The learning store: single owner of all learned state.
//!
//! Every mutation goes through `&mut LearningStore`. Readers take a
//! [`LearningView`] with [`LearningStore::snapshot`] and never observe
//! later writes, so a backtest that snapshots at start is unaffected by
//! outcomes ingested while it runs.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use thiserror::Error;

use super::config::{LearningConfig, LearningPhase};
use super::evidence::{FeaturePenalty, PatternEvidence};
use super::view::LearningView;
use super::window::{RollingWindow, WindowEntry};
use crate::collaborators::StoreError;
use crate::domain::{PickId, SimulatedTrade, StrategyKind, TradePlan, TrendState};
use crate::features::FeaturePattern;

#[derive(Debug, Error)]
pub enum LearningError {
    #[error("unknown pick id: {0}")]
    UnknownPick(PickId),

    #[error("outcome already recorded for pick {0}")]
    OutcomeAlreadyRecorded(PickId),

    #[error("invalid feedback: {0}")]
    InvalidFeedback(String),

    #[error("invalid learning config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("corrupt learning state at {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported learning schema version {found} (this build reads up to {supported})")]
    SchemaVersion { found: u32, supported: u32 },
}

// ── Inputs ──────────────────────────────────────────────────────────

/// One realized outcome, attributed to a strategy, a regime and the
/// feature patterns present at entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub strategy: StrategyKind,
    pub regime: TrendState,
    pub patterns: Vec<FeaturePattern>,
    /// Fraction of entry price.
    pub return_pct: f64,
    pub hit_target: bool,
    pub hit_stop: bool,
    pub closed_at: NaiveDateTime,
}

impl OutcomeRecord {
    pub fn from_trade(trade: &SimulatedTrade, regime: TrendState, patterns: Vec<FeaturePattern>) -> Self {
        Self {
            strategy: trade.strategy,
            regime,
            patterns,
            return_pct: trade.return_pct,
            hit_target: trade.hit_target(),
            hit_stop: trade.hit_stop(),
            closed_at: trade.exit_timestamp,
        }
    }

    pub fn is_success(&self) -> bool {
        self.return_pct > 0.0 || self.hit_target
    }

    pub fn is_failure(&self, config: &LearningConfig) -> bool {
        self.hit_stop || self.return_pct < config.failure_return
    }
}

/// A published pick, kept so later outcomes and feedback can be attributed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickRecord {
    pub id: PickId,
    pub symbol: String,
    pub strategy: StrategyKind,
    pub regime: TrendState,
    pub patterns: Vec<FeaturePattern>,
    pub conviction: f64,
    pub plan: TradePlan,
    pub issued_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub accepted: bool,
    /// 1 (poor) to 5 (excellent).
    pub rating: Option<u8>,
    pub rejection_reason: Option<String>,
}

impl Feedback {
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            ..Self::default()
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            rating: None,
            rejection_reason: Some(reason.into()),
        }
    }

    pub fn with_rating(mut self, rating: u8) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Preference signal in [-1, 1].
    fn signal(&self) -> f64 {
        let base = if self.accepted { 1.0 } else { -1.0 };
        match self.rating {
            Some(r) => (base + (f64::from(r) - 3.0) / 2.0) / 2.0,
            None => base,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSummary {
    pub accepted: u32,
    pub rejected: u32,
    pub rejection_reasons: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RegisteredPick {
    pub record: PickRecord,
    pub outcome_recorded: bool,
}

// ── Store ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LearningStore {
    pub(crate) config: LearningConfig,
    pub(crate) buckets: BTreeMap<(StrategyKind, TrendState), RollingWindow>,
    pub(crate) evidence: BTreeMap<FeaturePattern, PatternEvidence>,
    pub(crate) strategy_bias: BTreeMap<StrategyKind, f64>,
    pub(crate) pattern_bias: BTreeMap<FeaturePattern, f64>,
    pub(crate) picks: VecDeque<RegisteredPick>,
    pub(crate) total_outcomes: usize,
    pub(crate) last_updated: Option<NaiveDateTime>,
    pub(crate) feedback: FeedbackSummary,
}

impl LearningStore {
    pub fn new(config: LearningConfig) -> Result<Self, LearningError> {
        config.validate().map_err(LearningError::InvalidConfig)?;
        Ok(Self {
            config,
            buckets: BTreeMap::new(),
            evidence: BTreeMap::new(),
            strategy_bias: BTreeMap::new(),
            pattern_bias: BTreeMap::new(),
            picks: VecDeque::new(),
            total_outcomes: 0,
            last_updated: None,
            feedback: FeedbackSummary::default(),
        })
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    pub fn total_outcomes(&self) -> usize {
        self.total_outcomes
    }

    pub fn phase(&self) -> LearningPhase {
        self.config.phase_for(self.total_outcomes)
    }

    pub fn last_updated(&self) -> Option<NaiveDateTime> {
        self.last_updated
    }

    pub fn feedback_summary(&self) -> &FeedbackSummary {
        &self.feedback
    }

    pub fn window(&self, strategy: StrategyKind, regime: TrendState) -> Option<&RollingWindow> {
        self.buckets.get(&(strategy, regime))
    }

    pub fn pick(&self, id: &PickId) -> Option<&PickRecord> {
        self.picks.iter().find(|p| &p.record.id == id).map(|p| &p.record)
    }

    pub fn record_outcome(&mut self, record: OutcomeRecord) {
        let before = self.phase();
        let success = record.is_success();
        let failed = record.is_failure(&self.config);

        let capacity = self.config.window_capacity;
        let max_age = self.config.window_max_age_days;
        self.buckets
            .entry((record.strategy, record.regime))
            .or_insert_with(|| RollingWindow::new(capacity, max_age))
            .push(WindowEntry {
                closed_at: record.closed_at,
                return_pct: record.return_pct,
                success,
            });

        let mut patterns = record.patterns.clone();
        patterns.sort();
        patterns.dedup();
        for pattern in patterns {
            self.evidence
                .entry(pattern)
                .or_default()
                .record(failed, record.closed_at, &self.config);
        }

        self.total_outcomes += 1;
        self.last_updated = Some(match self.last_updated {
            Some(prev) if prev > record.closed_at => prev,
            _ => record.closed_at,
        });

        let after = self.phase();
        if after != before {
            tracing::info!(
                from = %before,
                to = %after,
                outcomes = self.total_outcomes,
                "learning phase changed"
            );
        }
    }

    /// Records every outcome in order. Returns the number ingested.
    pub fn ingest<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = OutcomeRecord>,
    {
        let mut n = 0;
        for record in records {
            self.record_outcome(record);
            n += 1;
        }
        n
    }

    /// Registers a published pick. The registry is bounded; the oldest pick
    /// is evicted first.
    pub fn register_pick(&mut self, record: PickRecord) {
        if let Some(existing) = self.picks.iter_mut().find(|p| p.record.id == record.id) {
            existing.record = record;
            return;
        }
        self.picks.push_back(RegisteredPick {
            record,
            outcome_recorded: false,
        });
        while self.picks.len() > self.config.max_registered_picks {
            if let Some(evicted) = self.picks.pop_front() {
                tracing::debug!(pick = %evicted.record.id, "evicted oldest registered pick");
            }
        }
    }

    /// Attributes a realized trade to a registered pick and learns from it.
    pub fn record_pick_outcome(&mut self, id: &PickId, trade: &SimulatedTrade) -> Result<(), LearningError> {
        let entry = self
            .picks
            .iter_mut()
            .find(|p| &p.record.id == id)
            .ok_or_else(|| LearningError::UnknownPick(id.clone()))?;
        if entry.outcome_recorded {
            return Err(LearningError::OutcomeAlreadyRecorded(id.clone()));
        }
        entry.outcome_recorded = true;
        let record = OutcomeRecord::from_trade(trade, entry.record.regime, entry.record.patterns.clone());
        self.record_outcome(record);
        Ok(())
    }

    /// Folds user feedback into the strategy and pattern preference biases.
    pub fn record_feedback(&mut self, id: &PickId, feedback: Feedback) -> Result<(), LearningError> {
        if let Some(r) = feedback.rating {
            if !(1..=5).contains(&r) {
                return Err(LearningError::InvalidFeedback(format!(
                    "rating must be 1-5, got {r}"
                )));
            }
        }
        let pick = self
            .pick(id)
            .cloned()
            .ok_or_else(|| LearningError::UnknownPick(id.clone()))?;

        let signal = feedback.signal();
        let alpha = self.config.feedback_alpha;
        let ema = |prev: f64| ((1.0 - alpha) * prev + alpha * signal).clamp(-1.0, 1.0);

        let bias = self.strategy_bias.entry(pick.strategy).or_insert(0.0);
        *bias = ema(*bias);
        for pattern in &pick.patterns {
            let bias = self.pattern_bias.entry(*pattern).or_insert(0.0);
            *bias = ema(*bias);
        }

        if feedback.accepted {
            self.feedback.accepted += 1;
        } else {
            self.feedback.rejected += 1;
            if let Some(reason) = feedback.rejection_reason {
                *self.feedback.rejection_reasons.entry(reason).or_insert(0) += 1;
            }
        }
        tracing::debug!(pick = %id, strategy = %pick.strategy, signal, "feedback recorded");
        Ok(())
    }

    /// Immutable copy of the learned state, with penalties decayed to `as_of`.
    pub fn snapshot(&self, as_of: NaiveDateTime) -> LearningView {
        let phase = self.phase();
        let stats = self
            .buckets
            .iter()
            .filter(|(_, w)| !w.is_empty())
            .map(|(k, w)| (*k, w.stats()))
            .collect();

        let mut penalties = BTreeMap::new();
        for pattern in FeaturePattern::ALL {
            let evidence = self.evidence.get(&pattern);
            let bias = self.pattern_bias.get(&pattern).copied();
            if evidence.is_none() && bias.is_none() {
                continue;
            }
            let (occurrences, failures) = evidence
                .map(|e| e.decayed(as_of, &self.config))
                .unwrap_or((0.0, 0.0));
            penalties.insert(
                pattern,
                FeaturePenalty {
                    magnitude: evidence.map_or(0.0, |e| e.penalty(as_of, &self.config)),
                    occurrences,
                    failures,
                    feedback_bias: bias.unwrap_or(0.0),
                },
            );
        }

        LearningView {
            as_of,
            updated_at: self.last_updated,
            phase,
            total_outcomes: self.total_outcomes,
            cap_fraction: self.config.cap_fraction(phase),
            stats,
            penalties,
            strategy_bias: self.strategy_bias.clone(),
            config: self.config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExitReason, Horizon, RiskLabel};
    use chrono::{Duration, NaiveDate};

    fn t(day: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(16, 0, 0)
            .unwrap()
            + Duration::days(day)
    }

    fn outcome(strategy: StrategyKind, ret: f64, day: i64) -> OutcomeRecord {
        OutcomeRecord {
            strategy,
            regime: TrendState::Bullish,
            patterns: vec![],
            return_pct: ret,
            hit_target: false,
            hit_stop: false,
            closed_at: t(day),
        }
    }

    fn pick(id: &str, patterns: Vec<FeaturePattern>) -> PickRecord {
        PickRecord {
            id: PickId::new(id),
            symbol: "AAPL".into(),
            strategy: StrategyKind::MomentumSwing,
            regime: TrendState::Bullish,
            patterns,
            conviction: 72.0,
            plan: TradePlan::new(100.0, 95.0, vec![110.0], Horizon::Bars(10), RiskLabel::Medium).unwrap(),
            issued_at: t(0),
        }
    }

    fn trade(exit: ExitReason, ret: f64) -> SimulatedTrade {
        SimulatedTrade {
            symbol: "AAPL".into(),
            strategy: StrategyKind::MomentumSwing,
            entry_timestamp: t(0),
            exit_timestamp: t(3),
            entry_price: 100.0,
            exit_price: 100.0 * (1.0 + ret),
            exit_reason: exit,
            return_pct: ret,
            mfe: ret.max(0.0),
            mae: ret.min(0.0),
            bars_held: 3,
        }
    }

    #[test]
    fn phases_advance_with_outcomes() {
        let mut store = LearningStore::new(LearningConfig::default()).unwrap();
        assert_eq!(store.phase(), LearningPhase::Cold);
        for d in 0..10 {
            store.record_outcome(outcome(StrategyKind::Orb, 0.01, d));
        }
        assert_eq!(store.phase(), LearningPhase::Conservative);
        for d in 10..50 {
            store.record_outcome(outcome(StrategyKind::Orb, 0.01, d));
        }
        assert_eq!(store.phase(), LearningPhase::Full);
        assert_eq!(store.total_outcomes(), 50);
        assert_eq!(store.last_updated(), Some(t(49)));
    }

    #[test]
    fn success_and_failure_classification() {
        let cfg = LearningConfig::default();
        let mut r = outcome(StrategyKind::Orb, -0.01, 0);
        assert!(!r.is_success());
        assert!(!r.is_failure(&cfg));
        r.hit_stop = true;
        assert!(r.is_failure(&cfg));
        let r = outcome(StrategyKind::Orb, -0.06, 0);
        assert!(r.is_failure(&cfg));
        let mut r = outcome(StrategyKind::Orb, 0.0, 0);
        r.hit_target = true;
        assert!(r.is_success());
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let mut store = LearningStore::new(LearningConfig::default()).unwrap();
        for d in 0..5 {
            store.record_outcome(outcome(StrategyKind::Orb, 0.02, d));
        }
        let view = store.snapshot(t(5));
        store.record_outcome(outcome(StrategyKind::Orb, -0.5, 6));
        let stat = view.stat(StrategyKind::Orb, TrendState::Bullish).unwrap();
        assert_eq!(stat.trades, 5);
        assert_eq!(view.total_outcomes, 5);
    }

    #[test]
    fn pick_outcome_requires_registration() {
        let mut store = LearningStore::new(LearningConfig::default()).unwrap();
        let id = PickId::new("missing");
        let err = store
            .record_pick_outcome(&id, &trade(ExitReason::Stop, -0.05))
            .unwrap_err();
        assert!(matches!(err, LearningError::UnknownPick(_)));

        store.register_pick(pick("p1", vec![FeaturePattern::FarFromVwap]));
        let id = PickId::new("p1");
        store.record_pick_outcome(&id, &trade(ExitReason::Stop, -0.05)).unwrap();
        assert_eq!(store.total_outcomes(), 1);
        let view = store.snapshot(t(3));
        assert!(view.penalty(FeaturePattern::FarFromVwap).unwrap().magnitude > 0.0);

        let again = store.record_pick_outcome(&id, &trade(ExitReason::Stop, -0.05));
        assert!(matches!(again, Err(LearningError::OutcomeAlreadyRecorded(_))));
    }

    #[test]
    fn registry_is_bounded() {
        let cfg = LearningConfig {
            max_registered_picks: 2,
            ..LearningConfig::default()
        };
        let mut store = LearningStore::new(cfg).unwrap();
        store.register_pick(pick("a", vec![]));
        store.register_pick(pick("b", vec![]));
        store.register_pick(pick("c", vec![]));
        assert!(store.pick(&PickId::new("a")).is_none());
        assert!(store.pick(&PickId::new("c")).is_some());
    }

    #[test]
    fn feedback_moves_biases() {
        let mut store = LearningStore::new(LearningConfig::default()).unwrap();
        store.register_pick(pick("p1", vec![FeaturePattern::GapWithoutVolume]));
        let id = PickId::new("p1");

        store.record_feedback(&id, Feedback::accepted().with_rating(5)).unwrap();
        let view = store.snapshot(t(1));
        assert!((view.strategy_bias(StrategyKind::MomentumSwing) - 0.2).abs() < 1e-12);
        let p = view.penalty(FeaturePattern::GapWithoutVolume).unwrap();
        assert!((p.feedback_bias - 0.2).abs() < 1e-12);
        assert_eq!(p.magnitude, 0.0);

        store
            .record_feedback(&id, Feedback::rejected("too extended"))
            .unwrap();
        let view = store.snapshot(t(1));
        assert!((view.strategy_bias(StrategyKind::MomentumSwing) - (0.8 * 0.2 - 0.2)).abs() < 1e-12);
        assert_eq!(store.feedback_summary().rejected, 1);
        assert_eq!(store.feedback_summary().rejection_reasons["too extended"], 1);

        let bad = store.record_feedback(&id, Feedback::accepted().with_rating(9));
        assert!(matches!(bad, Err(LearningError::InvalidFeedback(_))));
        let unknown = store.record_feedback(&PickId::new("nope"), Feedback::accepted());
        assert!(matches!(unknown, Err(LearningError::UnknownPick(_))));
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = LearningConfig {
            window_capacity: 0,
            ..LearningConfig::default()
        };
        assert!(matches!(
            LearningStore::new(cfg),
            Err(LearningError::InvalidConfig(_))
        ));
    }
}
