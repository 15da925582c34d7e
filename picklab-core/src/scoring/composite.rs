//! Composite scoring: weighted dimensions, trade plan, learning adjustments.
//!
//! Conviction is built in a fixed order and every step that moves the
//! score leaves one [`Adjustment`] behind:
//!
//! 1. strategy-by-regime delta (plus strategy preference from feedback),
//! 2. feature-pattern penalties (plus pattern preference from feedback),
//! 3. clamp to [0, 100],
//! 4. optionally, a scan-time dampening when higher timeframes are strongly
//!    bearish ([`CompositeScorer::apply_alignment`]).
//!
//! The phase cap, a fraction of the base score, bounds each of steps 1 and
//! 2 and also their sum. `base_score` plus the sum of all adjustment
//! magnitudes always equals `conviction`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::alignment::TimeframeAlignment;
use super::dimensions::{clamp_score, score_dimensions, DimensionScores};
use super::weights::ScoringWeights;
use crate::domain::{RiskLabel, SignalSnapshot, StrategyKind, TradePlan};
use crate::error::CoreError;
use crate::features::{detect_patterns, FeaturePattern, PatternThresholds};
use crate::learning::{LearningPhase, LearningView};
use crate::strategy::StrategyParams;

/// Adjustments smaller than this are not recorded.
const MIN_ADJUSTMENT: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    pub patterns: PatternThresholds,
    /// Learning state older than this (relative to the snapshot) is ignored.
    pub learning_freshness_days: Option<i64>,
    /// Ceiling on the HVB risk score. HVB is always treated as dangerous.
    pub hvb_max_risk_score: f64,
    /// Risk scores below this are labelled HIGH.
    pub high_risk_below: f64,
    /// Risk scores below this (and not HIGH) are labelled MEDIUM.
    pub medium_risk_below: f64,
    /// Minimum bearish share of timeframe votes that triggers dampening.
    pub bearish_alignment_strength: f64,
    /// Conviction multiplier under a strongly bearish alignment.
    pub bearish_alignment_factor: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            patterns: PatternThresholds::default(),
            learning_freshness_days: Some(30),
            hvb_max_risk_score: 15.0,
            high_risk_below: 30.0,
            medium_risk_below: 60.0,
            bearish_alignment_strength: 0.8,
            bearish_alignment_factor: 0.8,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.weights.validate()?;
        if !(0.0..=100.0).contains(&self.high_risk_below)
            || !(0.0..=100.0).contains(&self.medium_risk_below)
            || self.high_risk_below > self.medium_risk_below
        {
            return Err(format!(
                "risk label thresholds must satisfy 0 <= high ({}) <= medium ({}) <= 100",
                self.high_risk_below, self.medium_risk_below
            ));
        }
        if self.learning_freshness_days.is_some_and(|d| d < 0) {
            return Err("learning_freshness_days must be non-negative".into());
        }
        if !(0.0..=1.0).contains(&self.bearish_alignment_strength) {
            return Err("bearish_alignment_strength must be within [0, 1]".into());
        }
        if !(self.bearish_alignment_factor > 0.0 && self.bearish_alignment_factor <= 1.0) {
            return Err("bearish_alignment_factor must be within (0, 1]".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentSource {
    StrategyRegime,
    FeaturePenalty,
    Clamp,
    TimeframeAlignment,
}

/// One signed change to the score, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub source: AdjustmentSource,
    pub magnitude: f64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeResult {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub strategy: StrategyKind,
    /// Weighted dimension score before any learning.
    pub base_score: f64,
    /// Final score in [0, 100].
    pub conviction: f64,
    /// Safety score in [0, 100]; higher is safer.
    pub risk_score: f64,
    pub plan: TradePlan,
    pub dimensions: DimensionScores,
    pub adjustments: Vec<Adjustment>,
    pub learning_phase: LearningPhase,
    pub patterns: Vec<FeaturePattern>,
}

impl CompositeResult {
    pub fn risk_label(&self) -> RiskLabel {
        self.plan.risk_label()
    }

    pub fn adjustment_total(&self) -> f64 {
        self.adjustments.iter().map(|a| a.magnitude).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompositeScorer {
    config: ScoringConfig,
    params: StrategyParams,
}

impl CompositeScorer {
    pub fn new(config: ScoringConfig, params: StrategyParams) -> Self {
        Self { config, params }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    pub fn score(&self, snapshot: &SignalSnapshot, view: Option<&LearningView>) -> Result<CompositeResult, CoreError> {
        let dims = score_dimensions(snapshot);
        self.compose(&dims, snapshot, view)
    }

    /// Like [`score`](Self::score) but with dimensions already computed.
    pub fn compose(
        &self,
        dims: &DimensionScores,
        snapshot: &SignalSnapshot,
        view: Option<&LearningView>,
    ) -> Result<CompositeResult, CoreError> {
        let strategy = snapshot.strategy();
        let risk_score = if strategy == StrategyKind::HighVolatilityBreakout {
            dims.risk.min(self.config.hvb_max_risk_score)
        } else {
            dims.risk
        };
        let label = self.risk_label(strategy, risk_score);

        let setup = &snapshot.setup;
        let plan = TradePlan::new(
            setup.entry,
            setup.stop,
            setup.targets.clone(),
            self.params.horizon(strategy),
            label,
        )?;

        let base_score = clamp_score(self.config.weights.combine(dims));
        let patterns = detect_patterns(snapshot, &self.config.patterns);
        let active = self.active_view(snapshot, view);
        let learning_phase = active.map_or(LearningPhase::Cold, |v| v.phase);
        let (adjustments, conviction) = apply_learning(base_score, snapshot, &patterns, active);

        Ok(CompositeResult {
            symbol: snapshot.symbol.clone(),
            timestamp: snapshot.timestamp,
            strategy,
            base_score,
            conviction,
            risk_score,
            plan,
            dimensions: *dims,
            adjustments,
            learning_phase,
            patterns,
        })
    }

    pub fn risk_label(&self, strategy: StrategyKind, risk_score: f64) -> RiskLabel {
        if strategy == StrategyKind::HighVolatilityBreakout || risk_score < self.config.high_risk_below {
            RiskLabel::High
        } else if risk_score < self.config.medium_risk_below {
            RiskLabel::Medium
        } else {
            RiskLabel::Low
        }
    }

    /// Scales conviction by `bearish_alignment_factor` when `alignment` is
    /// strongly bearish, recording the change as its own adjustment.
    /// Returns whether the score moved.
    pub fn apply_alignment(&self, result: &mut CompositeResult, alignment: &TimeframeAlignment) -> bool {
        if !alignment.is_bearish(self.config.bearish_alignment_strength) {
            return false;
        }
        let dampened = result.conviction * self.config.bearish_alignment_factor;
        let delta = dampened - result.conviction;
        if delta.abs() <= MIN_ADJUSTMENT {
            return false;
        }
        result.adjustments.push(Adjustment {
            source: AdjustmentSource::TimeframeAlignment,
            magnitude: delta,
            reason: format!(
                "Higher timeframes bearish (strength {:.2}): {delta:+.1}",
                alignment.strength
            ),
        });
        result.conviction = dampened;
        true
    }

    /// The view to learn from, or `None` for cold-start behaviour.
    fn active_view<'v>(&self, snapshot: &SignalSnapshot, view: Option<&'v LearningView>) -> Option<&'v LearningView> {
        let view = view?;
        if let Some(bound) = self.config.learning_freshness_days {
            if let Err(err) = view.check_freshness(snapshot.timestamp, bound) {
                tracing::warn!(
                    symbol = %snapshot.symbol,
                    error = %err,
                    "ignoring stale learning state, scoring cold"
                );
                return None;
            }
        }
        (view.phase != LearningPhase::Cold).then_some(view)
    }
}

fn apply_learning(
    base: f64,
    snapshot: &SignalSnapshot,
    patterns: &[FeaturePattern],
    view: Option<&LearningView>,
) -> (Vec<Adjustment>, f64) {
    let mut adjustments = Vec::new();
    let mut total = 0.0;

    if let Some(view) = view {
        let cap = (view.cap_fraction * base).max(0.0);

        if let Some(raw) = view.strategy_adjustment(snapshot.strategy(), snapshot.regime.trend) {
            let delta = raw.delta.clamp(-cap, cap);
            if delta.is_finite() && delta.abs() > MIN_ADJUSTMENT {
                adjustments.push(Adjustment {
                    source: AdjustmentSource::StrategyRegime,
                    magnitude: delta,
                    reason: format!("Strategy weight: {delta:+.1} ({})", raw.detail),
                });
                total += delta;
            }
        }

        if let Some(raw) = view.pattern_adjustment(patterns) {
            // Bounded on its own and against what step 1 already used.
            let lo = (-cap).max(-cap - total);
            let hi = cap.min(cap - total);
            let delta = raw.delta.clamp(lo, hi);
            if delta.is_finite() && delta.abs() > MIN_ADJUSTMENT {
                let reason = if delta < 0.0 {
                    format!("Penalty: {delta:.1} ({})", raw.detail)
                } else {
                    format!("Preference: {delta:+.1} ({})", raw.detail)
                };
                adjustments.push(Adjustment {
                    source: AdjustmentSource::FeaturePenalty,
                    magnitude: delta,
                    reason,
                });
                total += delta;
            }
        }
    }

    let unclamped = base + total;
    let conviction = unclamped.clamp(0.0, 100.0);
    let clamp = conviction - unclamped;
    if clamp.abs() > MIN_ADJUSTMENT {
        adjustments.push(Adjustment {
            source: AdjustmentSource::Clamp,
            magnitude: clamp,
            reason: format!("Clamped to [0, 100]: {clamp:+.1}"),
        });
    }

    (adjustments, conviction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TrendState;
    use crate::learning::{LearningConfig, LearningStore, OutcomeRecord};
    use crate::scoring::test_snapshot;
    use chrono::Duration;

    fn scorer() -> CompositeScorer {
        CompositeScorer::new(ScoringConfig::default(), StrategyParams::default())
    }

    fn store_with(outcomes: usize, ret: f64, snap: &SignalSnapshot, patterns: Vec<FeaturePattern>) -> LearningStore {
        let mut store = LearningStore::new(LearningConfig::default()).unwrap();
        for i in 0..outcomes {
            store.record_outcome(OutcomeRecord {
                strategy: snap.strategy(),
                regime: snap.regime.trend,
                patterns: patterns.clone(),
                return_pct: ret,
                hit_target: false,
                hit_stop: ret < 0.0,
                closed_at: snap.timestamp - Duration::days(1) - Duration::hours(i as i64),
            });
        }
        store
    }

    fn assert_ledger(result: &CompositeResult) {
        let sum = result.base_score + result.adjustment_total();
        assert!(
            (sum - result.conviction).abs() < 1e-9,
            "base {} + adjustments {} != conviction {}",
            result.base_score,
            result.adjustment_total(),
            result.conviction
        );
    }

    #[test]
    fn uniform_dimensions_without_learning() {
        let snap = test_snapshot(StrategyKind::MomentumSwing);
        let result = scorer()
            .compose(&DimensionScores::uniform(80.0), &snap, None)
            .unwrap();
        assert!((result.conviction - 80.0).abs() < 1e-9);
        assert!(result.adjustments.is_empty());
        assert_eq!(result.learning_phase, LearningPhase::Cold);
        assert_ledger(&result);
    }

    #[test]
    fn invalid_plan_is_rejected() {
        let mut snap = test_snapshot(StrategyKind::MomentumSwing);
        snap.setup.stop = 101.0;
        let err = scorer().score(&snap, None).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTradePlan(_)));
    }

    #[test]
    fn hvb_is_always_high_risk() {
        let snap = test_snapshot(StrategyKind::HighVolatilityBreakout);
        let result = scorer()
            .compose(&DimensionScores::uniform(90.0), &snap, None)
            .unwrap();
        assert_eq!(result.risk_label(), RiskLabel::High);
        assert!(result.risk_score <= 15.0);
    }

    #[test]
    fn risk_labels_follow_thresholds() {
        let s = scorer();
        assert_eq!(s.risk_label(StrategyKind::Orb, 20.0), RiskLabel::High);
        assert_eq!(s.risk_label(StrategyKind::Orb, 45.0), RiskLabel::Medium);
        assert_eq!(s.risk_label(StrategyKind::Orb, 75.0), RiskLabel::Low);
    }

    #[test]
    fn cold_view_adds_nothing() {
        let snap = test_snapshot(StrategyKind::MomentumSwing);
        let store = store_with(5, 0.05, &snap, vec![]);
        let view = store.snapshot(snap.timestamp);
        let result = scorer()
            .compose(&DimensionScores::uniform(70.0), &snap, Some(&view))
            .unwrap();
        assert!(result.adjustments.is_empty());
        assert_eq!(result.conviction, result.base_score);
    }

    #[test]
    fn strategy_delta_is_capped_in_conservative_phase() {
        let snap = test_snapshot(StrategyKind::MomentumSwing);
        let store = store_with(20, 0.05, &snap, vec![]);
        let view = store.snapshot(snap.timestamp);
        assert_eq!(view.phase, LearningPhase::Conservative);

        let result = scorer()
            .compose(&DimensionScores::uniform(70.0), &snap, Some(&view))
            .unwrap();
        assert_eq!(result.adjustments.len(), 1);
        let adj = &result.adjustments[0];
        assert_eq!(adj.source, AdjustmentSource::StrategyRegime);
        assert!((adj.magnitude - 3.5).abs() < 1e-9);
        assert_eq!(
            adj.reason,
            "Strategy weight: +3.5 (MOMENTUM_SWING performing well in neutral regime)"
        );
        assert_ledger(&result);
    }

    #[test]
    fn penalty_shares_the_cap_with_strategy_delta() {
        let mut snap = test_snapshot(StrategyKind::MomentumSwing);
        snap.vwap = Some(snap.price * 0.95);
        let mut store = LearningStore::new(LearningConfig::default()).unwrap();
        for i in 0..60 {
            let failed = i % 3 == 0;
            store.record_outcome(OutcomeRecord {
                strategy: StrategyKind::MomentumSwing,
                regime: TrendState::Neutral,
                patterns: if failed { vec![FeaturePattern::FarFromVwap] } else { vec![] },
                return_pct: if failed { -0.02 } else { 0.05 },
                hit_target: false,
                hit_stop: failed,
                closed_at: snap.timestamp - Duration::days(1) - Duration::hours(i),
            });
        }
        let view = store.snapshot(snap.timestamp);
        assert_eq!(view.phase, LearningPhase::Full);

        let result = scorer()
            .compose(&DimensionScores::uniform(60.0), &snap, Some(&view))
            .unwrap();
        assert_eq!(result.patterns, vec![FeaturePattern::FarFromVwap]);
        let sources: Vec<_> = result.adjustments.iter().map(|a| a.source).collect();
        assert_eq!(
            sources,
            vec![AdjustmentSource::StrategyRegime, AdjustmentSource::FeaturePenalty]
        );
        // Strategy takes the whole +12 cap. The penalty is itself capped at
        // 12, so no single entry exceeds 20% of base.
        assert!((result.adjustments[0].magnitude - 12.0).abs() < 1e-9);
        assert!((result.adjustments[1].magnitude + 12.0).abs() < 1e-9);
        assert_eq!(result.adjustments[1].reason, "Penalty: -12.0 (far from VWAP)");
        assert!((result.conviction - 60.0).abs() < 1e-9);
        for adj in &result.adjustments {
            assert!(adj.magnitude.abs() <= 0.20 * result.base_score + 1e-9);
        }
        assert_ledger(&result);
    }

    #[test]
    fn stale_view_falls_back_to_cold() {
        let snap = test_snapshot(StrategyKind::MomentumSwing);
        let store = store_with(20, 0.05, &snap, vec![]);
        let view = store.snapshot(snap.timestamp);

        let mut later = snap.clone();
        later.timestamp = snap.timestamp + Duration::days(45);
        let result = scorer()
            .compose(&DimensionScores::uniform(70.0), &later, Some(&view))
            .unwrap();
        assert!(result.adjustments.is_empty());
        assert_eq!(result.learning_phase, LearningPhase::Cold);
    }

    #[test]
    fn bearish_alignment_dampens_conviction() {
        use crate::collaborators::Timeframe;

        let snap = test_snapshot(StrategyKind::MomentumSwing);
        let s = scorer();
        let mut result = s.compose(&DimensionScores::uniform(75.0), &snap, None).unwrap();

        let mixed = TimeframeAlignment::from_votes(vec![
            (Timeframe::Daily, TrendState::Bullish),
            (Timeframe::Weekly, TrendState::Bearish),
            (Timeframe::Monthly, TrendState::Bearish),
        ])
        .unwrap();
        assert!(!s.apply_alignment(&mut result, &mixed));
        assert!((result.conviction - 75.0).abs() < 1e-9);

        let bearish = TimeframeAlignment::from_votes(vec![
            (Timeframe::Weekly, TrendState::Bearish),
            (Timeframe::Monthly, TrendState::Bearish),
        ])
        .unwrap();
        assert!(s.apply_alignment(&mut result, &bearish));
        assert!((result.conviction - 60.0).abs() < 1e-9);
        let last = result.adjustments.last().unwrap();
        assert_eq!(last.source, AdjustmentSource::TimeframeAlignment);
        assert!((last.magnitude + 15.0).abs() < 1e-9);
        assert_eq!(last.reason, "Higher timeframes bearish (strength 1.00): -15.0");
        assert_ledger(&result);
    }

    #[test]
    fn clamp_is_recorded() {
        let snap = test_snapshot(StrategyKind::MomentumSwing);
        let store = store_with(60, 0.05, &snap, vec![]);
        let view = store.snapshot(snap.timestamp);
        let result = scorer()
            .compose(&DimensionScores::uniform(95.0), &snap, Some(&view))
            .unwrap();
        assert_eq!(result.conviction, 100.0);
        let last = result.adjustments.last().unwrap();
        assert_eq!(last.source, AdjustmentSource::Clamp);
        assert!(last.magnitude < 0.0);
        assert_ledger(&result);
    }
}
