//! Read-only learning view handed to the composite scorer.
//!
//! A view is a value copy taken from the store at one instant. Scoring and
//! parallel backtest workers share it without ever seeing later writes.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use super::config::{LearningConfig, LearningPhase};
use super::evidence::FeaturePenalty;
use super::window::StrategyRegimeStat;
use crate::domain::{StrategyKind, TrendState};
use crate::error::CoreError;
use crate::features::FeaturePattern;

/// Raw (uncapped) learning adjustment for one scoring step.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAdjustment {
    /// Signed score points before the phase cap.
    pub delta: f64,
    /// Explanation fragment, e.g. "ORB performing well in bullish regime".
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LearningView {
    pub as_of: NaiveDateTime,
    /// Close time of the newest ingested outcome.
    pub updated_at: Option<NaiveDateTime>,
    pub phase: LearningPhase,
    pub total_outcomes: usize,
    /// Total adjustment cap as a fraction of base score.
    pub cap_fraction: f64,
    pub(crate) stats: BTreeMap<(StrategyKind, TrendState), StrategyRegimeStat>,
    pub(crate) penalties: BTreeMap<FeaturePattern, FeaturePenalty>,
    pub(crate) strategy_bias: BTreeMap<StrategyKind, f64>,
    pub(crate) config: LearningConfig,
}

impl LearningView {
    /// A view with no evidence at all.
    pub fn cold(as_of: NaiveDateTime, config: LearningConfig) -> Self {
        Self {
            as_of,
            updated_at: None,
            phase: LearningPhase::Cold,
            total_outcomes: 0,
            cap_fraction: 0.0,
            stats: BTreeMap::new(),
            penalties: BTreeMap::new(),
            strategy_bias: BTreeMap::new(),
            config,
        }
    }

    pub fn stat(&self, strategy: StrategyKind, regime: TrendState) -> Option<&StrategyRegimeStat> {
        self.stats.get(&(strategy, regime))
    }

    pub fn penalty(&self, pattern: FeaturePattern) -> Option<&FeaturePenalty> {
        self.penalties.get(&pattern)
    }

    pub fn strategy_bias(&self, strategy: StrategyKind) -> f64 {
        self.strategy_bias.get(&strategy).copied().unwrap_or(0.0)
    }

    pub fn stats(&self) -> impl Iterator<Item = (&(StrategyKind, TrendState), &StrategyRegimeStat)> {
        self.stats.iter()
    }

    /// Fails when the newest evidence is more than `bound_days` older than `at`.
    pub fn check_freshness(&self, at: NaiveDateTime, bound_days: i64) -> Result<(), CoreError> {
        let Some(updated) = self.updated_at else {
            return Ok(());
        };
        let age_days = (at - updated).num_days();
        if age_days > bound_days {
            return Err(CoreError::StaleLearningState {
                age_days,
                bound_days,
            });
        }
        Ok(())
    }

    /// Step (1): strategy-by-regime delta plus user preference for the strategy.
    pub fn strategy_adjustment(&self, strategy: StrategyKind, regime: TrendState) -> Option<RawAdjustment> {
        let mut delta = 0.0;
        let mut parts = Vec::new();

        if let Some(stat) = self.stat(strategy, regime) {
            if stat.trades >= self.config.min_bucket_samples {
                let scaled = (stat.expectancy / self.config.expectancy_scale).clamp(-1.0, 1.0);
                let perf = scaled * self.config.max_strategy_delta;
                if perf != 0.0 {
                    let verdict = if perf > 0.0 { "well" } else { "poorly" };
                    parts.push(format!("{strategy} performing {verdict} in {regime} regime"));
                    delta += perf;
                }
            }
        }

        let bias = self.strategy_bias(strategy);
        let pref = bias * self.config.feedback_weight;
        if pref != 0.0 {
            let verdict = if pref > 0.0 { "favored" } else { "disfavored" };
            parts.push(format!("{strategy} {verdict} in user feedback"));
            delta += pref;
        }

        (!parts.is_empty()).then(|| RawAdjustment {
            delta,
            detail: parts.join(", "),
        })
    }

    /// Step (2): penalties and feedback preferences for the matched patterns.
    pub fn pattern_adjustment(&self, patterns: &[FeaturePattern]) -> Option<RawAdjustment> {
        let mut delta = 0.0;
        let mut parts = Vec::new();
        for pattern in patterns {
            let Some(p) = self.penalty(*pattern) else {
                continue;
            };
            let contribution = -p.magnitude + p.feedback_bias * self.config.feedback_weight;
            if contribution != 0.0 {
                delta += contribution;
                parts.push(pattern.describe().to_string());
            }
        }
        (!parts.is_empty()).then(|| RawAdjustment {
            delta,
            detail: parts.join(", "),
        })
    }
}
