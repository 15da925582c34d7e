//! Learning configuration and phase policy.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Outcomes observed before any adjustment is applied.
    pub cold_threshold: usize,
    /// Outcomes after which the full cap applies.
    pub full_threshold: usize,
    /// Largest total adjustment in the conservative phase, as a fraction of base score.
    pub conservative_cap_pct: f64,
    /// Largest total adjustment in the full phase, as a fraction of base score.
    pub full_cap_pct: f64,

    /// Outcomes kept per (strategy, regime) bucket.
    pub window_capacity: usize,
    /// Outcomes older than this (relative to the newest) leave the window.
    pub window_max_age_days: Option<i64>,
    /// Bucket size below which the strategy-regime delta stays zero.
    pub min_bucket_samples: usize,
    /// Strategy-regime delta at full expectancy, in score points.
    pub max_strategy_delta: f64,
    /// Expectancy (fraction per trade) that earns the full delta.
    pub expectancy_scale: f64,

    /// Half-life of feature-pattern evidence, in days.
    pub penalty_half_life_days: f64,
    /// Penalty ceiling for a pattern that always fails, in score points.
    pub max_penalty: f64,
    /// Failures needed for the penalty to reach ~63% of its rate-scaled ceiling.
    pub evidence_scale: f64,
    /// Return below which an outcome counts as failed even without a stop hit.
    pub failure_return: f64,

    /// EMA factor for user-feedback bias.
    pub feedback_alpha: f64,
    /// Score points per unit of feedback bias.
    pub feedback_weight: f64,
    /// Registered picks kept for outcome and feedback attribution.
    pub max_registered_picks: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            cold_threshold: 10,
            full_threshold: 50,
            conservative_cap_pct: 0.05,
            full_cap_pct: 0.20,
            window_capacity: 50,
            window_max_age_days: Some(180),
            min_bucket_samples: 5,
            max_strategy_delta: 20.0,
            expectancy_scale: 0.02,
            penalty_half_life_days: 14.0,
            max_penalty: 30.0,
            evidence_scale: 5.0,
            failure_return: -0.05,
            feedback_alpha: 0.2,
            feedback_weight: 5.0,
            max_registered_picks: 1_000,
        }
    }
}

impl LearningConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.full_threshold < self.cold_threshold {
            return Err(format!(
                "full_threshold ({}) must be >= cold_threshold ({})",
                self.full_threshold, self.cold_threshold
            ));
        }
        for (name, v) in [
            ("conservative_cap_pct", self.conservative_cap_pct),
            ("full_cap_pct", self.full_cap_pct),
            ("feedback_alpha", self.feedback_alpha),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(format!("{name} must be within [0, 1], got {v}"));
            }
        }
        if self.conservative_cap_pct > self.full_cap_pct {
            return Err("conservative cap must not exceed full cap".into());
        }
        if self.window_capacity == 0 {
            return Err("window_capacity must be >= 1".into());
        }
        if self.window_max_age_days.is_some_and(|d| d <= 0) {
            return Err("window_max_age_days must be positive".into());
        }
        for (name, v) in [
            ("penalty_half_life_days", self.penalty_half_life_days),
            ("evidence_scale", self.evidence_scale),
            ("expectancy_scale", self.expectancy_scale),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(format!("{name} must be positive, got {v}"));
            }
        }
        if self.max_penalty < 0.0 || self.max_strategy_delta < 0.0 || self.feedback_weight < 0.0 {
            return Err("penalty, delta and feedback magnitudes must be non-negative".into());
        }
        Ok(())
    }

    pub fn phase_for(&self, outcomes: usize) -> LearningPhase {
        if outcomes < self.cold_threshold {
            LearningPhase::Cold
        } else if outcomes < self.full_threshold {
            LearningPhase::Conservative
        } else {
            LearningPhase::Full
        }
    }

    /// Cap on the total learning adjustment, as a fraction of base score.
    pub fn cap_fraction(&self, phase: LearningPhase) -> f64 {
        match phase {
            LearningPhase::Cold => 0.0,
            LearningPhase::Conservative => self.conservative_cap_pct,
            LearningPhase::Full => self.full_cap_pct,
        }
    }
}

/// Graduated trust in learned adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningPhase {
    /// Pure observation, no adjustment.
    Cold,
    Conservative,
    Full,
}

impl fmt::Display for LearningPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LearningPhase::Cold => "cold",
            LearningPhase::Conservative => "conservative",
            LearningPhase::Full => "full",
        };
        f.write_str(s)
    }
}
