//! Decaying failure evidence per feature pattern.
//!
//! Evidence counts decay exponentially with a configurable half-life. The
//! penalty read from them is
//!
//! ```text
//! max_penalty · failure_rate · (1 − e^(−failures / evidence_scale))
//! ```
//!
//! so it grows with every additional failure and approaches
//! `max_penalty · failure_rate` as failures accumulate.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::config::LearningConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternEvidence {
    /// Decayed count of outcomes that carried the pattern.
    pub occurrences: f64,
    /// Decayed count of those outcomes that failed.
    pub failures: f64,
    pub last_update: Option<NaiveDateTime>,
}

impl PatternEvidence {
    /// Decay factor for `days` elapsed.
    fn decay(days: f64, half_life_days: f64) -> f64 {
        if days <= 0.0 {
            1.0
        } else {
            0.5_f64.powf(days / half_life_days)
        }
    }

    fn days_since(&self, at: NaiveDateTime) -> f64 {
        self.last_update
            .map(|t| (at - t).num_seconds() as f64 / 86_400.0)
            .unwrap_or(0.0)
    }

    /// Counts decayed forward to `at`. Never decays backward.
    pub fn decayed(&self, at: NaiveDateTime, config: &LearningConfig) -> (f64, f64) {
        let f = Self::decay(self.days_since(at), config.penalty_half_life_days);
        (self.occurrences * f, self.failures * f)
    }

    pub fn record(&mut self, failed: bool, at: NaiveDateTime, config: &LearningConfig) {
        let (occurrences, failures) = self.decayed(at, config);
        self.occurrences = occurrences + 1.0;
        self.failures = failures + if failed { 1.0 } else { 0.0 };
        self.last_update = Some(match self.last_update {
            Some(prev) if prev > at => prev,
            _ => at,
        });
    }

    /// Penalty magnitude in score points (non-negative).
    pub fn penalty(&self, at: NaiveDateTime, config: &LearningConfig) -> f64 {
        let (occurrences, failures) = self.decayed(at, config);
        if occurrences <= 0.0 || failures <= 0.0 {
            return 0.0;
        }
        let failure_rate = (failures / occurrences).clamp(0.0, 1.0);
        let confidence = 1.0 - (-failures / config.evidence_scale).exp();
        config.max_penalty * failure_rate * confidence
    }
}

/// Penalty state for one pattern as seen by a learning view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeaturePenalty {
    /// Decayed penalty, in score points.
    pub magnitude: f64,
    pub occurrences: f64,
    pub failures: f64,
    /// User-feedback preference in [-1, 1].
    pub feedback_bias: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(16, 0, 0)
            .unwrap()
    }

    #[test]
    fn repeated_failures_increase_penalty() {
        let cfg = LearningConfig::default();
        let mut ev = PatternEvidence::default();
        let mut last = 0.0;
        for _ in 0..6 {
            ev.record(true, t0(), &cfg);
            let p = ev.penalty(t0(), &cfg);
            assert!(p > last, "penalty {p} did not grow past {last}");
            assert!(p <= cfg.max_penalty);
            last = p;
        }
        let expected = 30.0 * (1.0 - (-6.0_f64 / 5.0).exp());
        assert!((last - expected).abs() < 1e-9);
    }

    #[test]
    fn successes_dilute_failure_rate() {
        let cfg = LearningConfig::default();
        let mut only_fail = PatternEvidence::default();
        only_fail.record(true, t0(), &cfg);
        let mut mixed = only_fail;
        mixed.record(false, t0(), &cfg);
        assert!(mixed.penalty(t0(), &cfg) < only_fail.penalty(t0(), &cfg));
    }

    #[test]
    fn evidence_halves_after_half_life() {
        let cfg = LearningConfig::default();
        let mut ev = PatternEvidence::default();
        ev.record(true, t0(), &cfg);
        let later = t0() + Duration::days(14);
        let (occ, fail) = ev.decayed(later, &cfg);
        assert!((occ - 0.5).abs() < 1e-9);
        assert!((fail - 0.5).abs() < 1e-9);
        assert!(ev.penalty(later, &cfg) < ev.penalty(t0(), &cfg));
        // Reading in the past never inflates evidence.
        assert_eq!(ev.decayed(t0() - Duration::days(3), &cfg), (1.0, 1.0));
    }

    #[test]
    fn no_failures_no_penalty() {
        let cfg = LearningConfig::default();
        let mut ev = PatternEvidence::default();
        ev.record(false, t0(), &cfg);
        assert_eq!(ev.penalty(t0(), &cfg), 0.0);
    }
}
