//! Trade plan: entry, protective stop, profit targets and holding horizon.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Maximum holding period before a position is forced out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "lowercase")]
pub enum Horizon {
    /// At most `n` bars after the entry bar.
    Bars(usize),
    /// Bars stamped no later than `d` calendar days after entry.
    Days(u32),
}

impl Horizon {
    /// Whether a bar `bars_after` positions past entry (1-based) and stamped
    /// `timestamp` is still inside the horizon.
    pub fn contains(&self, entry: NaiveDateTime, bars_after: usize, timestamp: NaiveDateTime) -> bool {
        match *self {
            Horizon::Bars(n) => bars_after <= n,
            // A horizon past the end of the calendar never expires.
            Horizon::Days(d) => entry
                .checked_add_signed(Duration::days(i64::from(d)))
                .map_or(true, |end| timestamp <= end),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Horizon::Bars(0) | Horizon::Days(0))
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Horizon::Bars(n) => write!(f, "{n} bars"),
            Horizon::Days(d) => write!(f, "{d} days"),
        }
    }
}

/// Coarse risk classification attached to every plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLabel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLabel::Low => "LOW",
            RiskLabel::Medium => "MEDIUM",
            RiskLabel::High => "HIGH",
        };
        f.write_str(s)
    }
}

/// A long-only trade plan.
///
/// Construction enforces `0 < stop < entry < targets[0]` and ascending
/// targets, so a `TradePlan` value is always structurally valid.
/// Deserialization goes through the same checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTradePlan")]
pub struct TradePlan {
    entry: f64,
    stop: f64,
    targets: Vec<f64>,
    horizon: Horizon,
    risk_label: RiskLabel,
}

/// Unchecked wire form of [`TradePlan`].
#[derive(Deserialize)]
struct RawTradePlan {
    entry: f64,
    stop: f64,
    targets: Vec<f64>,
    horizon: Horizon,
    risk_label: RiskLabel,
}

impl TryFrom<RawTradePlan> for TradePlan {
    type Error = CoreError;

    fn try_from(raw: RawTradePlan) -> Result<Self, Self::Error> {
        TradePlan::new(raw.entry, raw.stop, raw.targets, raw.horizon, raw.risk_label)
    }
}

impl TradePlan {
    pub fn new(
        entry: f64,
        stop: f64,
        targets: Vec<f64>,
        horizon: Horizon,
        risk_label: RiskLabel,
    ) -> Result<Self, CoreError> {
        if !entry.is_finite() || !stop.is_finite() || targets.iter().any(|t| !t.is_finite()) {
            return Err(CoreError::InvalidTradePlan(
                "non-finite price in plan".into(),
            ));
        }
        let first = *targets
            .first()
            .ok_or_else(|| CoreError::InvalidTradePlan("plan has no targets".into()))?;
        if stop <= 0.0 {
            return Err(CoreError::InvalidTradePlan(format!(
                "stop {stop:.4} must be positive"
            )));
        }
        if stop >= entry {
            return Err(CoreError::InvalidTradePlan(format!(
                "stop {stop:.4} is not below entry {entry:.4}"
            )));
        }
        if first <= entry {
            return Err(CoreError::InvalidTradePlan(format!(
                "first target {first:.4} is not above entry {entry:.4}"
            )));
        }
        if targets.windows(2).any(|w| w[1] < w[0]) {
            return Err(CoreError::InvalidTradePlan(
                "targets are not ascending".into(),
            ));
        }
        if horizon.is_empty() {
            return Err(CoreError::InvalidTradePlan("horizon is empty".into()));
        }
        Ok(Self {
            entry,
            stop,
            targets,
            horizon,
            risk_label,
        })
    }

    pub fn entry(&self) -> f64 {
        self.entry
    }

    pub fn stop(&self) -> f64 {
        self.stop
    }

    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// The first (nearest) target; exits are evaluated against it.
    pub fn primary_target(&self) -> f64 {
        self.targets[0]
    }

    pub fn horizon(&self) -> Horizon {
        self.horizon
    }

    pub fn risk_label(&self) -> RiskLabel {
        self.risk_label
    }

    /// Entry minus stop. Always positive.
    pub fn risk_per_share(&self) -> f64 {
        self.entry - self.stop
    }

    /// Reward to the primary target divided by risk to the stop.
    pub fn reward_risk(&self) -> f64 {
        (self.primary_target() - self.entry) / self.risk_per_share()
    }

    /// Stop distance as a fraction of entry.
    pub fn stop_distance_pct(&self) -> f64 {
        self.risk_per_share() / self.entry
    }
}
