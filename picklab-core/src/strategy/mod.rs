//! Strategy entry rules.
//!
//! The strategy set is closed: one pure rule per [`StrategyKind`], looked up
//! through [`entry_rule`]. Rules see bars up to and including the evaluated
//! index and the precomputed indicator row for it, never anything later.

pub mod context;
pub mod earnings;
pub mod hvb;
pub mod momentum;
pub mod orb;
pub mod vwap;

use serde::{Deserialize, Serialize};

use crate::domain::{EntrySetup, Horizon, StrategyKind};

pub use context::EntryContext;

/// An entry rule: `Some(setup)` when the strategy fires at the context's bar.
pub type EntryRule = fn(&EntryContext<'_>) -> Option<EntrySetup>;

pub fn entry_rule(kind: StrategyKind) -> EntryRule {
    match kind {
        StrategyKind::Orb => orb::evaluate,
        StrategyKind::VwapPullback => vwap::evaluate,
        StrategyKind::MomentumSwing => momentum::evaluate,
        StrategyKind::HighVolatilityBreakout => hvb::evaluate,
        StrategyKind::EarningsDrift => earnings::evaluate,
    }
}

// ── Parameters ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbParams {
    /// Bars at the start of the session forming the opening range.
    pub range_bars: usize,
    /// Session bars required before the rule is evaluated.
    pub min_session_bars: usize,
    /// Trailing session bars averaged for the volume check.
    pub surge_bars: usize,
    pub volume_surge_ratio: f64,
    pub stop_atr: f64,
    pub target_atr: f64,
    pub horizon: Horizon,
}

impl Default for OrbParams {
    fn default() -> Self {
        Self {
            range_bars: 3,
            min_session_bars: 15,
            surge_bars: 10,
            volume_surge_ratio: 1.2,
            stop_atr: 1.5,
            target_atr: 2.0,
            horizon: Horizon::Days(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VwapPullbackParams {
    /// Largest distance from VWAP, as a fraction.
    pub max_distance: f64,
    /// Close must stay above `vwap * floor_ratio`.
    pub floor_ratio: f64,
    pub stop_atr: f64,
    pub target_atr: f64,
    pub volume_surge_ratio: f64,
    pub horizon: Horizon,
}

impl Default for VwapPullbackParams {
    fn default() -> Self {
        Self {
            max_distance: 0.01,
            floor_ratio: 0.998,
            stop_atr: 1.0,
            target_atr: 2.5,
            volume_surge_ratio: 1.1,
            horizon: Horizon::Days(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumSwingParams {
    pub rsi_min: f64,
    pub rsi_max: f64,
    pub stop_atr: f64,
    pub target_atr: f64,
    pub horizon: Horizon,
}

impl Default for MomentumSwingParams {
    fn default() -> Self {
        Self {
            rsi_min: 40.0,
            rsi_max: 70.0,
            stop_atr: 1.0,
            target_atr: 3.0,
            horizon: Horizon::Bars(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HvbParams {
    pub min_volatility_percentile: f64,
    /// High must reach this fraction of the range high.
    pub near_high_ratio: f64,
    pub surge_bars: usize,
    pub volume_surge_ratio: f64,
    pub stop_atr: f64,
    pub target_atr: f64,
    pub horizon: Horizon,
}

impl Default for HvbParams {
    fn default() -> Self {
        Self {
            min_volatility_percentile: 90.0,
            near_high_ratio: 0.98,
            surge_bars: 3,
            volume_surge_ratio: 1.5,
            stop_atr: 2.5,
            target_atr: 5.0,
            horizon: Horizon::Bars(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarningsDriftParams {
    /// Bars over which the post-event move is measured.
    pub drift_bars: usize,
    /// Minimum move over `drift_bars`, in percent.
    pub min_move_pct: f64,
    pub rsi_max: f64,
    pub stop_atr: f64,
    /// Stop floor as a fraction of the recent low.
    pub recent_low_ratio: f64,
    /// Target as a multiple of the per-share risk.
    pub reward_multiple: f64,
    /// Target is at least `close * min_target_ratio`.
    pub min_target_ratio: f64,
    pub volume_surge_ratio: f64,
    pub horizon: Horizon,
}

impl Default for EarningsDriftParams {
    fn default() -> Self {
        Self {
            drift_bars: 10,
            min_move_pct: 2.0,
            rsi_max: 75.0,
            stop_atr: 1.5,
            recent_low_ratio: 0.98,
            reward_multiple: 1.5,
            min_target_ratio: 1.05,
            volume_surge_ratio: 1.5,
            horizon: Horizon::Bars(10),
        }
    }
}

/// Parameters for every entry rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    pub orb: OrbParams,
    pub vwap_pullback: VwapPullbackParams,
    pub momentum_swing: MomentumSwingParams,
    pub hvb: HvbParams,
    pub earnings_drift: EarningsDriftParams,
}

impl StrategyParams {
    pub fn horizon(&self, kind: StrategyKind) -> Horizon {
        match kind {
            StrategyKind::Orb => self.orb.horizon,
            StrategyKind::VwapPullback => self.vwap_pullback.horizon,
            StrategyKind::MomentumSwing => self.momentum_swing.horizon,
            StrategyKind::HighVolatilityBreakout => self.hvb.horizon,
            StrategyKind::EarningsDrift => self.earnings_drift.horizon,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for kind in StrategyKind::ALL {
            if self.horizon(kind).is_empty() {
                return Err(format!("{kind} horizon must be non-empty"));
            }
        }
        if self.orb.range_bars == 0 || self.orb.range_bars > self.orb.min_session_bars {
            return Err("orb.range_bars must be within 1..=min_session_bars".into());
        }
        if self.orb.surge_bars == 0 || self.hvb.surge_bars == 0 || self.earnings_drift.drift_bars < 2 {
            return Err("volume and drift windows must be non-empty".into());
        }
        if self.momentum_swing.rsi_min >= self.momentum_swing.rsi_max {
            return Err("momentum_swing.rsi_min must be below rsi_max".into());
        }
        Ok(())
    }
}
