//! Feature patterns: setup traits the learning layer tracks failures for.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::{SignalSnapshot, StrategyKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeaturePattern {
    /// Thin average volume on a high-volatility breakout.
    #[serde(rename = "low_liquidity_hvb")]
    LowLiquidityHighVolatility,
    /// Large breakout without a volume surge behind it.
    #[serde(rename = "gap_no_volume")]
    GapWithoutVolume,
    /// Entry stretched far from VWAP.
    #[serde(rename = "far_from_vwap")]
    FarFromVwap,
}

impl FeaturePattern {
    pub const ALL: [FeaturePattern; 3] = [
        FeaturePattern::LowLiquidityHighVolatility,
        FeaturePattern::GapWithoutVolume,
        FeaturePattern::FarFromVwap,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            FeaturePattern::LowLiquidityHighVolatility => "low_liquidity_hvb",
            FeaturePattern::GapWithoutVolume => "gap_no_volume",
            FeaturePattern::FarFromVwap => "far_from_vwap",
        }
    }

    /// Phrase used in adjustment reasons.
    pub fn describe(&self) -> &'static str {
        match self {
            FeaturePattern::LowLiquidityHighVolatility => "low liquidity HVB pattern",
            FeaturePattern::GapWithoutVolume => "gap without volume",
            FeaturePattern::FarFromVwap => "far from VWAP",
        }
    }
}

impl fmt::Display for FeaturePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for FeaturePattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeaturePattern::ALL
            .iter()
            .copied()
            .find(|p| p.id() == s)
            .ok_or_else(|| format!("unknown feature pattern: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternThresholds {
    /// Average volume below `min_avg_volume * low_liquidity_multiple` is thin.
    pub low_liquidity_multiple: f64,
    /// Volatility percentile above which a non-HVB setup counts as a breakout.
    pub high_volatility_percentile: f64,
    /// Breakout percent above which a missing volume surge is suspicious.
    pub gap_breakout_pct: f64,
    pub far_from_vwap_pct: f64,
}

impl Default for PatternThresholds {
    fn default() -> Self {
        Self {
            low_liquidity_multiple: 1.5,
            high_volatility_percentile: 90.0,
            gap_breakout_pct: 3.0,
            far_from_vwap_pct: 2.0,
        }
    }
}

/// Patterns present in a snapshot, in [`FeaturePattern::ALL`] order.
pub fn detect_patterns(snapshot: &SignalSnapshot, thresholds: &PatternThresholds) -> Vec<FeaturePattern> {
    let mut found = Vec::new();

    let volatile = snapshot.strategy() == StrategyKind::HighVolatilityBreakout
        || snapshot
            .volatility
            .percentile
            .is_some_and(|p| p > thresholds.high_volatility_percentile);
    let thin = snapshot.liquidity.avg_volume.is_some_and(|v| {
        v < snapshot.liquidity.min_avg_volume * thresholds.low_liquidity_multiple
    });
    if volatile && thin {
        found.push(FeaturePattern::LowLiquidityHighVolatility);
    }

    if !snapshot.volume.surge
        && snapshot
            .momentum
            .breakout_pct
            .is_some_and(|b| b > thresholds.gap_breakout_pct)
    {
        found.push(FeaturePattern::GapWithoutVolume);
    }

    if snapshot
        .distance_from_vwap_pct()
        .is_some_and(|d| d > thresholds.far_from_vwap_pct)
    {
        found.push(FeaturePattern::FarFromVwap);
    }

    found
}
