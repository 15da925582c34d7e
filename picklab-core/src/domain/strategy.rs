//! Strategy tags: the closed set of entry-rule families.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One variant per entry rule. Dispatch goes through
/// [`crate::strategy::entry_rule`], so adding a variant forces every
/// match site to handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StrategyKind {
    #[serde(rename = "ORB")]
    Orb,
    #[serde(rename = "VWAP_PULLBACK")]
    VwapPullback,
    #[serde(rename = "MOMENTUM_SWING")]
    MomentumSwing,
    #[serde(rename = "HVB")]
    HighVolatilityBreakout,
    #[serde(rename = "EARNINGS_DRIFT")]
    EarningsDrift,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::Orb,
        StrategyKind::VwapPullback,
        StrategyKind::MomentumSwing,
        StrategyKind::HighVolatilityBreakout,
        StrategyKind::EarningsDrift,
    ];

    /// Stable tag used in reports, persisted keys and reason strings.
    pub fn tag(&self) -> &'static str {
        match self {
            StrategyKind::Orb => "ORB",
            StrategyKind::VwapPullback => "VWAP_PULLBACK",
            StrategyKind::MomentumSwing => "MOMENTUM_SWING",
            StrategyKind::HighVolatilityBreakout => "HVB",
            StrategyKind::EarningsDrift => "EARNINGS_DRIFT",
        }
    }

    /// Intraday strategies are closed out within the session.
    pub fn is_intraday(&self) -> bool {
        matches!(self, StrategyKind::Orb | StrategyKind::VwapPullback)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .iter()
            .copied()
            .find(|k| k.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown strategy tag: {s}"))
    }
}
