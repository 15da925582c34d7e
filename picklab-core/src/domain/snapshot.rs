//! Signal snapshot: the immutable scoring input for one symbol at one bar.
//!
//! Every numeric input is optional. Scorers treat an absent value as
//! "no information" and fall back to a neutral contribution.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::regime::{Regime, SentimentReading};
use super::strategy::StrategyKind;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendInputs {
    pub ma_short: Option<f64>,
    pub ma_long: Option<f64>,
    /// Kaufman efficiency ratio in [0,1]; low values mean choppy price action.
    pub efficiency_ratio: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MomentumInputs {
    /// Short rate of change, in percent.
    pub roc_short: Option<f64>,
    /// Long rate of change, in percent.
    pub roc_long: Option<f64>,
    pub rsi: Option<f64>,
    /// Percent above the prior range high; negative when below it.
    pub breakout_pct: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeInputs {
    pub current: Option<f64>,
    pub average: Option<f64>,
    /// Mean volume of the most recent bars.
    pub recent_average: Option<f64>,
    /// Mean volume of the bars immediately before the recent window.
    pub prior_average: Option<f64>,
    /// Entry rule observed a volume surge.
    #[serde(default)]
    pub surge: bool,
}

impl VolumeInputs {
    pub fn ratio(&self) -> Option<f64> {
        match (self.current, self.average) {
            (Some(c), Some(a)) if a > 0.0 => Some(c / a),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VolatilityInputs {
    /// Rank of current realized volatility in its trailing distribution, 0–100.
    pub percentile: Option<f64>,
    pub atr: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LiquidityInputs {
    pub avg_volume: Option<f64>,
    /// Minimum acceptable average daily volume for the universe.
    pub min_avg_volume: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskInputs {
    /// Highest high of the recent lookback, for drawdown-from-high.
    pub recent_high: Option<f64>,
}

/// Entry proposed by a strategy's entry rule.
///
/// Prices are raw: the composite scorer turns this into a validated
/// [`super::TradePlan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySetup {
    pub strategy: StrategyKind,
    pub entry: f64,
    pub stop: f64,
    pub targets: Vec<f64>,
    /// The rule saw volume well above its average.
    #[serde(default)]
    pub volume_surge: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub price: f64,
    pub regime: Regime,
    pub trend: TrendInputs,
    pub momentum: MomentumInputs,
    pub volume: VolumeInputs,
    pub volatility: VolatilityInputs,
    pub sentiment: Option<SentimentReading>,
    pub liquidity: LiquidityInputs,
    pub risk: RiskInputs,
    pub vwap: Option<f64>,
    pub setup: EntrySetup,
}

impl SignalSnapshot {
    pub fn strategy(&self) -> StrategyKind {
        self.setup.strategy
    }

    /// Absolute percent distance between price and VWAP.
    pub fn distance_from_vwap_pct(&self) -> Option<f64> {
        match self.vwap {
            Some(v) if v > 0.0 => Some(((self.price - v) / v * 100.0).abs()),
            _ => None,
        }
    }
}
