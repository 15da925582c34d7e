//! Market regime and news sentiment readings supplied by collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prevailing market trend classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendState {
    Bullish,
    Bearish,
    Neutral,
}

impl TrendState {
    pub const ALL: [TrendState; 3] = [TrendState::Bullish, TrendState::Bearish, TrendState::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendState::Bullish => "bullish",
            TrendState::Bearish => "bearish",
            TrendState::Neutral => "neutral",
        }
    }
}

impl fmt::Display for TrendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trend and volatility classification at a point in time.
///
/// `volatility_percentile` is on a 0–100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Regime {
    pub trend: TrendState,
    pub volatility_percentile: f64,
}

impl Regime {
    pub fn new(trend: TrendState, volatility_percentile: f64) -> Self {
        Self {
            trend,
            volatility_percentile,
        }
    }
}

impl Default for Regime {
    fn default() -> Self {
        Self::new(TrendState::Neutral, 50.0)
    }
}

/// Aggregated news sentiment for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentReading {
    /// -1.0 (bearish) to 1.0 (bullish).
    pub polarity: f64,
    /// 0.0 to 1.0.
    pub confidence: f64,
    /// An earnings release was detected in the underlying news.
    #[serde(default)]
    pub earnings_detected: bool,
}

impl SentimentReading {
    pub fn new(polarity: f64, confidence: f64) -> Self {
        Self {
            polarity: polarity.clamp(-1.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
            earnings_detected: false,
        }
    }

    pub fn with_earnings(mut self) -> Self {
        self.earnings_detected = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_state_serializes_lowercase() {
        let json = serde_json::to_string(&TrendState::Bullish).unwrap();
        assert_eq!(json, "\"bullish\"");
        assert_eq!(TrendState::Bearish.to_string(), "bearish");
    }

    #[test]
    fn sentiment_inputs_are_clamped() {
        let s = SentimentReading::new(3.0, -1.0);
        assert_eq!(s.polarity, 1.0);
        assert_eq!(s.confidence, 0.0);
        assert!(!s.earnings_detected);
        assert!(s.with_earnings().earnings_detected);
    }
}
