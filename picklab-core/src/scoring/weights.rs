//! Composite weights: a public, tunable configuration surface.

use serde::{Deserialize, Serialize};

use super::dimensions::{Dimension, DimensionScores};

/// Tolerance on the weight sum.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Weight per dimension. Must be non-negative and sum to 1.0.
///
/// Core technicals (trend, momentum) carry the most weight; sentiment is
/// light because it is often missing and then neutral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub trend: f64,
    pub momentum: f64,
    pub volume: f64,
    pub volatility: f64,
    pub sentiment: f64,
    pub liquidity: f64,
    pub risk: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            trend: 0.20,
            momentum: 0.20,
            volume: 0.15,
            volatility: 0.15,
            sentiment: 0.10,
            liquidity: 0.10,
            risk: 0.10,
        }
    }
}

impl ScoringWeights {
    pub fn get(&self, dim: Dimension) -> f64 {
        match dim {
            Dimension::Trend => self.trend,
            Dimension::Momentum => self.momentum,
            Dimension::Volume => self.volume,
            Dimension::Volatility => self.volatility,
            Dimension::Sentiment => self.sentiment,
            Dimension::Liquidity => self.liquidity,
            Dimension::Risk => self.risk,
        }
    }

    pub fn sum(&self) -> f64 {
        Dimension::ALL.iter().map(|&d| self.get(d)).sum()
    }

    pub fn validate(&self) -> Result<(), String> {
        for d in Dimension::ALL {
            let w = self.get(d);
            if !w.is_finite() || w < 0.0 {
                return Err(format!("weight for {d} must be a non-negative number, got {w}"));
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(format!("weights must sum to 1.0, got {sum:.6}"));
        }
        Ok(())
    }

    /// Weighted average of the dimension scores.
    pub fn combine(&self, scores: &DimensionScores) -> f64 {
        scores.iter().map(|(d, s)| self.get(d) * s).sum()
    }
}
