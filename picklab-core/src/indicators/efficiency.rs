//! Kaufman efficiency ratio.
//!
//! ER[t] = |close[t] - close[t-period]| / Σ|close[i] - close[i-1]|
//! 1.0 is a straight line, values near 0 are choppy. A window with no
//! movement at all reads 0.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct EfficiencyRatio {
    period: usize,
    name: String,
}

impl EfficiencyRatio {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "efficiency period must be >= 1");
        Self {
            period,
            name: format!("efficiency_{period}"),
        }
    }
}

impl Indicator for EfficiencyRatio {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut result = vec![f64::NAN; bars.len()];
        for (i, window) in bars.windows(self.period + 1).enumerate() {
            let net = (window[self.period].close - window[0].close).abs();
            let path: f64 = window.windows(2).map(|w| (w[1].close - w[0].close).abs()).sum();
            if !net.is_nan() && !path.is_nan() {
                result[i + self.period] = if path > 0.0 { net / path } else { 0.0 };
            }
        }
        result
    }
}
