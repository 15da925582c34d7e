//! Rate of Change (ROC), in percent.
//!
//! ROC[t] = (close[t] / close[t-period] - 1) * 100
//! Feeds the momentum dimension (short and long windows) and the earnings
//! drift entry rule.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Roc {
    period: usize,
    name: String,
}

impl Roc {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ROC period must be >= 1");
        Self {
            period,
            name: format!("roc_{period}"),
        }
    }
}

impl Indicator for Roc {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut result = vec![f64::NAN; bars.len()];
        for (i, window) in bars.windows(self.period + 1).enumerate() {
            let base = window[0].close;
            let last = window[self.period].close;
            if base > 0.0 && last.is_finite() {
                result[i + self.period] = (last / base - 1.0) * 100.0;
            }
        }
        result
    }
}
