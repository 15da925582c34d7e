//! Volatility percentile.
//!
//! Realized volatility is the population standard deviation of the last
//! `window` close-to-close returns. The percentile is the share of the
//! previous `lookback` volatility readings strictly below the current one,
//! on a 0–100 scale.

use super::{population_std, Indicator};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct VolatilityPercentile {
    window: usize,
    lookback: usize,
    name: String,
}

impl VolatilityPercentile {
    pub fn new(window: usize, lookback: usize) -> Self {
        assert!(window >= 1, "volatility window must be >= 1");
        assert!(lookback >= 1, "volatility lookback must be >= 1");
        Self {
            window,
            lookback,
            name: format!("vol_pct_{window}_{lookback}"),
        }
    }

    /// Realized volatility series; first valid value at index `window`.
    pub fn realized(&self, bars: &[Bar]) -> Vec<f64> {
        let returns: Vec<f64> = bars
            .windows(2)
            .map(|w| {
                if w[0].close > 0.0 {
                    w[1].close / w[0].close - 1.0
                } else {
                    f64::NAN
                }
            })
            .collect();
        let mut vol = vec![f64::NAN; bars.len()];
        for (i, rets) in returns.windows(self.window).enumerate() {
            if rets.iter().all(|r| r.is_finite()) {
                vol[i + self.window] = population_std(rets);
            }
        }
        vol
    }
}

impl Indicator for VolatilityPercentile {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window + self.lookback
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let vol = self.realized(bars);
        let mut result = vec![f64::NAN; bars.len()];
        for i in self.lookback()..bars.len() {
            let current = vol[i];
            let history = &vol[i - self.lookback..i];
            if current.is_nan() || history.iter().any(|v| v.is_nan()) {
                continue;
            }
            let below = history.iter().filter(|&&v| v < current).count();
            result[i] = below as f64 / self.lookback as f64 * 100.0;
        }
        result
    }
}
