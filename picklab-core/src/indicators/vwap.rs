//! Rolling volume-weighted average price.
//!
//! VWAP[t] = Σ typical_price·volume / Σ volume over the last `period` bars.
//! Windows with zero total volume are NaN.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Vwap {
    period: usize,
    name: String,
}

impl Vwap {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "VWAP period must be >= 1");
        Self {
            period,
            name: format!("vwap_{period}"),
        }
    }
}

impl Indicator for Vwap {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut result = vec![f64::NAN; bars.len()];
        for (i, window) in bars.windows(self.period).enumerate() {
            let (pv, vol) = window.iter().fold((0.0, 0.0), |(pv, vol), b| {
                let v = b.volume as f64;
                (pv + b.typical_price() * v, vol + v)
            });
            if vol > 0.0 && pv.is_finite() {
                result[i + self.period - 1] = pv / vol;
            }
        }
        result
    }
}
