//! Rolling highest high and lowest low, current bar included.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct HighestHigh {
    period: usize,
    name: String,
}

impl HighestHigh {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "channel period must be >= 1");
        Self {
            period,
            name: format!("highest_high_{period}"),
        }
    }
}

impl Indicator for HighestHigh {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        rolling_extreme(bars, self.period, |b| b.high, f64::max)
    }
}

#[derive(Debug, Clone)]
pub struct LowestLow {
    period: usize,
    name: String,
}

impl LowestLow {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "channel period must be >= 1");
        Self {
            period,
            name: format!("lowest_low_{period}"),
        }
    }
}

impl Indicator for LowestLow {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        rolling_extreme(bars, self.period, |b| b.low, f64::min)
    }
}

fn rolling_extreme(
    bars: &[Bar],
    period: usize,
    field: impl Fn(&Bar) -> f64,
    pick: impl Fn(f64, f64) -> f64,
) -> Vec<f64> {
    let mut result = vec![f64::NAN; bars.len()];
    for (i, window) in bars.windows(period).enumerate() {
        if window.iter().any(|b| field(b).is_nan()) {
            continue;
        }
        let first = field(&window[0]);
        result[i + period - 1] = window.iter().skip(1).map(&field).fold(first, &pick);
    }
    result
}
