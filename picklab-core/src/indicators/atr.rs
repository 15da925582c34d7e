//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! ATR is the simple mean of the last `period` true ranges. The first bar has
//! no previous close, so its TR is undefined and the first valid ATR is at
//! index `period`.

use super::{rolling_mean, Indicator};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// True Range series. TR[0] is NaN.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = vec![f64::NAN; bars.len()];
    for i in 1..bars.len() {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        if !(h.is_nan() || l.is_nan() || pc.is_nan()) {
            tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
        }
    }
    tr
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        rolling_mean(&true_range(bars), self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn true_range_uses_previous_close() {
        let mut bars = make_bars(&[100.0, 100.0]);
        // Gap up: prev close 100, bar range 105..107
        bars[1].high = 107.0;
        bars[1].low = 105.0;
        let tr = true_range(&bars);
        assert!(tr[0].is_nan());
        assert_approx(tr[1], 7.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_constant_range() {
        // make_bars with flat closes gives high-low = 2.0 on every bar
        let bars = make_bars(&[50.0; 6]);
        let atr = Atr::new(3);
        let result = atr.compute(&bars);
        for v in result.iter().take(3) {
            assert!(v.is_nan());
        }
        for v in result.iter().skip(3) {
            assert_approx(*v, 2.0, DEFAULT_EPSILON);
        }
        assert_eq!(atr.lookback(), 3);
    }
}
