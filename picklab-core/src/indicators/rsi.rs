//! Relative Strength Index (RSI).
//!
//! Simple (unsmoothed) averages of the gains and losses over the last
//! `period` close-to-close changes.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period.
//! Edge cases: avg_loss == 0 → RSI = 100; avg_gain == 0 → RSI = 0; no movement → 50.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        for (i, slot) in result.iter_mut().enumerate().skip(self.period) {
            let mut gain = 0.0;
            let mut loss = 0.0;
            let mut valid = true;
            for j in (i + 1 - self.period)..=i {
                let ch = bars[j].close - bars[j - 1].close;
                if ch.is_nan() {
                    valid = false;
                    break;
                }
                if ch > 0.0 {
                    gain += ch;
                } else {
                    loss -= ch;
                }
            }
            if valid {
                *slot = compute_rsi(gain / self.period as f64, loss / self.period as f64);
            }
        }

        result
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // no movement
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn rsi_all_gains_is_100() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let result = Rsi::new(3).compute(&bars);
        assert!(result[2].is_nan());
        assert_approx(result[3], 100.0, DEFAULT_EPSILON);
        assert_approx(result[4], 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let bars = make_bars(&[10.0, 9.0, 8.0, 7.0]);
        let result = Rsi::new(3).compute(&bars);
        assert_approx(result[3], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rsi_mixed_window() {
        // Changes over last 4: +2, -1, +1, -2 → gain 3, loss 3 → 50
        let bars = make_bars(&[10.0, 12.0, 11.0, 12.0, 10.0]);
        let result = Rsi::new(4).compute(&bars);
        assert_approx(result[4], 50.0, DEFAULT_EPSILON);

        // Changes +2, -1 → avg gain 1.0, avg loss 0.5 → RSI 66.67
        let result = Rsi::new(2).compute(&bars[..3]);
        assert_approx(result[2], 100.0 - 100.0 / 3.0, 1e-9);
    }

    #[test]
    fn rsi_flat_is_50() {
        let bars = make_bars(&[5.0; 5]);
        let result = Rsi::new(3).compute(&bars);
        assert_approx(result[4], 50.0, DEFAULT_EPSILON);
    }
}
