//! Multi-timeframe trend alignment.
//!
//! Daily bars are resampled to weekly and monthly. Every timeframe with
//! enough history votes a trend from its price against a 20- and 50-period
//! moving average. The majority trend and its share of the votes form the
//! alignment.

use serde::{Deserialize, Serialize};

use crate::collaborators::Timeframe;
use crate::domain::{Bar, TrendState};
use crate::indicators::{resample, Indicator, Sma};

/// Bars a timeframe needs before it votes.
pub const MIN_TIMEFRAME_BARS: usize = 20;
const SHORT_MA: usize = 20;
const LONG_MA: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeAlignment {
    pub trend: TrendState,
    /// Share of voting timeframes behind `trend`. 0.5 when no trend wins.
    pub strength: f64,
    pub votes: Vec<(Timeframe, TrendState)>,
}

impl TimeframeAlignment {
    /// Daily, weekly and monthly votes from one daily series. `None` when
    /// no timeframe has enough history.
    pub fn analyze(daily: &[Bar]) -> Option<Self> {
        let votes = [Timeframe::Daily, Timeframe::Weekly, Timeframe::Monthly]
            .into_iter()
            .filter_map(|tf| {
                let bars = if tf == Timeframe::Daily {
                    daily.to_vec()
                } else {
                    resample(daily, tf)
                };
                timeframe_trend(&bars).map(|trend| (tf, trend))
            })
            .collect();
        Self::from_votes(votes)
    }

    pub fn from_votes(votes: Vec<(Timeframe, TrendState)>) -> Option<Self> {
        if votes.is_empty() {
            return None;
        }
        let count = |t: TrendState| votes.iter().filter(|(_, v)| *v == t).count();
        let (bull, bear, neutral) = (
            count(TrendState::Bullish),
            count(TrendState::Bearish),
            count(TrendState::Neutral),
        );
        let total = votes.len();
        let share = |n: usize| n as f64 / total as f64;

        let (trend, strength) = if bull == total {
            (TrendState::Bullish, 1.0)
        } else if bear == total {
            (TrendState::Bearish, 1.0)
        } else if bull > bear && bull > neutral {
            (TrendState::Bullish, share(bull))
        } else if bear > bull && bear > neutral {
            (TrendState::Bearish, share(bear))
        } else {
            (TrendState::Neutral, 0.5)
        };
        Some(Self {
            trend,
            strength,
            votes,
        })
    }

    pub fn is_bearish(&self, min_strength: f64) -> bool {
        self.trend == TrendState::Bearish && self.strength >= min_strength
    }
}

/// Trend of the last bar: above a rising MA stack is bullish, below a
/// falling one bearish. With fewer than 50 bars only the 20-period MA is
/// used. `None` below [`MIN_TIMEFRAME_BARS`].
pub fn timeframe_trend(bars: &[Bar]) -> Option<TrendState> {
    if bars.len() < MIN_TIMEFRAME_BARS {
        return None;
    }
    let last = bars.len() - 1;
    let price = bars[last].close;
    let short = Sma::new(SHORT_MA).compute(bars)[last];
    let long = (bars.len() >= LONG_MA).then(|| Sma::new(LONG_MA).compute(bars)[last]);

    let trend = match long {
        Some(long) if price > short && short > long => TrendState::Bullish,
        Some(long) if price < short && short < long => TrendState::Bearish,
        Some(_) => TrendState::Neutral,
        None if price > short => TrendState::Bullish,
        None if price < short => TrendState::Bearish,
        None => TrendState::Neutral,
    };
    Some(trend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn falling(n: usize) -> Vec<Bar> {
        let closes: Vec<f64> = (0..n).map(|i| 500.0 - i as f64).collect();
        make_bars(&closes)
    }

    #[test]
    fn short_history_does_not_vote() {
        assert_eq!(timeframe_trend(&falling(19)), None);
        assert_eq!(TimeframeAlignment::analyze(&falling(19)), None);
    }

    #[test]
    fn steady_decline_is_bearish_on_every_timeframe() {
        // Two years of daily bars gives 20+ monthly bars.
        let bars = falling(700);
        let alignment = TimeframeAlignment::analyze(&bars).unwrap();
        let timeframes: Vec<_> = alignment.votes.iter().map(|(tf, _)| *tf).collect();
        assert_eq!(timeframes, vec![Timeframe::Daily, Timeframe::Weekly, Timeframe::Monthly]);
        assert_eq!(alignment.trend, TrendState::Bearish);
        assert_eq!(alignment.strength, 1.0);
        assert!(alignment.is_bearish(0.8));
    }

    #[test]
    fn only_daily_votes_on_a_few_months() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let alignment = TimeframeAlignment::analyze(&make_bars(&closes)).unwrap();
        assert_eq!(alignment.votes, vec![(Timeframe::Daily, TrendState::Bullish)]);
        assert!(!alignment.is_bearish(0.8));
    }

    #[test]
    fn majority_and_split_votes() {
        let two_of_three = TimeframeAlignment::from_votes(vec![
            (Timeframe::Daily, TrendState::Bullish),
            (Timeframe::Weekly, TrendState::Bearish),
            (Timeframe::Monthly, TrendState::Bearish),
        ])
        .unwrap();
        assert_eq!(two_of_three.trend, TrendState::Bearish);
        assert!((two_of_three.strength - 2.0 / 3.0).abs() < 1e-12);
        assert!(!two_of_three.is_bearish(0.8));

        let split = TimeframeAlignment::from_votes(vec![
            (Timeframe::Daily, TrendState::Bullish),
            (Timeframe::Weekly, TrendState::Bearish),
        ])
        .unwrap();
        assert_eq!(split.trend, TrendState::Neutral);
        assert_eq!(split.strength, 0.5);

        let flat = TimeframeAlignment::from_votes(vec![(Timeframe::Daily, TrendState::Neutral)]).unwrap();
        assert_eq!(flat.trend, TrendState::Neutral);
        assert_eq!(flat.strength, 0.5);
        assert_eq!(TimeframeAlignment::from_votes(vec![]), None);
    }
}
