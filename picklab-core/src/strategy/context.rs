//! What an entry rule may look at, and how a fired rule becomes a snapshot.

use crate::domain::{
    Bar, EntrySetup, LiquidityInputs, MomentumInputs, Regime, RiskInputs, SentimentReading,
    SignalSnapshot, TrendInputs, VolatilityInputs, VolumeInputs,
};
use crate::indicators::{IndicatorFrame, IndicatorRow};

use super::StrategyParams;

/// Bars in each half of the recent-vs-prior volume comparison.
const VOLUME_TREND_BARS: usize = 5;

/// History up to and including one bar, plus its indicator rows.
///
/// `history` ends at the evaluated bar, so a rule cannot read future bars
/// even by accident.
#[derive(Debug, Clone, Copy)]
pub struct EntryContext<'a> {
    pub symbol: &'a str,
    history: &'a [Bar],
    frame: &'a IndicatorFrame,
    pub params: &'a StrategyParams,
    pub sentiment: Option<SentimentReading>,
    pub min_avg_volume: f64,
}

impl<'a> EntryContext<'a> {
    /// Context for bar `index` of `bars`. Returns `None` when `index` is out
    /// of range.
    pub fn new(
        symbol: &'a str,
        bars: &'a [Bar],
        index: usize,
        frame: &'a IndicatorFrame,
        params: &'a StrategyParams,
    ) -> Option<Self> {
        let history = bars.get(..=index)?;
        Some(Self {
            symbol,
            history,
            frame,
            params,
            sentiment: None,
            min_avg_volume: 0.0,
        })
    }

    pub fn with_sentiment(mut self, sentiment: Option<SentimentReading>) -> Self {
        self.sentiment = sentiment;
        self
    }

    pub fn with_min_avg_volume(mut self, min_avg_volume: f64) -> Self {
        self.min_avg_volume = min_avg_volume;
        self
    }

    pub fn index(&self) -> usize {
        self.history.len() - 1
    }

    /// The evaluated bar.
    pub fn bar(&self) -> &'a Bar {
        &self.history[self.history.len() - 1]
    }

    pub fn history(&self) -> &'a [Bar] {
        self.history
    }

    pub fn row(&self) -> IndicatorRow {
        self.frame.row(self.index())
    }

    /// Indicator row of the previous bar, if any.
    pub fn prev_row(&self) -> Option<IndicatorRow> {
        self.index().checked_sub(1).map(|i| self.frame.row(i))
    }

    /// Mean volume of the last `n` bars ending at the evaluated bar.
    pub fn mean_volume(&self, n: usize) -> Option<f64> {
        mean_volume(self.history, n)
    }

    /// Trailing bars sharing the evaluated bar's calendar date.
    ///
    /// For daily data this is a single bar.
    pub fn session(&self) -> &'a [Bar] {
        let date = self.bar().date();
        let start = self
            .history
            .iter()
            .rposition(|b| b.date() != date)
            .map_or(0, |p| p + 1);
        &self.history[start..]
    }

    /// Percent by which `close` clears the previous bar's range high.
    pub fn breakout_pct(&self) -> Option<f64> {
        let prior_high = self.prev_row()?.range_high?;
        (prior_high > 0.0).then(|| (self.bar().close - prior_high) / prior_high * 100.0)
    }

    /// Freezes the context into the scoring input for `setup`.
    pub fn snapshot(&self, setup: EntrySetup, regime: Regime) -> SignalSnapshot {
        let bar = self.bar();
        let row = self.row();
        let n = self.history.len();
        let prior_average = n
            .checked_sub(VOLUME_TREND_BARS)
            .and_then(|end| mean_volume(&self.history[..end], VOLUME_TREND_BARS));

        SignalSnapshot {
            symbol: self.symbol.to_string(),
            timestamp: bar.timestamp,
            price: bar.close,
            regime,
            trend: TrendInputs {
                ma_short: row.ma_short,
                ma_long: row.ma_long,
                efficiency_ratio: row.efficiency,
            },
            momentum: MomentumInputs {
                roc_short: row.roc_short,
                roc_long: row.roc_long,
                rsi: row.rsi,
                breakout_pct: self.breakout_pct(),
            },
            volume: VolumeInputs {
                current: Some(bar.volume as f64),
                average: row.avg_volume,
                recent_average: self.mean_volume(VOLUME_TREND_BARS),
                prior_average,
                surge: setup.volume_surge,
            },
            volatility: VolatilityInputs {
                percentile: row.volatility_percentile,
                atr: row.atr,
            },
            sentiment: self.sentiment,
            liquidity: LiquidityInputs {
                avg_volume: row.avg_volume,
                min_avg_volume: self.min_avg_volume,
            },
            risk: RiskInputs {
                recent_high: row.range_high,
            },
            vwap: row.vwap,
            setup,
        }
    }
}

fn mean_volume(bars: &[Bar], n: usize) -> Option<f64> {
    if n == 0 || bars.len() < n {
        return None;
    }
    let tail = &bars[bars.len() - n..];
    Some(tail.iter().map(|b| b.volume as f64).sum::<f64>() / n as f64)
}
