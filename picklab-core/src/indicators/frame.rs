//! Precomputed indicator frame for one symbol.
//!
//! Every series is computed once over the whole bar history; entry rules
//! and snapshot construction then read rows by index. Since each indicator
//! only looks backward, reading row `i` never sees bars after `i`.

use serde::{Deserialize, Serialize};

use super::{
    AvgVolume, Atr, EfficiencyRatio, HighestHigh, Indicator, LowestLow, Roc, Rsi, Sma,
    VolatilityPercentile, Vwap,
};
use crate::domain::Bar;

/// Indicator periods. Defaults follow daily-bar conventions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorPeriods {
    pub ma_short: usize,
    pub ma_long: usize,
    pub rsi: usize,
    pub atr: usize,
    pub roc_short: usize,
    pub roc_long: usize,
    pub vwap: usize,
    pub volatility_window: usize,
    pub volatility_lookback: usize,
    pub efficiency: usize,
    pub range: usize,
    pub avg_volume: usize,
}

impl Default for IndicatorPeriods {
    fn default() -> Self {
        Self {
            ma_short: 20,
            ma_long: 50,
            rsi: 14,
            atr: 14,
            roc_short: 5,
            roc_long: 10,
            vwap: 20,
            volatility_window: 20,
            volatility_lookback: 60,
            efficiency: 20,
            range: 20,
            avg_volume: 20,
        }
    }
}

impl IndicatorPeriods {
    /// Every period must be at least one bar.
    pub fn validate(&self) -> Result<(), String> {
        let periods = [
            ("ma_short", self.ma_short),
            ("ma_long", self.ma_long),
            ("rsi", self.rsi),
            ("atr", self.atr),
            ("roc_short", self.roc_short),
            ("roc_long", self.roc_long),
            ("vwap", self.vwap),
            ("volatility_window", self.volatility_window),
            ("volatility_lookback", self.volatility_lookback),
            ("efficiency", self.efficiency),
            ("range", self.range),
            ("avg_volume", self.avg_volume),
        ];
        for (name, p) in periods {
            if p == 0 {
                return Err(format!("indicator period '{name}' must be >= 1"));
            }
        }
        if self.ma_short >= self.ma_long {
            return Err(format!(
                "ma_short ({}) must be shorter than ma_long ({})",
                self.ma_short, self.ma_long
            ));
        }
        Ok(())
    }
}

/// One bar's indicator readings. `None` where the series is still warming up.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndicatorRow {
    pub ma_short: Option<f64>,
    pub ma_long: Option<f64>,
    pub rsi: Option<f64>,
    pub atr: Option<f64>,
    pub roc_short: Option<f64>,
    pub roc_long: Option<f64>,
    pub vwap: Option<f64>,
    pub volatility_percentile: Option<f64>,
    pub efficiency: Option<f64>,
    pub range_high: Option<f64>,
    pub range_low: Option<f64>,
    pub avg_volume: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    ma_short: Vec<f64>,
    ma_long: Vec<f64>,
    rsi: Vec<f64>,
    atr: Vec<f64>,
    roc_short: Vec<f64>,
    roc_long: Vec<f64>,
    vwap: Vec<f64>,
    volatility_percentile: Vec<f64>,
    efficiency: Vec<f64>,
    range_high: Vec<f64>,
    range_low: Vec<f64>,
    avg_volume: Vec<f64>,
    warmup: usize,
}

impl IndicatorFrame {
    pub fn compute(bars: &[Bar], periods: &IndicatorPeriods) -> Self {
        let sma_short = Sma::new(periods.ma_short);
        let sma_long = Sma::new(periods.ma_long);
        let rsi = Rsi::new(periods.rsi);
        let atr = Atr::new(periods.atr);
        let roc_short = Roc::new(periods.roc_short);
        let roc_long = Roc::new(periods.roc_long);
        let vwap = Vwap::new(periods.vwap);
        let vol_pct = VolatilityPercentile::new(periods.volatility_window, periods.volatility_lookback);
        let efficiency = EfficiencyRatio::new(periods.efficiency);
        let range_high = HighestHigh::new(periods.range);
        let range_low = LowestLow::new(periods.range);
        let avg_volume = AvgVolume::new(periods.avg_volume);

        let indicators: [&dyn Indicator; 12] = [
            &sma_short,
            &sma_long,
            &rsi,
            &atr,
            &roc_short,
            &roc_long,
            &vwap,
            &vol_pct,
            &efficiency,
            &range_high,
            &range_low,
            &avg_volume,
        ];
        let warmup = indicators.iter().map(|ind| ind.lookback()).max().unwrap_or(0);

        Self {
            ma_short: sma_short.compute(bars),
            ma_long: sma_long.compute(bars),
            rsi: rsi.compute(bars),
            atr: atr.compute(bars),
            roc_short: roc_short.compute(bars),
            roc_long: roc_long.compute(bars),
            vwap: vwap.compute(bars),
            volatility_percentile: vol_pct.compute(bars),
            efficiency: efficiency.compute(bars),
            range_high: range_high.compute(bars),
            range_low: range_low.compute(bars),
            avg_volume: avg_volume.compute(bars),
            warmup,
        }
    }

    /// First index at which every series is valid (given clean bars).
    pub fn warmup(&self) -> usize {
        self.warmup
    }

    pub fn len(&self) -> usize {
        self.ma_short.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ma_short.is_empty()
    }

    pub fn row(&self, i: usize) -> IndicatorRow {
        let at = |series: &[f64]| series.get(i).copied().filter(|v| v.is_finite());
        IndicatorRow {
            ma_short: at(&self.ma_short),
            ma_long: at(&self.ma_long),
            rsi: at(&self.rsi),
            atr: at(&self.atr),
            roc_short: at(&self.roc_short),
            roc_long: at(&self.roc_long),
            vwap: at(&self.vwap),
            volatility_percentile: at(&self.volatility_percentile),
            efficiency: at(&self.efficiency),
            range_high: at(&self.range_high),
            range_low: at(&self.range_low),
            avg_volume: at(&self.avg_volume),
        }
    }
}
