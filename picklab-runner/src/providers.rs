//! In-process collaborator implementations.
//!
//! Fetching from real market-data or news services is out of scope; these
//! implementations serve tests, benches and callers that already hold bars
//! in memory.

use std::collections::HashMap;

use chrono::NaiveDate;
use picklab_core::collaborators::{
    DateRange, PriceHistoryProvider, ProviderError, RegimeProvider, SentimentProvider, Timeframe,
};
use picklab_core::domain::{Bar, Regime, SentimentReading};
use picklab_core::indicators::resample;

pub use picklab_core::collaborators::MemoryStore;

/// Price history held in memory, keyed by symbol and timeframe.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPrices {
    series: HashMap<(String, Timeframe), Vec<Bar>>,
}

impl InMemoryPrices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds daily bars for `symbol`, sorting them by timestamp.
    pub fn with_daily(self, symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        self.with_series(symbol, Timeframe::Daily, bars)
    }

    pub fn with_series(mut self, symbol: impl Into<String>, timeframe: Timeframe, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        self.series.insert((symbol.into(), timeframe), bars);
        self
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.series.keys().map(|(s, _)| s.clone()).collect();
        symbols.sort();
        symbols.dedup();
        symbols
    }
}

impl PriceHistoryProvider for InMemoryPrices {
    /// Weekly and monthly requests without a stored series are resampled
    /// from the daily one.
    fn get_bars(&self, symbol: &str, timeframe: Timeframe, range: DateRange) -> Result<Vec<Bar>, ProviderError> {
        let in_range = |bars: &Vec<Bar>| -> Vec<Bar> {
            bars.iter()
                .filter(|b| range.contains(b.date()))
                .cloned()
                .collect()
        };
        if let Some(bars) = self.series.get(&(symbol.to_string(), timeframe)) {
            return Ok(in_range(bars));
        }
        match timeframe {
            Timeframe::Weekly | Timeframe::Monthly => self
                .series
                .get(&(symbol.to_string(), Timeframe::Daily))
                .map(|daily| resample(&in_range(daily), timeframe))
                .ok_or_else(|| ProviderError::SymbolNotFound(symbol.to_string())),
            Timeframe::Intraday5m | Timeframe::Daily => Err(ProviderError::SymbolNotFound(symbol.to_string())),
        }
    }
}

/// The same regime for every date.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedRegime(pub Regime);

impl RegimeProvider for FixedRegime {
    fn get_regime(&self, _as_of: NaiveDate) -> Regime {
        self.0
    }
}

/// Regime looked up by date, falling back to the latest earlier entry.
#[derive(Debug, Clone, Default)]
pub struct RegimeCalendar {
    entries: Vec<(NaiveDate, Regime)>,
    fallback: Regime,
}

impl RegimeCalendar {
    pub fn new(fallback: Regime) -> Self {
        Self {
            entries: Vec::new(),
            fallback,
        }
    }

    /// Regime in force from `from` until the next entry.
    pub fn with_entry(mut self, from: NaiveDate, regime: Regime) -> Self {
        let at = self.entries.partition_point(|(d, _)| *d <= from);
        self.entries.insert(at, (from, regime));
        self
    }
}

impl RegimeProvider for RegimeCalendar {
    fn get_regime(&self, as_of: NaiveDate) -> Regime {
        let at = self.entries.partition_point(|(d, _)| *d <= as_of);
        at.checked_sub(1)
            .map_or(self.fallback, |i| self.entries[i].1)
    }
}

/// Fixed sentiment readings per symbol. Unknown symbols have no reading.
#[derive(Debug, Clone, Default)]
pub struct StaticSentiment {
    readings: HashMap<String, SentimentReading>,
}

impl StaticSentiment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, symbol: impl Into<String>, reading: SentimentReading) -> Self {
        self.readings.insert(symbol.into(), reading);
        self
    }
}

impl SentimentProvider for StaticSentiment {
    fn get_sentiment(&self, symbol: &str) -> Option<SentimentReading> {
        self.readings.get(symbol).copied()
    }
}
