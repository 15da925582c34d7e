//! Interfaces to the outside world.
//!
//! The core never performs I/O itself. Price history, sentiment, market
//! regime and persistence arrive through these traits, so the scorer,
//! outcome model and learning store stay pure and testable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::domain::{Bar, Regime, SentimentReading};

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("price provider unavailable: {0}")]
    Unavailable(String),

    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("provider error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store backend error: {0}")]
    Backend(String),
}

// ── Request types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Intraday5m,
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeframe::Intraday5m => f.write_str("5m"),
            Timeframe::Daily => f.write_str("1d"),
            Timeframe::Weekly => f.write_str("1wk"),
            Timeframe::Monthly => f.write_str("1mo"),
        }
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

// ── Traits ──────────────────────────────────────────────────────────

/// Source of OHLCV history, sorted ascending by timestamp.
pub trait PriceHistoryProvider: Send + Sync {
    fn get_bars(&self, symbol: &str, timeframe: Timeframe, range: DateRange) -> Result<Vec<Bar>, ProviderError>;
}

/// Optional news sentiment. `None` means no reading, which scores neutral.
pub trait SentimentProvider: Send + Sync {
    fn get_sentiment(&self, symbol: &str) -> Option<SentimentReading>;
}

pub trait RegimeProvider: Send + Sync {
    fn get_regime(&self, as_of: NaiveDate) -> Regime;
}

/// String key/value persistence for learning state.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn put(&mut self, key: &str, value: String) -> Result<(), StoreError>;

    /// Keys starting with `prefix`, sorted.
    fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// In-memory key/value store, for tests and short-lived sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}
