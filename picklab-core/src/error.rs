//! Core error taxonomy.
//!
//! None of these abort a batch: callers catch them at the symbol boundary and
//! record them in the report.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Not enough history to compute an indicator, a snapshot or an outcome.
    #[error("insufficient data for {symbol}: need {needed} bars, have {available}")]
    InsufficientData {
        symbol: String,
        needed: usize,
        available: usize,
    },

    /// Stop/entry/target ordering violated. The pick must be rejected.
    #[error("invalid trade plan: {0}")]
    InvalidTradePlan(String),

    /// Learning state older than the configured freshness bound.
    #[error("learning state is stale: {age_days} days old (bound {bound_days})")]
    StaleLearningState { age_days: i64, bound_days: i64 },
}

impl CoreError {
    pub fn insufficient(symbol: impl Into<String>, needed: usize, available: usize) -> Self {
        CoreError::InsufficientData {
            symbol: symbol.into(),
            needed,
            available,
        }
    }
}
