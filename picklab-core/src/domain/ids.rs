use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::strategy::StrategyKind;

/// Identifier of a published pick, used to attribute outcomes and feedback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PickId(pub String);

impl PickId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Deterministic id from what makes a pick unique.
    /// BLAKE3 keeps it stable across builds and platforms.
    pub fn derive(symbol: &str, strategy: StrategyKind, timestamp: NaiveDateTime) -> Self {
        let canonical = serde_json::json!({
            "strategy": strategy.tag(),
            "symbol": symbol,
            "timestamp": timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
        });
        let hash = blake3::hash(canonical.to_string().as_bytes());
        Self(hash.to_hex()[..16].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
