//! TOML configuration for the whole engine.
//!
//! Every section is optional; missing keys take the documented defaults.
//!
//! ```toml
//! [scoring]
//! learning_freshness_days = 14
//!
//! [learning]
//! full_threshold = 80
//!
//! [strategies.momentum_swing]
//! rsi_max = 65.0
//!
//! [risk]
//! budget = 1000.0
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use picklab_core::indicators::IndicatorPeriods;
use picklab_core::learning::LearningConfig;
use picklab_core::risk::{RiskGate, RiskLimits};
use picklab_core::scoring::{CompositeScorer, ScoringConfig};
use picklab_core::strategy::StrategyParams;

use crate::backtest::BacktestConfig;
use crate::scan::ScanConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid [{section}] config: {message}")]
    Invalid { section: &'static str, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickLabConfig {
    pub scoring: ScoringConfig,
    pub learning: LearningConfig,
    pub strategies: StrategyParams,
    pub indicators: IndicatorPeriods,
    pub risk: RiskLimits,
    pub backtest: BacktestConfig,
    pub scan: ScanConfig,
}

impl PickLabConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&'static str, Result<(), String>); 7] = [
            ("scoring", self.scoring.validate()),
            ("learning", self.learning.validate()),
            ("strategies", self.strategies.validate()),
            ("indicators", self.indicators.validate()),
            ("risk", self.risk.validate()),
            ("backtest", self.backtest.validate()),
            ("scan", self.scan.validate()),
        ];
        for (section, result) in checks {
            result.map_err(|message| ConfigError::Invalid { section, message })?;
        }
        Ok(())
    }

    pub fn scorer(&self) -> CompositeScorer {
        CompositeScorer::new(self.scoring.clone(), self.strategies.clone())
    }

    pub fn risk_gate(&self) -> RiskGate {
        RiskGate::new(self.risk.clone())
    }
}
