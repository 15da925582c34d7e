//! Saving and restoring the learning store through a [`KeyValueStore`].
//!
//! Layout:
//!
//! ```text
//! learning/meta                    counts, biases, feedback summary
//! learning/bucket/{STRATEGY}/{trend} one rolling window
//! learning/penalty/{pattern}       decayed pattern evidence
//! learning/picks                   registered picks
//! ```
//!
//! All values are JSON. A meta record with a newer `schema_version` than
//! this build understands is rejected rather than misread.

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use super::config::LearningConfig;
use super::evidence::PatternEvidence;
use super::store::{FeedbackSummary, LearningError, LearningStore, RegisteredPick};
use super::window::RollingWindow;
use crate::collaborators::KeyValueStore;
use crate::domain::{StrategyKind, TrendState};
use crate::features::FeaturePattern;

pub const LEARNING_SCHEMA_VERSION: u32 = 1;

const META_KEY: &str = "learning/meta";
const BUCKET_PREFIX: &str = "learning/bucket/";
const PENALTY_PREFIX: &str = "learning/penalty/";
const PICKS_KEY: &str = "learning/picks";

fn default_schema_version() -> u32 {
    1
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredMeta {
    #[serde(default = "default_schema_version")]
    schema_version: u32,
    total_outcomes: usize,
    last_updated: Option<NaiveDateTime>,
    #[serde(default)]
    strategy_bias: BTreeMap<StrategyKind, f64>,
    #[serde(default)]
    pattern_bias: BTreeMap<FeaturePattern, f64>,
    #[serde(default)]
    feedback: FeedbackSummary,
}

fn bucket_key(strategy: StrategyKind, regime: TrendState) -> String {
    format!("{BUCKET_PREFIX}{}/{}", strategy.tag(), regime.as_str())
}

fn parse_bucket_key(key: &str) -> Option<(StrategyKind, TrendState)> {
    let rest = key.strip_prefix(BUCKET_PREFIX)?;
    let (strategy, trend) = rest.split_once('/')?;
    let strategy = strategy.parse().ok()?;
    let trend = TrendState::ALL.into_iter().find(|t| t.as_str() == trend)?;
    Some((strategy, trend))
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<String, LearningError> {
    serde_json::to_string(value).map_err(|source| LearningError::Corrupt {
        key: key.to_string(),
        source,
    })
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, LearningError> {
    serde_json::from_str(raw).map_err(|source| LearningError::Corrupt {
        key: key.to_string(),
        source,
    })
}

impl LearningStore {
    /// Writes the full learned state.
    pub fn save(&self, kv: &mut dyn KeyValueStore) -> Result<(), LearningError> {
        let meta = StoredMeta {
            schema_version: LEARNING_SCHEMA_VERSION,
            total_outcomes: self.total_outcomes,
            last_updated: self.last_updated,
            strategy_bias: self.strategy_bias.clone(),
            pattern_bias: self.pattern_bias.clone(),
            feedback: self.feedback.clone(),
        };
        kv.put(META_KEY, encode(META_KEY, &meta)?)?;

        for (&(strategy, regime), window) in &self.buckets {
            let key = bucket_key(strategy, regime);
            kv.put(&key, encode(&key, window)?)?;
        }
        for (pattern, evidence) in &self.evidence {
            let key = format!("{PENALTY_PREFIX}{}", pattern.id());
            kv.put(&key, encode(&key, evidence)?)?;
        }
        kv.put(PICKS_KEY, encode(PICKS_KEY, &self.picks)?)?;

        tracing::debug!(
            buckets = self.buckets.len(),
            patterns = self.evidence.len(),
            picks = self.picks.len(),
            "learning state saved"
        );
        Ok(())
    }

    /// Restores state saved by [`LearningStore::save`]. An empty store
    /// yields a fresh cold-start store.
    pub fn load(config: LearningConfig, kv: &dyn KeyValueStore) -> Result<Self, LearningError> {
        let mut store = LearningStore::new(config)?;
        let Some(raw) = kv.get(META_KEY)? else {
            return Ok(store);
        };
        let meta: StoredMeta = decode(META_KEY, &raw)?;
        if meta.schema_version > LEARNING_SCHEMA_VERSION {
            return Err(LearningError::SchemaVersion {
                found: meta.schema_version,
                supported: LEARNING_SCHEMA_VERSION,
            });
        }
        store.total_outcomes = meta.total_outcomes;
        store.last_updated = meta.last_updated;
        store.strategy_bias = meta.strategy_bias;
        store.pattern_bias = meta.pattern_bias;
        store.feedback = meta.feedback;

        for key in kv.keys(BUCKET_PREFIX)? {
            let Some(bucket) = parse_bucket_key(&key) else {
                tracing::warn!(key = %key, "ignoring unrecognized learning bucket key");
                continue;
            };
            if let Some(raw) = kv.get(&key)? {
                let stored: RollingWindow = decode(&key, &raw)?;
                // Window bounds come from the current config, not the file.
                let mut window =
                    RollingWindow::new(store.config.window_capacity, store.config.window_max_age_days);
                for entry in stored.entries() {
                    window.push(*entry);
                }
                store.buckets.insert(bucket, window);
            }
        }

        for key in kv.keys(PENALTY_PREFIX)? {
            let id = &key[PENALTY_PREFIX.len()..];
            let Ok(pattern) = id.parse::<FeaturePattern>() else {
                tracing::warn!(key = %key, "ignoring unrecognized pattern key");
                continue;
            };
            if let Some(raw) = kv.get(&key)? {
                let evidence: PatternEvidence = decode(&key, &raw)?;
                store.evidence.insert(pattern, evidence);
            }
        }

        if let Some(raw) = kv.get(PICKS_KEY)? {
            let picks: VecDeque<RegisteredPick> = decode(PICKS_KEY, &raw)?;
            store.picks = picks;
        }

        tracing::info!(
            outcomes = store.total_outcomes,
            phase = %store.phase(),
            "learning state loaded"
        );
        Ok(store)
    }
}
