//! Adaptive learning from realized outcomes and user feedback.
//!
//! Outcomes land in per-(strategy, trend) rolling windows and in decaying
//! per-pattern failure evidence. The scorer reads an immutable
//! [`LearningView`] and turns it into at most two capped adjustments.
//!
//! Trust in learned state is graduated by how many outcomes have been seen:
//! no adjustment below `cold_threshold`, a small cap until
//! `full_threshold`, the full cap afterwards.

pub mod config;
pub mod evidence;
pub mod persist;
pub mod store;
pub mod view;
pub mod window;

pub use config::{LearningConfig, LearningPhase};
pub use evidence::{FeaturePenalty, PatternEvidence};
pub use persist::LEARNING_SCHEMA_VERSION;
pub use store::{Feedback, FeedbackSummary, LearningError, LearningStore, OutcomeRecord, PickRecord};
pub use view::{LearningView, RawAdjustment};
pub use window::{RollingWindow, StrategyRegimeStat, WindowEntry};
