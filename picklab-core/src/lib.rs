//! PickLab Core: domain types, indicators, scoring, entry rules, trade
//! outcomes and adaptive learning.
//!
//! This crate holds everything that is pure computation:
//! - Domain types (bars, snapshots, trade plans, simulated trades)
//! - Indicators precomputed once per symbol into an `IndicatorFrame`
//! - Seven dimension scorers and the composite scorer with its adjustment log
//! - Strategy entry rules as a closed, tagged set
//! - The trade outcome model shared by backtests and live picks
//! - The adaptive learning store and the immutable view scorers read
//! - The risk gate and position sizing
//! - Collaborator traits for prices, sentiment, regime and key/value storage
//!
//! No I/O happens here. Fetching, persistence backends and orchestration
//! live in `picklab-runner`.

pub mod collaborators;
pub mod domain;
pub mod error;
pub mod features;
pub mod indicators;
pub mod learning;
pub mod outcome;
pub mod risk;
pub mod scoring;
pub mod strategy;

pub use error::CoreError;
pub use outcome::simulate_trade;
