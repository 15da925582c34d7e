//! Domain types for PickLab

pub mod bar;
pub mod ids;
pub mod plan;
pub mod regime;
pub mod snapshot;
pub mod strategy;
pub mod trade;

pub use bar::Bar;
pub use ids::PickId;
pub use plan::{Horizon, RiskLabel, TradePlan};
pub use regime::{Regime, SentimentReading, TrendState};
pub use snapshot::{
    EntrySetup, LiquidityInputs, MomentumInputs, RiskInputs, SignalSnapshot, TrendInputs,
    VolatilityInputs, VolumeInputs,
};
pub use strategy::StrategyKind;
pub use trade::{ExitReason, SimulatedTrade};
