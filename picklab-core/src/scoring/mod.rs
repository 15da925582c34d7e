//! Scoring: seven dimension scores, weighted into a composite conviction.

pub mod alignment;
pub mod composite;
pub mod dimensions;
pub mod weights;

pub use alignment::{timeframe_trend, TimeframeAlignment, MIN_TIMEFRAME_BARS};
pub use composite::{Adjustment, AdjustmentSource, CompositeResult, CompositeScorer, ScoringConfig};
pub use dimensions::{score_dimensions, Dimension, DimensionScores, NEUTRAL};
pub use weights::ScoringWeights;

/// Snapshot with every input missing and a valid 100 / 95 / 110 setup.
#[cfg(test)]
pub(crate) fn test_snapshot(strategy: crate::domain::StrategyKind) -> crate::domain::SignalSnapshot {
    use crate::domain::{
        EntrySetup, LiquidityInputs, MomentumInputs, Regime, RiskInputs, SignalSnapshot,
        TrendInputs, VolatilityInputs, VolumeInputs,
    };

    SignalSnapshot {
        symbol: "TEST".into(),
        timestamp: chrono::NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(16, 0, 0)
            .unwrap(),
        price: 100.0,
        regime: Regime::default(),
        trend: TrendInputs::default(),
        momentum: MomentumInputs::default(),
        volume: VolumeInputs::default(),
        volatility: VolatilityInputs::default(),
        sentiment: None,
        liquidity: LiquidityInputs {
            avg_volume: None,
            min_avg_volume: 100_000.0,
        },
        risk: RiskInputs::default(),
        vwap: None,
        setup: EntrySetup {
            strategy,
            entry: 100.0,
            stop: 95.0,
            targets: vec![110.0],
            volume_surge: false,
        },
    }
}
