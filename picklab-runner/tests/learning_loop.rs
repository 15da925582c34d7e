//! Scan, settle, learn and persist: the feedback loop across restarts.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use picklab_core::collaborators::{DateRange, Timeframe};
use picklab_core::domain::{
    Bar, EntrySetup, ExitReason, LiquidityInputs, MomentumInputs, Regime, RiskInputs, SentimentReading,
    SignalSnapshot, StrategyKind, TrendInputs, TrendState, VolatilityInputs, VolumeInputs,
};
use picklab_core::indicators::IndicatorPeriods;
use picklab_core::learning::{LearningConfig, LearningError, LearningPhase, LearningStore, OutcomeRecord};
use picklab_core::risk::{ExposureState, RiskGate, RiskLimits};
use picklab_core::scoring::CompositeScorer;
use picklab_runner::export::export_picks_csv;
use picklab_runner::{
    settle_pick, InMemoryPrices, JsonFileStore, ScanCandidate, ScanConfig, Scanner, SettleError, StaticSentiment,
};

fn day(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::days(i as i64)
}

fn bars_from(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let open = if i == 0 { c } else { closes[i - 1] };
            Bar {
                timestamp: day(i),
                open,
                high: open.max(c) + 0.5,
                low: open.min(c) - 0.5,
                close: c,
                volume: 1_000_000,
            }
        })
        .collect()
}

const CLOSES: [f64; 15] = [
    100.0, 100.5, 101.0, 101.6, 101.3, 101.4, 101.2, 101.5, 101.1, 101.3, 101.4, 101.2, 101.5, 101.3, 101.4,
];

fn scanner() -> Scanner {
    let periods = IndicatorPeriods {
        ma_short: 2,
        ma_long: 3,
        rsi: 2,
        atr: 2,
        roc_short: 1,
        roc_long: 2,
        vwap: 2,
        volatility_window: 2,
        volatility_lookback: 2,
        efficiency: 2,
        range: 2,
        avg_volume: 2,
    };
    let gate = RiskGate::new(RiskLimits {
        max_volatility_percentile: 100.0,
        ..RiskLimits::default()
    });
    let config = ScanConfig {
        strategies: vec![StrategyKind::MomentumSwing],
        min_conviction: 0.0,
        ..ScanConfig::default()
    };
    Scanner::new(CompositeScorer::default(), periods, gate, config)
}

fn outcome(i: usize, return_pct: f64) -> OutcomeRecord {
    OutcomeRecord {
        strategy: StrategyKind::MomentumSwing,
        regime: TrendState::Bullish,
        patterns: Vec::new(),
        return_pct,
        hit_target: return_pct > 0.0,
        hit_stop: return_pct < 0.0,
        closed_at: day(i),
    }
}

fn snapshot(at: NaiveDateTime) -> SignalSnapshot {
    SignalSnapshot {
        symbol: "ABC".into(),
        timestamp: at,
        price: 100.0,
        regime: Regime::new(TrendState::Bullish, 40.0),
        trend: TrendInputs {
            ma_short: Some(101.0),
            ma_long: Some(99.0),
            efficiency_ratio: Some(0.6),
        },
        momentum: MomentumInputs {
            roc_short: Some(1.0),
            roc_long: Some(2.0),
            rsi: Some(58.0),
            breakout_pct: None,
        },
        volume: VolumeInputs::default(),
        volatility: VolatilityInputs {
            percentile: Some(40.0),
            atr: Some(2.0),
        },
        sentiment: None,
        liquidity: LiquidityInputs {
            avg_volume: Some(2_000_000.0),
            min_avg_volume: 100_000.0,
        },
        risk: RiskInputs::default(),
        vwap: Some(99.5),
        setup: EntrySetup {
            strategy: StrategyKind::MomentumSwing,
            entry: 100.0,
            stop: 97.0,
            targets: vec![106.0],
            volume_surge: false,
        },
    }
}

#[test]
fn scan_then_settle_feeds_learning() {
    let bars = bars_from(&CLOSES);
    let candidates = vec![ScanCandidate {
        symbol: "ABC".into(),
        bars: bars[..5].to_vec(),
        sentiment: None,
    }];
    let regime = Regime::new(TrendState::Bullish, 40.0);
    let report = scanner().scan(&candidates, regime, None, &ExposureState::default());

    assert!(report.blocked.is_none());
    assert_eq!(report.picks.len(), 1, "{report:?}");
    let pick = &report.picks[0];
    assert_eq!(pick.rank, 1);
    assert_eq!(pick.result.timestamp, day(4));
    assert!(pick.position_size > 0.0);

    let mut store = LearningStore::new(LearningConfig::default()).unwrap();
    report.register(&mut store);
    assert!(store.pick(&pick.id).is_some());

    let trade = settle_pick(&mut store, pick, &bars).unwrap();
    assert_eq!(trade.exit_reason, ExitReason::HorizonExpiry);
    assert_eq!(trade.exit_timestamp, day(14));
    assert_eq!(store.total_outcomes(), 1);

    let again = settle_pick(&mut store, pick, &bars).unwrap_err();
    assert!(matches!(again, SettleError::Learning(_)), "{again}");
    assert_eq!(store.total_outcomes(), 1);
}

#[test]
fn fetched_candidates_flow_into_a_scan() {
    let bars = bars_from(&CLOSES);
    let prices = InMemoryPrices::new()
        .with_daily("ABC", bars.clone())
        .with_daily("BAD", bars.clone());
    let sentiment = StaticSentiment::new().with("BAD", SentimentReading::new(-0.8, 0.9));
    let symbols = vec!["ABC".to_string(), "BAD".to_string(), "GONE".to_string()];
    let range = DateRange::new(day(0).date(), day(4).date());

    let (candidates, failed) =
        Scanner::fetch_candidates(&prices, Some(&sentiment), &symbols, Timeframe::Daily, range);
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].bars.len(), 5);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].symbol, "GONE");

    let report = scanner()
        .scan(&candidates, Regime::default(), None, &ExposureState::default())
        .with_failed(failed);
    assert_eq!(report.picks.len(), 1);
    assert_eq!(report.picks[0].result.symbol, "ABC");
    assert_eq!(report.skipped_count(), 1);
    assert!(report.skipped[0].reason.contains("negative news"));
    assert_eq!(report.failed_count(), 1);

    let csv = export_picks_csv(&report.picks).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("1,"));
    assert!(lines[1].contains(",ABC,MOMENTUM_SWING,"));
}

#[test]
fn settling_an_unregistered_pick_fails() {
    let bars = bars_from(&CLOSES);
    let candidates = vec![ScanCandidate {
        symbol: "ABC".into(),
        bars: bars[..5].to_vec(),
        sentiment: None,
    }];
    let report = scanner().scan(&candidates, Regime::default(), None, &ExposureState::default());
    let pick = report.picks.first().expect("one pick");

    let mut store = LearningStore::new(LearningConfig::default()).unwrap();
    let err = settle_pick(&mut store, pick, &bars).unwrap_err();
    assert!(matches!(err, SettleError::Learning(LearningError::UnknownPick(_))), "{err}");
}

#[test]
fn learning_state_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = LearningConfig::default();

    let mut store = LearningStore::new(config.clone()).unwrap();
    store.ingest((0..12).map(|i| outcome(i, if i % 3 == 0 { -0.02 } else { 0.03 })));
    assert_eq!(store.phase(), LearningPhase::Conservative);

    let mut kv = JsonFileStore::open(dir.path()).unwrap();
    store.save(&mut kv).unwrap();

    let reopened = JsonFileStore::open(dir.path()).unwrap();
    let restored = LearningStore::load(config, &reopened).unwrap();
    assert_eq!(restored.total_outcomes(), 12);
    assert_eq!(restored.phase(), LearningPhase::Conservative);
    assert_eq!(restored.last_updated(), Some(day(11)));
    assert_eq!(restored.snapshot(day(20)), store.snapshot(day(20)));
}

#[test]
fn empty_directory_loads_a_cold_store() {
    let dir = tempfile::tempdir().unwrap();
    let kv = JsonFileStore::open(dir.path()).unwrap();
    let store = LearningStore::load(LearningConfig::default(), &kv).unwrap();
    assert_eq!(store.total_outcomes(), 0);
    assert_eq!(store.phase(), LearningPhase::Cold);
}

#[test]
fn stale_learning_scores_cold() {
    let mut store = LearningStore::new(LearningConfig::default()).unwrap();
    store.ingest((0..15).map(|i| outcome(i, 0.05)));
    let scorer = CompositeScorer::default();

    let fresh_at = day(20);
    let fresh = scorer
        .score(&snapshot(fresh_at), Some(&store.snapshot(fresh_at)))
        .unwrap();
    assert_eq!(fresh.learning_phase, LearningPhase::Conservative);
    assert!(fresh.conviction >= fresh.base_score);

    let stale_at = day(150);
    let stale = scorer
        .score(&snapshot(stale_at), Some(&store.snapshot(stale_at)))
        .unwrap();
    assert_eq!(stale.learning_phase, LearningPhase::Cold);
    assert!(stale.adjustments.is_empty());
    assert_eq!(stale.conviction, stale.base_score);
}
