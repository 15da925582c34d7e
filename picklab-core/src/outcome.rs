//! Trade outcome model.
//!
//! Walks the bars after entry and decides how a long trade ended. The same
//! function settles backtest trades and live picks, so both are judged by
//! identical rules:
//!
//! - excursions (MFE/MAE) are updated first from each bar's high and low;
//! - the stop is checked before the target, so a bar that touches both
//!   counts as a stop (the conservative reading);
//! - a bar that opens below the stop fills at the open, not the stop;
//! - when the horizon runs out the trade closes at the last in-horizon close;
//! - when the bars run out first the trade closes with `EndOfData`.

use chrono::NaiveDateTime;

use crate::domain::{Bar, ExitReason, Horizon, SimulatedTrade, StrategyKind, TradePlan};
use crate::error::CoreError;

/// Settle a long trade entered at `plan.entry()` on the bar stamped
/// `entry_timestamp`. `bars_after` starts with the first bar after entry.
pub fn simulate_trade(
    symbol: &str,
    strategy: StrategyKind,
    entry_timestamp: NaiveDateTime,
    plan: &TradePlan,
    bars_after: &[Bar],
) -> Result<SimulatedTrade, CoreError> {
    let first = bars_after
        .first()
        .ok_or_else(|| CoreError::insufficient(symbol, 1, 0))?;

    let entry = plan.entry();
    let stop = plan.stop();
    let target = plan.primary_target();
    let horizon = plan.horizon();

    let close = |bar: &Bar, price: f64, reason: ExitReason, held: usize, high: f64, low: f64| SimulatedTrade {
        symbol: symbol.to_string(),
        strategy,
        entry_timestamp,
        exit_timestamp: bar.timestamp,
        entry_price: entry,
        exit_price: price,
        exit_reason: reason,
        return_pct: (price - entry) / entry,
        mfe: ((high - entry) / entry).max(0.0),
        mae: ((low - entry) / entry).min(0.0),
        bars_held: held,
    };

    // Next bar already past a calendar horizon: out at its open.
    if !horizon.contains(entry_timestamp, 1, first.timestamp) {
        return Ok(close(
            first,
            first.open,
            ExitReason::HorizonExpiry,
            1,
            first.open,
            first.open,
        ));
    }

    let mut high = entry;
    let mut low = entry;
    let mut last = first;
    let mut held = 0;

    for (i, bar) in bars_after.iter().enumerate() {
        if !horizon.contains(entry_timestamp, i + 1, bar.timestamp) {
            return Ok(close(last, last.close, ExitReason::HorizonExpiry, held, high, low));
        }
        held = i + 1;
        last = bar;
        high = high.max(bar.high);
        low = low.min(bar.low);

        if bar.low <= stop {
            return Ok(close(bar, bar.open.min(stop), ExitReason::Stop, held, high, low));
        }
        if bar.high >= target {
            return Ok(close(bar, target, ExitReason::Target, held, high, low));
        }
    }

    let reason = match horizon {
        Horizon::Bars(n) if held >= n => ExitReason::HorizonExpiry,
        _ => ExitReason::EndOfData,
    };
    Ok(close(last, last.close, reason, held, high, low))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RiskLabel;
    use chrono::{Duration, NaiveDate};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, 1)
            .unwrap()
            .and_hms_opt(16, 0, 0)
            .unwrap()
    }

    fn bar(day: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: t0() + Duration::days(day),
            open,
            high,
            low,
            close,
            volume: 1_000,
        }
    }

    fn plan(horizon: Horizon) -> TradePlan {
        TradePlan::new(100.0, 95.0, vec![110.0], horizon, RiskLabel::Medium).unwrap()
    }

    fn run(horizon: Horizon, bars: &[Bar]) -> SimulatedTrade {
        simulate_trade("ABC", StrategyKind::MomentumSwing, t0(), &plan(horizon), bars).unwrap()
    }

    #[test]
    fn stop_hit() {
        let bars = [bar(1, 100.0, 101.0, 98.0, 99.0), bar(2, 99.0, 99.5, 94.0, 95.5)];
        let trade = run(Horizon::Bars(10), &bars);
        assert_eq!(trade.exit_reason, ExitReason::Stop);
        assert_eq!(trade.exit_price, 95.0);
        assert_eq!(trade.bars_held, 2);
        assert!((trade.return_pct + 0.05).abs() < 1e-12);
        assert!((trade.mfe - 0.01).abs() < 1e-12);
        assert!((trade.mae + 0.06).abs() < 1e-12);
    }

    #[test]
    fn gap_through_stop_fills_at_open() {
        let bars = [bar(1, 92.0, 93.0, 91.0, 92.5)];
        let trade = run(Horizon::Bars(10), &bars);
        assert_eq!(trade.exit_reason, ExitReason::Stop);
        assert_eq!(trade.exit_price, 92.0);
    }

    #[test]
    fn target_hit() {
        let bars = [bar(1, 101.0, 104.0, 100.5, 103.0), bar(2, 103.0, 111.0, 102.0, 109.0)];
        let trade = run(Horizon::Bars(10), &bars);
        assert_eq!(trade.exit_reason, ExitReason::Target);
        assert_eq!(trade.exit_price, 110.0);
        assert!(trade.hit_target());
        assert!((trade.return_pct - 0.10).abs() < 1e-12);
    }

    #[test]
    fn same_bar_touch_counts_as_stop() {
        let bars = [bar(1, 100.0, 112.0, 94.0, 105.0)];
        let trade = run(Horizon::Bars(10), &bars);
        assert_eq!(trade.exit_reason, ExitReason::Stop);
        assert_eq!(trade.exit_price, 95.0);
    }

    #[test]
    fn horizon_expiry_closes_at_last_close() {
        let bars: Vec<Bar> = (1..=5).map(|d| bar(d, 100.0, 101.0, 99.0, 100.0 + d as f64 * 0.1)).collect();
        let trade = run(Horizon::Bars(3), &bars);
        assert_eq!(trade.exit_reason, ExitReason::HorizonExpiry);
        assert_eq!(trade.bars_held, 3);
        assert_eq!(trade.exit_timestamp, bars[2].timestamp);
        assert!((trade.exit_price - 100.3).abs() < 1e-12);

        // Exactly the horizon's worth of bars still counts as expiry.
        let trade = run(Horizon::Bars(5), &bars);
        assert_eq!(trade.exit_reason, ExitReason::HorizonExpiry);
    }

    #[test]
    fn data_runs_out_first() {
        let bars = [bar(1, 100.0, 101.0, 99.0, 100.5), bar(2, 100.5, 101.0, 99.5, 100.8)];
        let trade = run(Horizon::Bars(10), &bars);
        assert_eq!(trade.exit_reason, ExitReason::EndOfData);
        assert_eq!(trade.exit_price, 100.8);
    }

    #[test]
    fn calendar_horizon() {
        let bars: Vec<Bar> = (1..=4).map(|d| bar(d, 100.0, 101.0, 99.0, 100.0 + d as f64)).collect();
        let trade = run(Horizon::Days(2), &bars);
        assert_eq!(trade.exit_reason, ExitReason::HorizonExpiry);
        assert_eq!(trade.exit_timestamp, bars[1].timestamp);

        // Weekend gap: the first bar is already past a one-day horizon.
        let monday = [bar(3, 100.4, 101.0, 99.0, 100.6)];
        let trade = run(Horizon::Days(1), &monday);
        assert_eq!(trade.exit_reason, ExitReason::HorizonExpiry);
        assert_eq!(trade.exit_price, 100.4);
        assert_eq!(trade.bars_held, 1);
    }

    #[test]
    fn no_bars_is_insufficient_data() {
        let err = simulate_trade("ABC", StrategyKind::Orb, t0(), &plan(Horizon::Bars(3)), &[]).unwrap_err();
        assert_eq!(err, CoreError::insufficient("ABC", 1, 0));
    }
}
