//! VWAP trend pullback: price returns to within a hair of VWAP while the
//! moving averages still point up.

use crate::domain::{EntrySetup, StrategyKind};

use super::EntryContext;

/// Trailing bars averaged for the volume-surge flag.
const SURGE_BARS: usize = 10;

/// ATR stand-in, as a fraction of price, when ATR is unavailable.
const FALLBACK_ATR_FRACTION: f64 = 0.02;

pub fn evaluate(ctx: &EntryContext<'_>) -> Option<EntrySetup> {
    let p = &ctx.params.vwap_pullback;
    let row = ctx.row();
    let vwap = row.vwap.filter(|v| *v > 0.0)?;
    let close = ctx.bar().close;

    let near = (close - vwap).abs() / vwap < p.max_distance;
    let above = close > vwap * p.floor_ratio;
    let uptrend = matches!((row.ma_short, row.ma_long), (Some(s), Some(l)) if s > l);
    if !(near && above && uptrend) {
        return None;
    }

    let atr = row
        .atr
        .filter(|a| *a > 0.0)
        .unwrap_or(close * FALLBACK_ATR_FRACTION);
    let surge = match (ctx.mean_volume(SURGE_BARS.min(ctx.history().len())), row.avg_volume) {
        (Some(recent), Some(avg)) => recent > avg * p.volume_surge_ratio,
        _ => false,
    };

    Some(EntrySetup {
        strategy: StrategyKind::VwapPullback,
        entry: close,
        stop: vwap - p.stop_atr * atr,
        targets: vec![close + p.target_atr * atr],
        volume_surge: surge,
    })
}
