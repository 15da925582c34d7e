//! High-volatility breakout.
//!
//! Opt-in and always labelled high risk: volatility in the top decile,
//! price pressing the range high, and a short burst of heavy volume.

use crate::domain::{EntrySetup, StrategyKind};

use super::EntryContext;

pub fn evaluate(ctx: &EntryContext<'_>) -> Option<EntrySetup> {
    let p = &ctx.params.hvb;
    let row = ctx.row();
    let bar = ctx.bar();

    let percentile = row.volatility_percentile?;
    if percentile < p.min_volatility_percentile {
        return None;
    }
    let range_high = row.range_high?;
    if bar.high < range_high * p.near_high_ratio {
        return None;
    }
    let avg_volume = row.avg_volume?;
    let recent_volume = ctx.mean_volume(p.surge_bars)?;
    if recent_volume <= avg_volume * p.volume_surge_ratio || avg_volume < ctx.min_avg_volume {
        return None;
    }
    let atr = row.atr.filter(|a| *a > 0.0)?;

    Some(EntrySetup {
        strategy: StrategyKind::HighVolatilityBreakout,
        entry: bar.close,
        stop: bar.close - p.stop_atr * atr,
        targets: vec![bar.close + p.target_atr * atr],
        volume_surge: true,
    })
}
