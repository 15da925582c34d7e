//! Momentum swing: short MA above long MA with RSI in a healthy band.

use crate::domain::{EntrySetup, StrategyKind};

use super::EntryContext;

const RECENT_VOLUME_BARS: usize = 5;
const OLDER_VOLUME_BARS: usize = 15;
const FALLBACK_ATR_FRACTION: f64 = 0.02;

pub fn evaluate(ctx: &EntryContext<'_>) -> Option<EntrySetup> {
    let p = &ctx.params.momentum_swing;
    let row = ctx.row();
    let (ma_short, ma_long, rsi) = (row.ma_short?, row.ma_long?, row.rsi?);
    if !(ma_short > ma_long && rsi > p.rsi_min && rsi < p.rsi_max) {
        return None;
    }

    let close = ctx.bar().close;
    let atr = row
        .atr
        .filter(|a| *a > 0.0)
        .unwrap_or(close * FALLBACK_ATR_FRACTION);

    Some(EntrySetup {
        strategy: StrategyKind::MomentumSwing,
        entry: close,
        stop: ma_short - p.stop_atr * atr,
        targets: vec![close + p.target_atr * atr],
        volume_surge: volume_rising(ctx),
    })
}

/// Recent volume above the volume of the bars before it.
fn volume_rising(ctx: &EntryContext<'_>) -> bool {
    let history = ctx.history();
    let Some(recent) = ctx.mean_volume(RECENT_VOLUME_BARS) else {
        return false;
    };
    let end = history.len() - RECENT_VOLUME_BARS;
    let older = &history[end.saturating_sub(OLDER_VOLUME_BARS)..end];
    if older.is_empty() {
        return false;
    }
    let older_mean = older.iter().map(|b| b.volume as f64).sum::<f64>() / older.len() as f64;
    recent > older_mean
}
