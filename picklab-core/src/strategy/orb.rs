//! Opening range breakout.
//!
//! The first `range_bars` bars of the session form the opening range. The
//! rule fires when price closes above the range high on a volume surge.
//! Daily bars never form a multi-bar session, so this only fires intraday.

use crate::domain::{EntrySetup, StrategyKind};

use super::EntryContext;

pub fn evaluate(ctx: &EntryContext<'_>) -> Option<EntrySetup> {
    let p = &ctx.params.orb;
    let session = ctx.session();
    if session.len() < p.min_session_bars.max(p.range_bars) {
        return None;
    }

    let opening = &session[..p.range_bars];
    let range_high = opening.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let range_low = opening.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let close = ctx.bar().close;

    let tail = &session[session.len() - p.surge_bars.min(session.len())..];
    let recent_volume = tail.iter().map(|b| b.volume as f64).sum::<f64>() / tail.len() as f64;
    let avg_volume = ctx.row().avg_volume?;
    let surge = recent_volume > avg_volume * p.volume_surge_ratio;

    if !(close > range_high && surge) {
        return None;
    }

    let atr = ctx
        .row()
        .atr
        .filter(|a| *a > 0.0)
        .unwrap_or(range_high - range_low);
    if atr <= 0.0 {
        return None;
    }

    Some(EntrySetup {
        strategy: StrategyKind::Orb,
        entry: close,
        stop: (range_high - p.stop_atr * atr).max(range_low),
        targets: vec![range_high + p.target_atr * atr],
        volume_surge: surge,
    })
}
