//! Post-earnings drift: continuation after a positively received release.

use crate::domain::{EntrySetup, StrategyKind};

use super::EntryContext;

pub fn evaluate(ctx: &EntryContext<'_>) -> Option<EntrySetup> {
    let p = &ctx.params.earnings_drift;
    let sentiment = ctx.sentiment?;
    if !sentiment.earnings_detected || sentiment.polarity <= 0.0 {
        return None;
    }

    let history = ctx.history();
    if history.len() < p.drift_bars {
        return None;
    }
    let recent = &history[history.len() - p.drift_bars..];
    let first_close = recent[0].close;
    let close = ctx.bar().close;
    if first_close <= 0.0 {
        return None;
    }
    let move_pct = (close - first_close) / first_close * 100.0;
    if move_pct < p.min_move_pct {
        return None;
    }

    let row = ctx.row();
    if close < row.ma_short? {
        return None;
    }
    if row.rsi? > p.rsi_max {
        return None;
    }
    let atr = row.atr.filter(|a| *a > 0.0)?;

    let recent_low = recent.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let stop = (recent_low * p.recent_low_ratio).max(close - p.stop_atr * atr);
    let risk = close - stop;
    let target = (close + p.reward_multiple * risk).max(close * p.min_target_ratio);
    let surge = match (ctx.mean_volume(p.drift_bars), row.avg_volume) {
        (Some(recent), Some(avg)) => recent > avg * p.volume_surge_ratio,
        _ => false,
    };

    Some(EntrySetup {
        strategy: StrategyKind::EarningsDrift,
        entry: close,
        stop,
        targets: vec![target],
        volume_surge: surge,
    })
}
