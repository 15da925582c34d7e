//! Aggregating bars into coarser timeframes.

use chrono::Datelike;

use crate::collaborators::Timeframe;
use crate::domain::Bar;

/// Groups consecutive bars into `timeframe` periods: daily by date, weekly
/// by ISO week, monthly by calendar month. Each aggregate is stamped with
/// its last bar, so it never reflects a bar that came after that stamp.
/// `Intraday5m` returns the input unchanged.
pub fn resample(bars: &[Bar], timeframe: Timeframe) -> Vec<Bar> {
    let key = |bar: &Bar| -> (i32, u32) {
        let date = bar.date();
        match timeframe {
            Timeframe::Intraday5m | Timeframe::Daily => (date.year(), date.ordinal()),
            Timeframe::Weekly => {
                let week = date.iso_week();
                (week.year(), week.week())
            }
            Timeframe::Monthly => (date.year(), date.month()),
        }
    };
    if timeframe == Timeframe::Intraday5m {
        return bars.to_vec();
    }

    let mut out = Vec::new();
    let mut current: Option<((i32, u32), Bar)> = None;
    for bar in bars {
        let k = key(bar);
        match current.as_mut() {
            Some((open_key, agg)) if *open_key == k => {
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                agg.volume = agg.volume.saturating_add(bar.volume);
                agg.timestamp = bar.timestamp;
            }
            _ => {
                if let Some((_, done)) = current.replace((k, bar.clone())) {
                    out.push(done);
                }
            }
        }
    }
    out.extend(current.map(|(_, bar)| bar));
    out
}
