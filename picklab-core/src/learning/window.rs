//! Fixed-capacity rolling window of outcomes for one (strategy, regime) bucket.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowEntry {
    pub closed_at: NaiveDateTime,
    pub return_pct: f64,
    pub success: bool,
}

/// Ring buffer of the most recent outcomes. The oldest entry is evicted
/// once `capacity` is reached, and entries older than `max_age` relative
/// to the newest one are pruned on every push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingWindow {
    capacity: usize,
    max_age_days: Option<i64>,
    entries: VecDeque<WindowEntry>,
}

impl RollingWindow {
    pub fn new(capacity: usize, max_age_days: Option<i64>) -> Self {
        Self {
            capacity: capacity.max(1),
            max_age_days,
            entries: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, entry: WindowEntry) {
        // Keep chronological order even when outcomes arrive out of order.
        let pos = self
            .entries
            .iter()
            .rposition(|e| e.closed_at <= entry.closed_at)
            .map_or(0, |p| p + 1);
        self.entries.insert(pos, entry);

        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        if let (Some(days), Some(newest)) = (self.max_age_days, self.entries.back().copied()) {
            let cutoff = newest.closed_at - Duration::days(days);
            while self.entries.front().is_some_and(|e| e.closed_at < cutoff) {
                self.entries.pop_front();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn entries(&self) -> impl Iterator<Item = &WindowEntry> {
        self.entries.iter()
    }

    pub fn stats(&self) -> StrategyRegimeStat {
        StrategyRegimeStat::from_entries(self.entries.iter())
    }
}

/// Rolling performance of one strategy in one regime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyRegimeStat {
    pub trades: usize,
    pub wins: usize,
    pub win_rate: f64,
    /// Mean return per trade, as a fraction.
    pub expectancy: f64,
}

impl StrategyRegimeStat {
    fn from_entries<'a>(entries: impl Iterator<Item = &'a WindowEntry>) -> Self {
        let mut trades = 0usize;
        let mut wins = 0usize;
        let mut total = 0.0;
        for e in entries {
            trades += 1;
            if e.success {
                wins += 1;
            }
            total += e.return_pct;
        }
        if trades == 0 {
            return Self::default();
        }
        Self {
            trades,
            wins,
            win_rate: wins as f64 / trades as f64,
            expectancy: total / trades as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::days(day)
    }

    fn entry(day: i64, ret: f64) -> WindowEntry {
        WindowEntry {
            closed_at: at(day),
            return_pct: ret,
            success: ret > 0.0,
        }
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut w = RollingWindow::new(3, None);
        for d in 0..5 {
            w.push(entry(d, d as f64 * 0.01));
        }
        assert_eq!(w.len(), 3);
        let days: Vec<_> = w.entries().map(|e| e.closed_at).collect();
        assert_eq!(days, vec![at(2), at(3), at(4)]);
    }

    #[test]
    fn max_age_prunes_stale_entries() {
        let mut w = RollingWindow::new(10, Some(30));
        w.push(entry(0, 0.01));
        w.push(entry(10, 0.01));
        w.push(entry(45, -0.02));
        assert_eq!(w.len(), 1);
        assert_eq!(w.stats().trades, 1);
    }

    #[test]
    fn out_of_order_push_stays_sorted() {
        let mut w = RollingWindow::new(2, None);
        w.push(entry(5, 0.01));
        w.push(entry(1, 0.02));
        w.push(entry(3, 0.03));
        let days: Vec<_> = w.entries().map(|e| e.closed_at).collect();
        assert_eq!(days, vec![at(3), at(5)]);
    }

    #[test]
    fn stats_win_rate_and_expectancy() {
        let mut w = RollingWindow::new(10, None);
        w.push(entry(0, 0.04));
        w.push(entry(1, -0.02));
        w.push(entry(2, 0.01));
        w.push(entry(3, -0.01));
        let s = w.stats();
        assert_eq!(s.trades, 4);
        assert_eq!(s.wins, 2);
        assert!((s.win_rate - 0.5).abs() < 1e-12);
        assert!((s.expectancy - 0.005).abs() < 1e-12);
        assert_eq!(RollingWindow::new(1, None).stats(), StrategyRegimeStat::default());
    }
}
