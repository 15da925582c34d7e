//! Reporting and export: JSON, CSV and Markdown artifacts.
//!
//! - **JSON**: full round-trip of a `BacktestReport`, schema-versioned
//! - **CSV**: trade tape and published picks for external tools
//! - **Markdown**: a single-run summary and a side-by-side strategy table
//!
//! Reports from a newer schema version are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::report::{BacktestReport, BacktestTrade, SCHEMA_VERSION};
use crate::scan::Pick;

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

/// Deserialize a `BacktestReport`, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestReport> {
    let report: BacktestReport =
        serde_json::from_str(json).context("failed to deserialize BacktestReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Trade tape. Returns and excursions are percentages.
pub fn export_trades_csv(trades: &[BacktestTrade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "strategy",
        "entry_time",
        "entry_price",
        "exit_time",
        "exit_price",
        "exit_reason",
        "return_pct",
        "mfe_pct",
        "mae_pct",
        "bars_held",
        "regime",
        "conviction",
        "patterns",
    ])?;

    for t in trades {
        let s = &t.trade;
        let patterns: Vec<&str> = t.patterns.iter().map(|p| p.id()).collect();
        wtr.write_record([
            s.symbol.as_str(),
            s.strategy.tag(),
            &s.entry_timestamp.to_string(),
            &format!("{:.4}", s.entry_price),
            &s.exit_timestamp.to_string(),
            &format!("{:.4}", s.exit_price),
            &s.exit_reason.to_string(),
            &format!("{:.4}", s.return_pct * 100.0),
            &format!("{:.4}", s.mfe * 100.0),
            &format!("{:.4}", s.mae * 100.0),
            &s.bars_held.to_string(),
            t.regime.as_str(),
            &format!("{:.2}", t.conviction),
            &patterns.join(";"),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Published picks with their plan and sizing.
pub fn export_picks_csv(picks: &[Pick]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "id",
        "symbol",
        "strategy",
        "conviction",
        "risk_label",
        "entry",
        "stop",
        "target",
        "horizon",
        "position_size",
    ])?;
    for p in picks {
        let r = &p.result;
        wtr.write_record([
            &p.rank.to_string(),
            p.id.as_str(),
            r.symbol.as_str(),
            r.strategy.tag(),
            &format!("{:.2}", r.conviction),
            &r.risk_label().to_string(),
            &format!("{:.4}", r.plan.entry()),
            &format!("{:.4}", r.plan.stop()),
            &format!("{:.4}", r.plan.primary_target()),
            &r.plan.horizon().to_string(),
            &format!("{:.4}", p.position_size),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Writes `report.json`, `trades.csv` and `report.md` into
/// `{strategy}_{run id prefix}/` under `output_dir`. Returns that directory.
///
/// The directory name is derived from the run id, so re-running an
/// identical backtest overwrites its previous artifacts.
pub fn save_artifacts(report: &BacktestReport, output_dir: &Path) -> Result<PathBuf> {
    let prefix = report.run_id.get(..12).unwrap_or(&report.run_id);
    let run_dir = output_dir.join(format!("{}_{prefix}", report.strategy.tag().to_lowercase()));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.json"), export_json(report)?)?;
    std::fs::write(run_dir.join("trades.csv"), export_trades_csv(&report.trades)?)?;
    std::fs::write(run_dir.join("report.md"), generate_report(report))?;
    Ok(run_dir)
}

pub fn load_artifacts(dir: &Path) -> Result<BacktestReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown reports ───────────────────────────────────────────────

pub fn generate_report(report: &BacktestReport) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# Backtest Report\n\n");
    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Strategy | {} |\n", report.strategy));
    md.push_str(&format!("| Period | {} to {} |\n", report.period.start, report.period.end));
    md.push_str(&format!("| Symbols | {} |\n", report.symbols_requested.len()));
    md.push_str(&format!("| Learning Phase | {} |\n", report.learning_phase));
    md.push_str(&format!("| Run Id | {} |\n", report.run_id));
    md.push('\n');

    let m = &report.metrics;
    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Trades | {} |\n", m.trade_count));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", m.win_rate * 100.0));
    md.push_str(&format!("| Expectancy | {:.2}% |\n", m.expectancy * 100.0));
    md.push_str(&format!("| Avg Win | {:.2}% |\n", m.avg_win * 100.0));
    md.push_str(&format!("| Avg Loss | {:.2}% |\n", m.avg_loss * 100.0));
    md.push_str(&format!("| Best / Worst | {:.2}% / {:.2}% |\n", m.best_trade * 100.0, m.worst_trade * 100.0));
    md.push_str(&format!("| Total Return | {:.2}% |\n", m.total_return * 100.0));
    md.push_str(&format!("| Max Drawdown | {:.2}% |\n", m.max_drawdown * 100.0));
    md.push_str(&format!("| Sharpe | {:.3} |\n", m.sharpe));
    md.push_str(&format!("| Profit Factor | {} |\n", m.profit_factor));
    md.push_str(&format!("| Avg Bars Held | {:.1} |\n", m.avg_bars_held));
    md.push_str(&format!("| Max Consecutive Losses | {} |\n", m.max_consecutive_losses));
    md.push('\n');

    let e = &m.exit_reasons;
    md.push_str("## Exits\n\n");
    md.push_str("| Stop | Target | Horizon | End of Data |\n");
    md.push_str("| --- | --- | --- | --- |\n");
    md.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        e.stop, e.target, e.horizon_expiry, e.end_of_data
    ));

    if !report.skipped.is_empty() || !report.failed.is_empty() || report.rejected_signals > 0 {
        md.push_str("## Excluded\n\n");
        for issue in &report.skipped {
            md.push_str(&format!("- skipped {}: {}\n", issue.symbol, issue.reason));
        }
        for issue in &report.failed {
            md.push_str(&format!("- failed {}: {}\n", issue.symbol, issue.reason));
        }
        if report.rejected_signals > 0 {
            md.push_str(&format!("- {} signals rejected for invalid trade plans\n", report.rejected_signals));
        }
        md.push('\n');
    }

    md
}

/// One row per report, as produced by `Backtester::compare_strategies`.
pub fn generate_comparison(reports: &[BacktestReport]) -> String {
    let mut md = String::with_capacity(1024);
    md.push_str("# Strategy Comparison\n\n");
    md.push_str("| Strategy | Trades | Win Rate | Expectancy | Total Return | Max DD | Sharpe | Profit Factor |\n");
    md.push_str("| --- | --- | --- | --- | --- | --- | --- | --- |\n");
    for r in reports {
        let m = &r.metrics;
        md.push_str(&format!(
            "| {} | {} | {:.1}% | {:.2}% | {:.2}% | {:.2}% | {:.3} | {} |\n",
            r.strategy,
            m.trade_count,
            m.win_rate * 100.0,
            m.expectancy * 100.0,
            m.total_return * 100.0,
            m.max_drawdown * 100.0,
            m.sharpe,
            m.profit_factor
        ));
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use picklab_core::collaborators::DateRange;
    use picklab_core::domain::{ExitReason, SimulatedTrade, StrategyKind, TrendState};
    use picklab_core::features::FeaturePattern;
    use picklab_core::learning::LearningPhase;

    use crate::metrics::BacktestMetrics;
    use crate::report::SymbolIssue;

    fn sample_trade() -> BacktestTrade {
        let entry = NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        BacktestTrade {
            trade: SimulatedTrade {
                symbol: "ABC".into(),
                strategy: StrategyKind::MomentumSwing,
                entry_timestamp: entry,
                exit_timestamp: entry + Duration::days(3),
                entry_price: 100.0,
                exit_price: 104.5,
                exit_reason: ExitReason::Target,
                return_pct: 0.045,
                mfe: 0.05,
                mae: -0.01,
                bars_held: 3,
            },
            regime: TrendState::Bullish,
            patterns: vec![FeaturePattern::FarFromVwap, FeaturePattern::GapWithoutVolume],
            conviction: 72.5,
        }
    }

    fn sample_report() -> BacktestReport {
        let trades = vec![sample_trade()];
        let metrics = BacktestMetrics::compute(&[trades[0].trade.clone()]);
        BacktestReport {
            schema_version: SCHEMA_VERSION,
            run_id: "0123456789abcdef0123".into(),
            strategy: StrategyKind::MomentumSwing,
            period: DateRange::new(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            ),
            symbols_requested: vec!["ABC".into(), "XYZ".into()],
            trades,
            metrics,
            skipped: vec![SymbolIssue::new("XYZ", "insufficient data")],
            failed: vec![],
            rejected_signals: 2,
            learning_phase: LearningPhase::Cold,
        }
    }

    #[test]
    fn json_roundtrip() {
        let original = sample_report();
        let restored = import_json(&export_json(&original).unwrap()).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn json_rejects_unknown_version() {
        let mut report = sample_report();
        report.schema_version = 99;
        let json = export_json(&report).unwrap();
        let msg = import_json(&json).unwrap_err().to_string();
        assert!(msg.contains("unsupported schema version 99"));
    }

    #[test]
    fn csv_trades_content() {
        let csv = export_trades_csv(&[sample_trade()]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].split(',').count(), 14);
        let row = lines[1];
        assert!(row.contains("MOMENTUM_SWING"));
        assert!(row.contains("target"));
        assert!(row.contains("4.5000"));
        assert!(row.contains("far_from_vwap;gap_no_volume"));
    }

    #[test]
    fn csv_empty_trades() {
        let csv = export_trades_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn markdown_report_has_sections() {
        let md = generate_report(&sample_report());
        assert!(md.contains("# Backtest Report"));
        assert!(md.contains("## Performance Summary"));
        assert!(md.contains("| Profit Factor | unbounded |"));
        assert!(md.contains("- skipped XYZ: insufficient data"));
        assert!(md.contains("2 signals rejected"));
    }

    #[test]
    fn comparison_lists_each_strategy() {
        let mut other = sample_report();
        other.strategy = StrategyKind::Orb;
        let md = generate_comparison(&[sample_report(), other]);
        assert!(md.contains("| MOMENTUM_SWING |"));
        assert!(md.contains("| ORB |"));
    }

    #[test]
    fn artifacts_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let report = sample_report();
        let run_dir = save_artifacts(&report, dir.path()).unwrap();
        assert!(run_dir.ends_with("momentum_swing_0123456789ab"));
        assert!(run_dir.join("trades.csv").exists());
        assert!(run_dir.join("report.md").exists());
        assert_eq!(load_artifacts(&run_dir).unwrap(), report);
    }
}
