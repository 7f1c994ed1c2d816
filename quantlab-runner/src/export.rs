//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for results:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trade tape, equity curve, and ranked sweep table
//! - **Markdown**: human-readable single-run report, with monthly and
//!   yearly return tables
//!
//! Persisted single-run results carry a `schema_version` field. Newer
//! versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use quantlab_core::domain::{EquityCurve, Trade};
use serde::Serialize;

use crate::metrics::{period_returns, Period, PeriodReturn};
use crate::runner::{BacktestResult, SCHEMA_VERSION};
use crate::sweep::SweepResult;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

/// Write any serializable value as pretty JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize JSON")?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: direction, entry_bar, entry_date, entry_price, exit_bar,
/// exit_date, exit_price, size, gross_pnl, costs, net_pnl, return_pct,
/// bars_held, forced_close
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "direction",
        "entry_bar",
        "entry_date",
        "entry_price",
        "exit_bar",
        "exit_date",
        "exit_price",
        "size",
        "gross_pnl",
        "costs",
        "net_pnl",
        "return_pct",
        "bars_held",
        "forced_close",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.direction.to_string(),
            &t.entry_bar.to_string(),
            &t.entry_date.to_string(),
            &format!("{:.6}", t.entry_price),
            &t.exit_bar.to_string(),
            &t.exit_date.to_string(),
            &format!("{:.6}", t.exit_price),
            &format!("{:.6}", t.size),
            &format!("{:.2}", t.gross_pnl),
            &format!("{:.2}", t.costs),
            &format!("{:.2}", t.net_pnl),
            &format!("{:.6}", t.return_pct()),
            &t.bars_held().to_string(),
            &t.forced_close.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export an equity curve as CSV with date and equity columns.
pub fn export_equity_csv(curve: &EquityCurve) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "equity"])?;
    for p in &curve.points {
        wtr.write_record([&p.date.to_string(), &format!("{:.2}", p.equity)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Ranked sweep table, one row per evaluated combination, best first.
pub fn export_sweep_csv(sweep: &SweepResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "index",
        "fingerprint",
        "params",
        "total_return",
        "cagr",
        "annualized_volatility",
        "sharpe_ratio",
        "sortino_ratio",
        "max_drawdown",
        "calmar_ratio",
        "win_rate",
        "trade_count",
    ])?;
    for (rank, row) in sweep.rows.iter().enumerate() {
        let r = &row.report;
        wtr.write_record([
            &(rank + 1).to_string(),
            &row.index.to_string(),
            &row.fingerprint.short().to_string(),
            &row.params.to_string(),
            &format!("{:.6}", r.total_return),
            &format!("{:.6}", r.cagr),
            &format!("{:.6}", r.annualized_volatility),
            &format!("{:.4}", r.sharpe_ratio),
            &format!("{:.4}", r.sortino_ratio),
            &format!("{:.6}", r.max_drawdown),
            &format!("{:.4}", r.calmar_ratio),
            &format!("{:.4}", r.win_rate),
            &r.trade_count.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates `{symbol}_{strategy}_{fingerprint}/` under `output_dir` with
/// `result.json`, `trades.csv`, `equity.csv`, and `report.md`.
/// Returns the created directory.
pub fn save_run_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}_{}",
        result.symbol,
        result.strategy,
        result.fingerprint.short()
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("result.json"), export_json(result)?)?;
    std::fs::write(run_dir.join("trades.csv"), export_trades_csv(&result.trades)?)?;
    std::fs::write(run_dir.join("equity.csv"), export_equity_csv(&result.equity_curve)?)?;
    std::fs::write(run_dir.join("report.md"), generate_report(result))?;

    Ok(run_dir)
}

/// Save `sweep.json` and `sweep.csv` under `output_dir`.
pub fn save_sweep_artifacts(sweep: &SweepResult, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create artifact dir: {}", output_dir.display()))?;
    write_json(&output_dir.join("sweep.json"), sweep)?;
    std::fs::write(output_dir.join("sweep.csv"), export_sweep_csv(sweep)?)?;
    Ok(output_dir.to_path_buf())
}

/// Load a `BacktestResult` from an artifact directory's result.json.
pub fn load_run_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate a Markdown report for a single backtest run.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Symbol | {} |\n", result.symbol));
    md.push_str(&format!("| Strategy | {} |\n", result.strategy));
    md.push_str(&format!("| Parameters | {} |\n", result.params));
    md.push_str(&format!("| Fingerprint | {} |\n", result.fingerprint.short()));
    if let (Some(start), Some(end)) = (result.start_date, result.end_date) {
        md.push_str(&format!("| Period | {start} to {end} |\n"));
    }
    md.push_str(&format!(
        "| Initial Capital | ${:.0} |\n",
        result.initial_capital
    ));
    md.push_str(&format!(
        "| Bars | {} ({} warmup) |\n",
        result.report.bar_count, result.warmup_bars
    ));
    md.push_str(&format!("| Cost Model | {} |\n", result.cost_model));
    md.push('\n');

    let m = &result.report;
    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Total Return | {:.2}% |\n",
        m.total_return * 100.0
    ));
    md.push_str(&format!("| CAGR | {:.2}% |\n", m.cagr * 100.0));
    md.push_str(&format!(
        "| Volatility | {:.2}% |\n",
        m.annualized_volatility * 100.0
    ));
    md.push_str(&format!("| Sharpe | {:.3} |\n", m.sharpe_ratio));
    md.push_str(&format!("| Sortino | {:.3} |\n", m.sortino_ratio));
    md.push_str(&format!("| Calmar | {:.3} |\n", m.calmar_ratio));
    md.push_str(&format!(
        "| Max Drawdown | {:.2}% ({} bars) |\n",
        m.max_drawdown * 100.0,
        m.max_drawdown_duration
    ));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", m.win_rate * 100.0));
    md.push_str(&format!("| Profit Factor | {:.2} |\n", m.profit_factor));
    md.push_str(&format!("| Trades | {} |\n", m.trade_count));
    md.push_str(&format!("| Final Equity | ${:.2} |\n", m.final_equity));
    md.push('\n');

    if let Some(ref b) = m.benchmark {
        md.push_str("## Benchmark (buy and hold)\n\n");
        md.push_str("| Metric | Value |\n");
        md.push_str("| --- | --- |\n");
        md.push_str(&format!(
            "| Total Return | {:.2}% |\n",
            b.total_return * 100.0
        ));
        md.push_str(&format!("| CAGR | {:.2}% |\n", b.cagr * 100.0));
        md.push_str(&format!("| Sharpe | {:.3} |\n", b.sharpe_ratio));
        md.push_str(&format!(
            "| Max Drawdown | {:.2}% |\n",
            b.max_drawdown * 100.0
        ));
        md.push_str(&format!(
            "| Excess Return | {:+.2}% |\n",
            b.excess_return * 100.0
        ));
        md.push('\n');
    }

    push_period_table(
        &mut md,
        "Monthly Returns",
        &period_returns(&result.equity_curve, Period::Monthly),
    );
    push_period_table(
        &mut md,
        "Yearly Returns",
        &period_returns(&result.equity_curve, Period::Yearly),
    );

    md
}

fn push_period_table(md: &mut String, title: &str, rows: &[PeriodReturn]) {
    if rows.is_empty() {
        return;
    }
    md.push_str(&format!("## {title}\n\n"));
    md.push_str("| Period | From | To | Return |\n");
    md.push_str("| --- | --- | --- | --- |\n");
    for row in rows {
        md.push_str(&format!(
            "| {} | {} | {} | {:+.2}% |\n",
            row.period,
            row.start,
            row.end,
            row.total_return * 100.0
        ));
    }
    md.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{run_single_backtest, RunSettings};
    use chrono::NaiveDate;
    use quantlab_core::domain::{PriceSeries, StrategyParams};
    use quantlab_core::engine::NoCost;
    use quantlab_core::strategy::StrategyKind;

    fn sample_result() -> BacktestResult {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 / 4.0).sin() * 5.0).collect();
        let series =
            PriceSeries::from_closes("SPY", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), &closes);
        let params = StrategyParams::new()
            .with("short_window", 3.0)
            .with("long_window", 8.0);
        let settings = RunSettings {
            benchmark: true,
            ..RunSettings::default()
        };
        run_single_backtest(StrategyKind::MaCrossover, &series, &params, &NoCost, &settings)
            .unwrap()
    }

    #[test]
    fn json_roundtrip() {
        let result = sample_result();
        let json = export_json(&result).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back.fingerprint, result.fingerprint);
        assert_eq!(back.trades.len(), result.trades.len());
    }

    #[test]
    fn rejects_future_schema() {
        let mut result = sample_result();
        result.schema_version = SCHEMA_VERSION + 1;
        let json = serde_json::to_string(&result).unwrap();
        assert!(import_json(&json).is_err());
    }

    #[test]
    fn trades_csv_has_row_per_trade() {
        let result = sample_result();
        let csv = export_trades_csv(&result.trades).unwrap();
        assert_eq!(csv.lines().count(), result.trades.len() + 1);
        assert!(csv.starts_with("direction,entry_bar"));
    }

    #[test]
    fn equity_csv_has_row_per_bar() {
        let result = sample_result();
        let csv = export_equity_csv(&result.equity_curve).unwrap();
        assert_eq!(csv.lines().count(), 61);
        assert!(csv.lines().nth(1).unwrap().starts_with("2024-01-01,"));
    }

    #[test]
    fn report_mentions_benchmark() {
        let md = generate_report(&sample_result());
        assert!(md.contains("# Backtest Report"));
        assert!(md.contains("ma_crossover"));
        assert!(md.contains("Excess Return"));
    }

    #[test]
    fn report_lists_calendar_returns() {
        let result = sample_result();
        let md = generate_report(&result);
        assert!(md.contains("## Monthly Returns"));
        assert!(md.contains("| 2024-01 | 2024-01-01 | 2024-01-31 |"));
        assert!(md.contains("| 2024-02 | 2024-02-01 | 2024-02-29 |"));
        assert!(md.contains("## Yearly Returns"));
        let yearly = format!(
            "| 2024 | 2024-01-01 | 2024-02-29 | {:+.2}% |",
            result.report.total_return * 100.0
        );
        assert!(md.contains(&yearly), "missing {yearly}");
    }

    #[test]
    fn artifacts_roundtrip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let result = sample_result();
        let run_dir = save_run_artifacts(&result, dir.path()).unwrap();
        for file in ["result.json", "trades.csv", "equity.csv", "report.md"] {
            assert!(run_dir.join(file).exists(), "missing {file}");
        }
        let loaded = load_run_artifacts(&run_dir).unwrap();
        assert_eq!(loaded.fingerprint, result.fingerprint);
        assert_eq!(loaded.equity_curve.len(), result.equity_curve.len());
    }
}
