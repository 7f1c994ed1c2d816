//! End-to-end scenarios: config file → data → run / sweep → export.

use chrono::NaiveDate;
use quantlab_core::domain::{PriceSeries, StrategyParams};
use quantlab_core::engine::NoCost;
use quantlab_core::strategy::StrategyKind;
use quantlab_runner::config::BacktestConfig;
use quantlab_runner::data_loader::{load_csv, synthetic_series};
use quantlab_runner::export::{export_sweep_csv, save_sweep_artifacts};
use quantlab_runner::grid::ParameterGrid;
use quantlab_runner::runner::{run_single_backtest, RunSettings};
use quantlab_runner::sweep::{ParameterSweep, SweepOptions};

fn flat_series(n: usize) -> PriceSeries {
    PriceSeries::from_closes(
        "FLAT",
        NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
        &vec![100.0; n],
    )
}

#[test]
fn flat_year_through_crossover_has_all_zero_metrics() {
    let params = StrategyParams::new()
        .with("short_window", 10.0)
        .with("long_window", 30.0);
    let result = run_single_backtest(
        StrategyKind::MaCrossover,
        &flat_series(252),
        &params,
        &NoCost,
        &RunSettings::default(),
    )
    .unwrap();
    let r = &result.report;
    assert_eq!(r.trade_count, 0);
    assert_eq!(r.total_return, 0.0);
    assert_eq!(r.cagr, 0.0);
    assert_eq!(r.sharpe_ratio, 0.0);
    assert_eq!(r.max_drawdown, 0.0);
    assert_eq!(r.calmar_ratio, 0.0);
    assert_eq!(r.win_rate, 0.0);
    assert!(result
        .equity_curve
        .values()
        .iter()
        .all(|&v| v == 10_000.0));
}

#[test]
fn invalid_crossover_pair_is_skipped_and_valid_rows_survive() {
    let series = synthetic_series("SCENARIO", NaiveDate::from_ymd_opt(2021, 1, 4).unwrap(), 400);
    let grid = ParameterGrid::new()
        .with_values("short_window", [10.0, 50.0])
        .with_values("long_window", [20.0, 100.0]);
    let result = ParameterSweep::new(SweepOptions::default())
        .sweep(StrategyKind::MaCrossover, &series, &grid, 10_000.0, &NoCost, None)
        .unwrap();

    assert_eq!(result.grid_size, 4);
    assert_eq!(result.skipped.len(), 1);
    let skipped = &result.skipped[0];
    assert_eq!(skipped.params.get("short_window"), Some(50.0));
    assert_eq!(skipped.params.get("long_window"), Some(20.0));
    assert!(!skipped.reason.is_empty());

    assert_eq!(result.len(), 3);
    assert!(result.rows.iter().all(|row| {
        row.params.get("short_window").unwrap() < row.params.get("long_window").unwrap()
    }));
}

#[test]
fn placeholder_strategies_skip_every_combination() {
    let series = synthetic_series("PH", NaiveDate::from_ymd_opt(2021, 1, 4).unwrap(), 50);
    let result = ParameterSweep::new(SweepOptions::default())
        .sweep(
            StrategyKind::PairsTrading,
            &series,
            &ParameterGrid::new(),
            10_000.0,
            &NoCost,
            None,
        )
        .unwrap();
    assert!(result.is_empty());
    assert_eq!(result.skipped.len(), 1);
    assert!(result.skipped[0].reason.contains("not implemented"));
}

#[test]
fn config_file_drives_a_full_sweep() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("sweep.toml");
    std::fs::write(
        &config_path,
        r#"
[backtest]
symbol = "CSV"
initial_capital = 5000.0

[strategy]
kind = "trend_following"
params = { allow_short = 1 }

[costs]
type = "FLAT_FEE"
amount = 1.0

[sweep]
ranking = "calmar"
max_concurrency = 2
[sweep.grid]
lookback = { start = 5, end = 25, step = 5 }
threshold = [0.0, 0.01]
"#,
    )
    .unwrap();

    let csv_path = dir.path().join("prices.csv");
    let mut csv = String::from("Date,Open,High,Low,Close,Volume\n");
    let series = synthetic_series("CSV", NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(), 120);
    for b in &series.bars {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date, b.open, b.high, b.low, b.close, b.volume
        ));
    }
    std::fs::write(&csv_path, csv).unwrap();

    let config = BacktestConfig::from_file(&config_path).unwrap();
    let loaded = load_csv(&csv_path, &config.backtest.symbol).unwrap();
    assert_eq!(loaded.len(), 120);

    let cost = config.cost_model().unwrap();
    let result = ParameterSweep::new(config.sweep_options())
        .sweep(
            config.strategy.kind,
            &loaded,
            &config.parameter_grid(),
            config.backtest.initial_capital,
            cost.as_ref(),
            None,
        )
        .unwrap();
    assert_eq!(result.grid_size, 10);
    assert_eq!(result.len(), 10);
    assert!(result
        .rows
        .iter()
        .all(|row| row.params.get("allow_short") == Some(1.0)));
    for pair in result.rows.windows(2) {
        assert!(pair[0].report.calmar_ratio >= pair[1].report.calmar_ratio);
    }

    let out = dir.path().join("out");
    save_sweep_artifacts(&result, &out).unwrap();
    assert!(out.join("sweep.json").exists());
    let table = export_sweep_csv(&result).unwrap();
    assert_eq!(table.lines().count(), 11);
}
