//! Sequential and parallel sweeps must produce identical ranked output.

use chrono::NaiveDate;
use quantlab_core::domain::PriceSeries;
use quantlab_core::engine::{FlatFee, NoCost, PercentageFee, Slippage};
use quantlab_core::strategy::StrategyKind;
use quantlab_runner::data_loader::synthetic_series;
use quantlab_runner::grid::ParameterGrid;
use quantlab_runner::ranking::RankingMetric;
use quantlab_runner::sweep::{ParameterSweep, SweepOptions};

fn series() -> PriceSeries {
    synthetic_series("DETERMINISM", NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), 600)
}

fn options(parallel: bool, max_concurrency: usize, ranking: RankingMetric) -> SweepOptions {
    SweepOptions {
        parallel,
        max_concurrency,
        ranking,
        ..SweepOptions::default()
    }
}

#[test]
fn crossover_sweep_is_identical_across_execution_modes() {
    let grid = ParameterGrid::new()
        .with_range("short_window", 5.0, 40.0, 5.0)
        .unwrap()
        .with_range("long_window", 20.0, 120.0, 20.0)
        .unwrap();
    let fee = PercentageFee::new(0.001).unwrap();

    let seq = ParameterSweep::new(options(false, 0, RankingMetric::Sharpe))
        .sweep(StrategyKind::MaCrossover, &series(), &grid, 10_000.0, &fee, None)
        .unwrap();
    for threads in [1, 2, 8] {
        let par = ParameterSweep::new(options(true, threads, RankingMetric::Sharpe))
            .sweep(StrategyKind::MaCrossover, &series(), &grid, 10_000.0, &fee, None)
            .unwrap();
        assert_eq!(seq, par, "parallel sweep with {threads} threads diverged");
    }

    let seq_json = serde_json::to_string(&seq).unwrap();
    let par_json = serde_json::to_string(
        &ParameterSweep::new(options(true, 4, RankingMetric::Sharpe))
            .sweep(StrategyKind::MaCrossover, &series(), &grid, 10_000.0, &fee, None)
            .unwrap(),
    )
    .unwrap();
    assert_eq!(seq_json, par_json);
}

#[test]
fn every_strategy_and_ranking_is_deterministic() {
    let cost = Slippage::new(5.0, Box::new(FlatFee::new(1.0).unwrap())).unwrap();
    let cases = [
        (
            StrategyKind::MeanReversion,
            ParameterGrid::new()
                .with_values("window", [10.0, 20.0, 30.0])
                .with_values("entry_z", [1.0, 1.5, 2.0])
                .with_values("exit_z", [0.0, 0.5]),
        ),
        (
            StrategyKind::TrendFollowing,
            ParameterGrid::new()
                .with_values("lookback", [10.0, 20.0, 60.0, 120.0])
                .with_values("threshold", [0.0, 0.02])
                .with_values("allow_short", [0.0, 1.0]),
        ),
        (StrategyKind::BuyAndHold, ParameterGrid::new()),
    ];
    for (kind, grid) in cases {
        for ranking in RankingMetric::ALL {
            let seq = ParameterSweep::new(options(false, 0, ranking))
                .sweep(kind, &series(), &grid, 25_000.0, &cost, None)
                .unwrap();
            let par = ParameterSweep::new(options(true, 3, ranking))
                .sweep(kind, &series(), &grid, 25_000.0, &cost, None)
                .unwrap();
            assert_eq!(seq, par, "{kind} ranked by {ranking} diverged");
        }
    }
}

#[test]
fn ties_fall_back_to_insertion_order() {
    // Every combination is all-flat on a constant series: metrics tie exactly.
    let flat = PriceSeries::from_closes(
        "FLAT",
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        &[50.0; 40],
    );
    let grid = ParameterGrid::new()
        .with_values("short_window", [2.0, 3.0, 4.0])
        .with_values("long_window", [10.0, 20.0]);
    let result = ParameterSweep::new(options(true, 4, RankingMetric::Sharpe))
        .sweep(StrategyKind::MaCrossover, &flat, &grid, 10_000.0, &NoCost, None)
        .unwrap();
    let order: Vec<usize> = result.rows.iter().map(|r| r.index).collect();
    assert_eq!(order, vec![0, 1, 2, 3, 4, 5]);
}
