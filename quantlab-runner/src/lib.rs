//! QuantLab Runner — backtest orchestration, metrics, and parameter sweeps.
//!
//! This crate builds on `quantlab-core` to provide:
//! - Performance metrics over equity curves and trade lists
//! - Ranking keys and deterministic row ordering
//! - Parameter grids and the parallel, cancellable sweep driver
//! - Single-backtest runner with optional buy-and-hold benchmark
//! - TOML run configuration
//! - CSV price loading and synthetic series
//! - JSON / CSV / Markdown export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod grid;
pub mod metrics;
pub mod ranking;
pub mod runner;
pub mod sweep;

pub use config::{BacktestConfig, CommissionConfig, ConfigError, CostConfig, SweepSection};
pub use data_loader::{load_csv, load_csv_with, synthetic_series, LoadError, LoadOptions};
pub use grid::{GridAxis, GridError, ParameterGrid};
pub use metrics::{BenchmarkComparison, MetricsOptions, PerformanceReport, Period, PeriodReturn};
pub use ranking::RankingMetric;
pub use runner::{run_single_backtest, BacktestResult, RunError, RunSettings};
pub use sweep::{ParameterSweep, SkippedCombination, SweepOptions, SweepResult, SweepRow};
