//! Backtest runner: wires together strategy, engine, and metrics.
//!
//! `run_single_backtest()` is the one-shot entry point used by the CLI:
//! slice the series to the configured date range, validate, generate
//! signals, simulate, and score.

use chrono::NaiveDate;
use quantlab_core::domain::{EquityCurve, ParamsFingerprint, PriceSeries, StrategyParams, Trade};
use quantlab_core::engine::{CostModel, RiskLimits, SimulationEngine};
use quantlab_core::error::BacktestError;
use quantlab_core::strategy::StrategyKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::metrics::{MetricsOptions, PerformanceReport};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Backtest(#[from] BacktestError),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl RunError {
    /// Stable label for display.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Backtest(e) => e.kind(),
            Self::ThreadPool(_) => "runtime",
        }
    }
}

/// Current schema version for persisted results.
pub const SCHEMA_VERSION: u32 = 1;

/// Caller-side inputs shared by single runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub initial_capital: f64,
    /// Inclusive date bounds applied before the run.
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub metrics: MetricsOptions,
    /// Attach a buy-and-hold comparison of the same series.
    pub benchmark: bool,
    #[serde(default)]
    pub risk: RiskLimits,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            start: None,
            end: None,
            metrics: MetricsOptions::default(),
            benchmark: false,
            risk: RiskLimits::default(),
        }
    }
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    pub strategy: StrategyKind,
    pub params: StrategyParams,
    pub fingerprint: ParamsFingerprint,
    pub cost_model: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub initial_capital: f64,
    pub warmup_bars: usize,
    /// Number of bars where the target position changed.
    pub signal_changes: usize,
    pub report: PerformanceReport,
    pub trades: Vec<Trade>,
    pub equity_curve: EquityCurve,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run one backtest end to end.
pub fn run_single_backtest(
    kind: StrategyKind,
    series: &PriceSeries,
    params: &StrategyParams,
    cost_model: &dyn CostModel,
    settings: &RunSettings,
) -> Result<BacktestResult, RunError> {
    let series = series.slice_dates(settings.start, settings.end);
    let strategy = kind.build(params).map_err(BacktestError::from)?;
    let engine = SimulationEngine::new(settings.initial_capital, cost_model)
        .and_then(|engine| engine.with_risk_limits(settings.risk))
        .map_err(BacktestError::from)?;

    let signals = kind.generate_signals(&series, params)?;
    let sim = engine.run(&series, &signals)?;

    let benchmark = settings
        .benchmark
        .then(|| EquityCurve::buy_and_hold(&series, settings.initial_capital));
    let report = PerformanceReport::compute(
        &sim.equity_curve,
        &sim.trades,
        benchmark.as_ref(),
        &settings.metrics,
    );

    info!(
        symbol = %series.symbol,
        strategy = %kind,
        params = %params,
        bars = series.len(),
        trades = report.trade_count,
        total_return = report.total_return,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        symbol: series.symbol.clone(),
        strategy: kind,
        params: params.clone(),
        fingerprint: params.fingerprint(kind.name()),
        cost_model: cost_model.name().to_string(),
        start_date: series.first_date(),
        end_date: series.last_date(),
        initial_capital: settings.initial_capital,
        warmup_bars: strategy.warmup_bars(),
        signal_changes: signals.change_count(),
        report,
        trades: sim.trades,
        equity_curve: sim.equity_curve,
    })
}
