//! Parameter sweep: every grid combination through signals, engine, and
//! metrics, ranked deterministically.
//!
//! Combinations are independent, so a parallel sweep runs them on a
//! dedicated rayon pool capped at `max_concurrency` threads. Results are
//! collected in grid order and sorted afterwards; completion order never
//! affects the output, so sequential and parallel sweeps are identical.
//!
//! Invalid combinations are recorded as skipped with the validation
//! message. Bad price data aborts the whole sweep before any work starts.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use quantlab_core::domain::{ParamsFingerprint, PriceSeries, StrategyParams};
use quantlab_core::engine::{CostModel, RiskLimits, SimulationEngine};
use quantlab_core::error::{BacktestError, ValidationError};
use quantlab_core::strategy::StrategyKind;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::grid::ParameterGrid;
use crate::metrics::{MetricsOptions, PerformanceReport};
use crate::ranking::RankingMetric;
use crate::runner::RunError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepOptions {
    pub parallel: bool,
    /// Worker threads when `parallel`; 0 means one per core.
    pub max_concurrency: usize,
    pub ranking: RankingMetric,
    pub metrics: MetricsOptions,
    /// Engine limits applied identically to every combination.
    #[serde(default)]
    pub risk: RiskLimits,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            max_concurrency: 0,
            ranking: RankingMetric::default(),
            metrics: MetricsOptions::default(),
            risk: RiskLimits::default(),
        }
    }
}

/// One evaluated combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRow {
    /// Position in the grid's combination order.
    pub index: usize,
    pub params: StrategyParams,
    pub fingerprint: ParamsFingerprint,
    pub report: PerformanceReport,
}

/// A combination rejected by strategy validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedCombination {
    pub index: usize,
    pub params: StrategyParams,
    pub reason: String,
}

/// Ranked output of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub strategy: StrategyKind,
    pub ranking: RankingMetric,
    pub grid_size: usize,
    /// Best first.
    pub rows: Vec<SweepRow>,
    /// In grid order.
    pub skipped: Vec<SkippedCombination>,
    /// True when the cancel flag stopped the sweep early. Completed rows
    /// are still valid.
    pub cancelled: bool,
}

impl SweepResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn best(&self) -> Option<&SweepRow> {
        self.rows.first()
    }

    pub fn top_n(&self, n: usize) -> &[SweepRow] {
        &self.rows[..n.min(self.rows.len())]
    }
}

enum Outcome {
    Row(SweepRow),
    Skipped(SkippedCombination),
    Cancelled,
}

/// Parameter sweep executor.
#[derive(Debug, Clone, Default)]
pub struct ParameterSweep {
    options: SweepOptions,
}

impl ParameterSweep {
    pub fn new(options: SweepOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SweepOptions {
        &self.options
    }

    /// Evaluate every combination of `grid` for `kind` over `series`.
    ///
    /// `cancel` is polled before each combination; once set, remaining
    /// combinations are not started.
    pub fn sweep(
        &self,
        kind: StrategyKind,
        series: &PriceSeries,
        grid: &ParameterGrid,
        initial_capital: f64,
        cost_model: &dyn CostModel,
        cancel: Option<&AtomicBool>,
    ) -> Result<SweepResult, RunError> {
        self.run(kind, series, grid, initial_capital, cost_model, cancel, &|_, _| {})
    }

    /// Same as [`sweep`](Self::sweep), calling `progress(completed, total)`
    /// after each evaluated combination.
    #[allow(clippy::too_many_arguments)]
    pub fn sweep_with_progress<F>(
        &self,
        kind: StrategyKind,
        series: &PriceSeries,
        grid: &ParameterGrid,
        initial_capital: f64,
        cost_model: &dyn CostModel,
        cancel: Option<&AtomicBool>,
        progress: F,
    ) -> Result<SweepResult, RunError>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        self.run(kind, series, grid, initial_capital, cost_model, cancel, &progress)
    }

    #[allow(clippy::too_many_arguments)]
    fn run(
        &self,
        kind: StrategyKind,
        series: &PriceSeries,
        grid: &ParameterGrid,
        initial_capital: f64,
        cost_model: &dyn CostModel,
        cancel: Option<&AtomicBool>,
        progress: &(dyn Fn(usize, usize) + Sync),
    ) -> Result<SweepResult, RunError> {
        if series.is_empty() {
            return Err(BacktestError::from(ValidationError::EmptySeries).into());
        }
        series.validate().map_err(BacktestError::from)?;
        let engine = SimulationEngine::new(initial_capital, cost_model)
            .and_then(|engine| engine.with_risk_limits(self.options.risk))
            .map_err(BacktestError::from)?;

        let combinations = grid.combinations();
        let total = combinations.len();
        info!(
            strategy = %kind,
            grid_size = total,
            parallel = self.options.parallel,
            max_concurrency = self.options.max_concurrency,
            ranking = %self.options.ranking,
            "sweep started"
        );

        let completed = AtomicUsize::new(0);
        let evaluate = |(index, params): (usize, &StrategyParams)| -> Result<Outcome, BacktestError> {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Ok(Outcome::Cancelled);
            }
            let outcome = self.evaluate(kind, index, params, series, &engine)?;
            progress(completed.fetch_add(1, Ordering::Relaxed) + 1, total);
            Ok(outcome)
        };

        let outcomes: Vec<Outcome> = if self.options.parallel {
            let mut builder = rayon::ThreadPoolBuilder::new();
            if self.options.max_concurrency > 0 {
                builder = builder.num_threads(self.options.max_concurrency);
            }
            let pool = builder.build()?;
            pool.install(|| {
                combinations
                    .par_iter()
                    .enumerate()
                    .map(evaluate)
                    .collect::<Result<Vec<_>, _>>()
            })?
        } else {
            combinations
                .iter()
                .enumerate()
                .map(evaluate)
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut rows = Vec::new();
        let mut skipped = Vec::new();
        let mut cancelled = false;
        for outcome in outcomes {
            match outcome {
                Outcome::Row(row) => rows.push(row),
                Outcome::Skipped(skip) => skipped.push(skip),
                Outcome::Cancelled => cancelled = true,
            }
        }

        let ranking = self.options.ranking;
        rows.sort_by(|a, b| {
            ranking
                .compare(&a.report, &b.report)
                .then_with(|| a.index.cmp(&b.index))
        });

        if cancelled {
            warn!(
                evaluated = rows.len(),
                skipped = skipped.len(),
                grid_size = total,
                "sweep cancelled"
            );
        } else {
            info!(
                evaluated = rows.len(),
                skipped = skipped.len(),
                "sweep finished"
            );
        }

        Ok(SweepResult {
            strategy: kind,
            ranking,
            grid_size: total,
            rows,
            skipped,
            cancelled,
        })
    }

    /// Validate, simulate, and score one combination.
    fn evaluate(
        &self,
        kind: StrategyKind,
        index: usize,
        params: &StrategyParams,
        series: &PriceSeries,
        engine: &SimulationEngine<'_>,
    ) -> Result<Outcome, BacktestError> {
        let strategy = match kind.build(params) {
            Ok(strategy) => strategy,
            Err(e) => {
                warn!(index, params = %params, reason = %e, "combination skipped");
                return Ok(Outcome::Skipped(SkippedCombination {
                    index,
                    params: params.clone(),
                    reason: e.to_string(),
                }));
            }
        };
        let signals = strategy.generate_signals(series);
        let sim = engine.run(series, &signals)?;
        let report =
            PerformanceReport::compute(&sim.equity_curve, &sim.trades, None, &self.options.metrics);
        Ok(Outcome::Row(SweepRow {
            index,
            params: params.clone(),
            fingerprint: params.fingerprint(kind.name()),
            report,
        }))
    }
}
