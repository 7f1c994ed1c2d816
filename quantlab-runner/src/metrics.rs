//! Performance metrics: pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity values and/or trade list in,
//! scalar out. Degenerate inputs (flat equity, no trades, a single bar)
//! yield 0 rather than NaN or infinity.

use chrono::{Datelike, NaiveDate};
use quantlab_core::domain::{EquityCurve, Trade};
use serde::{Deserialize, Serialize};

/// Annualization and risk-free inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsOptions {
    /// Annual risk-free rate as a fraction.
    pub risk_free_rate: f64,
    pub trading_days_per_year: u32,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.0,
            trading_days_per_year: 252,
        }
    }
}

impl MetricsOptions {
    fn periods(&self) -> f64 {
        f64::from(self.trading_days_per_year.max(1))
    }
}

/// Headline statistics of a benchmark curve next to the strategy's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub total_return: f64,
    pub cagr: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    /// Strategy total return minus benchmark total return.
    pub excess_return: f64,
}

impl BenchmarkComparison {
    pub fn compute(benchmark: &[f64], strategy_total_return: f64, opts: &MetricsOptions) -> Self {
        let total = total_return(benchmark);
        Self {
            total_return: total,
            cagr: cagr(benchmark, opts.trading_days_per_year),
            annualized_volatility: annualized_volatility(benchmark, opts.trading_days_per_year),
            sharpe_ratio: sharpe_ratio(benchmark, opts),
            max_drawdown: max_drawdown(benchmark),
            excess_return: finite_or_zero(strategy_total_return - total),
        }
    }
}

/// Aggregate performance statistics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub total_return: f64,
    pub cagr: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    /// Negative fraction in [-1, 0].
    pub max_drawdown: f64,
    /// Longest run of consecutive bars below a prior peak.
    pub max_drawdown_duration: usize,
    pub calmar_ratio: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub trade_count: usize,
    pub final_equity: f64,
    pub bar_count: usize,
    pub benchmark: Option<BenchmarkComparison>,
}

impl PerformanceReport {
    /// Compute all metrics from an equity curve, its closed trades, and an
    /// optional benchmark curve. Does not mutate its inputs.
    pub fn compute(
        equity_curve: &EquityCurve,
        trades: &[Trade],
        benchmark: Option<&EquityCurve>,
        opts: &MetricsOptions,
    ) -> Self {
        let eq = equity_curve.values();
        let days = opts.trading_days_per_year;
        let total = total_return(&eq);
        Self {
            total_return: total,
            cagr: cagr(&eq, days),
            annualized_volatility: annualized_volatility(&eq, days),
            sharpe_ratio: sharpe_ratio(&eq, opts),
            sortino_ratio: sortino_ratio(&eq, opts),
            max_drawdown: max_drawdown(&eq),
            max_drawdown_duration: max_drawdown_duration(&eq),
            calmar_ratio: calmar_ratio(&eq, days),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            trade_count: trades.len(),
            final_equity: eq.last().copied().unwrap_or(0.0),
            bar_count: eq.len(),
            benchmark: benchmark
                .map(|b| BenchmarkComparison::compute(&b.values(), total, opts)),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: final / initial - 1.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    let (Some(&initial), Some(&final_eq)) = (equity_curve.first(), equity_curve.last()) else {
        return 0.0;
    };
    if initial <= 0.0 {
        return 0.0;
    }
    finite_or_zero(final_eq / initial - 1.0)
}

/// Compound annual growth rate: (final / initial)^(days_per_year / n_bars) - 1.
///
/// A curve that ends at or below zero reports -1 (total loss).
pub fn cagr(equity_curve: &[f64], trading_days_per_year: u32) -> f64 {
    let (Some(&initial), Some(&final_eq)) = (equity_curve.first(), equity_curve.last()) else {
        return 0.0;
    };
    if initial <= 0.0 {
        return 0.0;
    }
    if final_eq <= 0.0 {
        return -1.0;
    }
    let exponent = f64::from(trading_days_per_year) / equity_curve.len() as f64;
    finite_or_zero((final_eq / initial).powf(exponent) - 1.0)
}

/// Sample standard deviation of per-bar returns, annualized.
pub fn annualized_volatility(equity_curve: &[f64], trading_days_per_year: u32) -> f64 {
    let returns = bar_returns(equity_curve);
    finite_or_zero(std_dev(&returns) * f64::from(trading_days_per_year).sqrt())
}

/// Annualized Sharpe ratio from per-bar returns.
///
/// Sharpe = (mean(returns) - rf / days) / std(returns) * sqrt(days).
/// Returns 0.0 if the standard deviation is zero or there are fewer than 2 returns.
pub fn sharpe_ratio(equity_curve: &[f64], opts: &MetricsOptions) -> f64 {
    let returns = bar_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let periods = opts.periods();
    let excess = mean_f64(&returns) - opts.risk_free_rate / periods;
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    finite_or_zero(excess / std * periods.sqrt())
}

/// Annualized Sortino ratio (downside deviation only).
///
/// Downside deviation is the root mean square of negative excess returns,
/// taken over all periods. Returns 0.0 when there is no downside.
pub fn sortino_ratio(equity_curve: &[f64], opts: &MetricsOptions) -> f64 {
    let returns = bar_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let periods = opts.periods();
    let per_bar_rf = opts.risk_free_rate / periods;
    let excess: Vec<f64> = returns.iter().map(|r| r - per_bar_rf).collect();

    let downside_sq: f64 = excess.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    if downside_sq == 0.0 {
        return 0.0;
    }
    let downside_std = (downside_sq / excess.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    finite_or_zero(mean_f64(&excess) / downside_std * periods.sqrt())
}

/// Calmar ratio: CAGR / |max_drawdown|. 0.0 when there is no drawdown.
pub fn calmar_ratio(equity_curve: &[f64], trading_days_per_year: u32) -> f64 {
    let dd = max_drawdown(equity_curve);
    if dd == 0.0 {
        return 0.0;
    }
    finite_or_zero(cagr(equity_curve, trading_days_per_year) / dd.abs())
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Single running-peak pass. Clamped to -1.0 if equity falls through zero.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (eq - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd.max(-1.0)
}

/// Longest streak of consecutive bars strictly below the running peak.
pub fn max_drawdown_duration(equity_curve: &[f64]) -> usize {
    let Some(&first) = equity_curve.first() else {
        return 0;
    };
    let mut peak = first;
    let mut current = 0;
    let mut longest = 0;

    for &eq in equity_curve {
        if eq >= peak {
            peak = eq;
            current = 0;
        } else {
            current += 1;
            longest = longest.max(current);
        }
    }
    longest
}

/// Fraction of closed trades with positive net PnL. 0.0 with no trades.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Profit factor: gross profits / gross losses.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.net_pnl > 0.0)
        .map(|t| t.net_pnl)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.net_pnl < 0.0)
        .map(|t| t.net_pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

// ─── Calendar aggregation ───────────────────────────────────────────

/// Calendar bucket for [`period_returns`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Weekly,
    Monthly,
    Yearly,
}

impl Period {
    fn label(self, date: NaiveDate) -> String {
        match self {
            Self::Weekly => {
                let w = date.iso_week();
                format!("{}-W{:02}", w.year(), w.week())
            }
            Self::Monthly => format!("{}-{:02}", date.year(), date.month()),
            Self::Yearly => date.year().to_string(),
        }
    }
}

/// Compounded return of one calendar bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodReturn {
    pub period: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total_return: f64,
}

/// Compound per-bar returns into calendar buckets.
///
/// Each bucket's return runs from the last equity of the previous bucket
/// (or the curve's first point) to its own last equity.
pub fn period_returns(curve: &EquityCurve, period: Period) -> Vec<PeriodReturn> {
    let mut out: Vec<PeriodReturn> = Vec::new();
    let Some(first) = curve.points.first() else {
        return out;
    };
    let mut base = first.equity;
    let mut label = period.label(first.date);
    let mut start = first.date;
    let mut last = *first;

    let mut flush = |label: String, start: NaiveDate, last_date: NaiveDate, base: f64, end_eq: f64| {
        let r = if base > 0.0 { end_eq / base - 1.0 } else { 0.0 };
        out.push(PeriodReturn {
            period: label,
            start,
            end: last_date,
            total_return: finite_or_zero(r),
        });
    };

    for point in &curve.points[1..] {
        let this_label = period.label(point.date);
        if this_label != label {
            flush(label, start, last.date, base, last.equity);
            base = last.equity;
            label = this_label;
            start = point.date;
        }
        last = *point;
    }
    flush(label, start, last.date, base, last.equity);
    out
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple per-bar percentage change of equity.
pub fn bar_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}
