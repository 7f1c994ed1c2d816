//! Causal indicators over close prices.
//!
//! Every indicator is a pure function of bar history: a full series in, a
//! same-length series out, `f64::NAN` until the lookback is satisfied.
//!
//! # Look-ahead guard
//! No value at bar t may depend on bar t+1 or later. `tests/lookahead_test.rs`
//! checks every indicator against truncated copies of the same series.

pub mod roc;
pub mod sma;
pub mod zscore;

pub use roc::Roc;
pub use sma::Sma;
pub use zscore::ZScore;

use crate::domain::PriceBar;

pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20").
    fn name(&self) -> &str;

    /// Index of the first valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[PriceBar]) -> Vec<f64>;
}

/// Create flat bars from close prices for testing.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<PriceBar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar::flat(base_date + chrono::Duration::days(i as i64), close))
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
