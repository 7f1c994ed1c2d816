//! Error taxonomy for the backtesting core.
//!
//! - `ConfigurationError`: parameters that a strategy or cost model cannot accept.
//! - `ValidationError`: structurally inconsistent inputs (length mismatches, empty series).
//! - `DataQualityError`: unusable market data (NaN, non-positive prices, unordered dates).
//!
//! `BacktestError` wraps all three so callers can `?` through a whole run and
//! still branch on the failure kind.

use chrono::NaiveDate;
use thiserror::Error;

/// Invalid or mutually inconsistent strategy / engine parameters.
///
/// Inside a parameter sweep these are recorded as skipped rows, never fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("{strategy}: invalid parameter '{name}': {reason}")]
    InvalidParameter {
        strategy: &'static str,
        name: String,
        reason: String,
    },

    #[error("{strategy}: unknown parameter '{name}'")]
    UnknownParameter { strategy: &'static str, name: String },

    #[error("{strategy}: strategy is not implemented")]
    NotImplemented { strategy: &'static str },

    #[error("initial capital must be positive and finite, got {0}")]
    InvalidCapital(f64),

    #[error("invalid cost model: {reason}")]
    InvalidCost { reason: String },

    #[error("invalid risk limit: {reason}")]
    InvalidRiskLimit { reason: String },
}

/// Structural mismatch between inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("signal series length {signals} does not match price series length {prices}")]
    LengthMismatch { prices: usize, signals: usize },

    #[error("price series is empty")]
    EmptySeries,
}

/// The supplied price series cannot be simulated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataQualityError {
    #[error("bar {index} ({date}): {field} is not finite")]
    NonFinitePrice {
        index: usize,
        date: NaiveDate,
        field: &'static str,
    },

    #[error("bar {index} ({date}): {field} must be positive, got {value}")]
    NonPositivePrice {
        index: usize,
        date: NaiveDate,
        field: &'static str,
        value: f64,
    },

    #[error("bar {index}: date {date} does not follow {previous}")]
    NonMonotonicDate {
        index: usize,
        previous: NaiveDate,
        date: NaiveDate,
    },
}

/// Any failure that can abort a single backtest.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("data quality error: {0}")]
    DataQuality(#[from] DataQualityError),
}

impl BacktestError {
    /// Stable label for display and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Validation(_) => "validation",
            Self::DataQuality(_) => "data_quality",
        }
    }

    /// Configuration errors only invalidate one parameter set; everything else
    /// means the input itself is unusable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Configuration(_))
    }
}
