//! QuantLab Core — price series, strategies, and the simulation engine.
//!
//! This crate contains the deterministic heart of the backtester:
//! - Domain types (price bars, signal series, trades, equity curves, parameter sets)
//! - Error taxonomy (configuration / validation / data quality)
//! - Causal indicators (SMA, rolling z-score, rate of change)
//! - Strategy trait and its variants, dispatched through `StrategyKind`
//! - Single-pass simulation engine with pluggable cost models
//!
//! Nothing here performs I/O or holds shared mutable state; every run is a
//! pure function of its inputs.

pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod strategy;

pub use domain::{
    Direction, EquityCurve, EquityPoint, ParamsFingerprint, PriceBar, PriceSeries, SignalSeries,
    StrategyParams, TargetPosition, Trade,
};
pub use engine::{
    simulate, CostModel, FlatFee, NoCost, PercentageFee, RiskLimits, SimulationEngine,
    SimulationResult, Slippage,
};
pub use error::{BacktestError, ConfigurationError, DataQualityError, ValidationError};
pub use strategy::{Strategy, StrategyKind};
