//! Domain types for QuantLab

pub mod bar;
pub mod equity;
pub mod params;
pub mod signal;
pub mod trade;

pub use bar::{PriceBar, PriceSeries};
pub use equity::{EquityCurve, EquityPoint};
pub use params::{ParamsFingerprint, StrategyParams};
pub use signal::{Direction, SignalSeries, TargetPosition};
pub use trade::Trade;
