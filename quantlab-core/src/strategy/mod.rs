//! Strategies: price history + parameters in, one target position per bar out.
//!
//! `StrategyKind` is the tagged dispatch callers use: it validates a parameter
//! set, reports the warmup requirement, and generates signals. Concrete
//! variants implement the `Strategy` trait.
//!
//! # Look-ahead guard
//! The target at bar i may only depend on `bars[..=i]`. Bars before
//! `warmup_bars()` are always flat; that is policy, not an error.

pub mod buy_and_hold;
pub mod ma_crossover;
pub mod mean_reversion;
pub mod params;
pub mod trend_following;

pub use buy_and_hold::BuyAndHold;
pub use ma_crossover::MaCrossover;
pub use mean_reversion::MeanReversion;
pub use params::ParamSpec;
pub use trend_following::TrendFollowing;

use crate::domain::{PriceBar, PriceSeries, SignalSeries, StrategyParams, TargetPosition};
use crate::error::{BacktestError, ConfigurationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A configured, validated strategy instance.
pub trait Strategy: Send + Sync + fmt::Debug {
    fn kind(&self) -> StrategyKind;

    /// Bars of history required before the first non-flat target.
    fn warmup_bars(&self) -> usize;

    /// Raw target for every bar, same length as `bars`.
    ///
    /// The implementation must only use data from `bars[0..=i]` for index i.
    fn targets(&self, bars: &[PriceBar]) -> Vec<TargetPosition>;

    /// Targets with the warmup window forced flat.
    fn generate_signals(&self, series: &PriceSeries) -> SignalSeries {
        let mut targets = self.targets(&series.bars);
        debug_assert_eq!(targets.len(), series.len());
        let warmup = self.warmup_bars().min(targets.len());
        targets[..warmup].fill(TargetPosition::Flat);
        SignalSeries::new(targets)
    }
}

/// Every strategy variant the engine knows about.
///
/// The last three are reserved names: they parse and appear in listings but
/// fail validation with `ConfigurationError::NotImplemented`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    BuyAndHold,
    MaCrossover,
    MeanReversion,
    TrendFollowing,
    IndexRebalancing,
    PairsTrading,
    BasketTrading,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 7] = [
        Self::BuyAndHold,
        Self::MaCrossover,
        Self::MeanReversion,
        Self::TrendFollowing,
        Self::IndexRebalancing,
        Self::PairsTrading,
        Self::BasketTrading,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::BuyAndHold => "buy_and_hold",
            Self::MaCrossover => "ma_crossover",
            Self::MeanReversion => "mean_reversion",
            Self::TrendFollowing => "trend_following",
            Self::IndexRebalancing => "index_rebalancing",
            Self::PairsTrading => "pairs_trading",
            Self::BasketTrading => "basket_trading",
        }
    }

    pub fn is_placeholder(self) -> bool {
        matches!(
            self,
            Self::IndexRebalancing | Self::PairsTrading | Self::BasketTrading
        )
    }

    /// Declared parameters with their defaults.
    pub fn parameters(self) -> &'static [ParamSpec] {
        match self {
            Self::BuyAndHold => buy_and_hold::PARAMS,
            Self::MaCrossover => ma_crossover::PARAMS,
            Self::MeanReversion => mean_reversion::PARAMS,
            Self::TrendFollowing => trend_following::PARAMS,
            Self::IndexRebalancing | Self::PairsTrading | Self::BasketTrading => &[],
        }
    }

    /// Construct a validated strategy instance.
    pub fn build(self, params: &StrategyParams) -> Result<Box<dyn Strategy>, ConfigurationError> {
        match self {
            Self::BuyAndHold => Ok(Box::new(BuyAndHold::from_params(params)?)),
            Self::MaCrossover => Ok(Box::new(MaCrossover::from_params(params)?)),
            Self::MeanReversion => Ok(Box::new(MeanReversion::from_params(params)?)),
            Self::TrendFollowing => Ok(Box::new(TrendFollowing::from_params(params)?)),
            Self::IndexRebalancing | Self::PairsTrading | Self::BasketTrading => {
                Err(ConfigurationError::NotImplemented {
                    strategy: self.name(),
                })
            }
        }
    }

    pub fn validate(self, params: &StrategyParams) -> Result<(), ConfigurationError> {
        self.build(params).map(|_| ())
    }

    pub fn required_warmup_bars(self, params: &StrategyParams) -> Result<usize, ConfigurationError> {
        Ok(self.build(params)?.warmup_bars())
    }

    /// Validate the parameters and the series, then emit one target per bar.
    pub fn generate_signals(
        self,
        series: &PriceSeries,
        params: &StrategyParams,
    ) -> Result<SignalSeries, BacktestError> {
        let strategy = self.build(params)?;
        series.validate()?;
        Ok(strategy.generate_signals(series))
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    /// Accepts snake_case or kebab-case names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|k| k.name() == normalized)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|k| k.name()).collect();
                format!("unknown strategy '{s}' (expected one of: {})", names.join(", "))
            })
    }
}
