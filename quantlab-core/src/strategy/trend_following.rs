//! Time-series momentum: the sign of the trailing `lookback`-bar return.
//!
//! momentum[t] = close[t] / close[t - lookback] - 1
//! Long above `threshold`, short below `-threshold` when allowed, flat
//! in between. Warmup: `lookback` bars.

use super::params::{ParamReader, ParamSpec};
use super::{Strategy, StrategyKind};
use crate::domain::{PriceBar, StrategyParams, TargetPosition};
use crate::error::ConfigurationError;
use crate::indicators::{Indicator, Roc};

pub const PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "lookback",
        default: 60.0,
        description: "momentum lookback in bars",
    },
    ParamSpec {
        name: "threshold",
        default: 0.0,
        description: "minimum |momentum| (fraction) to take a position",
    },
    ParamSpec {
        name: "allow_short",
        default: 0.0,
        description: "1 = short negative momentum, 0 = go flat",
    },
];

#[derive(Debug, Clone)]
pub struct TrendFollowing {
    lookback: usize,
    threshold: f64,
    allow_short: bool,
}

impl TrendFollowing {
    pub fn from_params(params: &StrategyParams) -> Result<Self, ConfigurationError> {
        let r = ParamReader::new(StrategyKind::TrendFollowing.name(), PARAMS, params)?;
        Ok(Self {
            lookback: r.count("lookback", 1)?,
            threshold: r.non_negative("threshold")?,
            allow_short: r.flag("allow_short")?,
        })
    }
}

impl Strategy for TrendFollowing {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TrendFollowing
    }

    fn warmup_bars(&self) -> usize {
        self.lookback
    }

    fn targets(&self, bars: &[PriceBar]) -> Vec<TargetPosition> {
        Roc::new(self.lookback)
            .compute(bars)
            .into_iter()
            .map(|m| {
                if m.is_nan() {
                    TargetPosition::Flat
                } else if m > self.threshold {
                    TargetPosition::Long
                } else if m < -self.threshold && self.allow_short {
                    TargetPosition::Short
                } else {
                    TargetPosition::Flat
                }
            })
            .collect()
    }
}
