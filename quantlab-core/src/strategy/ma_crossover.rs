//! Moving-average crossover.
//!
//! Long while SMA(short) > SMA(long): the position flips on the bar where
//! the short average crosses the long one, evaluated at that bar's close.
//! Below the long average the target is flat, or short when `allow_short`
//! is set. Equal averages (e.g. a constant price) are flat.
//!
//! Warmup: `long_window` bars.

use super::params::{ParamReader, ParamSpec};
use super::{Strategy, StrategyKind};
use crate::domain::{PriceBar, StrategyParams, TargetPosition};
use crate::error::ConfigurationError;
use crate::indicators::{Indicator, Sma};

pub const PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "short_window",
        default: 40.0,
        description: "fast SMA period",
    },
    ParamSpec {
        name: "long_window",
        default: 100.0,
        description: "slow SMA period, must exceed short_window",
    },
    ParamSpec {
        name: "allow_short",
        default: 0.0,
        description: "1 = go short below the slow SMA, 0 = go flat",
    },
];

#[derive(Debug, Clone)]
pub struct MaCrossover {
    short_window: usize,
    long_window: usize,
    allow_short: bool,
}

impl MaCrossover {
    pub fn from_params(params: &StrategyParams) -> Result<Self, ConfigurationError> {
        let r = ParamReader::new(StrategyKind::MaCrossover.name(), PARAMS, params)?;
        let short_window = r.count("short_window", 1)?;
        let long_window = r.count("long_window", 1)?;
        if short_window >= long_window {
            return Err(r.invalid(
                "short_window",
                format!("must be smaller than long_window ({short_window} >= {long_window})"),
            ));
        }
        Ok(Self {
            short_window,
            long_window,
            allow_short: r.flag("allow_short")?,
        })
    }
}

impl Strategy for MaCrossover {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MaCrossover
    }

    fn warmup_bars(&self) -> usize {
        self.long_window
    }

    fn targets(&self, bars: &[PriceBar]) -> Vec<TargetPosition> {
        let fast = Sma::new(self.short_window).compute(bars);
        let slow = Sma::new(self.long_window).compute(bars);

        fast.iter()
            .zip(&slow)
            .map(|(&f, &s)| {
                if f.is_nan() || s.is_nan() {
                    TargetPosition::Flat
                } else if f > s {
                    TargetPosition::Long
                } else if f < s && self.allow_short {
                    TargetPosition::Short
                } else {
                    TargetPosition::Flat
                }
            })
            .collect()
    }
}
