//! Mean reversion on the rolling z-score of the close.
//!
//! From flat: long when z < -entry_z, short when z > entry_z (if allowed).
//! An open long exits once z recovers to >= -exit_z; an open short once
//! z falls to <= exit_z. A move straight through the opposite entry band
//! reverses the position on the same bar.
//!
//! Warmup: `window` bars.

use super::params::{ParamReader, ParamSpec};
use super::{Strategy, StrategyKind};
use crate::domain::{PriceBar, StrategyParams, TargetPosition};
use crate::error::ConfigurationError;
use crate::indicators::{Indicator, ZScore};

pub const PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "window",
        default: 20.0,
        description: "rolling mean / stddev period",
    },
    ParamSpec {
        name: "entry_z",
        default: 2.0,
        description: "|z| beyond which a position is opened",
    },
    ParamSpec {
        name: "exit_z",
        default: 0.5,
        description: "|z| inside which an open position is closed",
    },
    ParamSpec {
        name: "allow_short",
        default: 1.0,
        description: "1 = fade rallies with a short, 0 = long only",
    },
];

#[derive(Debug, Clone)]
pub struct MeanReversion {
    window: usize,
    entry_z: f64,
    exit_z: f64,
    allow_short: bool,
}

impl MeanReversion {
    pub fn from_params(params: &StrategyParams) -> Result<Self, ConfigurationError> {
        let r = ParamReader::new(StrategyKind::MeanReversion.name(), PARAMS, params)?;
        let window = r.count("window", 2)?;
        let entry_z = r.non_negative("entry_z")?;
        let exit_z = r.non_negative("exit_z")?;
        if entry_z <= 0.0 {
            return Err(r.invalid("entry_z", "must be positive"));
        }
        if exit_z >= entry_z {
            return Err(r.invalid(
                "exit_z",
                format!("must be smaller than entry_z ({exit_z} >= {entry_z})"),
            ));
        }
        Ok(Self {
            window,
            entry_z,
            exit_z,
            allow_short: r.flag("allow_short")?,
        })
    }

    fn enter(&self, z: f64) -> TargetPosition {
        if z < -self.entry_z {
            TargetPosition::Long
        } else if z > self.entry_z && self.allow_short {
            TargetPosition::Short
        } else {
            TargetPosition::Flat
        }
    }

    fn step(&self, state: TargetPosition, z: f64) -> TargetPosition {
        match state {
            TargetPosition::Flat => self.enter(z),
            TargetPosition::Long if z >= -self.exit_z => self.enter(z),
            TargetPosition::Short if z <= self.exit_z => self.enter(z),
            held => held,
        }
    }
}

impl Strategy for MeanReversion {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MeanReversion
    }

    fn warmup_bars(&self) -> usize {
        self.window
    }

    fn targets(&self, bars: &[PriceBar]) -> Vec<TargetPosition> {
        let z = ZScore::new(self.window).compute(bars);
        let mut out = vec![TargetPosition::Flat; bars.len()];
        let mut state = TargetPosition::Flat;
        for i in self.warmup_bars()..bars.len() {
            state = self.step(state, z[i]);
            out[i] = state;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::series;

    fn params(window: f64, entry: f64, exit: f64) -> StrategyParams {
        StrategyParams::new()
            .with("window", window)
            .with("entry_z", entry)
            .with("exit_z", exit)
    }

    #[test]
    fn rejects_exit_not_below_entry() {
        assert!(MeanReversion::from_params(&params(20.0, 1.0, 1.0)).is_err());
        assert!(MeanReversion::from_params(&params(20.0, 1.0, 2.0)).is_err());
    }

    #[test]
    fn rejects_window_below_two() {
        assert!(MeanReversion::from_params(&params(1.0, 2.0, 0.5)).is_err());
    }

    #[test]
    fn dip_goes_long_then_exits_on_recovery() {
        let mut closes = vec![100.0; 10];
        closes.push(90.0); // sharp dip
        closes.extend([100.0; 10]);
        let s = MeanReversion::from_params(&params(5.0, 1.5, 0.5)).unwrap();
        let signals = s.generate_signals(&series(&closes));
        assert_eq!(signals.get(10), Some(TargetPosition::Long));
        assert_eq!(signals.get(20), Some(TargetPosition::Flat));
    }

    #[test]
    fn spike_goes_short_only_when_allowed() {
        let mut closes = vec![100.0; 10];
        closes.push(110.0);
        let s = MeanReversion::from_params(&params(5.0, 1.5, 0.5)).unwrap();
        assert_eq!(
            s.generate_signals(&series(&closes)).get(10),
            Some(TargetPosition::Short)
        );

        let s = MeanReversion::from_params(&params(5.0, 1.5, 0.5).with("allow_short", 0.0))
            .unwrap();
        assert_eq!(
            s.generate_signals(&series(&closes)).get(10),
            Some(TargetPosition::Flat)
        );
    }

    #[test]
    fn constant_prices_stay_flat() {
        let s = MeanReversion::from_params(&StrategyParams::new()).unwrap();
        assert_eq!(s.generate_signals(&series(&[50.0; 100])).change_count(), 0);
    }
}
