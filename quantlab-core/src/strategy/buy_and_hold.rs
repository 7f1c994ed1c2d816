//! Buy-and-hold: long from the first bar after warmup until the end.

use super::params::{ParamReader, ParamSpec};
use super::{Strategy, StrategyKind};
use crate::domain::{PriceBar, StrategyParams, TargetPosition};
use crate::error::ConfigurationError;

pub const PARAMS: &[ParamSpec] = &[ParamSpec {
    name: "warmup",
    default: 0.0,
    description: "bars to stay flat before entering",
}];

#[derive(Debug, Clone)]
pub struct BuyAndHold {
    warmup: usize,
}

impl BuyAndHold {
    pub fn new(warmup: usize) -> Self {
        Self { warmup }
    }

    pub fn from_params(params: &StrategyParams) -> Result<Self, ConfigurationError> {
        let r = ParamReader::new(StrategyKind::BuyAndHold.name(), PARAMS, params)?;
        Ok(Self::new(r.count("warmup", 0)?))
    }
}

impl Strategy for BuyAndHold {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BuyAndHold
    }

    fn warmup_bars(&self) -> usize {
        self.warmup
    }

    fn targets(&self, bars: &[PriceBar]) -> Vec<TargetPosition> {
        vec![TargetPosition::Long; bars.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::series;

    #[test]
    fn long_from_first_bar() {
        let signals = BuyAndHold::new(0).generate_signals(&series(&[1.0, 2.0, 3.0]));
        assert!(signals.iter().all(|t| t == TargetPosition::Long));
        assert_eq!(signals.change_count(), 1);
    }

    #[test]
    fn warmup_bars_are_flat() {
        let signals = BuyAndHold::new(2).generate_signals(&series(&[1.0, 2.0, 3.0, 4.0]));
        use TargetPosition::*;
        assert_eq!(signals.as_slice(), &[Flat, Flat, Long, Long]);
    }

    #[test]
    fn warmup_longer_than_series_is_all_flat() {
        let signals = BuyAndHold::new(10).generate_signals(&series(&[1.0, 2.0, 3.0]));
        assert_eq!(signals.change_count(), 0);
        assert_eq!(signals.len(), 3);
    }
}
