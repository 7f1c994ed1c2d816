//! Rate of Change (ROC).
//!
//! Fractional price change over N bars.
//! ROC[t] = close[t] / close[t-period] - 1
//! Lookback: period.

use super::Indicator;
use crate::domain::PriceBar;

#[derive(Debug, Clone)]
pub struct Roc {
    period: usize,
    name: String,
}

impl Roc {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ROC period must be >= 1");
        Self {
            period,
            name: format!("roc_{period}"),
        }
    }
}

impl Indicator for Roc {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        for i in self.period..n {
            let prev = bars[i - self.period].close;
            if prev > 0.0 {
                result[i] = bars[i].close / prev - 1.0;
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn roc_basic() {
        let bars = make_bars(&[100.0, 110.0, 121.0]);
        let result = Roc::new(1).compute(&bars);
        assert!(result[0].is_nan());
        assert_approx(result[1], 0.1, DEFAULT_EPSILON);
        assert_approx(result[2], 0.1, DEFAULT_EPSILON);
    }

    #[test]
    fn roc_negative() {
        let bars = make_bars(&[100.0, 90.0, 80.0]);
        let result = Roc::new(2).compute(&bars);
        assert_approx(result[2], -0.2, DEFAULT_EPSILON);
    }

    #[test]
    fn roc_lookback() {
        assert_eq!(Roc::new(12).lookback(), 12);
    }
}
