//! Rolling z-score of the close.
//!
//! z[t] = (close[t] - mean) / stddev over the trailing `period` closes.
//! Uses population stddev (divide by N); a zero stddev yields z = 0.
//! Lookback: period - 1.

use super::Indicator;
use crate::domain::PriceBar;

#[derive(Debug, Clone)]
pub struct ZScore {
    period: usize,
    name: String,
}

impl ZScore {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "z-score period must be >= 2");
        Self {
            period,
            name: format!("zscore_{period}"),
        }
    }
}

impl Indicator for ZScore {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }

        let len = self.period as f64;
        for i in (self.period - 1)..n {
            let window = &bars[i + 1 - self.period..=i];
            let mean = window.iter().map(|b| b.close).sum::<f64>() / len;
            let variance = window
                .iter()
                .map(|b| {
                    let diff = b.close - mean;
                    diff * diff
                })
                .sum::<f64>()
                / len;
            let stddev = variance.sqrt();
            result[i] = if stddev < 1e-12 * mean.abs().max(1.0) {
                0.0
            } else {
                (bars[i].close - mean) / stddev
            };
        }

        result
    }
}
