//! PriceBar and PriceSeries: the daily market data the engine replays.

use crate::error::DataQualityError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single asset on a single trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    /// Bar with open = high = low = close.
    pub fn flat(date: NaiveDate, price: f64) -> Self {
        Self {
            date,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0,
        }
    }

    fn prices(&self) -> [(&'static str, f64); 4] {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ]
    }

    /// Check that every price field is finite and positive.
    pub fn check(&self, index: usize) -> Result<(), DataQualityError> {
        for (field, value) in self.prices() {
            if !value.is_finite() {
                return Err(DataQualityError::NonFinitePrice {
                    index,
                    date: self.date,
                    field,
                });
            }
            if value <= 0.0 {
                return Err(DataQualityError::NonPositivePrice {
                    index,
                    date: self.date,
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Ordered daily bars for one asset.
///
/// Construction does not validate; call [`PriceSeries::validate`] (the engine
/// and sweep driver do) before trusting the invariants: strictly increasing
/// dates and finite, positive prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    /// Build a series of flat bars from closes on consecutive calendar days.
    pub fn from_closes(symbol: impl Into<String>, start: NaiveDate, closes: &[f64]) -> Self {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::flat(start + chrono::Duration::days(i as i64), c))
            .collect();
        Self::new(symbol, bars)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Verify price sanity and strict date ordering.
    ///
    /// An empty series passes here; the engine rejects it separately as a
    /// structural problem.
    pub fn validate(&self) -> Result<(), DataQualityError> {
        let mut previous: Option<NaiveDate> = None;
        for (index, bar) in self.bars.iter().enumerate() {
            bar.check(index)?;
            if let Some(prev) = previous {
                if bar.date <= prev {
                    return Err(DataQualityError::NonMonotonicDate {
                        index,
                        previous: prev,
                        date: bar.date,
                    });
                }
            }
            previous = Some(bar.date);
        }
        Ok(())
    }

    /// Bars within `[start, end]`, both bounds optional and inclusive.
    pub fn slice_dates(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> PriceSeries {
        let bars = self
            .bars
            .iter()
            .filter(|b| start.map_or(true, |s| b.date >= s))
            .filter(|b| end.map_or(true, |e| b.date <= e))
            .cloned()
            .collect();
        PriceSeries::new(self.symbol.clone(), bars)
    }

    /// The first `n` bars (or all of them if shorter).
    pub fn prefix(&self, n: usize) -> PriceSeries {
        let n = n.min(self.bars.len());
        PriceSeries::new(self.symbol.clone(), self.bars[..n].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn valid_series_passes() {
        let s = PriceSeries::from_closes("SPY", d(1), &[100.0, 101.0, 102.0]);
        assert!(s.validate().is_ok());
        assert_eq!(s.len(), 3);
        assert_eq!(s.last_date(), Some(d(3)));
    }

    #[test]
    fn nan_close_is_rejected() {
        let s = PriceSeries::from_closes("SPY", d(1), &[100.0, f64::NAN, 102.0]);
        match s.validate() {
            Err(DataQualityError::NonFinitePrice { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected NonFinitePrice, got {other:?}"),
        }
    }

    #[test]
    fn zero_price_is_rejected() {
        let s = PriceSeries::from_closes("SPY", d(1), &[100.0, 0.0]);
        assert!(matches!(
            s.validate(),
            Err(DataQualityError::NonPositivePrice { index: 1, .. })
        ));
    }

    #[test]
    fn duplicate_date_is_rejected() {
        let mut s = PriceSeries::from_closes("SPY", d(1), &[100.0, 101.0, 102.0]);
        s.bars[2].date = d(2);
        assert!(matches!(
            s.validate(),
            Err(DataQualityError::NonMonotonicDate { index: 2, .. })
        ));
    }

    #[test]
    fn slice_dates_is_inclusive() {
        let s = PriceSeries::from_closes("SPY", d(1), &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let sliced = s.slice_dates(Some(d(2)), Some(d(4)));
        assert_eq!(sliced.closes(), vec![2.0, 3.0, 4.0]);
        assert_eq!(s.slice_dates(None, None).len(), 5);
    }

    #[test]
    fn prefix_clamps_to_length() {
        let s = PriceSeries::from_closes("SPY", d(1), &[1.0, 2.0, 3.0]);
        assert_eq!(s.prefix(2).len(), 2);
        assert_eq!(s.prefix(10).len(), 3);
    }
}
