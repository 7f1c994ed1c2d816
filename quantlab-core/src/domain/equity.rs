//! EquityCurve: one (date, equity) point per bar of the simulated series.

use super::bar::PriceSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Ordered equity values produced by the simulation engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquityCurve {
    pub points: Vec<EquityPoint>,
}

impl EquityCurve {
    pub fn new(points: Vec<EquityPoint>) -> Self {
        Self { points }
    }

    /// Curve of a constant value over the given dates.
    pub fn constant(dates: &[NaiveDate], equity: f64) -> Self {
        Self::new(
            dates
                .iter()
                .map(|&date| EquityPoint { date, equity })
                .collect(),
        )
    }

    /// Passive benchmark: `capital` fully invested at the first close and
    /// held to the end, no costs.
    pub fn buy_and_hold(series: &PriceSeries, capital: f64) -> Self {
        let Some(first) = series.bars.first() else {
            return Self::default();
        };
        let units = capital / first.close;
        Self::new(
            series
                .bars
                .iter()
                .map(|b| EquityPoint {
                    date: b.date,
                    equity: capital + units * (b.close - first.close),
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.equity).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn initial(&self) -> Option<f64> {
        self.points.first().map(|p| p.equity)
    }

    pub fn final_value(&self) -> Option<f64> {
        self.points.last().map(|p| p.equity)
    }
}
