//! Target positions and the signal series a strategy emits.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position a strategy wants to hold after observing a bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPosition {
    #[default]
    Flat,
    Long,
    Short,
}

impl TargetPosition {
    /// +1 for long, -1 for short, 0 for flat.
    pub fn sign(self) -> f64 {
        match self {
            Self::Flat => 0.0,
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }

    pub fn is_flat(self) -> bool {
        self == Self::Flat
    }

    /// Direction of the trade this target opens, if any.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Self::Flat => None,
            Self::Long => Some(Direction::Long),
            Self::Short => Some(Direction::Short),
        }
    }
}

impl fmt::Display for TargetPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

/// Side of an open trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

/// One target position per bar, aligned 1:1 with a `PriceSeries`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalSeries(Vec<TargetPosition>);

impl SignalSeries {
    pub fn new(targets: Vec<TargetPosition>) -> Self {
        Self(targets)
    }

    /// All-flat series of length `n`.
    pub fn flat(n: usize) -> Self {
        Self(vec![TargetPosition::Flat; n])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<TargetPosition> {
        self.0.get(index).copied()
    }

    pub fn as_slice(&self) -> &[TargetPosition] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = TargetPosition> + '_ {
        self.0.iter().copied()
    }

    /// Number of bars where the target differs from the previous bar's
    /// (the first bar compares against flat).
    pub fn change_count(&self) -> usize {
        let mut prev = TargetPosition::Flat;
        let mut changes = 0;
        for t in self.iter() {
            if t != prev {
                changes += 1;
            }
            prev = t;
        }
        changes
    }
}

impl From<Vec<TargetPosition>> for SignalSeries {
    fn from(v: Vec<TargetPosition>) -> Self {
        Self(v)
    }
}
