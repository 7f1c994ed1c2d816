//! Parameter grid: named axes of candidate values, expanded as a Cartesian product.
//!
//! Axes keep insertion order (document order when read from TOML) and the
//! last axis varies fastest, so combination indices are stable.

use quantlab_core::domain::StrategyParams;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("grid axis '{name}': {reason}")]
    InvalidRange { name: String, reason: String },

    #[error("grid axis '{0}' has no values")]
    EmptyAxis(String),
}

/// One axis as written in a run file: a list or an inclusive range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GridAxis {
    Values(Vec<f64>),
    Range { start: f64, end: f64, step: f64 },
}

impl GridAxis {
    /// Expand to concrete values.
    pub fn expand(&self, name: &str) -> Result<Vec<f64>, GridError> {
        let values = match *self {
            Self::Values(ref v) => v.clone(),
            Self::Range { start, end, step } => inclusive_range(name, start, end, step)?,
        };
        if values.is_empty() {
            return Err(GridError::EmptyAxis(name.to_string()));
        }
        Ok(values)
    }
}

fn inclusive_range(name: &str, start: f64, end: f64, step: f64) -> Result<Vec<f64>, GridError> {
    let invalid = |reason: &str| GridError::InvalidRange {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if !(start.is_finite() && end.is_finite() && step.is_finite()) {
        return Err(invalid("bounds and step must be finite"));
    }
    if step <= 0.0 {
        return Err(invalid("step must be positive"));
    }
    if start > end {
        return Err(invalid("start must not exceed end"));
    }
    let steps = ((end - start) / step + 1e-9).floor() as usize;
    Ok((0..=steps)
        .map(|i| round10(start + i as f64 * step))
        .collect())
}

fn round10(x: f64) -> f64 {
    (x * 1e10).round() / 1e10
}

/// Candidate values per parameter, plus fixed base parameters shared by
/// every combination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterGrid {
    axes: Vec<(String, Vec<f64>)>,
    base: StrategyParams,
}

impl ParameterGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed parameters merged under every combination. Axis values win.
    pub fn with_base(mut self, base: StrategyParams) -> Self {
        self.base = base;
        self
    }

    /// Add (or replace in place) an axis with explicit values.
    pub fn with_values(mut self, name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        self.set_axis(name.into(), values.into_iter().collect());
        self
    }

    /// Add an inclusive `start..=end` axis stepping by `step`.
    pub fn with_range(
        mut self,
        name: impl Into<String>,
        start: f64,
        end: f64,
        step: f64,
    ) -> Result<Self, GridError> {
        let name = name.into();
        let values = inclusive_range(&name, start, end, step)?;
        self.set_axis(name, values);
        Ok(self)
    }

    pub fn add_axis(&mut self, name: impl Into<String>, axis: &GridAxis) -> Result<(), GridError> {
        let name = name.into();
        let values = axis.expand(&name)?;
        self.set_axis(name, values);
        Ok(())
    }

    fn set_axis(&mut self, name: String, values: Vec<f64>) {
        match self.axes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = values,
            None => self.axes.push((name, values)),
        }
    }

    pub fn axes(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.axes.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    pub fn base(&self) -> &StrategyParams {
        &self.base
    }

    /// Number of combinations. A grid with no axes has exactly one (the base).
    pub fn size(&self) -> usize {
        self.axes.iter().map(|(_, v)| v.len()).product()
    }

    /// All combinations in insertion order, last axis fastest.
    pub fn combinations(&self) -> Vec<StrategyParams> {
        let total = self.size();
        let mut out = Vec::with_capacity(total);
        if total == 0 {
            return out;
        }
        let mut cursor = vec![0usize; self.axes.len()];
        for _ in 0..total {
            let mut params = self.base.clone();
            for ((name, values), &i) in self.axes.iter().zip(&cursor) {
                params.insert(name.clone(), values[i]);
            }
            out.push(params);

            for (pos, (_, values)) in self.axes.iter().enumerate().rev() {
                cursor[pos] += 1;
                if cursor[pos] < values.len() {
                    break;
                }
                cursor[pos] = 0;
            }
        }
        out
    }
}

impl Serialize for ParameterGrid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.axes.len()))?;
        for (name, values) in &self.axes {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ParameterGrid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GridVisitor;

        impl<'de> Visitor<'de> for GridVisitor {
            type Value = ParameterGrid;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table of parameter name to value list or {start, end, step}")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut grid = ParameterGrid::new();
                while let Some((name, axis)) = access.next_entry::<String, GridAxis>()? {
                    grid.add_axis(name, &axis).map_err(serde::de::Error::custom)?;
                }
                Ok(grid)
            }
        }

        deserializer.deserialize_map(GridVisitor)
    }
}
