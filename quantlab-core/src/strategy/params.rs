//! Typed access to a `StrategyParams` map, with domain checks.

use crate::domain::StrategyParams;
use crate::error::ConfigurationError;

/// Declared parameter of a strategy: name, default, one-line description.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: f64,
    pub description: &'static str,
}

/// Reads parameters for one strategy, falling back to declared defaults.
pub(crate) struct ParamReader<'a> {
    strategy: &'static str,
    specs: &'static [ParamSpec],
    params: &'a StrategyParams,
}

impl<'a> ParamReader<'a> {
    /// Fails on any key not declared in `specs`.
    pub fn new(
        strategy: &'static str,
        specs: &'static [ParamSpec],
        params: &'a StrategyParams,
    ) -> Result<Self, ConfigurationError> {
        if let Some(unknown) = params
            .names()
            .find(|name| !specs.iter().any(|s| s.name == *name))
        {
            return Err(ConfigurationError::UnknownParameter {
                strategy,
                name: unknown.to_string(),
            });
        }
        Ok(Self {
            strategy,
            specs,
            params,
        })
    }

    pub fn invalid(&self, name: &str, reason: impl Into<String>) -> ConfigurationError {
        ConfigurationError::InvalidParameter {
            strategy: self.strategy,
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    fn raw(&self, name: &str) -> f64 {
        self.params.get(name).unwrap_or_else(|| {
            self.specs
                .iter()
                .find(|s| s.name == name)
                .map_or(f64::NAN, |s| s.default)
        })
    }

    /// Finite number.
    pub fn number(&self, name: &str) -> Result<f64, ConfigurationError> {
        let v = self.raw(name);
        if !v.is_finite() {
            return Err(self.invalid(name, format!("must be finite, got {v}")));
        }
        Ok(v)
    }

    /// Finite number >= 0.
    pub fn non_negative(&self, name: &str) -> Result<f64, ConfigurationError> {
        let v = self.number(name)?;
        if v < 0.0 {
            return Err(self.invalid(name, format!("must be >= 0, got {v}")));
        }
        Ok(v)
    }

    /// Whole number >= `min`.
    pub fn count(&self, name: &str, min: usize) -> Result<usize, ConfigurationError> {
        let v = self.number(name)?;
        if v.fract() != 0.0 {
            return Err(self.invalid(name, format!("must be a whole number, got {v}")));
        }
        if v < min as f64 {
            return Err(self.invalid(name, format!("must be >= {min}, got {v}")));
        }
        Ok(v as usize)
    }

    /// 0 or 1.
    pub fn flag(&self, name: &str) -> Result<bool, ConfigurationError> {
        match self.number(name)? {
            v if v == 0.0 => Ok(false),
            v if v == 1.0 => Ok(true),
            v => Err(self.invalid(name, format!("must be 0 or 1, got {v}"))),
        }
    }
}
