//! Pre-trade risk limits applied by the engine at every entry.
//!
//! Two rules, both checked against equity at the moment of entry:
//! - position cap: a new trade uses at most `max_position_fraction` of equity
//! - drawdown halt: once equity has fallen more than `max_drawdown_halt`
//!   below its high-water mark, new entries are refused. Exits are never blocked.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Fraction of current equity committed to a new position, in (0, 1].
    pub max_position_fraction: f64,
    /// Drawdown from the high-water mark, in (0, 1), beyond which entries stop.
    pub max_drawdown_halt: Option<f64>,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_fraction: 1.0,
            max_drawdown_halt: None,
        }
    }
}

impl RiskLimits {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let f = self.max_position_fraction;
        if !f.is_finite() || f <= 0.0 || f > 1.0 {
            return Err(ConfigurationError::InvalidRiskLimit {
                reason: format!("max_position_fraction must be in (0, 1], got {f}"),
            });
        }
        if let Some(halt) = self.max_drawdown_halt {
            if !halt.is_finite() || halt <= 0.0 || halt >= 1.0 {
                return Err(ConfigurationError::InvalidRiskLimit {
                    reason: format!("max_drawdown_halt must be in (0, 1), got {halt}"),
                });
            }
        }
        Ok(())
    }

    /// Whether `equity` sits deeper below `high_water` than the halt allows.
    pub fn is_halted(&self, equity: f64, high_water: f64) -> bool {
        match self.max_drawdown_halt {
            Some(limit) if high_water > 0.0 => (high_water - equity) / high_water > limit,
            _ => false,
        }
    }

    /// Capital committed to a new position out of `equity`.
    pub fn position_capital(&self, equity: f64) -> f64 {
        equity * self.max_position_fraction
    }
}
