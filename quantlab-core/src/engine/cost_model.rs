//! Cost models: transaction friction applied at every position change.
//!
//! The engine only sees the `CostModel` trait: a fill price adjustment
//! (slippage) and a commission per fill. Concrete policies:
//! - `NoCost`: frictionless.
//! - `FlatFee`: fixed amount per fill.
//! - `PercentageFee`: fraction of fill notional.
//! - `Slippage`: adverse price move in basis points, wrapping another model.
//!
//! Slippage is directional: buyers pay more, sellers receive less.

use crate::error::ConfigurationError;
use std::fmt;

/// Side of a single fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

pub trait CostModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Price actually obtained for a fill at `price`.
    fn fill_price(&self, price: f64, _side: OrderSide) -> f64 {
        price
    }

    /// Commission charged for one fill.
    fn commission(&self, fill_price: f64, quantity: f64) -> f64;
}

fn check_amount(value: f64, what: &str) -> Result<f64, ConfigurationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigurationError::InvalidCost {
            reason: format!("{what} must be finite and >= 0, got {value}"),
        });
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoCost;

impl CostModel for NoCost {
    fn name(&self) -> &str {
        "none"
    }

    fn commission(&self, _fill_price: f64, _quantity: f64) -> f64 {
        0.0
    }
}

/// Fixed commission per fill, regardless of size.
#[derive(Debug, Clone, Copy)]
pub struct FlatFee {
    fee: f64,
}

impl FlatFee {
    pub fn new(fee: f64) -> Result<Self, ConfigurationError> {
        Ok(Self {
            fee: check_amount(fee, "flat fee")?,
        })
    }
}

impl CostModel for FlatFee {
    fn name(&self) -> &str {
        "flat_fee"
    }

    fn commission(&self, _fill_price: f64, _quantity: f64) -> f64 {
        self.fee
    }
}

/// Commission as a fraction of fill notional (0.001 = 0.1%).
#[derive(Debug, Clone, Copy)]
pub struct PercentageFee {
    rate: f64,
}

impl PercentageFee {
    pub fn new(rate: f64) -> Result<Self, ConfigurationError> {
        let rate = check_amount(rate, "fee rate")?;
        if rate >= 1.0 {
            return Err(ConfigurationError::InvalidCost {
                reason: format!("fee rate must be below 1.0, got {rate}"),
            });
        }
        Ok(Self { rate })
    }
}

impl CostModel for PercentageFee {
    fn name(&self) -> &str {
        "percentage"
    }

    fn commission(&self, fill_price: f64, quantity: f64) -> f64 {
        fill_price * quantity.abs() * self.rate
    }
}

/// Deterministic adverse slippage layered on top of a commission model.
#[derive(Debug)]
pub struct Slippage {
    bps: f64,
    inner: Box<dyn CostModel>,
}

impl Slippage {
    pub fn new(bps: f64, inner: Box<dyn CostModel>) -> Result<Self, ConfigurationError> {
        let bps = check_amount(bps, "slippage bps")?;
        if bps >= 10_000.0 {
            return Err(ConfigurationError::InvalidCost {
                reason: format!("slippage must be below 10000 bps, got {bps}"),
            });
        }
        Ok(Self { bps, inner })
    }
}

impl CostModel for Slippage {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fill_price(&self, price: f64, side: OrderSide) -> f64 {
        let slip = self.bps / 10_000.0;
        let base = self.inner.fill_price(price, side);
        match side {
            OrderSide::Buy => base * (1.0 + slip),
            OrderSide::Sell => base * (1.0 - slip),
        }
    }

    fn commission(&self, fill_price: f64, quantity: f64) -> f64 {
        self.inner.commission(fill_price, quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_cost_returns_raw_price() {
        assert_eq!(NoCost.fill_price(100.0, OrderSide::Buy), 100.0);
        assert_eq!(NoCost.commission(100.0, 50.0), 0.0);
    }

    #[test]
    fn flat_fee_ignores_size() {
        let fee = FlatFee::new(1.0).unwrap();
        assert_eq!(fee.commission(100.0, 1.0), 1.0);
        assert_eq!(fee.commission(5.0, 10_000.0), 1.0);
    }

    #[test]
    fn percentage_scales_with_notional() {
        let fee = PercentageFee::new(0.001).unwrap();
        assert!((fee.commission(100.0, 1000.0) - 100.0).abs() < 1e-10);
    }

    #[test]
    fn buy_slippage_increases_price() {
        let cost = Slippage::new(10.0, Box::new(NoCost)).unwrap();
        assert!((cost.fill_price(100.0, OrderSide::Buy) - 100.10).abs() < 1e-10);
        assert!((cost.fill_price(100.0, OrderSide::Sell) - 99.90).abs() < 1e-10);
    }

    #[test]
    fn slippage_delegates_commission() {
        let cost = Slippage::new(5.0, Box::new(FlatFee::new(2.5).unwrap())).unwrap();
        assert_eq!(cost.commission(100.0, 10.0), 2.5);
        assert_eq!(cost.name(), "flat_fee");
    }

    #[test]
    fn invalid_amounts_are_rejected() {
        assert!(FlatFee::new(-1.0).is_err());
        assert!(PercentageFee::new(f64::NAN).is_err());
        assert!(PercentageFee::new(1.5).is_err());
        assert!(Slippage::new(-3.0, Box::new(NoCost)).is_err());
    }
}
