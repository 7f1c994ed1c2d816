//! Simulation engine: replays a signal series over a price series.
//!
//! Single forward pass, bar by bar. On every bar where the target differs
//! from the held position:
//! 1. close the open trade (if any) at this bar's close, net of costs
//! 2. open a new trade at this bar's close if the target is not flat
//!
//! Equity at each bar = realized cash + unrealized PnL marked at that bar's
//! close. Positions are sized at full notional by default: all available
//! cash, with fractional units. `RiskLimits` can cap that fraction and halt
//! new entries during a deep drawdown. A trade still open after the last bar
//! is liquidated at the final close and flagged `forced_close`.

pub mod cost_model;
pub mod risk;

pub use cost_model::{CostModel, FlatFee, NoCost, OrderSide, PercentageFee, Slippage};
pub use risk::RiskLimits;

use crate::domain::{
    Direction, EquityCurve, EquityPoint, PriceBar, PriceSeries, SignalSeries, TargetPosition,
    Trade,
};
use crate::error::{BacktestError, ConfigurationError, ValidationError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Trades and equity produced by one simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub trades: Vec<Trade>,
    pub equity_curve: EquityCurve,
}

/// Trade currently held by the engine.
#[derive(Debug, Clone)]
struct OpenTrade {
    direction: Direction,
    entry_bar: usize,
    entry_date: chrono::NaiveDate,
    entry_price: f64,
    size: f64,
    entry_cost: f64,
}

impl OpenTrade {
    fn unrealized(&self, price: f64) -> f64 {
        self.direction.sign() * (price - self.entry_price) * self.size
    }
}

fn entry_side(direction: Direction) -> OrderSide {
    match direction {
        Direction::Long => OrderSide::Buy,
        Direction::Short => OrderSide::Sell,
    }
}

fn exit_side(direction: Direction) -> OrderSide {
    match direction {
        Direction::Long => OrderSide::Sell,
        Direction::Short => OrderSide::Buy,
    }
}

/// Backtest simulator for one asset.
#[derive(Debug, Clone, Copy)]
pub struct SimulationEngine<'a> {
    initial_capital: f64,
    cost_model: &'a dyn CostModel,
    risk: RiskLimits,
}

impl<'a> SimulationEngine<'a> {
    pub fn new(
        initial_capital: f64,
        cost_model: &'a dyn CostModel,
    ) -> Result<Self, ConfigurationError> {
        if !initial_capital.is_finite() || initial_capital <= 0.0 {
            return Err(ConfigurationError::InvalidCapital(initial_capital));
        }
        Ok(Self {
            initial_capital,
            cost_model,
            risk: RiskLimits::default(),
        })
    }

    pub fn with_risk_limits(mut self, risk: RiskLimits) -> Result<Self, ConfigurationError> {
        risk.validate()?;
        self.risk = risk;
        Ok(self)
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn risk_limits(&self) -> &RiskLimits {
        &self.risk
    }

    /// Run the simulation.
    ///
    /// Fails with `ValidationError` when the series is empty or the lengths
    /// differ, and with `DataQualityError` on NaN / non-positive prices or
    /// unordered dates. Never produces NaN equity from valid input.
    pub fn run(
        &self,
        series: &PriceSeries,
        signals: &SignalSeries,
    ) -> Result<SimulationResult, BacktestError> {
        if series.is_empty() {
            return Err(ValidationError::EmptySeries.into());
        }
        if series.len() != signals.len() {
            return Err(ValidationError::LengthMismatch {
                prices: series.len(),
                signals: signals.len(),
            }
            .into());
        }
        series.validate()?;

        let mut cash = self.initial_capital;
        let mut high_water = self.initial_capital;
        let mut position = TargetPosition::Flat;
        let mut open: Option<OpenTrade> = None;
        let mut trades = Vec::new();
        let mut points = Vec::with_capacity(series.len());

        for (i, (bar, target)) in series.bars.iter().zip(signals.iter()).enumerate() {
            if target != position {
                if let Some(trade) = open.take() {
                    trades.push(self.close(trade, i, bar, false, &mut cash));
                }
                if let Some(direction) = target.direction() {
                    high_water = high_water.max(cash);
                    open = self.open(direction, i, bar, high_water, &mut cash);
                }
                position = target;
            }

            let unrealized = open.as_ref().map_or(0.0, |t| t.unrealized(bar.close));
            let equity = cash + unrealized;
            high_water = high_water.max(equity);
            points.push(EquityPoint {
                date: bar.date,
                equity,
            });
        }

        if let Some(trade) = open.take() {
            let last_index = series.len() - 1;
            let last = &series.bars[last_index];
            trades.push(self.close(trade, last_index, last, true, &mut cash));
            if let Some(point) = points.last_mut() {
                point.equity = cash;
            }
        }

        Ok(SimulationResult {
            trades,
            equity_curve: EquityCurve::new(points),
        })
    }

    fn open(
        &self,
        direction: Direction,
        index: usize,
        bar: &PriceBar,
        high_water: f64,
        cash: &mut f64,
    ) -> Option<OpenTrade> {
        if *cash <= 0.0 {
            warn!(bar = index, date = %bar.date, cash = *cash, "no capital left, entry skipped");
            return None;
        }
        if self.risk.is_halted(*cash, high_water) {
            warn!(
                bar = index,
                date = %bar.date,
                equity = *cash,
                high_water,
                "drawdown halt, entry skipped"
            );
            return None;
        }
        let entry_price = self.cost_model.fill_price(bar.close, entry_side(direction));
        let size = self.risk.position_capital(*cash) / entry_price;
        let entry_cost = self.cost_model.commission(entry_price, size);
        *cash -= entry_cost;
        debug!(bar = index, date = %bar.date, %direction, entry_price, size, "open trade");
        Some(OpenTrade {
            direction,
            entry_bar: index,
            entry_date: bar.date,
            entry_price,
            size,
            entry_cost,
        })
    }

    /// Realize the trade at `bar`, crediting gross PnL net of the exit fee to `cash`.
    fn close(
        &self,
        trade: OpenTrade,
        index: usize,
        bar: &PriceBar,
        forced: bool,
        cash: &mut f64,
    ) -> Trade {
        let exit_price = self
            .cost_model
            .fill_price(bar.close, exit_side(trade.direction));
        let exit_cost = self.cost_model.commission(exit_price, trade.size);
        let gross_pnl = trade.direction.sign() * (exit_price - trade.entry_price) * trade.size;
        let costs = trade.entry_cost + exit_cost;
        *cash += gross_pnl - exit_cost;
        debug!(
            bar = index,
            date = %bar.date,
            direction = %trade.direction,
            exit_price,
            gross_pnl,
            forced,
            "close trade"
        );
        Trade {
            direction: trade.direction,
            entry_bar: trade.entry_bar,
            entry_date: trade.entry_date,
            entry_price: trade.entry_price,
            exit_bar: index,
            exit_date: bar.date,
            exit_price,
            size: trade.size,
            gross_pnl,
            costs,
            net_pnl: gross_pnl - costs,
            forced_close: forced,
        }
    }
}

/// Run one simulation with a borrowed cost model.
pub fn simulate(
    series: &PriceSeries,
    signals: &SignalSeries,
    initial_capital: f64,
    cost_model: &dyn CostModel,
) -> Result<SimulationResult, BacktestError> {
    SimulationEngine::new(initial_capital, cost_model)?.run(series, signals)
}
