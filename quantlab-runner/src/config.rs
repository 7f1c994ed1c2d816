//! TOML run configuration.
//!
//! One file describes a backtest (capital, date range, metric inputs), the
//! strategy and its parameters, the cost model, and optionally a sweep grid.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use quantlab_core::domain::StrategyParams;
use quantlab_core::engine::{CostModel, FlatFee, NoCost, PercentageFee, RiskLimits, Slippage};
use quantlab_core::error::ConfigurationError;
use quantlab_core::strategy::StrategyKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::ParameterGrid;
use crate::metrics::MetricsOptions;
use crate::ranking::RankingMetric;
use crate::runner::RunSettings;
use crate::sweep::SweepOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("[backtest] {0}")]
    Backtest(String),

    #[error(transparent)]
    Cost(#[from] ConfigurationError),
}

/// Top-level run file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BacktestConfig {
    #[serde(default)]
    pub backtest: BacktestSection,
    #[serde(default)]
    pub strategy: StrategySection,
    #[serde(default)]
    pub costs: CostConfig,
    #[serde(default)]
    pub sweep: Option<SweepSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BacktestSection {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_capital")]
    pub initial_capital: f64,
    /// Inclusive lower bound on bar dates.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound on bar dates.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub risk_free_rate: f64,
    #[serde(default = "default_trading_days")]
    pub trading_days_per_year: u32,
    /// Compare against passive buy-and-hold of the same series.
    #[serde(default)]
    pub benchmark: bool,
    /// Share of equity committed to each new position.
    #[serde(default = "default_position_fraction")]
    pub max_position_fraction: f64,
    /// Drawdown from peak equity beyond which new entries are refused.
    #[serde(default)]
    pub max_drawdown_halt: Option<f64>,
}

impl BacktestSection {
    pub fn risk_limits(&self) -> RiskLimits {
        RiskLimits {
            max_position_fraction: self.max_position_fraction,
            max_drawdown_halt: self.max_drawdown_halt,
        }
    }
}

fn default_symbol() -> String {
    "SYNTH".to_string()
}

fn default_capital() -> f64 {
    10_000.0
}

fn default_position_fraction() -> f64 {
    1.0
}

fn default_trading_days() -> u32 {
    252
}

fn default_true() -> bool {
    true
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            initial_capital: default_capital(),
            start_date: None,
            end_date: None,
            risk_free_rate: 0.0,
            trading_days_per_year: default_trading_days(),
            benchmark: false,
            max_position_fraction: default_position_fraction(),
            max_drawdown_halt: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategySection {
    pub kind: StrategyKind,
    #[serde(default)]
    pub params: StrategyParams,
}

impl Default for StrategySection {
    fn default() -> Self {
        Self {
            kind: StrategyKind::BuyAndHold,
            params: StrategyParams::new(),
        }
    }
}

/// Commission policy (serializable enum).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionConfig {
    /// No commission.
    #[default]
    None,

    /// Fixed amount per fill.
    FlatFee { amount: f64 },

    /// Percentage of fill notional (0.1 = 0.1%).
    Percentage { percent: f64 },
}

/// `[costs]` section: a commission policy plus optional slippage.
///
/// `type` may be omitted, which means no commission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCostConfig")]
pub struct CostConfig {
    #[serde(flatten)]
    pub commission: CommissionConfig,
    /// Adverse price move per fill in basis points (1 bp = 0.01%).
    #[serde(default)]
    pub slippage_bps: f64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum CommissionKind {
    #[default]
    None,
    FlatFee,
    Percentage,
}

/// Wire shape of `[costs]` before the commission fields are checked against `type`.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCostConfig {
    #[serde(rename = "type", default)]
    kind: CommissionKind,
    amount: Option<f64>,
    percent: Option<f64>,
    #[serde(default)]
    slippage_bps: f64,
}

impl TryFrom<RawCostConfig> for CostConfig {
    type Error = String;

    fn try_from(raw: RawCostConfig) -> Result<Self, Self::Error> {
        let commission = match (raw.kind, raw.amount, raw.percent) {
            (CommissionKind::None, None, None) => CommissionConfig::None,
            (CommissionKind::FlatFee, Some(amount), None) => CommissionConfig::FlatFee { amount },
            (CommissionKind::Percentage, None, Some(percent)) => {
                CommissionConfig::Percentage { percent }
            }
            (CommissionKind::FlatFee, None, _) => return Err("FLAT_FEE requires `amount`".into()),
            (CommissionKind::Percentage, _, None) => {
                return Err("PERCENTAGE requires `percent`".into())
            }
            (kind, _, _) => {
                return Err(format!(
                    "`amount` / `percent` do not match commission type {kind:?}"
                ))
            }
        };
        Ok(Self {
            commission,
            slippage_bps: raw.slippage_bps,
        })
    }
}

impl CostConfig {
    /// Build the engine's cost model.
    pub fn build(&self) -> Result<Box<dyn CostModel>, ConfigurationError> {
        let commission: Box<dyn CostModel> = match self.commission {
            CommissionConfig::None => Box::new(NoCost),
            CommissionConfig::FlatFee { amount } => Box::new(FlatFee::new(amount)?),
            CommissionConfig::Percentage { percent } => {
                Box::new(PercentageFee::new(percent / 100.0)?)
            }
        };
        if self.slippage_bps == 0.0 {
            return Ok(commission);
        }
        Ok(Box::new(Slippage::new(self.slippage_bps, commission)?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepSection {
    #[serde(default)]
    pub ranking: RankingMetric,
    /// Worker threads for a parallel sweep; 0 uses one per core.
    #[serde(default)]
    pub max_concurrency: usize,
    #[serde(default = "default_true")]
    pub parallel: bool,
    #[serde(default)]
    pub grid: ParameterGrid,
}

impl Default for SweepSection {
    fn default() -> Self {
        Self {
            ranking: RankingMetric::default(),
            max_concurrency: 0,
            parallel: true,
            grid: ParameterGrid::default(),
        }
    }
}

impl BacktestConfig {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Checks that do not depend on the strategy; parameter checks belong
    /// to `StrategyKind::validate`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.backtest;
        if !b.initial_capital.is_finite() || b.initial_capital <= 0.0 {
            return Err(ConfigError::Backtest(format!(
                "initial_capital must be positive, got {}",
                b.initial_capital
            )));
        }
        if let (Some(start), Some(end)) = (b.start_date, b.end_date) {
            if start > end {
                return Err(ConfigError::Backtest(format!(
                    "start_date {start} is after end_date {end}"
                )));
            }
        }
        if b.trading_days_per_year == 0 {
            return Err(ConfigError::Backtest(
                "trading_days_per_year must be positive".to_string(),
            ));
        }
        if !b.risk_free_rate.is_finite() {
            return Err(ConfigError::Backtest(
                "risk_free_rate must be finite".to_string(),
            ));
        }
        self.costs.build()?;
        b.risk_limits()
            .validate()
            .map_err(|e| ConfigError::Backtest(e.to_string()))?;
        Ok(())
    }

    pub fn cost_model(&self) -> Result<Box<dyn CostModel>, ConfigError> {
        Ok(self.costs.build()?)
    }

    pub fn metrics_options(&self) -> MetricsOptions {
        MetricsOptions {
            risk_free_rate: self.backtest.risk_free_rate,
            trading_days_per_year: self.backtest.trading_days_per_year,
        }
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            initial_capital: self.backtest.initial_capital,
            start: self.backtest.start_date,
            end: self.backtest.end_date,
            metrics: self.metrics_options(),
            benchmark: self.backtest.benchmark,
            risk: self.backtest.risk_limits(),
        }
    }

    /// Sweep options from `[sweep]`, or defaults when the section is absent.
    pub fn sweep_options(&self) -> SweepOptions {
        let section = self.sweep.clone().unwrap_or_default();
        SweepOptions {
            parallel: section.parallel,
            max_concurrency: section.max_concurrency,
            ranking: section.ranking,
            metrics: self.metrics_options(),
            risk: self.backtest.risk_limits(),
        }
    }

    /// The sweep grid with `[strategy].params` as the base of every combination.
    pub fn parameter_grid(&self) -> ParameterGrid {
        self.sweep
            .as_ref()
            .map(|s| s.grid.clone())
            .unwrap_or_default()
            .with_base(self.strategy.params.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantlab_core::engine::OrderSide;

    const FULL: &str = r#"
        [backtest]
        symbol = "SPY"
        initial_capital = 25000.0
        start_date = "2020-01-01"
        end_date = "2023-12-31"
        risk_free_rate = 0.02
        benchmark = true

        [strategy]
        kind = "ma_crossover"
        params = { short_window = 10, long_window = 30 }

        [costs]
        type = "PERCENTAGE"
        percent = 0.1
        slippage_bps = 5.0

        [sweep]
        ranking = "sortino"
        max_concurrency = 4
        [sweep.grid]
        short_window = [5, 10, 20]
        long_window = { start = 30, end = 60, step = 10 }
    "#;

    #[test]
    fn parses_full_file() {
        let config = BacktestConfig::from_toml(FULL).unwrap();
        assert_eq!(config.backtest.symbol, "SPY");
        assert_eq!(config.backtest.initial_capital, 25_000.0);
        assert_eq!(config.backtest.trading_days_per_year, 252);
        assert_eq!(config.strategy.kind, StrategyKind::MaCrossover);
        assert_eq!(config.strategy.params.get("long_window"), Some(30.0));
        assert_eq!(
            config.costs.commission,
            CommissionConfig::Percentage { percent: 0.1 }
        );
        assert_eq!(config.costs.slippage_bps, 5.0);

        let opts = config.sweep_options();
        assert_eq!(opts.ranking, RankingMetric::Sortino);
        assert_eq!(opts.max_concurrency, 4);
        assert!(opts.parallel);
        assert_eq!(config.parameter_grid().size(), 12);
    }

    #[test]
    fn minimal_file_uses_defaults() {
        let config = BacktestConfig::from_toml("[strategy]\nkind = \"buy_and_hold\"\n").unwrap();
        assert_eq!(config.backtest.initial_capital, 10_000.0);
        assert_eq!(config.costs, CostConfig::default());
        assert!(config.sweep.is_none());
        assert_eq!(config.parameter_grid().size(), 1);
    }

    #[test]
    fn cost_model_wraps_slippage() {
        let config = BacktestConfig::from_toml(FULL).unwrap();
        let model = config.cost_model().unwrap();
        assert_eq!(model.name(), "percentage");
        let buy = model.fill_price(100.0, OrderSide::Buy);
        assert!((buy - 100.05).abs() < 1e-9);
        assert!((model.commission(buy, 10.0) - buy * 10.0 * 0.001).abs() < 1e-9);
    }

    #[test]
    fn slippage_without_commission_type() {
        let config = BacktestConfig::from_toml("[costs]\nslippage_bps = 5.0\n").unwrap();
        assert_eq!(config.costs.commission, CommissionConfig::None);
        assert_eq!(config.costs.slippage_bps, 5.0);
        let model = config.cost_model().unwrap();
        assert_eq!(model.name(), "none");
        assert!((model.fill_price(100.0, OrderSide::Sell) - 99.95).abs() < 1e-9);
        assert_eq!(model.commission(100.0, 10.0), 0.0);
    }

    #[test]
    fn commission_fields_must_match_type() {
        for text in [
            "[costs]\ntype = \"FLAT_FEE\"\n",
            "[costs]\ntype = \"PERCENTAGE\"\namount = 1.0\n",
            "[costs]\namount = 1.0\n",
            "[costs]\ntype = \"NONE\"\nbogus = 1\n",
        ] {
            assert!(
                matches!(BacktestConfig::from_toml(text), Err(ConfigError::Parse(_))),
                "accepted: {text}"
            );
        }
    }

    #[test]
    fn risk_limits_flow_into_run_settings() {
        let config = BacktestConfig::from_toml(
            "[backtest]\nmax_position_fraction = 0.5\nmax_drawdown_halt = 0.2\n[sweep]\n",
        )
        .unwrap();
        let expected = RiskLimits {
            max_position_fraction: 0.5,
            max_drawdown_halt: Some(0.2),
        };
        assert_eq!(config.run_settings().risk, expected);
        assert_eq!(config.sweep_options().risk, expected);
        assert_eq!(
            BacktestConfig::default().run_settings().risk,
            RiskLimits::default()
        );
    }

    #[test]
    fn rejects_out_of_range_risk_limits() {
        let err = BacktestConfig::from_toml("[backtest]\nmax_position_fraction = 1.5\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Backtest(_)));
        let err =
            BacktestConfig::from_toml("[backtest]\nmax_drawdown_halt = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Backtest(_)));
    }

    #[test]
    fn rejects_inverted_dates() {
        let err = BacktestConfig::from_toml(
            "[backtest]\nstart_date = \"2024-01-01\"\nend_date = \"2023-01-01\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Backtest(_)));
    }

    #[test]
    fn rejects_negative_fee() {
        let err =
            BacktestConfig::from_toml("[costs]\ntype = \"FLAT_FEE\"\namount = -1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Cost(_)));
    }

    #[test]
    fn rejects_unknown_strategy() {
        assert!(matches!(
            BacktestConfig::from_toml("[strategy]\nkind = \"martingale\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn from_file_reports_missing_path() {
        let err = BacktestConfig::from_file("/nonexistent/quantlab.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
