//! Ranking key: configurable metric selector for ordering sweep rows.

use crate::metrics::PerformanceReport;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Which metric to rank by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMetric {
    #[default]
    Sharpe,
    Sortino,
    Calmar,
    Cagr,
    TotalReturn,
    WinRate,
    MaxDrawdown,
}

impl RankingMetric {
    pub const ALL: [RankingMetric; 7] = [
        Self::Sharpe,
        Self::Sortino,
        Self::Calmar,
        Self::Cagr,
        Self::TotalReturn,
        Self::WinRate,
        Self::MaxDrawdown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Sharpe => "sharpe",
            Self::Sortino => "sortino",
            Self::Calmar => "calmar",
            Self::Cagr => "cagr",
            Self::TotalReturn => "total_return",
            Self::WinRate => "win_rate",
            Self::MaxDrawdown => "max_drawdown",
        }
    }

    /// Extract the relevant value from a report.
    pub fn extract(&self, report: &PerformanceReport) -> f64 {
        match self {
            Self::Sharpe => report.sharpe_ratio,
            Self::Sortino => report.sortino_ratio,
            Self::Calmar => report.calmar_ratio,
            Self::Cagr => report.cagr,
            Self::TotalReturn => report.total_return,
            Self::WinRate => report.win_rate,
            Self::MaxDrawdown => report.max_drawdown,
        }
    }

    /// Ordering of two reports, best first.
    ///
    /// Primary metric descending for every variant; drawdowns are stored
    /// negative, so the shallower one sorts first. Ties fall to drawdown
    /// magnitude ascending, and callers break what remains on insertion index.
    pub fn compare(&self, a: &PerformanceReport, b: &PerformanceReport) -> Ordering {
        self.extract(b)
            .total_cmp(&self.extract(a))
            .then_with(|| a.max_drawdown.abs().total_cmp(&b.max_drawdown.abs()))
    }
}

impl fmt::Display for RankingMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RankingMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        let alias = match normalized.as_str() {
            "sharpe_ratio" => "sharpe",
            "sortino_ratio" => "sortino",
            "calmar_ratio" => "calmar",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|m| m.name() == alias)
            .ok_or_else(|| format!("unknown ranking metric '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(sharpe: f64, max_drawdown: f64) -> PerformanceReport {
        PerformanceReport {
            total_return: 0.15,
            cagr: 0.12,
            annualized_volatility: 0.2,
            sharpe_ratio: sharpe,
            sortino_ratio: 2.0,
            max_drawdown,
            max_drawdown_duration: 10,
            calmar_ratio: 1.2,
            win_rate: 0.55,
            profit_factor: 1.8,
            trade_count: 20,
            final_equity: 11_500.0,
            bar_count: 252,
            benchmark: None,
        }
    }

    #[test]
    fn extract_sharpe() {
        let r = report(1.5, -0.1);
        assert!((RankingMetric::Sharpe.extract(&r) - 1.5).abs() < 1e-10);
    }

    #[test]
    fn extract_max_drawdown() {
        let r = report(1.5, -0.1);
        assert!((RankingMetric::MaxDrawdown.extract(&r) - (-0.10)).abs() < 1e-10);
    }

    #[test]
    fn default_is_sharpe() {
        assert_eq!(RankingMetric::default(), RankingMetric::Sharpe);
    }

    #[test]
    fn max_drawdown_ranks_shallower_first() {
        let shallow = report(0.5, -0.05);
        let deep = report(2.0, -0.20);
        assert_eq!(RankingMetric::MaxDrawdown.compare(&shallow, &deep), Ordering::Less);
        assert_eq!(RankingMetric::MaxDrawdown.compare(&deep, &shallow), Ordering::Greater);
        // the primary key overrides a better sharpe
        assert_eq!(RankingMetric::Sharpe.compare(&shallow, &deep), Ordering::Greater);
    }

    #[test]
    fn compare_puts_higher_metric_first() {
        let a = report(2.0, -0.3);
        let b = report(1.0, -0.1);
        assert_eq!(RankingMetric::Sharpe.compare(&a, &b), Ordering::Less);
        assert_eq!(RankingMetric::Sharpe.compare(&b, &a), Ordering::Greater);
    }

    #[test]
    fn compare_ties_break_on_smaller_drawdown() {
        let a = report(1.0, -0.05);
        let b = report(1.0, -0.20);
        assert_eq!(RankingMetric::Sharpe.compare(&a, &b), Ordering::Less);
        assert_eq!(RankingMetric::Sharpe.compare(&a, &a.clone()), Ordering::Equal);
    }

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("sharpe_ratio".parse(), Ok(RankingMetric::Sharpe));
        assert_eq!("total-return".parse(), Ok(RankingMetric::TotalReturn));
        assert_eq!("MAX_DRAWDOWN".parse(), Ok(RankingMetric::MaxDrawdown));
        assert!("alpha".parse::<RankingMetric>().is_err());
    }
}
