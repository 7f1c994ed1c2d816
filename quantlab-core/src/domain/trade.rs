//! Trade: a completed round trip recorded by the simulation engine.

use super::signal::Direction;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A closed round trip: entry → exit.
///
/// Immutable once recorded. A trade still open at the end of the window is
/// liquidated at the final close and carries `forced_close = true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub direction: Direction,

    // ── Entry ──
    pub entry_bar: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_date: NaiveDate,
    pub exit_price: f64,

    /// Units held (fractional).
    pub size: f64,

    // ── PnL ──
    pub gross_pnl: f64,
    /// Entry plus exit commissions.
    pub costs: f64,
    pub net_pnl: f64,

    pub forced_close: bool,
}

impl Trade {
    /// Net return as a fraction of entry notional.
    pub fn return_pct(&self) -> f64 {
        let notional = self.entry_price * self.size;
        if notional == 0.0 {
            return 0.0;
        }
        self.net_pnl / notional
    }

    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }
}
