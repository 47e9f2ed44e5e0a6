//! Open positions, exit signals and closed trades.

use crate::domain::channel::TrendChannel;
use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub code: String,
    pub shares: u64,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    /// Channel captured at entry. Exit rules evaluate against this snapshot.
    pub channel: TrendChannel,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.shares as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.shares as f64 * (price - self.entry_price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    DeathCross,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::DeathCross => "death_cross",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instruction to close a position at `price`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitSignal {
    pub reason: ExitReason,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub code: String,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub shares: u64,
    pub profit: f64,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }

    pub fn is_win(&self) -> bool {
        self.profit > 0.0
    }
}
