//! Portfolio state, order fills and equity tracking.
//!
//! Fills are all-or-nothing at the last close on or before the order date.
//! A proportional commission is charged on each leg. `buy` never lets cash go
//! negative: when any guard trips the portfolio is left untouched and the
//! outcome says why.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::channel::TrendChannel;
use super::position::{ExitReason, Position, Trade};

/// Source of marks for open positions.
pub trait PriceLookup {
    fn close_on_or_before(&self, code: &str, date: NaiveDate) -> Option<f64>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuyOutcome {
    Filled {
        shares: u64,
        price: f64,
        cost: f64,
        commission: f64,
    },
    NoPrice,
    ZeroShares,
    InsufficientCash,
}

impl BuyOutcome {
    pub fn is_filled(&self) -> bool {
        matches!(self, BuyOutcome::Filled { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub commission_rate: f64,
    pub positions: BTreeMap<String, Position>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_capital: f64, commission_rate: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            commission_rate,
            positions: BTreeMap::new(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn commission(&self, notional: f64) -> f64 {
        notional * self.commission_rate
    }

    pub fn get_position(&self, code: &str) -> Option<&Position> {
        self.positions.get(code)
    }

    pub fn has_position(&self, code: &str) -> bool {
        self.positions.contains_key(code)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Spend up to `budget` on whole shares of `code`.
    ///
    /// Adding to an existing holding accumulates shares; the entry price,
    /// entry date and channel snapshot are replaced by this fill.
    pub fn buy(
        &mut self,
        code: &str,
        date: NaiveDate,
        budget: f64,
        channel: TrendChannel,
        prices: &dyn PriceLookup,
    ) -> BuyOutcome {
        let Some(price) = prices.close_on_or_before(code, date).filter(|p| *p > 0.0) else {
            debug!(code, %date, "buy skipped: no price");
            return BuyOutcome::NoPrice;
        };

        let shares = (budget.max(0.0) / price).floor() as u64;
        if shares == 0 {
            debug!(code, %date, budget, price, "buy skipped: budget below one share");
            return BuyOutcome::ZeroShares;
        }

        let cost = shares as f64 * price;
        let commission = self.commission(cost);
        if self.cash < cost + commission {
            debug!(code, %date, cash = self.cash, cost, commission, "buy skipped: insufficient cash");
            return BuyOutcome::InsufficientCash;
        }

        self.cash -= cost + commission;

        let held = self.positions.get(code).map_or(0, |p| p.shares);
        self.positions.insert(
            code.to_string(),
            Position {
                code: code.to_string(),
                shares: held + shares,
                entry_date: date,
                entry_price: price,
                channel,
            },
        );

        BuyOutcome::Filled {
            shares,
            price,
            cost,
            commission,
        }
    }

    /// Close the whole position in `code` at `price`. Returns the recorded
    /// trade, or `None` when nothing is held.
    pub fn sell(
        &mut self,
        code: &str,
        date: NaiveDate,
        price: f64,
        reason: ExitReason,
    ) -> Option<Trade> {
        let position = self.positions.remove(code)?;

        let proceeds = position.shares as f64 * price;
        let commission = self.commission(proceeds);
        self.cash += proceeds - commission;

        let profit = position.unrealized_pnl(price) - commission * 2.0;
        let trade = Trade {
            code: position.code,
            entry_date: position.entry_date,
            exit_date: date,
            entry_price: position.entry_price,
            exit_price: price,
            shares: position.shares,
            profit,
            exit_reason: reason,
        };
        self.trades.push(trade.clone());
        Some(trade)
    }

    /// Cash plus every open position marked at its last close on or before
    /// `date`. Unpriced positions contribute zero.
    pub fn total_value(&self, date: NaiveDate, prices: &dyn PriceLookup) -> f64 {
        let marked: f64 = self
            .positions
            .values()
            .map(|pos| match prices.close_on_or_before(&pos.code, date) {
                Some(price) => pos.market_value(price),
                None => {
                    warn!(code = %pos.code, %date, "no price to mark position, valuing at zero");
                    0.0
                }
            })
            .sum();
        self.cash + marked
    }

    pub fn record_equity(&mut self, date: NaiveDate, prices: &dyn PriceLookup) -> f64 {
        let equity = self.total_value(date, prices);
        self.equity_curve.push(EquityPoint { date, equity });
        equity
    }
}
