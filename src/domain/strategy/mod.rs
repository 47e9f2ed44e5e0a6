//! Entry and exit rules plugged into the backtest engine.
//!
//! Rules see only the history visible on the evaluation date. Positions
//! carry the channel captured when they were opened, and exit rules must use
//! that snapshot instead of refitting.

pub mod channel;
pub mod ma_cross;

use crate::domain::position::{ExitSignal, Position};
use crate::domain::price_series::PriceSeries;
use chrono::NaiveDate;

pub use channel::{ChannelStrategy, ChannelStrategyConfig};
pub use ma_cross::{MaCrossConfig, MaCrossStrategy};

pub trait Strategy {
    fn name(&self) -> &str;

    /// Whether to open a position in `series` on `date`.
    fn check_entry(&self, series: &PriceSeries, date: NaiveDate) -> bool;

    /// Whether to close `position` on `date`, and at what price.
    fn check_exit(
        &self,
        series: &PriceSeries,
        date: NaiveDate,
        position: &Position,
    ) -> Option<ExitSignal>;
}
