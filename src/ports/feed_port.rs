//! Market breadth and capital flow feeds consumed by the regime judge.

use chrono::NaiveDate;

/// A feed value, or an explicit marker that the feed could not answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedReading<T> {
    Available(T),
    Unavailable,
}

pub trait MarketFeed {
    /// Longest consecutive limit-up streak across the market on `date`.
    fn max_limit_up_streak(&self, date: NaiveDate) -> FeedReading<u32>;

    /// Net cross-border (northbound) inflow on `date`.
    fn northbound_net_inflow(&self, date: NaiveDate) -> FeedReading<f64>;
}
