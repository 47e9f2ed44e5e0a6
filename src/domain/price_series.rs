//! Chronologically ordered bar history for one instrument.

use crate::domain::error::TraderError;
use crate::domain::ohlcv::PriceBar;
use chrono::NaiveDate;

/// Bars for one instrument, strictly increasing by date.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    code: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series from bars that are already in date order.
    /// Out-of-order or duplicate dates are rejected.
    pub fn new(code: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self, TraderError> {
        let code = code.into();
        if let Some(w) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(TraderError::UnorderedSeries {
                code,
                date: w[1].date,
            });
        }
        Ok(Self { code, bars })
    }

    /// Sort bars by date first, then validate. Duplicates still fail.
    pub fn from_unsorted(
        code: impl Into<String>,
        mut bars: Vec<PriceBar>,
    ) -> Result<Self, TraderError> {
        bars.sort_by_key(|b| b.date);
        Self::new(code, bars)
    }

    pub fn empty(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            bars: Vec::new(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Number of bars dated on or before `date`.
    fn count_through(&self, date: NaiveDate) -> usize {
        self.bars.partition_point(|b| b.date <= date)
    }

    /// History visible on `date`: every bar up to and including it.
    pub fn up_to(&self, date: NaiveDate) -> &[PriceBar] {
        &self.bars[..self.count_through(date)]
    }

    /// Ordinal position of the last bar on or before `date`.
    pub fn index_on_or_before(&self, date: NaiveDate) -> Option<usize> {
        self.count_through(date).checked_sub(1)
    }

    pub fn bar_on_or_before(&self, date: NaiveDate) -> Option<&PriceBar> {
        self.index_on_or_before(date).map(|i| &self.bars[i])
    }

    pub fn close_on_or_before(&self, date: NaiveDate) -> Option<f64> {
        self.bar_on_or_before(date).map(|b| b.close)
    }

    /// Bars with `start <= date <= end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> &[PriceBar] {
        let from = self.bars.partition_point(|b| b.date < start);
        let to = self.count_through(end).max(from);
        &self.bars[from..to]
    }
}
