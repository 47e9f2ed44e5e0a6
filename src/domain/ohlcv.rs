//! Daily price bar representation.

use chrono::NaiveDate;

/// One instrument's trading day. Immutable once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub turnover: f64,
}

impl PriceBar {
    pub fn is_positive_candle(&self) -> bool {
        self.close > self.open
    }
}

pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

pub fn volumes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.volume as f64).collect()
}
