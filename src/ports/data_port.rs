//! Market data port trait.
//!
//! Implementations own fetching, retries and caching. `Ok(None)` means the
//! instrument has no data; the engine treats errors the same way after
//! logging them.

use crate::domain::error::TraderError;
use crate::domain::price_series::PriceSeries;

pub trait MarketDataSource {
    /// Full available daily history for an instrument.
    fn get_series(&self, code: &str) -> Result<Option<PriceSeries>, TraderError>;

    /// Full available daily history for an index. Index bars carry the
    /// market turnover used by the regime judge.
    fn get_index_series(&self, code: &str) -> Result<Option<PriceSeries>, TraderError> {
        self.get_series(code)
    }
}
