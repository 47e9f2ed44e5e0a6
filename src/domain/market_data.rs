//! Series cache for one backtest run.
//!
//! Every instrument the run touches is fetched once up front. A fetch error
//! is logged and the instrument is treated as having no data.

use crate::domain::portfolio::PriceLookup;
use crate::domain::price_series::PriceSeries;
use crate::ports::data_port::MarketDataSource;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct MarketData {
    series: HashMap<String, PriceSeries>,
}

impl MarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: PriceSeries) {
        self.series.insert(series.code().to_string(), series);
    }

    /// Fetch each stock in `codes` and each index in `index_codes`.
    pub fn load(
        source: &dyn MarketDataSource,
        codes: &[String],
        index_codes: &[&str],
    ) -> Self {
        let mut data = MarketData::new();

        for code in codes {
            match source.get_series(code) {
                Ok(Some(series)) => data.insert(series),
                Ok(None) => warn!(code = %code, "no price data"),
                Err(e) => warn!(code = %code, error = %e, "failed to load price data"),
            }
        }

        for &code in index_codes {
            if data.series.contains_key(code) {
                continue;
            }
            match source.get_index_series(code) {
                Ok(Some(series)) => data.insert(series),
                Ok(None) => warn!(code, "no index data"),
                Err(e) => warn!(code, error = %e, "failed to load index data"),
            }
        }

        info!(instruments = data.series.len(), "market data loaded");
        data
    }

    pub fn get(&self, code: &str) -> Option<&PriceSeries> {
        self.series.get(code)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl PriceLookup for MarketData {
    fn close_on_or_before(&self, code: &str, date: NaiveDate) -> Option<f64> {
        self.series.get(code)?.close_on_or_before(date)
    }
}
