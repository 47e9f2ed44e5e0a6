//! Market breadth and capital flow feeds.
//!
//! `NoFeed` answers nothing. `CsvFeedAdapter` serves readings recorded in
//! `limit_up.csv` (`date,max_streak`) and `northbound.csv`
//! (`date,net_inflow`); a missing file or a date with no row reads as
//! unavailable.

use crate::domain::error::TraderError;
use crate::ports::feed_port::{FeedReading, MarketFeed};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeed;

impl MarketFeed for NoFeed {
    fn max_limit_up_streak(&self, _date: NaiveDate) -> FeedReading<u32> {
        FeedReading::Unavailable
    }

    fn northbound_net_inflow(&self, _date: NaiveDate) -> FeedReading<f64> {
        FeedReading::Unavailable
    }
}

#[derive(Debug, Clone, Default)]
pub struct CsvFeedAdapter {
    limit_up: HashMap<NaiveDate, u32>,
    northbound: HashMap<NaiveDate, f64>,
}

impl CsvFeedAdapter {
    pub fn from_dir(dir: &Path) -> Result<Self, TraderError> {
        let limit_up = load_daily(&dir.join("limit_up.csv"))?;
        let northbound = load_daily(&dir.join("northbound.csv"))?;
        info!(
            dir = %dir.display(),
            limit_up_days = limit_up.len(),
            northbound_days = northbound.len(),
            "feed loaded"
        );
        Ok(Self {
            limit_up,
            northbound,
        })
    }
}

fn load_daily<T: FromStr>(path: &Path) -> Result<HashMap<NaiveDate, T>, TraderError>
where
    T::Err: std::fmt::Display,
{
    if !path.is_file() {
        return Ok(HashMap::new());
    }
    let shown = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|e| TraderError::Data {
        reason: format!("failed to read {shown}: {e}"),
    })?;

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut values = HashMap::new();
    for result in rdr.records() {
        let record = result.map_err(|e| TraderError::Data {
            reason: format!("{shown}: CSV parse error: {e}"),
        })?;
        let (Some(date), Some(value)) = (record.get(0), record.get(1)) else {
            return Err(TraderError::Data {
                reason: format!("{shown}: expected two columns"),
            });
        };
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|e| {
            TraderError::Data {
                reason: format!("{shown}: invalid date '{date}': {e}"),
            }
        })?;
        let value = value.trim().parse().map_err(|e| TraderError::Data {
            reason: format!("{shown}: invalid value '{value}': {e}"),
        })?;
        values.insert(date, value);
    }
    Ok(values)
}

impl MarketFeed for CsvFeedAdapter {
    fn max_limit_up_streak(&self, date: NaiveDate) -> FeedReading<u32> {
        match self.limit_up.get(&date) {
            Some(&streak) => FeedReading::Available(streak),
            None => FeedReading::Unavailable,
        }
    }

    fn northbound_net_inflow(&self, date: NaiveDate) -> FeedReading<f64> {
        match self.northbound.get(&date) {
            Some(&flow) => FeedReading::Available(flow),
            None => FeedReading::Unavailable,
        }
    }
}
