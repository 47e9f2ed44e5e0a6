//! CSV file market data adapter.
//!
//! One file per instrument, `<code>.csv`, with a header row and columns
//! `date,open,high,low,close,volume[,turnover]`. When the bare file is absent
//! the exchange-suffixed `<code>.SZ.csv` and `<code>.SH.csv` are tried.

use crate::domain::error::TraderError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::price_series::PriceSeries;
use crate::ports::data_port::MarketDataSource;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

const EXCHANGE_SUFFIXES: [&str; 2] = ["SZ", "SH"];

pub struct CsvDataAdapter {
    base_path: PathBuf,
}

impl CsvDataAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> Option<PathBuf> {
        std::iter::once(format!("{code}.csv"))
            .chain(EXCHANGE_SUFFIXES.iter().map(|sfx| format!("{code}.{sfx}.csv")))
            .map(|name| self.base_path.join(name))
            .find(|path| path.is_file())
    }
}

fn field<T: FromStr>(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    path: &str,
) -> Result<T, TraderError>
where
    T::Err: std::fmt::Display,
{
    let raw = record.get(index).ok_or_else(|| TraderError::Data {
        reason: format!("{path}: missing {name} column"),
    })?;
    raw.trim().parse().map_err(|e| TraderError::Data {
        reason: format!("{path}: invalid {name} value '{raw}': {e}"),
    })
}

/// Whole-number volumes are sometimes written with a fractional part.
fn volume_field(record: &csv::StringRecord, path: &str) -> Result<i64, TraderError> {
    match field::<i64>(record, 5, "volume", path) {
        Ok(v) => Ok(v),
        Err(_) => field::<f64>(record, 5, "volume", path).map(|v| v.round() as i64),
    }
}

impl MarketDataSource for CsvDataAdapter {
    fn get_series(&self, code: &str) -> Result<Option<PriceSeries>, TraderError> {
        let Some(path) = self.csv_path(code) else {
            return Ok(None);
        };
        let shown = path.display().to_string();
        let content = fs::read_to_string(&path).map_err(|e| TraderError::Data {
            reason: format!("failed to read {shown}: {e}"),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| TraderError::Data {
                reason: format!("{shown}: CSV parse error: {e}"),
            })?;

            let date_str = record.get(0).ok_or_else(|| TraderError::Data {
                reason: format!("{shown}: missing date column"),
            })?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
                TraderError::Data {
                    reason: format!("{shown}: invalid date '{date_str}': {e}"),
                }
            })?;

            let turnover = match record.get(6).map(str::trim) {
                Some(raw) if !raw.is_empty() => field(&record, 6, "turnover", &shown)?,
                _ => 0.0,
            };

            bars.push(PriceBar {
                date,
                open: field(&record, 1, "open", &shown)?,
                high: field(&record, 2, "high", &shown)?,
                low: field(&record, 3, "low", &shown)?,
                close: field(&record, 4, "close", &shown)?,
                volume: volume_field(&record, &shown)?,
                turnover,
            });
        }

        if bars.is_empty() {
            return Ok(None);
        }
        PriceSeries::from_unsorted(code, bars).map(Some)
    }
}
