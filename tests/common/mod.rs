#![allow(dead_code)]

use channeltrader::domain::channel::TrendChannel;
use channeltrader::domain::error::TraderError;
pub use channeltrader::domain::ohlcv::PriceBar;
use channeltrader::domain::position::{ExitSignal, Position};
use channeltrader::domain::price_series::PriceSeries;
use channeltrader::domain::strategy::{ChannelStrategy, Strategy};
use channeltrader::ports::alert_port::AlertSink;
use channeltrader::ports::data_port::MarketDataSource;
use channeltrader::ports::feed_port::{FeedReading, MarketFeed};
use chrono::{Duration, NaiveDate};
use std::cell::RefCell;
use std::collections::HashMap;

pub const INDEX: &str = "000001";

pub fn day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + Duration::days(i as i64)
}

pub fn index_of(date: NaiveDate) -> usize {
    (date - day(0)).num_days() as usize
}

/// Rising line with a 20-bar sawtooth: troughs on the line at i = 10, 30,
/// 50, ... and peaks 2.0 above it at i = 20, 40, 60, ...
pub fn sawtooth_close(i: usize, slope: f64) -> f64 {
    let phase = (i % 20) as f64;
    10.0 + slope * i as f64 + (phase - 10.0).abs() / 5.0
}

pub fn bar(i: usize, close: f64, turnover: f64) -> PriceBar {
    PriceBar {
        date: day(i),
        open: close,
        high: close + 0.05,
        low: close - 0.05,
        close,
        volume: 1000,
        turnover,
    }
}

pub fn sawtooth_bars(n: usize) -> Vec<PriceBar> {
    (0..n).map(|i| bar(i, sawtooth_close(i, 0.1), 0.0)).collect()
}

/// Sawtooth on slope 0.1 up to `switch`, then a taller sawtooth on slope
/// 0.2. A channel refitted after the switch differs from one fitted before.
pub fn steepening_bars(n: usize, switch: usize) -> Vec<PriceBar> {
    (0..n)
        .map(|i| {
            let close = if i < switch {
                sawtooth_close(i, 0.1)
            } else {
                let phase = (i % 20) as f64;
                10.0 + 0.1 * switch as f64 + 0.2 * (i - switch) as f64
                    + 2.0 * (phase - 10.0).abs() / 5.0
            };
            bar(i, close, 0.0)
        })
        .collect()
}

/// Strictly rising index with market turnover above the default threshold.
pub fn index_bars(n: usize) -> Vec<PriceBar> {
    (0..n)
        .map(|i| bar(i, 3000.0 + i as f64, 1_000_000_000_000.0))
        .collect()
}

pub struct MockDataSource {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl MarketDataSource for MockDataSource {
    fn get_series(&self, code: &str) -> Result<Option<PriceSeries>, TraderError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(TraderError::Data {
                reason: reason.clone(),
            });
        }
        match self.data.get(code) {
            Some(bars) => PriceSeries::new(code, bars.clone()).map(Some),
            None => Ok(None),
        }
    }
}

/// Same readings on every date.
pub struct ScriptedFeed {
    pub streak: Option<u32>,
    pub inflow: Option<f64>,
}

impl MarketFeed for ScriptedFeed {
    fn max_limit_up_streak(&self, _date: NaiveDate) -> FeedReading<u32> {
        self.streak.map_or(FeedReading::Unavailable, FeedReading::Available)
    }

    fn northbound_net_inflow(&self, _date: NaiveDate) -> FeedReading<f64> {
        self.inflow.map_or(FeedReading::Unavailable, FeedReading::Available)
    }
}

#[derive(Default)]
pub struct RecordingAlertSink {
    pub messages: RefCell<Vec<String>>,
}

impl AlertSink for RecordingAlertSink {
    fn notify(&self, text: &str) {
        self.messages.borrow_mut().push(text.to_string());
    }
}

/// Enters whenever asked, never exits.
pub struct AlwaysEnter;

impl Strategy for AlwaysEnter {
    fn name(&self) -> &str {
        "always_enter"
    }

    fn check_entry(&self, series: &PriceSeries, date: NaiveDate) -> bool {
        !series.up_to(date).is_empty()
    }

    fn check_exit(&self, _: &PriceSeries, _: NaiveDate, _: &Position) -> Option<ExitSignal> {
        None
    }
}

/// Enters whenever asked and exits by the channel rules.
pub struct EnterWithChannelExits(pub ChannelStrategy);

impl Strategy for EnterWithChannelExits {
    fn name(&self) -> &str {
        "enter_with_channel_exits"
    }

    fn check_entry(&self, series: &PriceSeries, date: NaiveDate) -> bool {
        !series.up_to(date).is_empty()
    }

    fn check_exit(
        &self,
        series: &PriceSeries,
        date: NaiveDate,
        position: &Position,
    ) -> Option<ExitSignal> {
        self.0.check_exit(series, date, position)
    }
}

/// Enters whenever asked, never exits, and records the channel each exit
/// check was handed.
#[derive(Default)]
pub struct ChannelRecorder {
    pub seen: RefCell<Vec<(String, NaiveDate, TrendChannel)>>,
}

impl Strategy for ChannelRecorder {
    fn name(&self) -> &str {
        "channel_recorder"
    }

    fn check_entry(&self, series: &PriceSeries, date: NaiveDate) -> bool {
        !series.up_to(date).is_empty()
    }

    fn check_exit(
        &self,
        _series: &PriceSeries,
        date: NaiveDate,
        position: &Position,
    ) -> Option<ExitSignal> {
        self.seen
            .borrow_mut()
            .push((position.code.clone(), date, position.channel));
        None
    }
}
