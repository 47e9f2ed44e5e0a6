//! Market regime scoring.
//!
//! Four independent checks each add one point: index above its moving
//! average, market turnover above a threshold, limit-up streak height, and
//! positive northbound inflow. Optional placeholder checks always pass and
//! reproduce the five-check scorer. The total maps onto a label through
//! configurable thresholds. Every call is a fresh classification for one
//! date; nothing carries over between calls.

use crate::domain::indicator::sma::trailing_sma;
use crate::domain::ohlcv::closes;
use crate::domain::price_series::PriceSeries;
use crate::ports::feed_port::{FeedReading, MarketFeed};
use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct RegimeConfig {
    pub index_ma_days: usize,
    pub turnover_threshold: f64,
    pub chain_height_threshold: u32,
    pub offensive_score: u8,
    pub defensive_score: u8,
    pub placeholder_checks: u8,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        RegimeConfig {
            index_ma_days: 20,
            turnover_threshold: 800_000_000_000.0,
            chain_height_threshold: 4,
            offensive_score: 3,
            defensive_score: 2,
            placeholder_checks: 0,
        }
    }
}

impl RegimeConfig {
    pub fn max_score(&self) -> u8 {
        self.placeholder_checks.saturating_add(4)
    }

    pub fn classify(&self, score: u8) -> RegimeLabel {
        if score >= self.offensive_score {
            RegimeLabel::Offensive
        } else if score >= self.defensive_score {
            RegimeLabel::Defensive
        } else {
            RegimeLabel::Empty
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RegimeLabel {
    Empty,
    Defensive,
    Offensive,
}

impl fmt::Display for RegimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegimeLabel::Offensive => write!(f, "Offensive"),
            RegimeLabel::Defensive => write!(f, "Defensive"),
            RegimeLabel::Empty => write!(f, "Empty"),
        }
    }
}

/// Outcome of one check. `Unknown` means the input was unavailable and
/// scores like `Fail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Pass,
    Fail,
    Unknown,
}

impl CheckOutcome {
    fn from_bool(passed: bool) -> Self {
        if passed {
            CheckOutcome::Pass
        } else {
            CheckOutcome::Fail
        }
    }

    pub fn points(self) -> u8 {
        match self {
            CheckOutcome::Pass => 1,
            CheckOutcome::Fail | CheckOutcome::Unknown => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegimeChecks {
    pub index_trend: CheckOutcome,
    pub turnover: CheckOutcome,
    pub chain_height: CheckOutcome,
    pub northbound: CheckOutcome,
}

impl RegimeChecks {
    pub fn score(&self) -> u8 {
        self.index_trend.points()
            + self.turnover.points()
            + self.chain_height.points()
            + self.northbound.points()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegimeResult {
    pub date: NaiveDate,
    pub score: u8,
    pub label: RegimeLabel,
    /// `None` when the judge was bypassed.
    pub checks: Option<RegimeChecks>,
}

impl RegimeResult {
    pub fn from_checks(date: NaiveDate, checks: RegimeChecks, config: &RegimeConfig) -> Self {
        let score = checks.score().saturating_add(config.placeholder_checks);
        RegimeResult {
            date,
            score,
            label: config.classify(score),
            checks: Some(checks),
        }
    }

    /// Full score without consulting any input, for controlled experiments.
    pub fn forced_offensive(date: NaiveDate, config: &RegimeConfig) -> Self {
        RegimeResult {
            date,
            score: config.max_score(),
            label: RegimeLabel::Offensive,
            checks: None,
        }
    }
}

pub struct RegimeJudge<'a> {
    config: RegimeConfig,
    feed: &'a dyn MarketFeed,
}

impl<'a> RegimeJudge<'a> {
    pub fn new(config: RegimeConfig, feed: &'a dyn MarketFeed) -> Self {
        Self { config, feed }
    }

    pub fn score(&self, date: NaiveDate, index_series: &PriceSeries) -> RegimeResult {
        let history = index_series.up_to(date);

        let index_trend = {
            let closes = closes(history);
            match (closes.last(), trailing_sma(&closes, self.config.index_ma_days)) {
                (Some(&latest), Some(ma)) => CheckOutcome::from_bool(latest > ma),
                _ => CheckOutcome::Fail,
            }
        };

        let turnover = match history.last() {
            Some(bar) => CheckOutcome::from_bool(bar.turnover > self.config.turnover_threshold),
            None => CheckOutcome::Fail,
        };

        let chain_height = match self.feed.max_limit_up_streak(date) {
            FeedReading::Available(streak) => {
                CheckOutcome::from_bool(streak >= self.config.chain_height_threshold)
            }
            FeedReading::Unavailable => CheckOutcome::Unknown,
        };

        let northbound = match self.feed.northbound_net_inflow(date) {
            FeedReading::Available(flow) => CheckOutcome::from_bool(flow > 0.0),
            FeedReading::Unavailable => CheckOutcome::Unknown,
        };

        let checks = RegimeChecks {
            index_trend,
            turnover,
            chain_height,
            northbound,
        };
        RegimeResult::from_checks(date, checks, &self.config)
    }
}
