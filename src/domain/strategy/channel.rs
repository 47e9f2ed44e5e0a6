//! Pullback-to-support entries inside a rising channel.
//!
//! Entry needs every condition on the evaluation day: enough history, a
//! channel fitted over the visible closes, a low touching the lower rail
//! band while the close holds above it, a close above its moving average,
//! volume above a multiple of its moving average, and a positive candle.
//!
//! Exits read the channel stored on the position. A close below the lower
//! rail times `stop_buffer` stops out at the close; a high reaching the upper
//! rail takes profit at the rail price.

use crate::domain::channel::{detect, ChannelParams};
use crate::domain::indicator::sma::trailing_sma;
use crate::domain::ohlcv::{closes, volumes};
use crate::domain::position::{ExitReason, ExitSignal, Position};
use crate::domain::price_series::PriceSeries;
use crate::domain::strategy::Strategy;
use chrono::NaiveDate;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStrategyConfig {
    pub channel: ChannelParams,
    pub min_history: usize,
    pub band_pct: f64,
    pub ma_window: usize,
    pub volume_ma_window: usize,
    pub volume_multiplier: f64,
    pub stop_buffer: f64,
}

impl Default for ChannelStrategyConfig {
    fn default() -> Self {
        ChannelStrategyConfig {
            channel: ChannelParams::default(),
            min_history: 60,
            band_pct: 0.02,
            ma_window: 10,
            volume_ma_window: 10,
            volume_multiplier: 1.2,
            stop_buffer: 0.98,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChannelStrategy {
    config: ChannelStrategyConfig,
}

impl ChannelStrategy {
    pub fn new(config: ChannelStrategyConfig) -> Self {
        Self { config }
    }
}

impl Strategy for ChannelStrategy {
    fn name(&self) -> &str {
        "channel"
    }

    fn check_entry(&self, series: &PriceSeries, date: NaiveDate) -> bool {
        let history = series.up_to(date);
        if history.len() < self.config.min_history.max(1) {
            return false;
        }
        let today_index = history.len() - 1;
        let today = &history[today_index];

        let closes = closes(history);
        let Some(channel) = detect(&closes, &self.config.channel) else {
            return false;
        };

        let lower = channel.lower_at(today_index);
        let near_support = today.low <= lower * (1.0 + self.config.band_pct)
            && today.close > lower * (1.0 - self.config.band_pct);
        if !near_support {
            return false;
        }

        match trailing_sma(&closes, self.config.ma_window) {
            Some(ma) if today.close > ma => {}
            _ => return false,
        }

        let volumes = volumes(history);
        match trailing_sma(&volumes, self.config.volume_ma_window) {
            Some(vol_ma) if today.volume as f64 > vol_ma * self.config.volume_multiplier => {}
            _ => return false,
        }

        if !today.is_positive_candle() {
            return false;
        }

        debug!(code = series.code(), %date, lower, "channel entry signal");
        true
    }

    fn check_exit(
        &self,
        series: &PriceSeries,
        date: NaiveDate,
        position: &Position,
    ) -> Option<ExitSignal> {
        let history = series.up_to(date);
        if history.len() < 2 {
            return None;
        }
        let today_index = history.len() - 1;
        let today = &history[today_index];
        let channel = &position.channel;

        let stop = channel.lower_at(today_index) * self.config.stop_buffer;
        if today.close < stop {
            return Some(ExitSignal {
                reason: ExitReason::StopLoss,
                price: today.close,
            });
        }

        let upper = channel.upper_at(today_index);
        if today.high >= upper {
            return Some(ExitSignal {
                reason: ExitReason::TakeProfit,
                price: upper,
            });
        }

        None
    }
}
