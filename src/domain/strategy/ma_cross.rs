//! Moving-average crossover: enter on a golden cross, leave on a death
//! cross or a fixed percentage stop below the entry price.

use crate::domain::indicator::sma::rolling_sma;
use crate::domain::ohlcv::closes;
use crate::domain::position::{ExitReason, ExitSignal, Position};
use crate::domain::price_series::PriceSeries;
use crate::domain::strategy::Strategy;
use chrono::NaiveDate;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct MaCrossConfig {
    pub short_ma: usize,
    pub long_ma: usize,
    pub stop_loss_pct: f64,
}

impl Default for MaCrossConfig {
    fn default() -> Self {
        MaCrossConfig {
            short_ma: 20,
            long_ma: 60,
            stop_loss_pct: 0.10,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MaCrossStrategy {
    config: MaCrossConfig,
}

/// Short and long averages for yesterday and today.
struct CrossState {
    prev_short: f64,
    prev_long: f64,
    short: f64,
    long: f64,
}

impl MaCrossStrategy {
    pub fn new(config: MaCrossConfig) -> Self {
        Self { config }
    }

    fn cross_state(&self, closes: &[f64]) -> Option<CrossState> {
        let span = self.config.long_ma.max(self.config.short_ma) + 1;
        if closes.len() < span + 1 {
            return None;
        }
        let tail = &closes[closes.len() - span..];
        let short = rolling_sma(tail, self.config.short_ma);
        let long = rolling_sma(tail, self.config.long_ma);
        let [.., prev_short, short] = short.as_slice() else {
            return None;
        };
        let [.., prev_long, long] = long.as_slice() else {
            return None;
        };
        Some(CrossState {
            prev_short: (*prev_short)?,
            prev_long: (*prev_long)?,
            short: (*short)?,
            long: (*long)?,
        })
    }
}

impl Strategy for MaCrossStrategy {
    fn name(&self) -> &str {
        "ma_cross"
    }

    fn check_entry(&self, series: &PriceSeries, date: NaiveDate) -> bool {
        let closes = closes(series.up_to(date));
        let Some(s) = self.cross_state(&closes) else {
            return false;
        };
        let golden = s.short >= s.long && s.prev_short < s.prev_long;
        if golden {
            debug!(code = series.code(), %date, "golden cross");
        }
        golden
    }

    fn check_exit(
        &self,
        series: &PriceSeries,
        date: NaiveDate,
        position: &Position,
    ) -> Option<ExitSignal> {
        let closes = closes(series.up_to(date));
        let s = self.cross_state(&closes)?;
        let close = *closes.last()?;

        if s.short <= s.long && s.prev_short > s.prev_long {
            return Some(ExitSignal {
                reason: ExitReason::DeathCross,
                price: close,
            });
        }

        if close < position.entry_price * (1.0 - self.config.stop_loss_pct) {
            return Some(ExitSignal {
                reason: ExitReason::StopLoss,
                price: close,
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::channel::TrendChannel;
    use crate::domain::ohlcv::PriceBar;
    use chrono::Duration;

    fn day(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + Duration::days(i as i64)
    }

    fn series(closes: &[f64]) -> PriceSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: day(i),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
                turnover: 0.0,
            })
            .collect();
        PriceSeries::new("000651", bars).unwrap()
    }

    fn fast() -> MaCrossStrategy {
        MaCrossStrategy::new(MaCrossConfig {
            short_ma: 2,
            long_ma: 4,
            stop_loss_pct: 0.10,
        })
    }

    fn position(entry_price: f64) -> Position {
        Position {
            code: "000651".into(),
            shares: 100,
            entry_date: day(0),
            entry_price,
            channel: TrendChannel {
                slope: 0.1,
                intercept: 1.0,
                upper_intercept: 2.0,
                p1_index: 0,
                p2_index: 1,
                peak_index: 0,
            },
        }
    }

    #[test]
    fn golden_cross_enters() {
        let s = series(&[10.0, 9.0, 8.0, 7.0, 6.0, 5.0, 6.0, 9.0]);
        assert!(fast().check_entry(&s, day(7)));
        assert!(!fast().check_entry(&s, day(6)));
        assert!(!fast().check_entry(&s, day(5)));
    }

    #[test]
    fn entry_needs_long_window_plus_two() {
        let s = series(&[10.0, 9.0, 8.0, 7.0, 6.0]);
        assert!(!fast().check_entry(&s, day(4)));
    }

    #[test]
    fn cross_state_reads_last_two_averages() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let s = fast().cross_state(&closes).unwrap();
        assert!((s.prev_short - 6.5).abs() < 1e-12);
        assert!((s.prev_long - 5.5).abs() < 1e-12);
        assert!((s.short - 7.5).abs() < 1e-12);
        assert!((s.long - 6.5).abs() < 1e-12);
    }

    #[test]
    fn short_window_longer_than_long_window() {
        let inverted = MaCrossStrategy::new(MaCrossConfig {
            short_ma: 6,
            long_ma: 2,
            stop_loss_pct: 0.10,
        });
        let s = series(&[10.0, 9.0, 8.0, 7.0, 6.0]);
        assert!(!inverted.check_entry(&s, day(4)));
    }

    #[test]
    fn death_cross_exits_at_close() {
        let s = series(&[5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 9.0, 6.0]);
        let signal = fast().check_exit(&s, day(7), &position(5.0)).unwrap();
        assert_eq!(signal.reason, ExitReason::DeathCross);
        assert!((signal.price - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn fixed_stop_below_entry() {
        let s = series(&[8.9; 8]);
        let signal = fast().check_exit(&s, day(7), &position(10.0)).unwrap();
        assert_eq!(signal.reason, ExitReason::StopLoss);
        assert!(fast().check_exit(&s, day(7), &position(9.8)).is_none());
    }
}
