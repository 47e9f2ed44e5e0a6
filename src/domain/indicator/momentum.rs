//! Momentum over a calendar window.
//!
//! MOM = (C[last] - C[first]) / C[first], over bars dated in
//! (date - window_days, date]. Needs at least `min_bars` bars in the window.

use crate::domain::ohlcv::PriceBar;
use chrono::{Duration, NaiveDate};

pub fn window_momentum(
    bars: &[PriceBar],
    date: NaiveDate,
    window_days: i64,
    min_bars: usize,
) -> Option<f64> {
    let window_start = date - Duration::days(window_days);
    let from = bars.partition_point(|b| b.date <= window_start);
    let to = bars.partition_point(|b| b.date <= date);
    if to <= from {
        return None;
    }
    let window = &bars[from..to];
    if window.len() < min_bars.max(1) {
        return None;
    }

    let first = window[0].close;
    let last = window[window.len() - 1].close;
    if first <= 0.0 {
        return None;
    }
    Some((last - first) / first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn make_bars(start: &str, closes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::parse_from_str(start, "%Y-%m-%d").unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: start + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
                turnover: 0.0,
            })
            .collect()
    }

    fn d(date: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn momentum_over_window() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars("2024-01-01", &closes);
        // Window (Jan 10, Feb 9] holds bars Jan 11..Feb 9, closes 110..139.
        let m = window_momentum(&bars, d("2024-02-09"), 30, 10).unwrap();
        assert_abs_diff_eq!(m, (139.0 - 110.0) / 110.0, epsilon = 1e-12);
    }

    #[test]
    fn ignores_bars_after_date() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars("2024-01-01", &closes);
        let m = window_momentum(&bars, d("2024-01-15"), 30, 10).unwrap();
        assert_abs_diff_eq!(m, 14.0 / 100.0, epsilon = 1e-12);
    }

    #[test]
    fn requires_minimum_bars() {
        let bars = make_bars("2024-01-01", &[100.0; 9]);
        assert!(window_momentum(&bars, d("2024-01-09"), 30, 10).is_none());
        assert!(window_momentum(&bars, d("2024-01-09"), 30, 9).is_some());
    }

    #[test]
    fn negative_momentum_is_reported() {
        let closes: Vec<f64> = (0..12).map(|i| 100.0 - i as f64).collect();
        let bars = make_bars("2024-01-01", &closes);
        let m = window_momentum(&bars, d("2024-01-12"), 30, 10).unwrap();
        assert!(m < 0.0);
    }

    #[test]
    fn empty_window() {
        let bars = make_bars("2024-03-01", &[100.0; 12]);
        assert!(window_momentum(&bars, d("2024-01-01"), 30, 1).is_none());
    }
}
