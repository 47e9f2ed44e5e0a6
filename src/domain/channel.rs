//! Rising trend channel fitted from the two most recent troughs.
//!
//! The lower rail runs through the troughs p1 (earlier) and p2 (later); the
//! upper rail is parallel and passes through the highest local maximum
//! strictly between them. Rails are linear in a bar's ordinal position in
//! the series handed to [`detect`], so callers must evaluate them with
//! indices from the same series.

use crate::domain::peaks::{find_peaks, find_troughs, PeakOptions};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelParams {
    pub lookback_period: usize,
    pub trough_distance: usize,
    pub min_slope: f64,
    pub prominence: f64,
}

impl Default for ChannelParams {
    fn default() -> Self {
        ChannelParams {
            lookback_period: 120,
            trough_distance: 10,
            min_slope: 0.05,
            prominence: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendChannel {
    pub slope: f64,
    pub intercept: f64,
    pub upper_intercept: f64,
    /// Earlier trough anchoring the lower rail.
    pub p1_index: usize,
    /// Later trough anchoring the lower rail.
    pub p2_index: usize,
    /// Local maximum the upper rail passes through.
    pub peak_index: usize,
}

impl TrendChannel {
    pub fn lower_at(&self, index: usize) -> f64 {
        self.slope * index as f64 + self.intercept
    }

    pub fn upper_at(&self, index: usize) -> f64 {
        self.slope * index as f64 + self.upper_intercept
    }

    pub fn width(&self) -> f64 {
        self.upper_intercept - self.intercept
    }
}

/// Fit a channel to `closes`. Returns `None` when fewer than two troughs
/// qualify, the troughs do not rise, the slope is too flat, or no local
/// maximum separates them.
pub fn detect(closes: &[f64], params: &ChannelParams) -> Option<TrendChannel> {
    let start = closes.len().saturating_sub(params.lookback_period);
    let window = &closes[start..];

    let troughs = find_troughs(
        window,
        &PeakOptions {
            distance: params.trough_distance.max(1),
            prominence: Some(params.prominence),
        },
    );
    if troughs.len() < 2 {
        return None;
    }

    let p1 = start + troughs[troughs.len() - 2];
    let p2 = start + troughs[troughs.len() - 1];
    let (price1, price2) = (closes[p1], closes[p2]);
    if price2 <= price1 {
        return None;
    }

    let slope = (price2 - price1) / (p2 - p1) as f64;
    if slope < params.min_slope {
        return None;
    }
    let intercept = price2 - slope * p2 as f64;

    // Maxima of closes[p1..p2] sit strictly inside the range: edges never qualify.
    let highs = find_peaks(&closes[p1..p2], &PeakOptions::default());
    let peak_index = highs
        .iter()
        .map(|&h| p1 + h)
        .max_by(|&a, &b| closes[a].total_cmp(&closes[b]).then(a.cmp(&b)))?;
    let upper_intercept = closes[peak_index] - slope * peak_index as f64;

    Some(TrendChannel {
        slope,
        intercept,
        upper_intercept,
        p1_index: p1,
        p2_index: p2,
        peak_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    /// Piecewise-linear path through the given (index, price) knots.
    fn path(knots: &[(usize, f64)]) -> Vec<f64> {
        let mut out = Vec::new();
        for w in knots.windows(2) {
            let ((i0, v0), (i1, v1)) = (w[0], w[1]);
            for i in i0..i1 {
                let t = (i - i0) as f64 / (i1 - i0) as f64;
                out.push(v0 + (v1 - v0) * t);
            }
        }
        let (_, last) = knots[knots.len() - 1];
        out.push(last);
        out
    }

    fn two_trough_series() -> Vec<f64> {
        path(&[(0, 11.0), (10, 10.0), (25, 13.0), (40, 12.0), (49, 13.5)])
    }

    #[test]
    fn fits_channel_through_two_troughs() {
        let closes = two_trough_series();
        let channel = detect(&closes, &ChannelParams::default()).unwrap();

        assert_eq!(channel.p1_index, 10);
        assert_eq!(channel.p2_index, 40);
        assert_eq!(channel.peak_index, 25);
        assert_abs_diff_eq!(channel.slope, 2.0 / 30.0, epsilon = 1e-12);
        assert_abs_diff_eq!(channel.intercept, 12.0 - 2.0 / 30.0 * 40.0, epsilon = 1e-9);
        assert_abs_diff_eq!(channel.upper_intercept, 13.0 - 2.0 / 30.0 * 25.0, epsilon = 1e-9);
        assert_abs_diff_eq!(channel.intercept, 9.3333, epsilon = 1e-3);
        assert_abs_diff_eq!(channel.upper_intercept, 11.3333, epsilon = 1e-3);
    }

    #[test]
    fn rails_evaluate_linearly() {
        let channel = detect(&two_trough_series(), &ChannelParams::default()).unwrap();
        assert_abs_diff_eq!(channel.lower_at(10), 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(channel.lower_at(40), 12.0, epsilon = 1e-9);
        assert_abs_diff_eq!(channel.upper_at(25), 13.0, epsilon = 1e-9);
        assert_abs_diff_eq!(channel.width(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn identical_inputs_yield_identical_channels() {
        let closes = two_trough_series();
        let a = detect(&closes, &ChannelParams::default());
        let b = detect(&closes, &ChannelParams::default());
        assert_eq!(a, b);
    }

    #[test]
    fn falling_troughs_are_rejected() {
        let closes = path(&[(0, 13.0), (10, 12.0), (25, 14.0), (40, 10.0), (49, 11.5)]);
        assert!(detect(&closes, &ChannelParams::default()).is_none());
    }

    #[test]
    fn flat_slope_is_rejected() {
        // Troughs 10.0 and 10.6 over 30 bars: slope 0.02.
        let closes = path(&[(0, 11.0), (10, 10.0), (25, 13.0), (40, 10.6), (49, 12.0)]);
        assert!(detect(&closes, &ChannelParams::default()).is_none());

        let loose = ChannelParams {
            min_slope: 0.01,
            ..ChannelParams::default()
        };
        assert!(detect(&closes, &loose).is_some());
    }

    #[test]
    fn single_trough_is_rejected() {
        let closes = path(&[(0, 12.0), (20, 10.0), (49, 15.0)]);
        assert!(detect(&closes, &ChannelParams::default()).is_none());
    }

    #[test]
    fn shallow_troughs_fail_prominence() {
        // Dips of 0.2 do not clear the default prominence of 0.5.
        let closes = path(&[
            (0, 10.0),
            (10, 10.5),
            (12, 10.3),
            (25, 11.5),
            (40, 12.0),
            (42, 11.8),
            (49, 12.5),
        ]);
        assert!(detect(&closes, &ChannelParams::default()).is_none());
    }

    #[test]
    fn troughs_closer_than_spacing_collapse() {
        // Two dips 5 bars apart with spacing 10: only the deeper survives.
        let closes = path(&[
            (0, 12.0),
            (10, 10.0),
            (13, 12.0),
            (15, 10.5),
            (25, 14.0),
            (49, 16.0),
        ]);
        assert!(detect(&closes, &ChannelParams::default()).is_none());
    }

    #[test]
    fn lookback_limits_trough_search_but_keeps_absolute_indices() {
        let mut closes = vec![20.0; 100];
        closes.extend(two_trough_series());
        // The flat prefix lies entirely outside the 50-bar window.
        let params = ChannelParams {
            lookback_period: 50,
            ..ChannelParams::default()
        };
        let channel = detect(&closes, &params).unwrap();
        assert_eq!(channel.p1_index, 110);
        assert_eq!(channel.p2_index, 140);
        assert_abs_diff_eq!(channel.lower_at(140), 12.0, epsilon = 1e-9);
    }

    proptest! {
        #[test]
        fn detection_is_deterministic_and_ordered(
            closes in prop::collection::vec(5.0f64..50.0, 3..200),
        ) {
            let params = ChannelParams::default();
            let first = detect(&closes, &params);
            prop_assert_eq!(first, detect(&closes, &params));
            if let Some(ch) = first {
                prop_assert!(ch.p1_index < ch.peak_index);
                prop_assert!(ch.peak_index < ch.p2_index);
                prop_assert!(ch.p2_index < closes.len());
                prop_assert!(ch.slope >= params.min_slope);
            }
        }
    }
}
