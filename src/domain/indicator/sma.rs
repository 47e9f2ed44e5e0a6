//! Simple moving average.
//!
//! SMA(n)[i] = sum(V[i-j] for j in 0..n) / n
//! Warmup: first (n-1) values have no average.

/// Average of the last `period` values, or `None` when fewer are available.
pub fn trailing_sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// SMA at every position; `None` during warmup.
pub fn rolling_sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }
    let warmup = period - 1;
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;

    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= period {
            sum -= values[i - period];
        }
        if i >= warmup {
            out.push(Some(sum / period as f64));
        } else {
            out.push(None);
        }
    }

    out
}
