//! Local extrema detection with spacing and prominence filters.
//!
//! A peak is a sample strictly higher than its left neighbour and higher
//! than the first differing sample to its right; flat tops report their
//! midpoint. Edges never qualify. Troughs are peaks of the negated series.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakOptions {
    /// Minimum index distance between kept peaks. Higher peaks win.
    pub distance: usize,
    /// Minimum topographic prominence, in the units of the input.
    pub prominence: Option<f64>,
}

impl Default for PeakOptions {
    fn default() -> Self {
        PeakOptions {
            distance: 1,
            prominence: None,
        }
    }
}

pub fn find_peaks(x: &[f64], options: &PeakOptions) -> Vec<usize> {
    let mut peaks = local_maxima(x);

    if options.distance > 1 && peaks.len() > 1 {
        peaks = select_by_distance(x, &peaks, options.distance);
    }

    if let Some(min_prominence) = options.prominence {
        peaks.retain(|&p| prominence(x, p) >= min_prominence);
    }

    peaks
}

pub fn find_troughs(x: &[f64], options: &PeakOptions) -> Vec<usize> {
    let negated: Vec<f64> = x.iter().map(|v| -v).collect();
    find_peaks(&negated, options)
}

fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }
    let last = x.len() - 1;

    let mut i = 1;
    while i < last {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < last && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                let right_edge = ahead - 1;
                peaks.push((i + right_edge) / 2);
                i = ahead;
            }
        }
        i += 1;
    }

    peaks
}

fn select_by_distance(x: &[f64], peaks: &[usize], distance: usize) -> Vec<usize> {
    let mut keep = vec![true; peaks.len()];

    let mut by_height: Vec<usize> = (0..peaks.len()).collect();
    by_height.sort_by(|&a, &b| x[peaks[a]].total_cmp(&x[peaks[b]]));

    for &j in by_height.iter().rev() {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, kept)| kept.then_some(p))
        .collect()
}

/// Height of a peak above the higher of the two lowest points reachable
/// on each side before crossing a sample taller than the peak.
pub fn prominence(x: &[f64], peak: usize) -> f64 {
    let height = x[peak];

    let mut left_min = height;
    for &v in x[..=peak].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    for &v in &x[peak..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}
