//! NaN-aware column statistics
//!
//! Missing values are encoded as `NaN` throughout the crate; every helper in
//! this module skips them.

use ndarray::ArrayView1;

/// Check if value is missing (NaN)
#[inline]
pub fn is_missing(v: f64) -> bool {
    v.is_nan()
}

/// Observed (non-missing) values of a column
pub fn observed(col: ArrayView1<f64>) -> Vec<f64> {
    col.iter().copied().filter(|v| !is_missing(*v)).collect()
}

/// Mean of observed values, `None` when nothing is observed
pub fn nan_mean(col: ArrayView1<f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for &v in col.iter() {
        if !is_missing(v) {
            sum += v;
            n += 1;
        }
    }
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// Variance of observed values with `ddof` delta degrees of freedom.
///
/// Returns `None` when fewer than `ddof + 1` values are observed.
pub fn nan_variance(col: ArrayView1<f64>, ddof: usize) -> Option<f64> {
    let values = observed(col);
    if values.len() <= ddof {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some(ss / (values.len() - ddof) as f64)
}

/// Median of observed values
pub fn nan_median(col: ArrayView1<f64>) -> Option<f64> {
    let mut values = observed(col);
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Most frequent observed value; ties resolve to the smallest value
pub fn nan_mode(col: ArrayView1<f64>) -> Option<f64> {
    let mut values = observed(col);
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let mut best = values[0];
    let mut best_count = 0usize;
    let mut run_start = 0usize;
    for i in 1..=values.len() {
        if i == values.len() || values[i] != values[run_start] {
            let count = i - run_start;
            // strict '>' keeps the smallest value among equally frequent ones
            if count > best_count {
                best_count = count;
                best = values[run_start];
            }
            run_start = i;
        }
    }
    Some(best)
}

/// Minimum and maximum of observed values
pub fn nan_min_max(col: ArrayView1<f64>) -> Option<(f64, f64)> {
    col.iter()
        .copied()
        .filter(|v| !is_missing(*v))
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
