//! Small numeric helpers shared by the aggregators

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Population standard deviation around a precomputed mean.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Percentile with linear interpolation between closest ranks.
/// Empty series evaluate to 0.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);

    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let fraction = rank - lower as f64;
        sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
    }
}

/// 95th percentile of a load distribution.
pub fn p95(values: &[f64]) -> f64 {
    percentile(values, 95.0)
}

/// Statistical mode; ties resolve to the smallest value so repeated calls
/// stay deterministic. `None` for an empty slice.
pub fn mode(values: &[u8]) -> Option<u8> {
    let mut counts = [0usize; 256];
    for &value in values {
        counts[value as usize] += 1;
    }
    values
        .iter()
        .map(|&v| v as usize)
        .max_by(|&a, &b| counts[a].cmp(&counts[b]).then(b.cmp(&a)))
        .map(|v| v as u8)
}

/// Ordinary-least-squares slope of `values` against their indices.
/// Fewer than two points, or a degenerate x-spread, give slope 0.
pub fn ols_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;
    let x_sum: f64 = (0..n).map(|i| i as f64).sum();
    let y_sum: f64 = values.iter().sum();
    let xy_sum: f64 = values.iter().enumerate().map(|(i, &y)| i as f64 * y).sum();
    let x_sq_sum: f64 = (0..n).map(|i| (i as f64).powi(2)).sum();

    let denominator = n_f * x_sq_sum - x_sum.powi(2);
    if denominator == 0.0 {
        0.0
    } else {
        (n_f * xy_sum - x_sum * y_sum) / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_stddev_of_known_series() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let m = mean(&values);
        assert!((m - 5.0).abs() < 1e-10);
        assert!((stddev(&values, m) - 2.0).abs() < 1e-10);
    }

    #[test]
    fn empty_series_are_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(stddev(&[], 0.0), 0.0);
        assert_eq!(p95(&[]), 0.0);
        assert_eq!(ols_slope(&[]), 0.0);
        assert_eq!(mode(&[]), None);
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let values = [1.0, 2.0, 3.0, 4.0];
        // rank = 0.5 * 3 = 1.5 -> halfway between 2 and 3
        assert!((percentile(&values, 50.0) - 2.5).abs() < 1e-10);
        assert!((percentile(&values, 0.0) - 1.0).abs() < 1e-10);
        assert!((percentile(&values, 100.0) - 4.0).abs() < 1e-10);
    }

    #[test]
    fn p95_at_least_mean_for_non_degenerate_series() {
        let values = [0.2, 0.4, 0.9, 1.3, 0.7];
        assert!(p95(&values) >= mean(&values));
    }

    #[test]
    fn p95_of_single_value_is_that_value() {
        assert!((p95(&[0.8]) - 0.8).abs() < 1e-10);
    }

    #[test]
    fn mode_breaks_ties_toward_smaller_value() {
        assert_eq!(mode(&[7, 9, 9, 7, 3]), Some(7));
        assert_eq!(mode(&[8, 8, 2]), Some(8));
    }

    #[test]
    fn slope_of_linear_series() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((ols_slope(&values) - 1.0).abs() < 1e-10);
        assert!(ols_slope(&[5.0, 5.0, 5.0]).abs() < 1e-10);
    }
}
