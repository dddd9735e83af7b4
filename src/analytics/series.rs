//! Derived series: spread, rolling z-score and correlation

use super::error::{check_paired, is_degenerate, AnalyticsError};

/// Arithmetic mean; 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; 0 for an empty slice
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Spread `prices1[i] - hedge_ratio * prices2[i]` for every index
pub fn spread(prices1: &[f64], prices2: &[f64], hedge_ratio: f64) -> Result<Vec<f64>, AnalyticsError> {
    if prices1.len() != prices2.len() {
        return Err(AnalyticsError::InvalidInput {
            x_len: prices1.len(),
            y_len: prices2.len(),
        });
    }

    Ok(prices1
        .iter()
        .zip(prices2)
        .map(|(p1, p2)| p1 - hedge_ratio * p2)
        .collect())
}

/// Rolling z-score over a trailing window.
///
/// Index `i` is scored against the last `min(window, i + 1)` values, so the
/// window expands until it is full. `None` (or a zero window) scores every
/// value against the whole prefix. A window with zero deviation scores 0.
pub fn rolling_zscore(values: &[f64], window: Option<usize>) -> Vec<f64> {
    let window = match window {
        Some(w) if w > 0 => w,
        _ => values.len().max(1),
    };

    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            let sd = std_dev(slice);
            if sd == 0.0 {
                0.0
            } else {
                (values[i] - mean(slice)) / sd
            }
        })
        .collect()
}

/// Pearson correlation.
///
/// Returns 0 when the inputs are empty, mismatched, or either has no variance.
pub fn correlation(x: &[f64], y: &[f64]) -> f64 {
    if check_paired(x, y).is_err() {
        return 0.0;
    }

    let x_mean = mean(x);
    let y_mean = mean(y);

    let mut s_xx = 0.0;
    let mut s_yy = 0.0;
    let mut s_xy = 0.0;
    let mut raw_xx = 0.0;
    let mut raw_yy = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - x_mean;
        let dy = yi - y_mean;
        s_xx += dx * dx;
        s_yy += dy * dy;
        s_xy += dx * dy;
        raw_xx += xi * xi;
        raw_yy += yi * yi;
    }

    if is_degenerate(s_xx, raw_xx, x.len()) || is_degenerate(s_yy, raw_yy, y.len()) {
        return 0.0;
    }

    (s_xy / (s_xx * s_yy).sqrt()).clamp(-1.0, 1.0)
}

/// Correlation over each full trailing window, emitted from index `window - 1`.
///
/// Empty when the window is zero, longer than the series, or the inputs differ
/// in length.
pub fn rolling_correlation(x: &[f64], y: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || x.len() != y.len() || window > x.len() {
        return Vec::new();
    }

    x.windows(window)
        .zip(y.windows(window))
        .map(|(xw, yw)| correlation(xw, yw))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn wave(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + (i as f64 * 0.7).sin() * 3.0).collect()
    }

    #[test]
    fn test_mean_and_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), 5.0);
        assert_eq!(std_dev(&values), 2.0);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
    }

    #[test]
    fn test_spread_is_exact() {
        let p1 = [101.5, 102.25, 99.75, 100.0];
        let p2 = [50.5, 51.0, 49.0, 50.25];
        let h = 1.98;
        let s = spread(&p1, &p2, h).unwrap();
        for i in 0..p1.len() {
            assert_eq!(s[i], p1[i] - h * p2[i]);
        }
    }

    #[test]
    fn test_spread_mismatched_lengths() {
        assert!(spread(&[1.0, 2.0], &[1.0], 1.0).is_err());
    }

    #[test]
    fn test_spread_empty() {
        assert_eq!(spread(&[], &[], 2.0).unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn test_zscore_constant_series_is_zero() {
        let values = vec![7.5; 40];
        for window in [None, Some(1), Some(5), Some(20), Some(100)] {
            let z = rolling_zscore(&values, window);
            assert_eq!(z.len(), values.len());
            assert!(z.iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_zscore_first_value_is_zero() {
        let z = rolling_zscore(&wave(10), Some(5));
        assert_eq!(z[0], 0.0);
    }

    #[test]
    fn test_zscore_window_of_one_is_zero() {
        let z = rolling_zscore(&wave(10), Some(1));
        assert!(z.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_zscore_expanding_then_fixed() {
        let values = [1.0, 2.0, 3.0, 10.0];
        let z = rolling_zscore(&values, Some(3));

        // i = 1 uses [1, 2]: mean 1.5, sd 0.5
        assert!((z[1] - 1.0).abs() < EPS);

        // i = 3 uses [2, 3, 10] only
        let window = [2.0, 3.0, 10.0];
        let expected = (10.0 - mean(&window)) / std_dev(&window);
        assert!((z[3] - expected).abs() < EPS);
    }

    #[test]
    fn test_zscore_zero_window_uses_whole_prefix() {
        let values = wave(15);
        assert_eq!(rolling_zscore(&values, Some(0)), rolling_zscore(&values, None));
    }

    #[test]
    fn test_zscore_empty() {
        assert!(rolling_zscore(&[], Some(10)).is_empty());
    }

    #[test]
    fn test_correlation_with_self_and_negation() {
        let x = wave(50);
        let neg: Vec<f64> = x.iter().map(|v| -v).collect();
        assert!((correlation(&x, &x) - 1.0).abs() < 1e-9);
        assert!((correlation(&x, &neg) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_correlation_degenerate_cases() {
        let x = wave(20);
        assert_eq!(correlation(&x, &vec![3.0; 20]), 0.0);
        assert_eq!(correlation(&x, &x[..10]), 0.0);
        assert_eq!(correlation(&[], &[]), 0.0);
    }

    #[test]
    fn test_correlation_keeps_small_variation_on_large_level() {
        let mut x = vec![60_000.0; 999];
        x.push(60_000.01);
        let y: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        assert!(correlation(&x, &y) > 0.0);
    }

    #[test]
    fn test_rolling_correlation_length() {
        let x = wave(30);
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
        let rc = rolling_correlation(&x, &y, 10);
        assert_eq!(rc.len(), 21);
        assert!(rc.iter().all(|c| (c - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_rolling_correlation_invalid_window() {
        let x = wave(5);
        assert!(rolling_correlation(&x, &x, 0).is_empty());
        assert!(rolling_correlation(&x, &x, 6).is_empty());
        assert!(rolling_correlation(&x, &x[..4], 2).is_empty());
    }
}
