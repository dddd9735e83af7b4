//! Batch hedge-ratio estimators
//!
//! Three independent fits of `y = slope * x + intercept` over two aligned
//! price series:
//! - OLS: closed-form least squares
//! - Huber: iteratively reweighted least squares, seeded from OLS
//! - Theil-Sen: median of pairwise slopes, robust to a minority of outliers

use super::error::{check_paired, is_degenerate, AnalyticsError};
use super::series::mean;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default Huber threshold (95% efficiency under Gaussian noise)
pub const DEFAULT_HUBER_DELTA: f64 = 1.35;

/// Huber runs a fixed number of reweighting passes, no early stopping
pub const HUBER_ITERATIONS: usize = 10;

/// Fitted line and its goodness of fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionResult {
    pub slope: f64,
    pub intercept: f64,
    /// 1 - SS_residual / SS_total; 0 when y has no variance
    pub r_squared: f64,
}

/// Hedge-ratio estimation method selected for the live cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegressionMethod {
    #[default]
    Ols,
    Huber,
    TheilSen,
    /// Incremental estimator; the batch cycle uses a fixed unit hedge ratio
    Kalman,
}

impl RegressionMethod {
    /// Configuration label
    pub fn as_str(&self) -> &'static str {
        match self {
            RegressionMethod::Ols => "ols",
            RegressionMethod::Huber => "huber",
            RegressionMethod::TheilSen => "theil-sen",
            RegressionMethod::Kalman => "kalman",
        }
    }
}

impl fmt::Display for RegressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegressionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ols" => Ok(RegressionMethod::Ols),
            "huber" => Ok(RegressionMethod::Huber),
            "theil-sen" | "theilsen" | "theil_sen" => Ok(RegressionMethod::TheilSen),
            "kalman" => Ok(RegressionMethod::Kalman),
            other => Err(format!(
                "unknown regression method '{}' (expected ols, huber, theil-sen or kalman)",
                other
            )),
        }
    }
}

/// Ordinary least squares fit of `y` on `x`.
///
/// Fails with [`AnalyticsError::InvalidInput`] on empty or mismatched input and
/// with [`AnalyticsError::ZeroVariance`] when `x` is constant.
pub fn ols(x: &[f64], y: &[f64]) -> Result<RegressionResult, AnalyticsError> {
    check_paired(x, y)?;

    let x_mean = mean(x);
    let y_mean = mean(y);

    let mut s_xx = 0.0;
    let mut s_xy = 0.0;
    let mut raw_xx = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - x_mean;
        s_xx += dx * dx;
        s_xy += dx * (yi - y_mean);
        raw_xx += xi * xi;
    }

    if is_degenerate(s_xx, raw_xx, x.len()) {
        return Err(AnalyticsError::ZeroVariance);
    }

    let slope = s_xy / s_xx;
    let intercept = y_mean - slope * x_mean;

    Ok(fit(x, y, slope, intercept))
}

/// Huber robust regression by iteratively reweighted least squares.
///
/// Starts from the OLS fit and runs exactly [`HUBER_ITERATIONS`] passes. Each
/// point gets weight 1 when its residual is within `delta`, else
/// `delta / |residual|`.
pub fn huber(x: &[f64], y: &[f64], delta: f64) -> Result<RegressionResult, AnalyticsError> {
    let initial = ols(x, y)?;
    let mut slope = initial.slope;
    let mut intercept = initial.intercept;

    for _ in 0..HUBER_ITERATIONS {
        let weights: Vec<f64> = x
            .iter()
            .zip(y)
            .map(|(&xi, &yi)| huber_weight(yi - (slope * xi + intercept), delta))
            .collect();

        let mut sum_w = 0.0;
        let mut sum_wx = 0.0;
        let mut sum_wy = 0.0;
        for ((&xi, &yi), &w) in x.iter().zip(y).zip(&weights) {
            sum_w += w;
            sum_wx += w * xi;
            sum_wy += w * yi;
        }

        let wx_mean = sum_wx / sum_w;
        let wy_mean = sum_wy / sum_w;

        let mut s_wxx = 0.0;
        let mut s_wxy = 0.0;
        let mut raw_wxx = 0.0;
        for ((&xi, &yi), &w) in x.iter().zip(y).zip(&weights) {
            let dx = xi - wx_mean;
            s_wxx += w * dx * dx;
            s_wxy += w * dx * (yi - wy_mean);
            raw_wxx += w * xi * xi;
        }

        if is_degenerate(s_wxx, raw_wxx, x.len()) {
            return Err(AnalyticsError::ZeroVariance);
        }

        slope = s_wxy / s_wxx;
        intercept = wy_mean - slope * wx_mean;
    }

    Ok(fit(x, y, slope, intercept))
}

fn huber_weight(residual: f64, delta: f64) -> f64 {
    let abs = residual.abs();
    if abs <= delta {
        1.0
    } else {
        delta / abs
    }
}

/// Theil-Sen estimator: slope is the median of all pairwise slopes with
/// distinct x, intercept is the median of `y_i - slope * x_i`.
///
/// O(n^2) in the number of points.
pub fn theil_sen(x: &[f64], y: &[f64]) -> Result<RegressionResult, AnalyticsError> {
    check_paired(x, y)?;

    let n = x.len();
    let mut slopes = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            if x[j] != x[i] {
                slopes.push((y[j] - y[i]) / (x[j] - x[i]));
            }
        }
    }

    if slopes.is_empty() {
        return Err(AnalyticsError::ZeroVariance);
    }

    let slope = upper_median(&mut slopes);
    let mut intercepts: Vec<f64> = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| yi - slope * xi)
        .collect();
    let intercept = upper_median(&mut intercepts);

    Ok(fit(x, y, slope, intercept))
}

/// Element at index `len / 2` after sorting (upper median for even lengths)
fn upper_median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    values[values.len() / 2]
}

/// Package a fitted line with its r-squared over the original points
fn fit(x: &[f64], y: &[f64], slope: f64, intercept: f64) -> RegressionResult {
    let y_mean = mean(y);
    let mut ss_total = 0.0;
    let mut ss_residual = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        ss_total += (yi - y_mean).powi(2);
        ss_residual += (yi - (slope * xi + intercept)).powi(2);
    }

    let r_squared = if ss_total > 0.0 {
        1.0 - ss_residual / ss_total
    } else {
        0.0
    };

    RegressionResult {
        slope,
        intercept,
        r_squared,
    }
}
