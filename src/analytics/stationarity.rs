//! Single-lag augmented Dickey-Fuller style stationarity check
//!
//! Regresses first differences on the lagged level and compares the slope's
//! t-statistic against fixed critical values. The reported p-value is a
//! two-valued approximation (0.01 when stationary, 0.1 otherwise), not an
//! interpolated distributional estimate.

use super::regression::ols;
use super::series::mean;
use serde::{Deserialize, Serialize};

/// Number of lags in the test regression
pub const ADF_LAG: usize = 1;

/// Critical values of the test statistic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CriticalValues {
    pub one_pct: f64,
    pub five_pct: f64,
    pub ten_pct: f64,
}

/// Fixed critical values used for classification
pub const CRITICAL_VALUES: CriticalValues = CriticalValues {
    one_pct: -3.43,
    five_pct: -2.86,
    ten_pct: -2.57,
};

const STATIONARY_P_VALUE: f64 = 0.01;
const NON_STATIONARY_P_VALUE: f64 = 0.1;

/// Outcome of the stationarity test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdfResult {
    pub statistic: f64,
    pub p_value: f64,
    pub is_stationary: bool,
}

impl AdfResult {
    /// Neutral, explicitly non-stationary result for unusable input
    pub fn inconclusive() -> Self {
        Self {
            statistic: 0.0,
            p_value: 1.0,
            is_stationary: false,
        }
    }
}

/// Test `values` for mean reversion.
///
/// Series shorter than `ADF_LAG + 2`, or whose lagged level is constant, give
/// [`AdfResult::inconclusive`]. Stationary iff the statistic is below the 10%
/// critical value.
pub fn adf_test(values: &[f64]) -> AdfResult {
    if values.len() < ADF_LAG + 2 {
        return AdfResult::inconclusive();
    }

    let lagged = &values[..values.len() - 1];
    let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    let regression = match ols(lagged, &diffs) {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!(error = %e, "ADF regression undefined");
            return AdfResult::inconclusive();
        }
    };

    let n = diffs.len();
    if n <= 2 {
        return AdfResult::inconclusive();
    }

    let residual_ss: f64 = lagged
        .iter()
        .zip(&diffs)
        .map(|(l, d)| (d - (regression.slope * l + regression.intercept)).powi(2))
        .sum();
    let residual_var = residual_ss / (n - 2) as f64;

    let lagged_mean = mean(lagged);
    let lagged_ss: f64 = lagged.iter().map(|l| (l - lagged_mean).powi(2)).sum();

    let standard_error = (residual_var / lagged_ss).sqrt();
    let statistic = regression.slope / standard_error;

    // NaN (0/0) compares false and classifies as non-stationary
    let is_stationary = statistic < CRITICAL_VALUES.ten_pct;
    let p_value = if is_stationary {
        STATIONARY_P_VALUE
    } else {
        NON_STATIONARY_P_VALUE
    };

    AdfResult {
        statistic,
        p_value,
        is_stationary,
    }
}
