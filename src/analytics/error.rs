//! Analytics error types

use thiserror::Error;

/// Errors raised by the numeric estimators
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyticsError {
    /// Input series are empty or of different lengths
    #[error("Invalid input: series lengths {x_len} and {y_len} must be equal and non-zero")]
    InvalidInput { x_len: usize, y_len: usize },
    /// The independent variable has no variance, so the slope is undefined
    #[error("Independent variable has zero variance")]
    ZeroVariance,
    /// Bucket interval for bar aggregation must be positive
    #[error("Invalid aggregation interval: {0}ms")]
    InvalidInterval(i64),
}

/// Check that two series are non-empty and equally long
pub(crate) fn check_paired(x: &[f64], y: &[f64]) -> Result<(), AnalyticsError> {
    if x.len() != y.len() || x.is_empty() {
        return Err(AnalyticsError::InvalidInput {
            x_len: x.len(),
            y_len: y.len(),
        });
    }
    Ok(())
}

/// True when a centered sum of squares over `n` points is zero up to rounding.
///
/// Centering a constant series around its computed mean leaves residue of at
/// most `(n * EPSILON)^2` relative to the raw sum of squares, so anything at or
/// below that is treated as zero variance. Small but genuine variation is kept.
pub(crate) fn is_degenerate(centered_ss: f64, raw_ss: f64, n: usize) -> bool {
    let tolerance = (n as f64 * f64::EPSILON).powi(2) * raw_ss.abs();
    !centered_ss.is_finite() || centered_ss <= tolerance
}
