//! Scalar Kalman filter for a slowly varying hedge ratio.
//!
//! The filter is a plain value: [`update`] takes the current state and a
//! measurement and returns the next state together with the new estimate.
//! Callers own the state and thread it through successive updates.
//!
//! # Model
//!
//! ```text
//! predict:  p' = p + q
//! gain:     k  = p' / (p' + r)
//! correct:  x' = x + k * (z - x)
//!           p'' = (1 - k) * p'
//! ```
//!
//! # Usage
//!
//! ```rust
//! use pairs_arb::analytics::{kalman_update, KalmanState};
//!
//! let state = KalmanState::new(1.0, 1.0, 1e-5, 1e-3);
//! let (state, beta) = kalman_update(state, 0.98);
//! assert!(beta < 1.0);
//! assert!(state.error_covariance < 1.0);
//! ```

use serde::{Deserialize, Serialize};

/// Filter state: estimate, its error covariance, and the noise parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KalmanState {
    /// Current estimate (x)
    pub estimate: f64,
    /// Estimation error covariance (p)
    pub error_covariance: f64,
    /// Process noise (q): how fast the hidden value may drift
    pub process_noise: f64,
    /// Measurement noise (r): uncertainty of each observation
    pub measurement_noise: f64,
}

impl KalmanState {
    /// Create a filter state from explicit parameters
    pub fn new(
        estimate: f64,
        error_covariance: f64,
        process_noise: f64,
        measurement_noise: f64,
    ) -> Self {
        Self {
            estimate,
            error_covariance,
            process_noise,
            measurement_noise,
        }
    }

    /// Apply one measurement, see [`kalman_update`]
    pub fn update(self, measurement: f64) -> (Self, f64) {
        kalman_update(self, measurement)
    }
}

impl Default for KalmanState {
    fn default() -> Self {
        Self::new(0.0, 1.0, 0.001, 0.1)
    }
}

/// One predict/correct step. Returns the next state and its estimate.
///
/// Non-finite measurements leave the state untouched.
pub fn kalman_update(state: KalmanState, measurement: f64) -> (KalmanState, f64) {
    if !measurement.is_finite() {
        return (state, state.estimate);
    }

    let predicted = state.error_covariance + state.process_noise;
    let innovation_var = predicted + state.measurement_noise;
    let gain = if innovation_var > 0.0 {
        predicted / innovation_var
    } else {
        0.0
    };

    let next = KalmanState {
        estimate: state.estimate + gain * (measurement - state.estimate),
        error_covariance: (1.0 - gain) * predicted,
        ..state
    };

    (next, next.estimate)
}

/// Run the filter over a whole measurement series.
///
/// Returns the final state and the estimate after each measurement.
pub fn kalman_filter_series(state: KalmanState, measurements: &[f64]) -> (KalmanState, Vec<f64>) {
    let mut estimates = Vec::with_capacity(measurements.len());
    let state = measurements.iter().fold(state, |state, &z| {
        let (next, estimate) = kalman_update(state, z);
        estimates.push(estimate);
        next
    });
    (state, estimates)
}
