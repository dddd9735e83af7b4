//! Analytics engine
//!
//! Pure numeric building blocks for pairs analysis: hedge-ratio estimators,
//! derived series, the stationarity test and bar aggregation. Nothing here
//! performs I/O or holds shared state.

mod error;
mod kalman;
mod ohlc;
mod regression;
mod series;
mod stationarity;

pub use error::AnalyticsError;
pub use kalman::{kalman_filter_series, kalman_update, KalmanState};
pub use ohlc::{aggregate_ohlc, OhlcBar, Timeframe};
pub use regression::{
    huber, ols, theil_sen, RegressionMethod, RegressionResult, DEFAULT_HUBER_DELTA,
    HUBER_ITERATIONS,
};
pub use series::{correlation, mean, rolling_correlation, rolling_zscore, spread, std_dev};
pub use stationarity::{adf_test, AdfResult, CriticalValues, ADF_LAG, CRITICAL_VALUES};

/// Estimate the hedge ratio of `prices1` against `prices2` with `method`.
///
/// Regresses `prices1` (dependent) on `prices2`. The Kalman method returns a
/// fixed ratio of 1; incremental tracking goes through [`kalman_update`].
pub fn hedge_ratio(
    method: RegressionMethod,
    prices1: &[f64],
    prices2: &[f64],
    huber_delta: f64,
) -> Result<f64, AnalyticsError> {
    let slope = match method {
        RegressionMethod::Ols => ols(prices2, prices1)?.slope,
        RegressionMethod::Huber => huber(prices2, prices1, huber_delta)?.slope,
        RegressionMethod::TheilSen => theil_sen(prices2, prices1)?.slope,
        RegressionMethod::Kalman => 1.0,
    };
    Ok(slope)
}
