//! Immutable analytics snapshot produced by each recompute cycle

use crate::analytics::{
    adf_test, correlation, hedge_ratio, rolling_zscore, spread, AnalyticsError, RegressionMethod,
    DEFAULT_HUBER_DELTA,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tunables read by every cycle
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsSettings {
    pub method: RegressionMethod,
    /// Z-score window, at least 1
    pub rolling_window: usize,
    pub huber_delta: f64,
    /// Ticks each symbol needs before a cycle runs
    pub min_samples: usize,
    /// Spread length the stationarity test requires to be exceeded
    pub stationarity_min_len: usize,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            method: RegressionMethod::Ols,
            rolling_window: 20,
            huber_delta: DEFAULT_HUBER_DELTA,
            min_samples: 20,
            stationarity_min_len: 30,
        }
    }
}

/// Published analytics for the active pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub hedge_ratio: f64,
    pub spread: Vec<f64>,
    pub z_score: Vec<f64>,
    pub correlation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adf_statistic: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adf_p_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_stationary: Option<bool>,
    pub method: RegressionMethod,
    pub computed_at: DateTime<Utc>,
}

impl AnalyticsSnapshot {
    /// Run the full pipeline over two aligned price series:
    /// hedge ratio, spread, rolling z-score, correlation and, for long
    /// enough spreads, the stationarity test.
    pub fn compute(
        prices1: &[f64],
        prices2: &[f64],
        settings: &AnalyticsSettings,
    ) -> Result<Self, AnalyticsError> {
        let hedge_ratio = hedge_ratio(settings.method, prices1, prices2, settings.huber_delta)?;
        let spread = spread(prices1, prices2, hedge_ratio)?;
        let z_score = rolling_zscore(&spread, Some(settings.rolling_window.max(1)));
        let correlation = correlation(prices1, prices2);

        let adf = (spread.len() > settings.stationarity_min_len).then(|| adf_test(&spread));

        Ok(Self {
            hedge_ratio,
            spread,
            z_score,
            correlation,
            adf_statistic: adf.map(|a| a.statistic),
            adf_p_value: adf.map(|a| a.p_value),
            is_stationary: adf.map(|a| a.is_stationary),
            method: settings.method,
            computed_at: Utc::now(),
        })
    }

    pub fn last_z_score(&self) -> Option<f64> {
        self.z_score.last().copied()
    }

    pub fn last_spread(&self) -> Option<f64> {
        self.spread.last().copied()
    }
}
