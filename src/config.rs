//! Configuration types for pairs-arb

use crate::analytics::{RegressionMethod, Timeframe, DEFAULT_HUBER_DELTA};
use crate::backtest::BacktestConfig;
use crate::data::RecorderConfig;
use crate::engine::{AlertDefinition, AnalyticsSettings, OrchestratorConfig};
use crate::telemetry::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
    #[serde(default)]
    pub alerts: Vec<AlertDefinition>,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Price feed configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    /// The traded pair; live analytics need exactly two
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// OHLC bar interval
    #[serde(default)]
    pub timeframe: Timeframe,

    /// Consecutive failed connects before the feed gives up
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// First reconnect delay; doubles per attempt
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
}

fn default_symbols() -> Vec<String> {
    vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()]
}
fn default_max_reconnect_attempts() -> u32 {
    5
}
fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            timeframe: Timeframe::default(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
        }
    }
}

impl FeedConfig {
    pub fn reconnect_base_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_delay_ms)
    }
}

/// Analytics pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalyticsConfig {
    /// Hedge-ratio estimator
    #[serde(default)]
    pub regression: RegressionMethod,

    /// Z-score window (recommended 10-100)
    #[serde(default = "default_rolling_window")]
    pub rolling_window: usize,

    /// Recompute period in milliseconds
    #[serde(default = "default_recompute_interval_ms")]
    pub recompute_interval_ms: u64,

    /// Ticks retained per symbol
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Ticks each symbol needs before analytics run
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// The stationarity test runs once the spread is longer than this
    #[serde(default = "default_stationarity_min_len")]
    pub stationarity_min_len: usize,

    /// Huber loss threshold
    #[serde(default = "default_huber_delta")]
    pub huber_delta: f64,
}

fn default_rolling_window() -> usize {
    20
}
fn default_recompute_interval_ms() -> u64 {
    500
}
fn default_buffer_capacity() -> usize {
    1000
}
fn default_min_samples() -> usize {
    20
}
fn default_stationarity_min_len() -> usize {
    30
}
fn default_huber_delta() -> f64 {
    DEFAULT_HUBER_DELTA
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            regression: RegressionMethod::default(),
            rolling_window: default_rolling_window(),
            recompute_interval_ms: default_recompute_interval_ms(),
            buffer_capacity: default_buffer_capacity(),
            min_samples: default_min_samples(),
            stationarity_min_len: default_stationarity_min_len(),
            huber_delta: default_huber_delta(),
        }
    }
}

impl AnalyticsConfig {
    /// Per-cycle tunables
    pub fn settings(&self) -> AnalyticsSettings {
        AnalyticsSettings {
            method: self.regression,
            rolling_window: self.rolling_window.max(1),
            huber_delta: self.huber_delta,
            min_samples: self.min_samples,
            stationarity_min_len: self.stationarity_min_len,
        }
    }
}

/// Data capture configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    #[serde(default)]
    pub capture_enabled: bool,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Start a new file after this many seconds
    #[serde(default = "default_rotation_interval_secs")]
    pub rotation_interval_secs: u64,

    /// Ticks buffered before a write
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Maximum time between writes
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_rotation_interval_secs() -> u64 {
    3600
}
fn default_buffer_size() -> usize {
    1000
}
fn default_flush_interval_secs() -> u64 {
    60
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            capture_enabled: false,
            output_dir: default_output_dir(),
            rotation_interval_secs: default_rotation_interval_secs(),
            buffer_size: default_buffer_size(),
            flush_interval_secs: default_flush_interval_secs(),
        }
    }
}

impl DataConfig {
    pub fn recorder_config(&self) -> RecorderConfig {
        RecorderConfig {
            output_dir: self.output_dir.clone(),
            rotation_interval_secs: self.rotation_interval_secs,
            buffer_size: self.buffer_size.max(1),
            flush_interval_secs: self.flush_interval_secs,
            ..Default::default()
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Prometheus exporter port; 0 disables it
    #[serde(default)]
    pub metrics_port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: 0,
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        let a = &self.analytics;

        if self.feed.symbols.len() != 2 {
            anyhow::bail!(
                "feed.symbols must name exactly two symbols, got {}",
                self.feed.symbols.len()
            );
        }
        if a.rolling_window == 0 {
            anyhow::bail!("analytics.rolling_window must be at least 1");
        }
        if a.min_samples < 2 {
            anyhow::bail!("analytics.min_samples must be at least 2");
        }
        if a.buffer_capacity < a.min_samples {
            anyhow::bail!(
                "analytics.buffer_capacity ({}) must be at least min_samples ({})",
                a.buffer_capacity,
                a.min_samples
            );
        }
        if a.recompute_interval_ms == 0 {
            anyhow::bail!("analytics.recompute_interval_ms must be positive");
        }
        if !(a.huber_delta > 0.0) {
            anyhow::bail!("analytics.huber_delta must be positive");
        }
        if self.backtest.entry_threshold < 0.0 {
            anyhow::bail!("backtest.entry_threshold must not be negative");
        }

        Ok(())
    }

    /// Orchestrator parameters derived from this configuration
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            settings: self.analytics.settings(),
            timeframe: self.feed.timeframe,
            buffer_capacity: self.analytics.buffer_capacity,
            recompute_interval: Duration::from_millis(self.analytics.recompute_interval_ms),
        }
    }
}
