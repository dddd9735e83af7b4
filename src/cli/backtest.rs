//! Backtest command implementation

use crate::analytics::RegressionMethod;
use crate::backtest::{BacktestConfig, BacktestEngine, BacktestResult};
use crate::config::Config;
use crate::engine::{AnalyticsSettings, AnalyticsSnapshot, TickBuffers};
use crate::feed::Tick;
use clap::{Args, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Args, Debug)]
pub struct BacktestArgs {
    /// Tick Parquet files or recorder output directories
    #[arg(long, required = true, num_args = 1..)]
    pub ticks: Vec<PathBuf>,

    /// Symbol pair, comma separated (defaults to the configured pair)
    #[arg(long, value_delimiter = ',')]
    pub symbols: Option<Vec<String>>,

    /// Entry |z| threshold
    #[arg(long, allow_hyphen_values = true)]
    pub entry: Option<f64>,

    /// Exit |z| threshold
    #[arg(long, allow_hyphen_values = true)]
    pub exit: Option<f64>,

    /// Hedge-ratio estimator
    #[arg(long)]
    pub regression: Option<RegressionMethod>,

    /// Rolling z-score window
    #[arg(long)]
    pub window: Option<usize>,

    /// Output format: table or json
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

/// Backtest outcome with the fitted pair parameters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestReport {
    pub symbols: (String, String),
    pub method: RegressionMethod,
    pub hedge_ratio: f64,
    pub samples: usize,
    pub entry_threshold: f64,
    pub exit_threshold: f64,
    pub result: BacktestResult,
}

impl BacktestReport {
    pub fn format_table(&self) -> String {
        format!(
            "Pair:             {} / {}\n\
             Method:           {}\n\
             Hedge Ratio:      {:.6}\n\
             Samples:          {}\n\
             Thresholds:       entry {:.2}, exit {:.2}\n\
             {}",
            self.symbols.0,
            self.symbols.1,
            self.method,
            self.hedge_ratio,
            self.samples,
            self.entry_threshold,
            self.exit_threshold,
            self.result.format_table()
        )
    }
}

/// Align a pair from recorded ticks, fit the hedge ratio and run the strategy.
///
/// Ticks must be in timestamp order. Both symbols need `settings.min_samples`
/// ticks; the longer series is trimmed from the front to match.
pub fn backtest_ticks(
    ticks: &[Tick],
    symbol1: &str,
    symbol2: &str,
    settings: &AnalyticsSettings,
    config: BacktestConfig,
) -> anyhow::Result<BacktestReport> {
    let mut buffers = TickBuffers::new(ticks.len());
    for tick in ticks {
        if tick.symbol == symbol1 || tick.symbol == symbol2 {
            buffers.push(tick.clone());
        }
    }

    let Some((prices1, prices2)) = buffers.aligned_prices(symbol1, symbol2, settings.min_samples)
    else {
        anyhow::bail!(
            "not enough ticks: {} has {}, {} has {}, need {} each",
            symbol1,
            buffers.len_of(symbol1),
            symbol2,
            buffers.len_of(symbol2),
            settings.min_samples
        );
    };

    let snapshot = AnalyticsSnapshot::compute(&prices1, &prices2, settings)?;
    let result = BacktestEngine::new(config).run(&snapshot.spread, &snapshot.z_score)?;

    Ok(BacktestReport {
        symbols: (symbol1.to_string(), symbol2.to_string()),
        method: settings.method,
        hedge_ratio: snapshot.hedge_ratio,
        samples: snapshot.spread.len(),
        entry_threshold: config.entry_threshold,
        exit_threshold: config.exit_threshold,
        result,
    })
}

impl BacktestArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let (symbol1, symbol2) =
            super::parse_pair(self.symbols.as_deref().unwrap_or(&config.feed.symbols))?;

        let mut analytics = config.analytics.clone();
        if let Some(method) = self.regression {
            analytics.regression = method;
        }
        if let Some(window) = self.window {
            analytics.rolling_window = window;
        }
        let settings = analytics.settings();

        let backtest = BacktestConfig {
            entry_threshold: self.entry.unwrap_or(config.backtest.entry_threshold),
            exit_threshold: self.exit.unwrap_or(config.backtest.exit_threshold),
        };

        let ticks = super::load_ticks(&self.ticks)?;
        tracing::info!(
            ticks = ticks.len(),
            symbol1 = %symbol1,
            symbol2 = %symbol2,
            "Running backtest"
        );

        let report = backtest_ticks(&ticks, &symbol1, &symbol2, &settings, backtest)?;
        match self.format {
            OutputFormat::Table => println!("{}", report.format_table()),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        }

        Ok(())
    }
}
