//! Run command implementation

use crate::analytics::RegressionMethod;
use crate::config::Config;
use crate::data::{MemoryStore, ParquetStore, TickStore};
use crate::engine::RecomputeOrchestrator;
use crate::feed::BinanceFeed;
use clap::Args;
use std::sync::Arc;

/// Ticks kept in memory when capture is disabled
const MEMORY_STORE_CAPACITY: usize = 10_000;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Symbol pair, comma separated (e.g. BTCUSDT,ETHUSDT)
    #[arg(long, value_delimiter = ',')]
    pub symbols: Option<Vec<String>>,

    /// Hedge-ratio estimator: ols, huber, theil-sen or kalman
    #[arg(long)]
    pub regression: Option<RegressionMethod>,

    /// Rolling z-score window
    #[arg(long)]
    pub window: Option<usize>,

    /// Record ticks to Parquet regardless of config
    #[arg(long)]
    pub capture: bool,
}

impl RunArgs {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &Config) -> anyhow::Result<Config> {
        let mut config = config.clone();
        if let Some(symbols) = &self.symbols {
            let (a, b) = super::parse_pair(symbols)?;
            config.feed.symbols = vec![a, b];
        }
        if let Some(method) = self.regression {
            config.analytics.regression = method;
        }
        if let Some(window) = self.window {
            config.analytics.rolling_window = window;
        }
        if self.capture {
            config.data.capture_enabled = true;
        }
        config.validate()?;
        Ok(config)
    }

    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let config = self.apply(config)?;

        let feed = Arc::new(BinanceFeed::new().with_reconnect_policy(
            config.feed.max_reconnect_attempts,
            config.feed.reconnect_base_delay(),
        ));

        let recorder = config
            .data
            .capture_enabled
            .then(|| Arc::new(ParquetStore::new(config.data.recorder_config())));
        let store: Arc<dyn TickStore> = match &recorder {
            Some(recorder) => {
                tracing::info!(output_dir = ?recorder.output_dir(), "Recording ticks to Parquet");
                recorder.clone() as Arc<dyn TickStore>
            }
            None => Arc::new(MemoryStore::with_capacity(MEMORY_STORE_CAPACITY)),
        };

        let orchestrator = Arc::new(RecomputeOrchestrator::new(
            feed,
            store,
            config.orchestrator_config(),
        ));
        for definition in &config.alerts {
            let id = orchestrator.add_alert(definition.clone()).await;
            tracing::info!(alert_id = %id, threshold = definition.threshold, "Registered alert");
        }

        let mut snapshots = orchestrator.subscribe_snapshots();
        let handle = orchestrator.spawn().await;
        orchestrator.connect_symbols(&config.feed.symbols).await?;

        tracing::info!(
            symbols = ?config.feed.symbols,
            regression = %config.analytics.regression,
            window = config.analytics.rolling_window,
            timeframe = %config.feed.timeframe,
            "Live analytics started"
        );

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    if let Some(snapshot) = snapshot {
                        tracing::info!(
                            hedge_ratio = snapshot.hedge_ratio,
                            z_score = ?snapshot.last_z_score(),
                            spread = ?snapshot.last_spread(),
                            correlation = snapshot.correlation,
                            adf_statistic = ?snapshot.adf_statistic,
                            is_stationary = ?snapshot.is_stationary,
                            "Analytics"
                        );
                    }
                }
            }
        }

        orchestrator.disconnect().await;
        handle.shutdown();
        if let Some(recorder) = recorder {
            recorder.shutdown().await;
            let stats = recorder.stats().await;
            tracing::info!(
                ticks_written = stats.ticks_written,
                ticks_dropped = stats.ticks_dropped,
                "Recorder stopped"
            );
        }

        Ok(())
    }
}
