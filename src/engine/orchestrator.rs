//! Recompute orchestrator
//!
//! Ties the live tick stream to published analytics:
//! 1. An ingestion task appends ticks to bounded per-symbol buffers
//! 2. A fixed-period cycle aligns the pair, runs the analytics pipeline and
//!    publishes an immutable snapshot through a watch channel
//! 3. Alerts are evaluated against each new snapshot

use super::alert::{Alert, AlertDefinition};
use super::buffer::{TickBuffers, DEFAULT_BUFFER_CAPACITY};
use super::snapshot::{AnalyticsSettings, AnalyticsSnapshot};
use crate::analytics::{aggregate_ohlc, AnalyticsError, OhlcBar, RegressionMethod, Timeframe};
use crate::backtest::{BacktestConfig, BacktestEngine, BacktestResult};
use crate::data::{StoreError, TickStore};
use crate::feed::{Tick, TickSource};
use crate::telemetry::{
    increment_counter, record_latency, set_gauge, set_symbol_gauge, CounterMetric, GaugeMetric,
    LatencyMetric,
};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

/// Latest published snapshot; `None` until the first successful cycle
pub type SnapshotReceiver = watch::Receiver<Option<Arc<AnalyticsSnapshot>>>;

/// Orchestrator construction parameters
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub settings: AnalyticsSettings,
    pub timeframe: Timeframe,
    /// Ticks retained per symbol
    pub buffer_capacity: usize,
    pub recompute_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            settings: AnalyticsSettings::default(),
            timeframe: Timeframe::default(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            recompute_interval: Duration::from_millis(500),
        }
    }
}

/// Handle to the background tasks started by [`RecomputeOrchestrator::spawn`]
pub struct OrchestratorHandle {
    ingest_task: JoinHandle<()>,
    cycle_task: JoinHandle<()>,
}

impl OrchestratorHandle {
    /// Stop ingestion and the recompute cycle
    pub fn shutdown(self) {
        self.ingest_task.abort();
        self.cycle_task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.ingest_task.is_finished() && self.cycle_task.is_finished()
    }
}

/// Owns tick buffers, settings and alerts, and publishes analytics snapshots
pub struct RecomputeOrchestrator<S: TickSource + ?Sized, P: TickStore + ?Sized> {
    source: Arc<S>,
    store: Arc<P>,
    /// Written only by ingestion (and cleared by control operations)
    buffers: RwLock<TickBuffers>,
    settings: RwLock<AnalyticsSettings>,
    timeframe: RwLock<Timeframe>,
    symbols: RwLock<Vec<String>>,
    alerts: RwLock<Vec<Alert>>,
    ohlc: RwLock<BTreeMap<String, Vec<OhlcBar>>>,
    snapshot_tx: watch::Sender<Option<Arc<AnalyticsSnapshot>>>,
    recompute_interval: Duration,
}

impl<S, P> RecomputeOrchestrator<S, P>
where
    S: TickSource + ?Sized + 'static,
    P: TickStore + ?Sized + 'static,
{
    /// Create a new orchestrator
    pub fn new(source: Arc<S>, store: Arc<P>, config: OrchestratorConfig) -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        Self {
            source,
            store,
            buffers: RwLock::new(TickBuffers::new(config.buffer_capacity)),
            settings: RwLock::new(config.settings),
            timeframe: RwLock::new(config.timeframe),
            symbols: RwLock::new(Vec::new()),
            alerts: RwLock::new(Vec::new()),
            ohlc: RwLock::new(BTreeMap::new()),
            snapshot_tx,
            recompute_interval: config.recompute_interval,
        }
    }

    /// Create with default config
    pub fn with_defaults(source: Arc<S>, store: Arc<P>) -> Self {
        Self::new(source, store, OrchestratorConfig::default())
    }

    /// Append a tick to its symbol's buffer and forward it to the store.
    ///
    /// Ticks for symbols outside the active pair are ignored once a pair is set.
    pub async fn ingest(&self, tick: Tick) {
        {
            let symbols = self.symbols.read().await;
            if !symbols.is_empty() && !symbols.contains(&tick.symbol) {
                tracing::trace!(symbol = %tick.symbol, "Ignoring tick for inactive symbol");
                return;
            }
        }

        let len = {
            let mut buffers = self.buffers.write().await;
            if buffers.push(tick.clone()).is_some() {
                increment_counter(CounterMetric::TicksEvicted, 1);
            }
            buffers.len_of(&tick.symbol)
        };
        increment_counter(CounterMetric::TicksIngested, 1);
        set_symbol_gauge(GaugeMetric::BufferLength, &tick.symbol, len as f64);

        if let Err(e) = self.store.append_tick(&tick).await {
            match e {
                StoreError::QueueFull => {
                    tracing::debug!(symbol = %tick.symbol, "Store queue full, tick not persisted")
                }
                e => tracing::error!(error = %e, symbol = %tick.symbol, "Failed to persist tick"),
            }
        }
    }

    /// Run one analytics cycle.
    ///
    /// Returns `Ok(None)` when preconditions are not met (no pair, or either
    /// buffer below `min_samples`). On success the new snapshot is published
    /// before alerts are evaluated.
    pub async fn recompute(&self) -> Result<Option<Arc<AnalyticsSnapshot>>, AnalyticsError> {
        let (symbol1, symbol2) = {
            let symbols = self.symbols.read().await;
            match symbols.as_slice() {
                [a, b] => (a.clone(), b.clone()),
                _ => return Ok(None),
            }
        };
        let settings = self.settings.read().await.clone();

        let aligned = self
            .buffers
            .read()
            .await
            .aligned_prices(&symbol1, &symbol2, settings.min_samples);
        let Some((prices1, prices2)) = aligned else {
            return Ok(None);
        };

        let start = Instant::now();
        let snapshot = Arc::new(AnalyticsSnapshot::compute(&prices1, &prices2, &settings)?);
        self.snapshot_tx.send_replace(Some(Arc::clone(&snapshot)));

        set_gauge(GaugeMetric::HedgeRatio, snapshot.hedge_ratio);
        set_gauge(GaugeMetric::Correlation, snapshot.correlation);
        if let Some(z) = snapshot.last_z_score() {
            set_gauge(GaugeMetric::ZScore, z);
        }
        if let Some(stat) = snapshot.adf_statistic {
            set_gauge(GaugeMetric::AdfStatistic, stat);
        }
        tracing::debug!(
            hedge_ratio = snapshot.hedge_ratio,
            z_score = ?snapshot.last_z_score(),
            correlation = snapshot.correlation,
            samples = snapshot.spread.len(),
            "Published analytics snapshot"
        );

        self.evaluate_alerts(&snapshot).await;
        record_latency(LatencyMetric::Recompute, start.elapsed());
        Ok(Some(snapshot))
    }

    /// Run one cycle, logging failures instead of propagating them
    pub async fn run_cycle(&self) {
        if let Err(e) = self.recompute().await {
            increment_counter(CounterMetric::RecomputeFailures, 1);
            tracing::warn!(error = %e, "Recompute cycle failed, keeping previous snapshot");
        }
    }

    /// Latch every armed alert whose condition holds
    async fn evaluate_alerts(&self, snapshot: &AnalyticsSnapshot) {
        let now = Utc::now();
        let mut alerts = self.alerts.write().await;

        for alert in alerts.iter_mut() {
            if alert.evaluate(&snapshot.z_score, now) {
                increment_counter(CounterMetric::AlertsTriggered, 1);
                tracing::info!(
                    alert_id = %alert.id,
                    condition = ?alert.definition.condition,
                    threshold = alert.definition.threshold,
                    z_score = ?snapshot.last_z_score(),
                    message = %alert.definition.message,
                    "Alert triggered"
                );
            }
        }
    }

    /// Start the ingestion and recompute tasks
    pub async fn spawn(self: &Arc<Self>) -> OrchestratorHandle {
        let mut tick_rx = self.source.subscribe().await;

        let ingest = Arc::clone(self);
        let ingest_task = tokio::spawn(async move {
            while let Some(tick) = tick_rx.recv().await {
                ingest.ingest(tick).await;
            }
            tracing::info!("Tick stream ended, ingestion stopped");
        });

        let cycle = Arc::clone(self);
        let cycle_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(cycle.recompute_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                cycle.run_cycle().await;
            }
        });

        OrchestratorHandle {
            ingest_task,
            cycle_task,
        }
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Option<Arc<AnalyticsSnapshot>> {
        self.snapshot_tx.borrow().clone()
    }

    /// Receive every future publication
    pub fn subscribe_snapshots(&self) -> SnapshotReceiver {
        self.snapshot_tx.subscribe()
    }

    /// Switch the live feed to `symbols`, resetting buffered data.
    ///
    /// An empty list is ignored.
    pub async fn connect_symbols(&self, symbols: &[String]) -> anyhow::Result<()> {
        if symbols.is_empty() {
            tracing::warn!("connect_symbols called with no symbols, ignoring");
            return Ok(());
        }
        let symbols: Vec<String> = symbols.iter().map(|s| s.to_uppercase()).collect();
        if symbols.len() != 2 {
            tracing::warn!(count = symbols.len(), "Analytics need exactly two symbols");
        }

        self.source.disconnect().await;
        self.buffers.write().await.clear();
        self.ohlc.write().await.clear();
        *self.symbols.write().await = symbols.clone();

        tracing::info!(symbols = ?symbols, "Connecting tick source");
        self.source.connect(&symbols).await
    }

    /// Stop the live feed; buffered data is kept
    pub async fn disconnect(&self) {
        self.source.disconnect().await;
        tracing::info!("Tick source disconnected");
    }

    pub async fn symbols(&self) -> Vec<String> {
        self.symbols.read().await.clone()
    }

    pub async fn set_timeframe(&self, timeframe: Timeframe) {
        *self.timeframe.write().await = timeframe;
        tracing::info!(%timeframe, "Timeframe changed");
    }

    pub async fn timeframe(&self) -> Timeframe {
        *self.timeframe.read().await
    }

    /// Set the z-score window; 0 is raised to 1
    pub async fn set_rolling_window(&self, window: usize) {
        let window = window.max(1);
        self.settings.write().await.rolling_window = window;
        tracing::info!(window, "Rolling window changed");
    }

    pub async fn set_regression_method(&self, method: RegressionMethod) {
        self.settings.write().await.method = method;
        if method == RegressionMethod::Kalman {
            tracing::warn!("Kalman method selected: hedge ratio is fixed at 1.0");
        } else {
            tracing::info!(%method, "Regression method changed");
        }
    }

    pub async fn settings(&self) -> AnalyticsSettings {
        self.settings.read().await.clone()
    }

    /// Register an alert, returning its id
    pub async fn add_alert(&self, definition: AlertDefinition) -> String {
        let alert = Alert::new(definition);
        let id = alert.id.clone();
        tracing::info!(alert_id = %id, message = %alert.definition.message, "Alert added");
        self.alerts.write().await.push(alert);
        id
    }

    /// Remove an alert; returns whether it existed
    pub async fn remove_alert(&self, id: &str) -> bool {
        let mut alerts = self.alerts.write().await;
        let before = alerts.len();
        alerts.retain(|a| a.id != id);
        before != alerts.len()
    }

    /// Flip an alert's `active` flag and re-arm it; returns whether it existed
    pub async fn toggle_alert(&self, id: &str) -> bool {
        let mut alerts = self.alerts.write().await;
        match alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) => {
                alert.toggle();
                true
            }
            None => false,
        }
    }

    pub async fn alerts(&self) -> Vec<Alert> {
        self.alerts.read().await.clone()
    }

    /// Drop buffered ticks, OHLC data and the published snapshot, then clear the store
    pub async fn clear_data(&self) {
        self.buffers.write().await.clear();
        self.ohlc.write().await.clear();
        self.snapshot_tx.send_replace(None);

        if let Err(e) = self.store.clear_all().await {
            tracing::error!(error = %e, "Failed to clear persisted data");
        }
        tracing::info!("All data cleared");
    }

    /// Replace the OHLC map with `bars` grouped by symbol and persist them
    pub async fn upload_ohlc(&self, bars: Vec<OhlcBar>) {
        if let Err(e) = self.store.append_ohlc_batch(&bars).await {
            tracing::error!(error = %e, "Failed to persist OHLC batch");
        }

        let count = bars.len();
        let mut grouped: BTreeMap<String, Vec<OhlcBar>> = BTreeMap::new();
        for bar in bars {
            grouped.entry(bar.symbol.clone()).or_default().push(bar);
        }
        *self.ohlc.write().await = grouped;
        tracing::info!(count, "Uploaded OHLC records");
    }

    /// Uploaded bars, keyed by symbol
    pub async fn uploaded_ohlc(&self) -> BTreeMap<String, Vec<OhlcBar>> {
        self.ohlc.read().await.clone()
    }

    /// Bars for `symbol` aggregated from its buffered ticks at the current timeframe
    pub async fn ohlc_bars(&self, symbol: &str) -> Result<Vec<OhlcBar>, AnalyticsError> {
        let ticks = match self.buffers.read().await.get(symbol) {
            Some(buffer) => buffer.to_vec(),
            None => return Ok(Vec::new()),
        };
        let interval = self.timeframe.read().await.interval_ms();
        aggregate_ohlc(&ticks, interval)
    }

    /// Buffered ticks for every symbol, symbols sorted
    pub async fn buffered_ticks(&self) -> Vec<Tick> {
        let buffers = self.buffers.read().await;
        buffers
            .symbols()
            .iter()
            .filter_map(|s| buffers.get(s))
            .flat_map(|b| b.iter().cloned())
            .collect()
    }

    /// Backtest over the current snapshot; `None` before the first publication
    pub async fn run_backtest(
        &self,
        config: BacktestConfig,
    ) -> Option<Result<BacktestResult, AnalyticsError>> {
        let snapshot = self.snapshot()?;
        Some(BacktestEngine::new(config).run(&snapshot.spread, &snapshot.z_score))
    }
}
