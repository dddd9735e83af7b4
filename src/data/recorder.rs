//! Background Parquet recorder implementing [`TickStore`]

use super::parquet::{ohlc_schema, ohlc_to_batch, tick_schema, ticks_to_batch, ParquetWriter};
use super::{StoreError, TickStore};
use crate::analytics::OhlcBar;
use crate::feed::Tick;
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;

/// Configuration for data recording
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Output directory for Parquet files
    pub output_dir: PathBuf,
    /// Rotation interval in seconds
    pub rotation_interval_secs: u64,
    /// Buffer size before flushing
    pub buffer_size: usize,
    /// Maximum time between flushes
    pub flush_interval_secs: u64,
    /// Depth of the command queue between callers and the writer task
    pub queue_capacity: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./data"),
            rotation_interval_secs: 3600,
            buffer_size: 1000,
            flush_interval_secs: 60,
            queue_capacity: 10_000,
        }
    }
}

/// Recording statistics
#[derive(Debug, Default, Clone)]
pub struct RecorderStats {
    pub ticks_received: u64,
    pub ticks_written: u64,
    pub ticks_dropped: u64,
    pub ohlc_bars_written: u64,
    pub files_removed: u64,
    pub last_flush: Option<chrono::DateTime<Utc>>,
}

enum StoreCommand {
    Tick(Tick),
    OhlcBatch(Vec<OhlcBar>),
    Clear(oneshot::Sender<Result<usize, StoreError>>),
    Shutdown(oneshot::Sender<()>),
}

/// Records ticks and OHLC bars to rotated Parquet files from a background task.
///
/// `append_tick` never waits: a full queue drops the tick and reports
/// [`StoreError::QueueFull`].
pub struct ParquetStore {
    config: RecorderConfig,
    tx: mpsc::Sender<StoreCommand>,
    stats: Arc<RwLock<RecorderStats>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct WriterState {
    ticks: ParquetWriter,
    ohlc: ParquetWriter,
    buffer: Vec<Tick>,
    stats: Arc<RwLock<RecorderStats>>,
}

impl WriterState {
    async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let now = Utc::now();
        let count = self.buffer.len();
        let result = ticks_to_batch(&self.buffer).and_then(|b| self.ticks.write_batch(&b, now));

        match result {
            Ok(()) => {
                let mut s = self.stats.write().await;
                s.ticks_written += count as u64;
                s.last_flush = Some(now);
                tracing::debug!(count, "Flushed ticks");
            }
            Err(e) => {
                tracing::error!(error = %e, count, "Failed to write ticks");
            }
        }

        self.buffer.clear();
    }

    async fn write_ohlc(&mut self, bars: Vec<OhlcBar>) {
        let result = ohlc_to_batch(&bars).and_then(|b| self.ohlc.write_batch(&b, Utc::now()));
        match result {
            Ok(()) => {
                self.stats.write().await.ohlc_bars_written += bars.len() as u64;
                tracing::debug!(count = bars.len(), "Wrote OHLC batch");
            }
            Err(e) => tracing::error!(error = %e, "Failed to write OHLC batch"),
        }
    }

    async fn clear(&mut self) -> Result<usize, StoreError> {
        self.buffer.clear();
        let removed = self.ticks.remove_files()? + self.ohlc.remove_files()?;
        self.stats.write().await.files_removed += removed as u64;
        tracing::info!(removed, "Cleared recorded data");
        Ok(removed)
    }

    fn close(&mut self) {
        for writer in [&mut self.ticks, &mut self.ohlc] {
            if let Err(e) = writer.close() {
                tracing::error!(error = %e, "Failed to close Parquet file");
            }
        }
    }
}

impl ParquetStore {
    /// Create a new store and spawn its writer task
    pub fn new(config: RecorderConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let stats = Arc::new(RwLock::new(RecorderStats::default()));

        let state = WriterState {
            ticks: ParquetWriter::new(
                config.output_dir.clone(),
                "ticks",
                tick_schema(),
                config.rotation_interval_secs,
            ),
            ohlc: ParquetWriter::new(
                config.output_dir.clone(),
                "ohlc",
                ohlc_schema(),
                config.rotation_interval_secs,
            ),
            buffer: Vec::with_capacity(config.buffer_size),
            stats: Arc::clone(&stats),
        };
        let task_config = config.clone();
        let task = tokio::spawn(async move {
            Self::run_writer(rx, state, task_config).await;
        });

        Self {
            config,
            tx,
            stats,
            task: Mutex::new(Some(task)),
        }
    }

    /// Create a new store with default config
    pub fn with_output_dir(output_dir: PathBuf) -> Self {
        Self::new(RecorderConfig {
            output_dir,
            ..Default::default()
        })
    }

    /// Run the writer task
    async fn run_writer(
        mut rx: mpsc::Receiver<StoreCommand>,
        mut state: WriterState,
        config: RecorderConfig,
    ) {
        let mut flush_timer =
            tokio::time::interval(std::time::Duration::from_secs(config.flush_interval_secs.max(1)));
        flush_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = rx.recv() => {
                    match cmd {
                        Some(StoreCommand::Tick(tick)) => {
                            state.stats.write().await.ticks_received += 1;
                            state.buffer.push(tick);
                            if state.buffer.len() >= config.buffer_size {
                                state.flush().await;
                            }
                        }
                        Some(StoreCommand::OhlcBatch(bars)) => {
                            state.write_ohlc(bars).await;
                        }
                        Some(StoreCommand::Clear(reply)) => {
                            let _ = reply.send(state.clear().await);
                        }
                        Some(StoreCommand::Shutdown(reply)) => {
                            state.flush().await;
                            state.close();
                            tracing::info!("Recorder shutting down");
                            let _ = reply.send(());
                            break;
                        }
                        None => {
                            state.flush().await;
                            state.close();
                            tracing::info!("Recorder channel closed, shutting down");
                            break;
                        }
                    }
                }

                _ = flush_timer.tick() => {
                    state.flush().await;
                }
            }
        }
    }

    /// Flush buffered ticks, close open files and stop the writer task
    pub async fn shutdown(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(StoreCommand::Shutdown(reply_tx)).await.is_ok() {
            let _ = reply_rx.await;
        }
        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Recorder task failed");
            }
        }
    }

    /// Get output directory
    pub fn output_dir(&self) -> &PathBuf {
        &self.config.output_dir
    }

    /// Get current statistics
    pub async fn stats(&self) -> RecorderStats {
        self.stats.read().await.clone()
    }
}

#[async_trait]
impl TickStore for ParquetStore {
    async fn append_tick(&self, tick: &Tick) -> Result<(), StoreError> {
        match self.tx.try_send(StoreCommand::Tick(tick.clone())) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.stats.write().await.ticks_dropped += 1;
                Err(StoreError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(StoreError::Closed),
        }
    }

    async fn append_ohlc_batch(&self, bars: &[OhlcBar]) -> Result<(), StoreError> {
        if bars.is_empty() {
            return Ok(());
        }
        self.tx
            .send(StoreCommand::OhlcBatch(bars.to_vec()))
            .await
            .map_err(|_| StoreError::Closed)
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Clear(reply_tx))
            .await
            .map_err(|_| StoreError::Closed)?;
        reply_rx.await.map_err(|_| StoreError::Closed)?.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ParquetReader;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> RecorderConfig {
        RecorderConfig {
            output_dir: dir.path().to_path_buf(),
            rotation_interval_secs: 3600,
            buffer_size: 2,
            flush_interval_secs: 60,
            queue_capacity: 16,
        }
    }

    fn parquet_files(dir: &TempDir, prefix: &str) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(prefix) && n.ends_with(".parquet"))
            })
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_default_config() {
        let config = RecorderConfig::default();
        assert_eq!(config.rotation_interval_secs, 3600);
        assert_eq!(config.buffer_size, 1000);
        assert_eq!(config.flush_interval_secs, 60);
    }

    #[tokio::test]
    async fn test_ticks_are_written_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let store = ParquetStore::new(test_config(&dir));

        for ts in 0..3 {
            store
                .append_tick(&Tick::new(ts, "BTCUSDT", 100.0 + ts as f64, 1.0))
                .await
                .unwrap();
        }
        store.shutdown().await;

        let stats = store.stats().await;
        assert_eq!(stats.ticks_received, 3);
        assert_eq!(stats.ticks_written, 3);

        let files = parquet_files(&dir, "ticks_");
        assert_eq!(files.len(), 1);
        let ticks = ParquetReader::new(&files[0]).read_ticks().unwrap();
        assert_eq!(ticks.len(), 3);
        assert_eq!(ticks[2].price, 102.0);
    }

    #[tokio::test]
    async fn test_ohlc_batch_is_written() {
        let dir = TempDir::new().unwrap();
        let store = ParquetStore::new(test_config(&dir));
        let bar = OhlcBar {
            timestamp: 0,
            symbol: "ETHUSDT".into(),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 3.0,
        };
        store.append_ohlc_batch(&[bar.clone()]).await.unwrap();
        store.shutdown().await;

        let files = parquet_files(&dir, "ohlc_");
        assert_eq!(files.len(), 1);
        assert_eq!(ParquetReader::new(&files[0]).read_ohlc().unwrap(), vec![bar]);
    }

    #[tokio::test]
    async fn test_clear_all_removes_files() {
        let dir = TempDir::new().unwrap();
        let store = ParquetStore::new(test_config(&dir));

        for ts in 0..2 {
            store
                .append_tick(&Tick::new(ts, "BTCUSDT", 1.0, 1.0))
                .await
                .unwrap();
        }
        // Commands are processed in order, so the flush precedes the clear
        store.clear_all().await.unwrap();
        assert!(parquet_files(&dir, "ticks_").is_empty());
        assert_eq!(store.stats().await.files_removed, 1);

        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_append_after_shutdown_reports_closed() {
        let dir = TempDir::new().unwrap();
        let store = ParquetStore::new(test_config(&dir));
        store.shutdown().await;

        let err = store
            .append_tick(&Tick::new(0, "BTCUSDT", 1.0, 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Closed));
    }
}
