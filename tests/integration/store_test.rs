//! Recording through the orchestrator and reading back for offline analysis

use crate::{pair_ticks, ChannelSource};
use pairs_arb::analytics::{aggregate_ohlc, Timeframe};
use pairs_arb::backtest::BacktestConfig;
use pairs_arb::cli::backtest_ticks;
use pairs_arb::data::{
    analytics_to_csv, ohlc_to_csv, ticks_to_csv, ParquetReader, ParquetStore, RecorderConfig,
    TickStore,
};
use pairs_arb::engine::{AnalyticsSettings, OrchestratorConfig, RecomputeOrchestrator};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn files_with_prefix(dir: &TempDir, prefix: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix))
        })
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn test_recorded_ticks_replay_into_backtest() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ParquetStore::new(RecorderConfig {
        output_dir: dir.path().to_path_buf(),
        buffer_size: 16,
        ..Default::default()
    }));
    let orch = RecomputeOrchestrator::new(
        Arc::new(ChannelSource::default()),
        Arc::clone(&store),
        OrchestratorConfig::default(),
    );
    orch.connect_symbols(&["AAAUSDT".to_string(), "BBBUSDT".to_string()])
        .await
        .unwrap();

    let ticks = pair_ticks("AAAUSDT", "BBBUSDT", 60);
    for tick in ticks.clone() {
        orch.ingest(tick).await;
    }
    let live = orch.recompute().await.unwrap().unwrap();
    store.shutdown().await;

    let stats = store.stats().await;
    assert_eq!(stats.ticks_received, 120);
    assert_eq!(stats.ticks_written, 120);

    let files = files_with_prefix(&dir, "ticks_");
    assert!(!files.is_empty());
    let mut replayed = Vec::new();
    for file in &files {
        replayed.extend(ParquetReader::new(file).read_ticks().unwrap());
    }
    assert_eq!(replayed, ticks);

    let report = backtest_ticks(
        &replayed,
        "AAAUSDT",
        "BBBUSDT",
        &AnalyticsSettings::default(),
        BacktestConfig::default(),
    )
    .unwrap();
    assert_eq!(report.samples, 60);
    assert!((report.hedge_ratio - live.hedge_ratio).abs() < 1e-9);
}

#[tokio::test]
async fn test_upload_and_clear_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ParquetStore::with_output_dir(dir.path().to_path_buf()));
    let orch = RecomputeOrchestrator::new(
        Arc::new(ChannelSource::default()),
        Arc::clone(&store) as Arc<dyn TickStore>,
        OrchestratorConfig::default(),
    );

    let ticks: Vec<_> = pair_ticks("AAAUSDT", "BBBUSDT", 90)
        .into_iter()
        .filter(|t| t.symbol == "AAAUSDT")
        .collect();
    let bars = aggregate_ohlc(&ticks, Timeframe::OneMinute.interval_ms()).unwrap();
    assert_eq!(bars.len(), 2);
    orch.upload_ohlc(bars.clone()).await;

    let uploaded = orch.uploaded_ohlc().await;
    assert_eq!(uploaded.len(), 1);
    assert_eq!(uploaded["AAAUSDT"].len(), bars.len());

    orch.clear_data().await;
    assert!(files_with_prefix(&dir, "ohlc_").is_empty());
    assert!(orch.uploaded_ohlc().await.is_empty());
    store.shutdown().await;
}

#[test]
fn test_csv_exports() {
    let ticks = pair_ticks("AAAUSDT", "BBBUSDT", 40);
    let csv = ticks_to_csv(&ticks);
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("Symbol,Timestamp,Price,Quantity"));
    assert_eq!(csv.lines().count(), 81);

    let bars = aggregate_ohlc(&ticks, Timeframe::OneSecond.interval_ms()).unwrap();
    assert!(ohlc_to_csv(&bars).starts_with("Symbol,Timestamp,Open,High,Low,Close,Volume\n"));

    let prices: Vec<f64> = ticks.iter().map(|t| t.price).collect();
    let (p1, p2): (Vec<f64>, Vec<f64>) = prices.chunks(2).map(|c| (c[0], c[1])).unzip();
    let snapshot =
        pairs_arb::engine::AnalyticsSnapshot::compute(&p1, &p2, &AnalyticsSettings::default())
            .unwrap();
    let csv = analytics_to_csv(&snapshot);
    assert!(csv.starts_with("Metric,Value\n"));
    assert!(csv.contains("Hedge Ratio,"));
    assert!(csv.contains("Is Stationary,"));
}
