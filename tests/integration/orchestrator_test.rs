//! Orchestrator end-to-end: live ticks in, snapshots and alerts out

use crate::{pair_ticks, ChannelSource};
use pairs_arb::analytics::{RegressionMethod, Timeframe};
use pairs_arb::backtest::BacktestConfig;
use pairs_arb::data::{MemoryStore, TickStore};
use pairs_arb::engine::{
    AlertCondition, AlertDefinition, AnalyticsSettings, OrchestratorConfig, RecomputeOrchestrator,
};
use std::sync::Arc;
use std::time::Duration;

type Orchestrator = RecomputeOrchestrator<ChannelSource, dyn TickStore>;

fn symbols() -> Vec<String> {
    vec!["SOLUSDT".to_string(), "AVAXUSDT".to_string()]
}

fn setup(interval: Duration) -> (Arc<Orchestrator>, Arc<ChannelSource>, Arc<MemoryStore>) {
    let source = Arc::new(ChannelSource::default());
    let store = Arc::new(MemoryStore::new());
    let config = OrchestratorConfig {
        settings: AnalyticsSettings::default(),
        timeframe: Timeframe::OneSecond,
        buffer_capacity: 100,
        recompute_interval: interval,
    };
    let orch = Arc::new(RecomputeOrchestrator::new(
        Arc::clone(&source),
        Arc::clone(&store) as Arc<dyn TickStore>,
        config,
    ));
    (orch, source, store)
}

#[tokio::test]
async fn test_live_pipeline_publishes_and_alerts() {
    let (orch, source, store) = setup(Duration::from_millis(20));
    // Always satisfied by a finite z-score
    let alert_id = orch
        .add_alert(AlertDefinition::z_score(
            AlertCondition::Below,
            100.0,
            "always",
        ))
        .await;

    let mut snapshots = orch.subscribe_snapshots();
    let handle = orch.spawn().await;
    orch.connect_symbols(&["solusdt".to_string(), "avaxusdt".to_string()])
        .await
        .unwrap();
    assert_eq!(source.connected.lock().await.as_slice(), &[symbols()]);

    for tick in pair_ticks("SOLUSDT", "AVAXUSDT", 40) {
        source.emit(tick).await;
    }

    let snapshot = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            snapshots.changed().await.unwrap();
            let snapshot = snapshots.borrow_and_update().clone();
            if let Some(s) = snapshot {
                if s.spread.len() == 40 {
                    return s;
                }
            }
        }
    })
    .await
    .expect("snapshot published");

    assert!((snapshot.hedge_ratio - 1.5).abs() < 0.05);
    assert!(snapshot.adf_statistic.is_some());

    tokio::time::timeout(Duration::from_secs(5), async {
        while store.ticks().await.len() < 80 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("ticks persisted");

    // A direct cycle finishes alert evaluation before returning
    orch.recompute().await.unwrap();
    let alerts = orch.alerts().await;
    let alert = alerts.iter().find(|a| a.id == alert_id).unwrap();
    assert!(alert.is_triggered());
    assert!(alert.triggered_at().is_some());

    handle.shutdown();
}

#[tokio::test]
async fn test_buffers_keep_capacity_and_switching_pair_resets() {
    let (orch, source, _) = setup(Duration::from_secs(60));
    let handle = orch.spawn().await;
    orch.connect_symbols(&symbols()).await.unwrap();

    for tick in pair_ticks("SOLUSDT", "AVAXUSDT", 150) {
        source.emit(tick).await;
    }
    // Ticks for other symbols never reach the buffers
    source
        .emit(pairs_arb::feed::Tick::new(1, "DOGEUSDT", 0.1, 1.0))
        .await;

    tokio::time::timeout(Duration::from_secs(5), async {
        while orch.buffered_ticks().await.len() < 200 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("ticks ingested");

    let buffered = orch.buffered_ticks().await;
    assert_eq!(buffered.len(), 200);
    assert!(buffered.iter().all(|t| t.symbol != "DOGEUSDT"));
    assert!(buffered.iter().all(|t| t.timestamp >= 50_000));

    let snapshot = orch.recompute().await.unwrap().unwrap();
    assert_eq!(snapshot.spread.len(), 100);

    let bars = orch.ohlc_bars("SOLUSDT").await.unwrap();
    assert_eq!(bars.len(), 100);

    orch.connect_symbols(&["BTCUSDT".to_string(), "ETHUSDT".to_string()])
        .await
        .unwrap();
    assert!(orch.buffered_ticks().await.is_empty());
    assert_eq!(orch.symbols().await, vec!["BTCUSDT", "ETHUSDT"]);
    assert!(orch.recompute().await.unwrap().is_none());

    handle.shutdown();
}

#[tokio::test]
async fn test_settings_changes_apply_next_cycle() {
    let (orch, _, _) = setup(Duration::from_secs(60));
    orch.connect_symbols(&symbols()).await.unwrap();
    for tick in pair_ticks("SOLUSDT", "AVAXUSDT", 60) {
        orch.ingest(tick).await;
    }

    orch.set_regression_method(RegressionMethod::Kalman).await;
    orch.set_rolling_window(0).await;
    assert_eq!(orch.settings().await.rolling_window, 1);

    let snapshot = orch.recompute().await.unwrap().unwrap();
    assert_eq!(snapshot.method, RegressionMethod::Kalman);
    assert_eq!(snapshot.hedge_ratio, 1.0);
    // A one-tick window has no dispersion
    assert!(snapshot.z_score.iter().all(|z| *z == 0.0));

    let result = orch
        .run_backtest(BacktestConfig::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.total_trades, 0);

    let alert_id = orch
        .add_alert(AlertDefinition::z_score(AlertCondition::Below, 100.0, "always"))
        .await;
    orch.recompute().await.unwrap();
    assert!(orch.alerts().await[0].is_triggered());

    // Re-arming through a double toggle lets it fire again
    assert!(orch.toggle_alert(&alert_id).await);
    assert!(orch.toggle_alert(&alert_id).await);
    assert!(!orch.alerts().await[0].is_triggered());
    orch.recompute().await.unwrap();
    assert!(orch.alerts().await[0].is_triggered());

    assert!(orch.remove_alert(&alert_id).await);
    assert!(!orch.toggle_alert(&alert_id).await);
    assert!(orch.alerts().await.is_empty());

    orch.clear_data().await;
    assert!(orch.snapshot().is_none());
    assert!(orch.run_backtest(BacktestConfig::default()).await.is_none());
}
