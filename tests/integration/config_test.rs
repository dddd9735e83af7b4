//! Configuration loading from disk

use pairs_arb::analytics::{RegressionMethod, Timeframe};
use pairs_arb::config::Config;
use pairs_arb::engine::{AlertCondition, Alert};
use std::io::Write;
use std::time::Duration;

#[test]
fn test_config_example_loads() {
    let config = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example")).unwrap();

    assert_eq!(config.feed.symbols, vec!["BTCUSDT", "ETHUSDT"]);
    assert_eq!(config.feed.timeframe, Timeframe::OneMinute);
    assert_eq!(config.analytics.regression, RegressionMethod::Ols);
    assert_eq!(config.alerts.len(), 2);
    assert_eq!(config.alerts[1].condition, AlertCondition::Below);

    let orch = config.orchestrator_config();
    assert_eq!(orch.recompute_interval, Duration::from_millis(500));
    assert_eq!(orch.settings.rolling_window, 20);
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        [feed]
        symbols = ["BTCUSDT", "ETHUSDT"]

        [analytics]
        buffer_capacity = 5
        min_samples = 20
        "#
    )
    .unwrap();

    let err = Config::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("buffer_capacity"));
}

#[test]
fn test_configured_alerts_register_armed() {
    let config: Config = toml::from_str(
        r#"
        [[alerts]]
        condition = "crosses"
        threshold = 0.0
        message = "Mean crossed"
        "#,
    )
    .unwrap();

    let alert = Alert::new(config.alerts[0].clone());
    assert!(alert.is_active());
    assert!(!alert.is_triggered());
    assert!(alert.condition_met(&[-0.5, 0.5]));
}
