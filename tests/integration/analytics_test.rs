//! Analytics pipeline over synthetic pairs

use pairs_arb::analytics::{
    adf_test, aggregate_ohlc, correlation, hedge_ratio, rolling_zscore, spread, AnalyticsError,
    RegressionMethod, Timeframe, DEFAULT_HUBER_DELTA,
};
use pairs_arb::backtest::{BacktestConfig, BacktestEngine};
use pairs_arb::feed::Tick;

fn series(n: usize) -> (Vec<f64>, Vec<f64>) {
    let p2: Vec<f64> = (0..n).map(|i| 200.0 + (i as f64 * 0.1).sin() * 8.0).collect();
    let p1: Vec<f64> = p2
        .iter()
        .enumerate()
        .map(|(i, p)| 0.5 * p + 3.0 + (i as f64 * 1.3).sin() * 0.2)
        .collect();
    (p1, p2)
}

#[test]
fn test_estimators_agree_on_clean_pair() {
    let (p1, p2) = series(200);
    for method in [
        RegressionMethod::Ols,
        RegressionMethod::Huber,
        RegressionMethod::TheilSen,
    ] {
        let beta = hedge_ratio(method, &p1, &p2, DEFAULT_HUBER_DELTA).unwrap();
        assert!((beta - 0.5).abs() < 0.05, "{} gave {}", method, beta);
    }
    assert_eq!(
        hedge_ratio(RegressionMethod::Kalman, &p1, &p2, DEFAULT_HUBER_DELTA).unwrap(),
        1.0
    );
}

#[test]
fn test_robust_estimators_resist_outlier() {
    let (mut p1, p2) = series(200);
    p1[100] += 500.0;

    let ols = hedge_ratio(RegressionMethod::Ols, &p1, &p2, DEFAULT_HUBER_DELTA).unwrap();
    let theil_sen = hedge_ratio(RegressionMethod::TheilSen, &p1, &p2, DEFAULT_HUBER_DELTA).unwrap();
    assert!((theil_sen - 0.5).abs() < (ols - 0.5).abs());
}

#[test]
fn test_pipeline_to_backtest() {
    let (p1, p2) = series(300);
    let beta = hedge_ratio(RegressionMethod::Ols, &p1, &p2, DEFAULT_HUBER_DELTA).unwrap();
    let spread = spread(&p1, &p2, beta).unwrap();
    let z = rolling_zscore(&spread, Some(20));

    assert_eq!(z.len(), spread.len());
    assert!(correlation(&p1, &p2) > 0.9);

    let adf = adf_test(&spread);
    assert!(adf.p_value == 0.01 || adf.p_value == 0.1);
    assert_eq!(adf.is_stationary, adf.p_value < 0.05);

    let result = BacktestEngine::new(BacktestConfig {
        entry_threshold: 1.5,
        exit_threshold: 0.0,
    })
    .run(&spread, &z)
    .unwrap();
    assert_eq!(result.total_trades, result.trades.len());
    let sum: f64 = result.trades.iter().map(|t| t.pnl).sum();
    assert!((result.total_pnl - sum).abs() < 1e-9);
}

#[test]
fn test_mismatched_inputs_are_rejected() {
    let err = spread(&[1.0, 2.0], &[1.0], 1.0).unwrap_err();
    assert_eq!(err, AnalyticsError::InvalidInput { x_len: 2, y_len: 1 });
    assert!(BacktestEngine::new(BacktestConfig::default())
        .run(&[1.0, 2.0], &[0.0])
        .is_err());
}

#[test]
fn test_ohlc_from_ticks() {
    let ticks: Vec<Tick> = (0..120)
        .map(|i| Tick::new(i * 1000, "BTCUSDT", 100.0 + i as f64, 0.5))
        .collect();
    let bars = aggregate_ohlc(&ticks, Timeframe::OneMinute.interval_ms()).unwrap();

    assert_eq!(bars.len(), 2);
    assert_eq!(bars[0].open, 100.0);
    assert_eq!(bars[0].close, 159.0);
    assert_eq!(bars[1].timestamp, 60_000);
    assert_eq!(bars[1].low, 160.0);
    assert_eq!(bars[1].volume, 30.0);
}
