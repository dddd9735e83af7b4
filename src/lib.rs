//! pairs-arb: real-time statistical arbitrage analytics for crypto pairs
//!
//! This library provides the core components for:
//! - Live trade feeds from Binance with reconnect and fan-out
//! - Hedge-ratio estimation (OLS, Huber, Theil-Sen) and a Kalman filter
//! - Spread, rolling z-score, correlation and ADF stationarity analytics
//! - A recompute orchestrator publishing snapshots and latching alerts
//! - Mean-reversion backtesting on the spread
//! - OHLC aggregation, Parquet capture and CSV export
//! - Structured logging and Prometheus metrics

pub mod analytics;
pub mod backtest;
pub mod cli;
pub mod config;
pub mod data;
pub mod engine;
pub mod feed;
pub mod telemetry;
pub mod ws;
