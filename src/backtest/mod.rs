//! Backtesting module
//!
//! Replays a pre-computed spread / z-score series through a mean-reversion
//! state machine and reports trade-level and aggregate performance.

mod analytics;
mod simulator;

pub use analytics::{BacktestResult, BacktestTrade, PositionSide};
pub use simulator::BacktestEngine;

use serde::{Deserialize, Serialize};

fn default_entry_threshold() -> f64 {
    2.0
}

fn default_exit_threshold() -> f64 {
    0.0
}

/// Backtest configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// |z| beyond which a position is opened
    #[serde(default = "default_entry_threshold")]
    pub entry_threshold: f64,
    /// z level at which an open position is closed
    #[serde(default = "default_exit_threshold")]
    pub exit_threshold: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            entry_threshold: default_entry_threshold(),
            exit_threshold: default_exit_threshold(),
        }
    }
}
