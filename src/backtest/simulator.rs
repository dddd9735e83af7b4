//! Mean-reversion backtest engine

use super::{BacktestConfig, BacktestResult, BacktestTrade, PositionSide};
use crate::analytics::AnalyticsError;

/// Position state during a run
#[derive(Debug, Clone, Copy, PartialEq)]
enum Position {
    Flat,
    Open { side: PositionSide, entry_index: usize },
}

/// Runs the long/flat/short spread strategy over a z-score series
#[derive(Debug, Clone, Default)]
pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    /// Create a new engine
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Simulate over `spread` and its index-aligned `z_score`.
    ///
    /// Scanning starts at index 1. One position at a time; entry signals while
    /// positioned are ignored and a position still open at the end is dropped.
    pub fn run(&self, spread: &[f64], z_score: &[f64]) -> Result<BacktestResult, AnalyticsError> {
        if spread.len() != z_score.len() {
            return Err(AnalyticsError::InvalidInput {
                x_len: spread.len(),
                y_len: z_score.len(),
            });
        }

        let entry = self.config.entry_threshold;
        let exit = self.config.exit_threshold;
        let mut position = Position::Flat;
        let mut trades = Vec::new();

        for (i, &z) in z_score.iter().enumerate().skip(1) {
            match position {
                Position::Flat => {
                    if z > entry {
                        position = Position::Open {
                            side: PositionSide::Short,
                            entry_index: i,
                        };
                    } else if z < -entry {
                        position = Position::Open {
                            side: PositionSide::Long,
                            entry_index: i,
                        };
                    }
                }
                Position::Open { side, entry_index } => {
                    let should_exit = match side {
                        PositionSide::Short => z < exit,
                        PositionSide::Long => z > -exit,
                    };
                    if !should_exit {
                        continue;
                    }

                    let entry_spread = spread[entry_index];
                    let exit_spread = spread[i];
                    let pnl = match side {
                        PositionSide::Short => entry_spread - exit_spread,
                        PositionSide::Long => exit_spread - entry_spread,
                    };
                    trades.push(BacktestTrade {
                        side,
                        entry_index,
                        exit_index: i,
                        entry_spread,
                        exit_spread,
                        pnl,
                        z_score_at_entry: z_score[entry_index],
                        z_score_at_exit: z,
                    });
                    position = Position::Flat;
                }
            }
        }

        if let Position::Open { side, entry_index } = position {
            tracing::debug!(?side, entry_index, "Discarding position open at end of series");
        }

        Ok(BacktestResult::from_trades(trades))
    }
}
