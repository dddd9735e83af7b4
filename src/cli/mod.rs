//! CLI interface for pairs-arb
//!
//! Provides subcommands for:
//! - `run`: Live analytics on a Binance symbol pair
//! - `backtest`: Mean-reversion backtest over recorded ticks
//! - `aggregate`: OHLC bars from recorded ticks as CSV
//! - `config`: Show the effective configuration

mod aggregate;
mod backtest;
mod run;

pub use aggregate::{aggregate_by_symbol, AggregateArgs};
pub use backtest::{backtest_ticks, BacktestArgs, BacktestReport, OutputFormat};
pub use run::RunArgs;

use crate::data::ParquetReader;
use crate::feed::Tick;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "pairs-arb")]
#[command(about = "Real-time pairs trading analytics for Binance spot markets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream a symbol pair and publish analytics
    Run(RunArgs),
    /// Backtest the z-score strategy on recorded ticks
    Backtest(BacktestArgs),
    /// Aggregate recorded ticks into OHLC bars
    Aggregate(AggregateArgs),
    /// Show the effective configuration
    Config,
}

/// Parse a comma separated `A,B` symbol pair, upper-cased
pub(crate) fn parse_pair(symbols: &[String]) -> anyhow::Result<(String, String)> {
    match symbols {
        [a, b] => Ok((a.trim().to_uppercase(), b.trim().to_uppercase())),
        other => anyhow::bail!("expected exactly two symbols, got {}", other.len()),
    }
}

/// Read ticks from Parquet files or recorder directories, sorted by timestamp.
///
/// A directory contributes every `ticks_*.parquet` file inside it.
pub(crate) fn load_ticks(paths: &[PathBuf]) -> anyhow::Result<Vec<Tick>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(tick_files(path)?);
        } else {
            files.push(path.clone());
        }
    }

    let mut ticks = Vec::new();
    for file in &files {
        let read = ParquetReader::new(file).read_ticks()?;
        tracing::debug!(file = ?file, ticks = read.len(), "Loaded tick file");
        ticks.extend(read);
    }
    ticks.sort_by_key(|t| t.timestamp);
    Ok(ticks)
}

fn tick_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_tick_file = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("ticks_") && n.ends_with(".parquet"));
        if is_tick_file {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
