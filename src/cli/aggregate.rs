//! Aggregate command implementation

use crate::analytics::{aggregate_ohlc, OhlcBar, Timeframe};
use crate::data::ohlc_to_csv;
use crate::feed::Tick;
use clap::Args;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct AggregateArgs {
    /// Tick Parquet files or recorder output directories
    #[arg(long, required = true, num_args = 1..)]
    pub ticks: Vec<PathBuf>,

    /// Bar interval: 1s, 1m or 5m
    #[arg(long, default_value = "1m")]
    pub interval: Timeframe,

    /// Only aggregate this symbol
    #[arg(long)]
    pub symbol: Option<String>,
}

/// Bars per symbol, symbols in name order
pub fn aggregate_by_symbol(
    ticks: &[Tick],
    timeframe: Timeframe,
    symbol: Option<&str>,
) -> anyhow::Result<Vec<OhlcBar>> {
    let mut grouped: BTreeMap<&str, Vec<Tick>> = BTreeMap::new();
    for tick in ticks {
        if symbol.is_some_and(|s| !s.eq_ignore_ascii_case(&tick.symbol)) {
            continue;
        }
        grouped.entry(tick.symbol.as_str()).or_default().push(tick.clone());
    }

    let mut bars = Vec::new();
    for ticks in grouped.values() {
        bars.extend(aggregate_ohlc(ticks, timeframe.interval_ms())?);
    }
    Ok(bars)
}

impl AggregateArgs {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let ticks = super::load_ticks(&self.ticks)?;
        let bars = aggregate_by_symbol(&ticks, self.interval, self.symbol.as_deref())?;
        tracing::info!(
            ticks = ticks.len(),
            bars = bars.len(),
            interval = %self.interval,
            "Aggregated ticks"
        );
        print!("{}", ohlc_to_csv(&bars));
        Ok(())
    }
}
