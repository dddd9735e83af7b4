//! Tick to OHLC bar aggregation

use super::error::AnalyticsError;
use crate::feed::Tick;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Fixed-interval price bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    /// Bucket start, epoch milliseconds
    pub timestamp: i64,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Bar interval label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1s")]
    OneSecond,
    #[default]
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
}

impl Timeframe {
    /// Bucket width in milliseconds
    pub fn interval_ms(&self) -> i64 {
        match self {
            Timeframe::OneSecond => 1_000,
            Timeframe::OneMinute => 60_000,
            Timeframe::FiveMinutes => 300_000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::OneSecond => "1s",
            Timeframe::OneMinute => "1m",
            Timeframe::FiveMinutes => "5m",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1s" => Ok(Timeframe::OneSecond),
            "1m" => Ok(Timeframe::OneMinute),
            "5m" => Ok(Timeframe::FiveMinutes),
            other => Err(format!("unknown timeframe '{}' (expected 1s, 1m or 5m)", other)),
        }
    }
}

/// Bucket ticks into bars of `interval_ms` width, ascending by bucket start.
///
/// The first tick in a bucket opens it; later ticks extend high/low, set the
/// close and add to volume. Ticks are taken in the order given.
pub fn aggregate_ohlc(ticks: &[Tick], interval_ms: i64) -> Result<Vec<OhlcBar>, AnalyticsError> {
    if interval_ms <= 0 {
        return Err(AnalyticsError::InvalidInterval(interval_ms));
    }

    let mut buckets: BTreeMap<i64, OhlcBar> = BTreeMap::new();

    for tick in ticks {
        let bucket = tick.timestamp.div_euclid(interval_ms) * interval_ms;
        buckets
            .entry(bucket)
            .and_modify(|bar| {
                bar.high = bar.high.max(tick.price);
                bar.low = bar.low.min(tick.price);
                bar.close = tick.price;
                bar.volume += tick.quantity;
            })
            .or_insert_with(|| OhlcBar {
                timestamp: bucket,
                symbol: tick.symbol.clone(),
                open: tick.price,
                high: tick.price,
                low: tick.price,
                close: tick.price,
                volume: tick.quantity,
            });
    }

    Ok(buckets.into_values().collect())
}
