//! CSV export of buffered ticks, bars and analytics

use crate::analytics::OhlcBar;
use crate::engine::AnalyticsSnapshot;
use crate::feed::Tick;
use std::fmt::Write;

/// `Symbol,Timestamp,Price,Quantity` rows in input order
pub fn ticks_to_csv<'a>(ticks: impl IntoIterator<Item = &'a Tick>) -> String {
    let mut out = String::from("Symbol,Timestamp,Price,Quantity\n");
    for t in ticks {
        let _ = writeln!(out, "{},{},{},{}", t.symbol, t.timestamp, t.price, t.quantity);
    }
    out
}

/// `Symbol,Timestamp,Open,High,Low,Close,Volume` rows in input order
pub fn ohlc_to_csv<'a>(bars: impl IntoIterator<Item = &'a OhlcBar>) -> String {
    let mut out = String::from("Symbol,Timestamp,Open,High,Low,Close,Volume\n");
    for b in bars {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{}",
            b.symbol, b.timestamp, b.open, b.high, b.low, b.close, b.volume
        );
    }
    out
}

/// `Metric,Value` rows; stationarity rows only when the test ran
pub fn analytics_to_csv(snapshot: &AnalyticsSnapshot) -> String {
    let mut out = String::from("Metric,Value\n");
    let _ = writeln!(out, "Hedge Ratio,{}", snapshot.hedge_ratio);
    let _ = writeln!(out, "Correlation,{}", snapshot.correlation);
    if let (Some(stat), Some(p), Some(stationary)) = (
        snapshot.adf_statistic,
        snapshot.adf_p_value,
        snapshot.is_stationary,
    ) {
        let _ = writeln!(out, "ADF Statistic,{stat}");
        let _ = writeln!(out, "ADF P-Value,{p}");
        let _ = writeln!(out, "Is Stationary,{stationary}");
    }
    out
}
