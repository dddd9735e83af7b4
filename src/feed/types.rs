//! Price feed types

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A single trade print from an exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Exchange trade time, epoch milliseconds
    pub timestamp: i64,
    /// Trading symbol (e.g., "BTCUSDT")
    pub symbol: String,
    /// Trade price
    pub price: f64,
    /// Trade quantity
    pub quantity: f64,
}

impl Tick {
    pub fn new(timestamp: i64, symbol: impl Into<String>, price: f64, quantity: f64) -> Self {
        Self {
            timestamp,
            symbol: symbol.into(),
            price,
            quantity,
        }
    }

    /// Trade time as a UTC datetime, if the timestamp is in range
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_datetime() {
        let tick = Tick::new(1_704_067_200_123, "ETHUSDT", 2300.5, 0.1);
        let dt = tick.datetime().unwrap();
        assert_eq!(dt.timestamp_millis(), 1_704_067_200_123);
    }

    #[test]
    fn test_tick_serde() {
        let tick = Tick::new(1, "BTCUSDT", 42000.0, 0.5);
        let json = serde_json::to_string(&tick).unwrap();
        let back: Tick = serde_json::from_str(&json).unwrap();
        assert_eq!(tick, back);
    }
}
