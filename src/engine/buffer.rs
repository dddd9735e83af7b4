//! Bounded per-symbol tick buffers

use crate::feed::Tick;
use std::collections::{HashMap, VecDeque};

/// Default ticks retained per symbol
pub const DEFAULT_BUFFER_CAPACITY: usize = 1000;

/// FIFO tick buffer that evicts its oldest entry once full
#[derive(Debug, Clone)]
pub struct PriceBuffer {
    capacity: usize,
    ticks: VecDeque<Tick>,
}

impl Default for PriceBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

impl PriceBuffer {
    /// Create an empty buffer; capacity is at least 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            ticks: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a tick, returning the evicted one if the buffer was full
    pub fn push(&mut self, tick: Tick) -> Option<Tick> {
        let evicted = if self.ticks.len() >= self.capacity {
            self.ticks.pop_front()
        } else {
            None
        };
        self.ticks.push_back(tick);
        evicted
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tick> {
        self.ticks.iter()
    }

    /// Prices in insertion order
    pub fn prices(&self) -> Vec<f64> {
        self.ticks.iter().map(|t| t.price).collect()
    }

    /// Prices of the most recent `n` ticks, oldest first
    pub fn trailing_prices(&self, n: usize) -> Vec<f64> {
        let skip = self.ticks.len().saturating_sub(n);
        self.ticks.iter().skip(skip).map(|t| t.price).collect()
    }

    /// Copy of the buffered ticks, oldest first
    pub fn to_vec(&self) -> Vec<Tick> {
        self.ticks.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.ticks.clear();
    }
}

/// Per-symbol buffers sharing one capacity
#[derive(Debug, Clone, Default)]
pub struct TickBuffers {
    capacity: usize,
    buffers: HashMap<String, PriceBuffer>,
}

impl TickBuffers {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffers: HashMap::new(),
        }
    }

    /// Route a tick to its symbol's buffer, returning any evicted tick
    pub fn push(&mut self, tick: Tick) -> Option<Tick> {
        let capacity = self.capacity;
        self.buffers
            .entry(tick.symbol.clone())
            .or_insert_with(|| PriceBuffer::new(capacity))
            .push(tick)
    }

    pub fn get(&self, symbol: &str) -> Option<&PriceBuffer> {
        self.buffers.get(symbol)
    }

    pub fn len_of(&self, symbol: &str) -> usize {
        self.buffers.get(symbol).map_or(0, PriceBuffer::len)
    }

    /// Symbols with a buffer, sorted
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.buffers.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Time-aligned price series for a pair.
    ///
    /// Returns `None` until both buffers hold `min_samples` ticks. Otherwise both
    /// series are cut to their common length by dropping the longer one's oldest
    /// entries, so they line up on their most recent ends. The buffers themselves
    /// are left untouched.
    pub fn aligned_prices(
        &self,
        symbol1: &str,
        symbol2: &str,
        min_samples: usize,
    ) -> Option<(Vec<f64>, Vec<f64>)> {
        let b1 = self.buffers.get(symbol1)?;
        let b2 = self.buffers.get(symbol2)?;
        if b1.len() < min_samples || b2.len() < min_samples {
            return None;
        }
        let n = b1.len().min(b2.len());
        if n == 0 {
            return None;
        }
        Some((b1.trailing_prices(n), b2.trailing_prices(n)))
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(ts: i64, symbol: &str, price: f64) -> Tick {
        Tick::new(ts, symbol, price, 1.0)
    }

    #[test]
    fn test_buffer_keeps_most_recent_1000() {
        let mut buffer = PriceBuffer::default();
        let mut evicted = Vec::new();
        for i in 0..1500 {
            if let Some(old) = buffer.push(tick(i, "BTCUSDT", i as f64)) {
                evicted.push(old.timestamp);
            }
        }

        assert_eq!(buffer.len(), 1000);
        let kept: Vec<i64> = buffer.iter().map(|t| t.timestamp).collect();
        assert_eq!(kept, (500..1500).collect::<Vec<_>>());
        assert_eq!(evicted, (0..500).collect::<Vec<_>>());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut buffer = PriceBuffer::new(0);
        buffer.push(tick(1, "A", 1.0));
        buffer.push(tick(2, "A", 2.0));
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.prices(), vec![2.0]);
    }

    #[test]
    fn test_trailing_prices() {
        let mut buffer = PriceBuffer::new(10);
        for i in 0..5 {
            buffer.push(tick(i, "A", i as f64));
        }
        assert_eq!(buffer.trailing_prices(2), vec![3.0, 4.0]);
        assert_eq!(buffer.trailing_prices(99).len(), 5);
    }

    #[test]
    fn test_aligned_prices_trims_from_front() {
        let mut buffers = TickBuffers::new(100);
        for i in 0..25 {
            buffers.push(tick(i, "A", i as f64));
        }
        for i in 0..22 {
            buffers.push(tick(i, "B", 100.0 + i as f64));
        }

        let (a, b) = buffers.aligned_prices("A", "B", 20).unwrap();
        assert_eq!(a.len(), 22);
        assert_eq!(b.len(), 22);
        assert_eq!(a[0], 3.0);
        assert_eq!(*a.last().unwrap(), 24.0);
        assert_eq!(b[0], 100.0);
        // Buffers are not mutated
        assert_eq!(buffers.len_of("A"), 25);
    }

    #[test]
    fn test_aligned_prices_requires_min_samples() {
        let mut buffers = TickBuffers::new(100);
        for i in 0..30 {
            buffers.push(tick(i, "A", 1.0));
        }
        for i in 0..19 {
            buffers.push(tick(i, "B", 1.0));
        }
        assert!(buffers.aligned_prices("A", "B", 20).is_none());
        assert!(buffers.aligned_prices("A", "C", 20).is_none());
    }
}
