//! In-process store

use super::{StoreError, TickStore};
use crate::analytics::OhlcBar;
use crate::feed::Tick;
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// Keeps ticks and bars in memory, optionally bounded to the most recent ticks
#[derive(Debug, Default)]
pub struct MemoryStore {
    capacity: Option<usize>,
    ticks: RwLock<VecDeque<Tick>>,
    ohlc: RwLock<Vec<OhlcBar>>,
}

impl MemoryStore {
    /// Unbounded store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that retains at most `capacity` ticks
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub async fn ticks(&self) -> Vec<Tick> {
        self.ticks.read().await.iter().cloned().collect()
    }

    pub async fn ohlc(&self) -> Vec<OhlcBar> {
        self.ohlc.read().await.clone()
    }
}

#[async_trait]
impl TickStore for MemoryStore {
    async fn append_tick(&self, tick: &Tick) -> Result<(), StoreError> {
        let mut ticks = self.ticks.write().await;
        if let Some(cap) = self.capacity {
            if cap == 0 {
                return Ok(());
            }
            while ticks.len() >= cap {
                ticks.pop_front();
            }
        }
        ticks.push_back(tick.clone());
        Ok(())
    }

    async fn append_ohlc_batch(&self, bars: &[OhlcBar]) -> Result<(), StoreError> {
        self.ohlc.write().await.extend_from_slice(bars);
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        self.ticks.write().await.clear();
        self.ohlc.write().await.clear();
        Ok(())
    }
}
