//! Data capture module
//!
//! Persistence collaborators for ticks and OHLC bars. The orchestrator treats
//! every call as best-effort: failures are logged and never reach analytics.

mod export;
mod memory;
mod parquet;
mod recorder;

pub use export::{analytics_to_csv, ohlc_to_csv, ticks_to_csv};
pub use memory::MemoryStore;
pub use self::parquet::{
    ohlc_schema, ohlc_to_batch, tick_schema, ticks_to_batch, write_ticks, ParquetReader,
    ParquetWriter,
};
pub use recorder::{ParquetStore, RecorderConfig, RecorderStats};

use crate::analytics::OhlcBar;
use crate::feed::Tick;
use async_trait::async_trait;
use thiserror::Error;

/// Persistence errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ::parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Invalid or missing column: {0}")]
    InvalidColumn(String),

    #[error("Store queue is full")]
    QueueFull,

    #[error("Store writer has shut down")]
    Closed,
}

/// Trait for tick/bar persistence backends
#[async_trait]
pub trait TickStore: Send + Sync {
    /// Queue a single tick; must not wait on I/O
    async fn append_tick(&self, tick: &Tick) -> Result<(), StoreError>;

    /// Persist a batch of OHLC bars
    async fn append_ohlc_batch(&self, bars: &[OhlcBar]) -> Result<(), StoreError>;

    /// Drop everything persisted so far
    async fn clear_all(&self) -> Result<(), StoreError>;
}
