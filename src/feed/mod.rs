//! Price feed module
//!
//! Tick sources for the analytics pipeline. The transport owns connection
//! and reconnect policy; consumers only see a stream of [`Tick`]s.

mod binance;
mod types;

pub use binance::BinanceFeed;
pub use types::Tick;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Trait for tick source implementations
#[async_trait]
pub trait TickSource: Send + Sync {
    /// Start streaming trades for `symbols`, replacing any current connection
    async fn connect(&self, symbols: &[String]) -> anyhow::Result<()>;

    /// Stop streaming and cancel any pending reconnect
    async fn disconnect(&self);

    /// Register a consumer. Dropping the receiver unsubscribes it.
    async fn subscribe(&self) -> mpsc::Receiver<Tick>;
}
