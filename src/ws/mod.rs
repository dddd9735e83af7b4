//! WebSocket client library
//!
//! Reusable WebSocket client with automatic reconnection, ping keepalive,
//! and exponential backoff (base * 2^(attempt - 1)).

mod client;
mod types;

pub use client::WsClient;
pub use types::{WsConfig, WsError, WsMessage};
