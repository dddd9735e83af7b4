//! Binance combined-stream trade feed

use super::{Tick, TickSource};
use crate::ws::{WsClient, WsConfig, WsMessage};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Binance combined-stream base URL
const BINANCE_STREAM_URL: &str = "wss://stream.binance.com:9443/stream";

/// Per-subscriber channel depth
const SUBSCRIBER_BUFFER: usize = 4096;

/// Combined-stream envelope: `{"stream": "...", "data": {...}}`
#[derive(Debug, Deserialize)]
struct StreamEnvelope {
    #[allow(dead_code)]
    stream: Option<String>,
    data: BinanceTrade,
}

/// Binance trade payload
#[derive(Debug, Deserialize)]
struct BinanceTrade {
    /// Event type
    #[serde(rename = "e", default)]
    event_type: Option<String>,
    /// Symbol
    #[serde(rename = "s")]
    symbol: String,
    /// Price
    #[serde(rename = "p")]
    price: String,
    /// Quantity
    #[serde(rename = "q")]
    quantity: String,
    /// Trade time (milliseconds)
    #[serde(rename = "T")]
    trade_time: i64,
}

type Subscribers = Arc<Mutex<Vec<mpsc::Sender<Tick>>>>;

/// Running connection: the socket task and the fan-out task
struct Connection {
    ws_task: JoinHandle<()>,
    fanout_task: JoinHandle<()>,
}

impl Connection {
    fn abort(self) {
        self.ws_task.abort();
        self.fanout_task.abort();
    }
}

/// Binance trade feed for one or more symbols over a single combined stream
pub struct BinanceFeed {
    base_url: String,
    max_reconnect_attempts: u32,
    base_reconnect_delay: Duration,
    subscribers: Subscribers,
    connection: Mutex<Option<Connection>>,
}

impl Default for BinanceFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl BinanceFeed {
    /// Create a feed with the default reconnect policy (5 attempts, 1s base)
    pub fn new() -> Self {
        Self {
            base_url: BINANCE_STREAM_URL.to_string(),
            max_reconnect_attempts: 5,
            base_reconnect_delay: Duration::from_secs(1),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            connection: Mutex::new(None),
        }
    }

    /// Override the reconnect policy
    pub fn with_reconnect_policy(mut self, max_attempts: u32, base_delay: Duration) -> Self {
        self.max_reconnect_attempts = max_attempts;
        self.base_reconnect_delay = base_delay;
        self
    }

    /// Override the stream endpoint
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Build the combined-stream URL, e.g. `.../stream?streams=btcusdt@trade/ethusdt@trade`
    fn build_ws_url(&self, symbols: &[String]) -> String {
        let streams: Vec<String> = symbols
            .iter()
            .map(|s| format!("{}@trade", s.to_lowercase()))
            .collect();
        format!("{}?streams={}", self.base_url, streams.join("/"))
    }

    /// Parse a combined-stream trade message into a Tick
    fn parse_message(msg: &str) -> Option<Tick> {
        let envelope: StreamEnvelope = match serde_json::from_str(msg) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unparseable stream message");
                return None;
            }
        };
        let trade = envelope.data;

        if trade.event_type.as_deref().is_some_and(|e| e != "trade") {
            return None;
        }

        let (Ok(price), Ok(quantity)) = (trade.price.parse::<f64>(), trade.quantity.parse::<f64>())
        else {
            tracing::warn!(
                symbol = %trade.symbol,
                price = %trade.price,
                quantity = %trade.quantity,
                "Skipping trade with malformed numbers"
            );
            return None;
        };

        if !price.is_finite() || !quantity.is_finite() {
            return None;
        }

        Some(Tick::new(trade.trade_time, trade.symbol, price, quantity))
    }

    /// Deliver a tick to every live subscriber without blocking the socket
    async fn fan_out(subscribers: &Subscribers, tick: &Tick) {
        let mut subs = subscribers.lock().await;
        subs.retain(|tx| match tx.try_send(tick.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(symbol = %tick.symbol, "Subscriber lagging, dropping tick");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    /// Run the message processing loop
    async fn run_message_loop(mut ws_rx: mpsc::Receiver<WsMessage>, subscribers: Subscribers) {
        while let Some(msg) = ws_rx.recv().await {
            match msg {
                WsMessage::Text(text) => {
                    if let Some(tick) = Self::parse_message(&text) {
                        Self::fan_out(&subscribers, &tick).await;
                    }
                }
                WsMessage::Connected => {
                    tracing::info!("Binance feed connected");
                }
                WsMessage::Disconnected => {
                    tracing::warn!("Binance feed disconnected");
                    break;
                }
                WsMessage::Reconnecting { attempt, delay } => {
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Binance feed reconnecting..."
                    );
                }
            }
        }
    }
}

#[async_trait]
impl TickSource for BinanceFeed {
    async fn connect(&self, symbols: &[String]) -> anyhow::Result<()> {
        let mut connection = self.connection.lock().await;
        if let Some(old) = connection.take() {
            tracing::info!("Replacing existing Binance connection");
            old.abort();
        }

        if symbols.is_empty() {
            tracing::warn!("No symbols requested, feed stays idle");
            return Ok(());
        }

        let url = self.build_ws_url(symbols);
        tracing::info!(symbols = ?symbols, url = %url, "Subscribing to Binance feed");

        let config = WsConfig::new(url)
            .max_reconnects(self.max_reconnect_attempts)
            .base_delay(self.base_reconnect_delay);

        let (ws_rx, ws_task) = WsClient::new(config).connect();
        let subscribers = Arc::clone(&self.subscribers);
        let fanout_task = tokio::spawn(async move {
            Self::run_message_loop(ws_rx, subscribers).await;
        });

        *connection = Some(Connection {
            ws_task,
            fanout_task,
        });
        Ok(())
    }

    async fn disconnect(&self) {
        if let Some(conn) = self.connection.lock().await.take() {
            tracing::info!("Disconnecting Binance feed");
            conn.abort();
        }
    }

    async fn subscribe(&self) -> mpsc::Receiver<Tick> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.subscribers.lock().await.push(tx);
        rx
    }
}
