//! WebSocket client with automatic reconnection

use super::types::{WsConfig, WsError, WsMessage};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Outcome of a single connection attempt
enum SessionEnd {
    /// Closed by the server or by the receiver going away
    Closed,
    /// Failed before the handshake completed
    HandshakeFailed(WsError),
    /// Dropped after a successful handshake
    Dropped(WsError),
}

/// Reusable WebSocket client with automatic reconnection and ping keepalive
pub struct WsClient {
    config: WsConfig,
}

impl WsClient {
    /// Create a new WebSocket client with the given configuration
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    /// Create a new client with just a URL using default config
    pub fn with_url(url: impl Into<String>) -> Self {
        Self::new(WsConfig::new(url))
    }

    /// Get the configured URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Connect and return a receiver for messages plus the connection task.
    ///
    /// The task reconnects with exponential backoff until the attempt budget
    /// is spent, the server closes cleanly, or the receiver is dropped.
    /// Aborting the returned handle tears the connection down immediately.
    pub fn connect(&self) -> (mpsc::Receiver<WsMessage>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(1024);
        let config = self.config.clone();

        let handle = tokio::spawn(async move {
            if let Err(e) = Self::run_connection_loop(config, tx).await {
                tracing::error!(error = %e, "WebSocket connection loop failed");
            }
        });

        (rx, handle)
    }

    /// Run the connection loop with automatic reconnection
    async fn run_connection_loop(
        config: WsConfig,
        tx: mpsc::Sender<WsMessage>,
    ) -> Result<(), WsError> {
        let mut reconnect_attempts: u32 = 0;

        loop {
            let error = match Self::connect_and_stream(&config, &tx).await {
                SessionEnd::Closed => {
                    tracing::info!("WebSocket connection closed cleanly");
                    let _ = tx.send(WsMessage::Disconnected).await;
                    return Ok(());
                }
                SessionEnd::Dropped(e) => {
                    // A session that got through the handshake restarts the budget
                    reconnect_attempts = 0;
                    e
                }
                SessionEnd::HandshakeFailed(e) => e,
            };

            reconnect_attempts += 1;
            tracing::warn!(
                error = %error,
                attempt = reconnect_attempts,
                "WebSocket connection error"
            );

            if config.max_reconnect_attempts > 0 && reconnect_attempts > config.max_reconnect_attempts
            {
                tracing::error!("Max reconnection attempts reached");
                let _ = tx.send(WsMessage::Disconnected).await;
                return Err(WsError::MaxReconnectsExceeded);
            }

            if tx.is_closed() {
                tracing::info!("Receiver dropped, stopping reconnection");
                return Ok(());
            }

            let delay = config.backoff_delay(reconnect_attempts);
            tracing::info!(
                attempt = reconnect_attempts,
                max_attempts = config.max_reconnect_attempts,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting"
            );
            let _ = tx
                .send(WsMessage::Reconnecting {
                    attempt: reconnect_attempts,
                    delay,
                })
                .await;

            sleep(delay).await;
        }
    }

    /// Connect to WebSocket and stream messages until the session ends
    async fn connect_and_stream(config: &WsConfig, tx: &mpsc::Sender<WsMessage>) -> SessionEnd {
        tracing::info!(url = %config.url, "Connecting to WebSocket");

        let ws_stream = match connect_async(config.url.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(e) => return SessionEnd::HandshakeFailed(WsError::ConnectionFailed(e.to_string())),
        };

        let (mut write, mut read) = ws_stream.split();

        tracing::info!("WebSocket connected");

        if tx.send(WsMessage::Connected).await.is_err() {
            return SessionEnd::Closed;
        }

        let mut ping_interval = tokio::time::interval(config.ping_interval);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut waiting_for_pong = false;

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if tx.send(WsMessage::Text(text)).await.is_err() {
                                tracing::debug!("Receiver dropped, closing connection");
                                return SessionEnd::Closed;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = write.send(Message::Pong(data)).await {
                                return SessionEnd::Dropped(WsError::SendFailed(e.to_string()));
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {
                            waiting_for_pong = false;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Received close frame");
                            return SessionEnd::Closed;
                        }
                        Some(Err(e)) => {
                            return SessionEnd::Dropped(WsError::ConnectionFailed(e.to_string()));
                        }
                        None => {
                            return SessionEnd::Dropped(WsError::ConnectionFailed(
                                "Stream ended unexpectedly".into(),
                            ));
                        }
                        _ => {}
                    }
                }

                _ = ping_interval.tick() => {
                    if waiting_for_pong {
                        return SessionEnd::Dropped(WsError::ConnectionFailed("Pong timeout".into()));
                    }
                    if let Err(e) = write.send(Message::Ping(vec![])).await {
                        return SessionEnd::Dropped(WsError::SendFailed(e.to_string()));
                    }
                    waiting_for_pong = true;
                }
            }
        }
    }
}
