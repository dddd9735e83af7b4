//! Integration tests for pairs-arb

mod analytics_test;
mod config_test;
mod orchestrator_test;
mod store_test;

use async_trait::async_trait;
use pairs_arb::feed::{Tick, TickSource};
use tokio::sync::{mpsc, Mutex};

/// In-process tick source driven by the test
#[derive(Default)]
pub struct ChannelSource {
    pub connected: Mutex<Vec<Vec<String>>>,
    subscribers: Mutex<Vec<mpsc::Sender<Tick>>>,
}

impl ChannelSource {
    pub async fn emit(&self, tick: Tick) {
        for tx in self.subscribers.lock().await.iter() {
            let _ = tx.send(tick.clone()).await;
        }
    }
}

#[async_trait]
impl TickSource for ChannelSource {
    async fn connect(&self, symbols: &[String]) -> anyhow::Result<()> {
        self.connected.lock().await.push(symbols.to_vec());
        Ok(())
    }

    async fn disconnect(&self) {}

    async fn subscribe(&self) -> mpsc::Receiver<Tick> {
        let (tx, rx) = mpsc::channel(4096);
        self.subscribers.lock().await.push(tx);
        rx
    }
}

/// `n` ticks per leg where the first leg is 1.5x the second plus noise
pub fn pair_ticks(symbol1: &str, symbol2: &str, n: usize) -> Vec<Tick> {
    let mut ticks = Vec::with_capacity(n * 2);
    for i in 0..n {
        let p2 = 50.0 + (i as f64 * 0.2).sin() * 3.0;
        let noise = (i as f64 * 2.3).cos() * 0.1;
        let ts = i as i64 * 1000;
        ticks.push(Tick::new(ts, symbol1, 1.5 * p2 + noise, 1.0));
        ticks.push(Tick::new(ts + 1, symbol2, p2, 2.0));
    }
    ticks
}
