//! Threaded socket manager
//!
//! Each socket gets its own OS thread running a private monoio runtime. The
//! worker connects to `<ws_url>/ws/<stream>` and calls the user's callback for
//! every text frame until it is told to stop or the connection drops. The
//! stop signal is a flume channel raced against the socket read.

use super::rest::BinanceConfig;
use super::websocket::{BinanceWebSocketClient, MarketDataEvent, parse_market_event};
use crate::errors::{ExchangeError, Result};
use crate::types::KlineInterval;
use cryptobot_core::{RuntimeConfig, log_error, spawn_worker};

use flume::{Receiver, Sender};
use serde_json::Value;
use std::collections::HashMap;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// One decoded text frame
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMessage {
    pub stream: String,
    pub payload: Value,
}

impl StreamMessage {
    /// The payload's `e` field, looking inside combined-stream wrappers
    pub fn event_type(&self) -> Option<&str> {
        self.payload["e"]
            .as_str()
            .or_else(|| self.payload["data"]["e"].as_str())
    }

    /// Typed ticker or kline event, `None` for anything else
    pub fn market_event(&self) -> Result<Option<MarketDataEvent>> {
        parse_market_event(&self.payload)
    }
}

struct SocketHandle {
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
}

impl SocketHandle {
    fn shutdown(self, stream: &str) {
        // The worker may already have exited on its own
        let _ = self.stop_tx.send(());
        if self.thread.join().is_err() {
            warn!("⚠️  Stream worker {} panicked", stream);
        }
    }
}

/// Manages background stream sockets, one thread per socket
pub struct ThreadedStreamManager {
    config: BinanceConfig,
    started: bool,
    sockets: HashMap<String, SocketHandle>,
}

impl ThreadedStreamManager {
    pub fn new(config: BinanceConfig) -> Self {
        Self {
            config,
            started: false,
            sockets: HashMap::new(),
        }
    }

    /// Allow sockets to be started
    pub fn start(&mut self) {
        if !self.started {
            info!("🚀 Stream manager started ({})", self.config.ws_url);
        }
        self.started = true;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Stream names of the sockets still registered
    pub fn active_streams(&self) -> Vec<String> {
        let mut names: Vec<_> = self.sockets.keys().cloned().collect();
        names.sort();
        names
    }

    /// Stream `<symbol>@ticker`, returns the stream name
    pub fn start_symbol_ticker_socket<F>(&mut self, callback: F, symbol: &str) -> Result<String>
    where
        F: Fn(StreamMessage) + Send + 'static,
    {
        self.start_socket(ticker_stream(symbol), callback)
    }

    /// Stream `<symbol>@kline_<interval>`, returns the stream name
    pub fn start_kline_socket<F>(
        &mut self,
        callback: F,
        symbol: &str,
        interval: KlineInterval,
    ) -> Result<String>
    where
        F: Fn(StreamMessage) + Send + 'static,
    {
        self.start_socket(kline_stream(symbol, interval), callback)
    }

    /// Start a socket on any raw stream name.
    ///
    /// A socket already running on the same stream is stopped and replaced.
    pub fn start_socket<F>(&mut self, stream: String, callback: F) -> Result<String>
    where
        F: Fn(StreamMessage) + Send + 'static,
    {
        if !self.is_started() {
            return Err(ExchangeError::ClientNotInitialized(
                "stream manager not started".to_string(),
            ));
        }

        if let Some(previous) = self.sockets.remove(&stream) {
            debug!("Replacing socket {}", stream);
            previous.shutdown(&stream);
        }

        let (stop_tx, stop_rx) = flume::bounded(1);
        let config = self.config.clone();
        let worker_stream = stream.clone();
        let thread = spawn_worker(RuntimeConfig::named(format!("ws-{stream}")), move || {
            run_socket(config, worker_stream, callback, stop_rx)
        })
        .map_err(|e| ExchangeError::NetworkError(format!("failed to spawn stream worker: {e}")))?;

        info!("📡 Socket started: {}", stream);
        self.sockets
            .insert(stream.clone(), SocketHandle { stop_tx, thread });
        Ok(stream)
    }

    /// Stop one socket and wait for its thread
    pub fn stop_socket(&mut self, stream: &str) -> Result<()> {
        let handle = self
            .sockets
            .remove(stream)
            .ok_or_else(|| ExchangeError::StreamNotFound(stream.to_string()))?;
        handle.shutdown(stream);
        info!("🛑 Socket stopped: {}", stream);
        Ok(())
    }

    /// Stop every socket
    pub fn stop(&mut self) {
        for (stream, handle) in self.sockets.drain() {
            handle.shutdown(&stream);
            debug!("Socket stopped: {}", stream);
        }
        if self.started {
            info!("🛑 Stream manager stopped");
        }
        self.started = false;
    }
}

impl Drop for ThreadedStreamManager {
    fn drop(&mut self) {
        self.stop();
    }
}

pub fn ticker_stream(symbol: &str) -> String {
    format!("{}@ticker", symbol.to_lowercase())
}

pub fn kline_stream(symbol: &str, interval: KlineInterval) -> String {
    format!("{}@kline_{}", symbol.to_lowercase(), interval.as_str())
}

async fn run_socket<F>(config: BinanceConfig, stream: String, callback: F, stop_rx: Receiver<()>)
where
    F: Fn(StreamMessage),
{
    let mut client = BinanceWebSocketClient::new(&config);

    let connected = monoio::select! {
        res = client.connect_single_stream(&stream) => res,
        _ = stop_rx.recv_async() => {
            debug!("Socket {} stopped while connecting", stream);
            return;
        }
    };
    if let Err(e) = connected {
        log_error!(format!("Socket {stream} connect"), e);
        return;
    }

    loop {
        monoio::select! {
            _ = stop_rx.recv_async() => break,
            received = client.receive_raw() => match received {
                Ok(text) => match serde_json::from_str::<Value>(&text) {
                    Ok(payload) => callback(StreamMessage {
                        stream: stream.clone(),
                        payload,
                    }),
                    Err(e) => warn!("⚠️  Socket {} sent invalid JSON: {}", stream, e),
                },
                Err(e) => {
                    error!("❌ Socket {} disconnected: {}", stream, e);
                    break;
                }
            }
        }
    }

    if let Err(e) = client.close().await {
        debug!("Socket {} close failed: {}", stream, e);
    }
}
