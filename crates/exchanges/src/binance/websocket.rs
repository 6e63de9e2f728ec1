//! Binance market stream client
//!
//! Connects to one raw stream (`<ws_url>/ws/<stream>`) and hands back each
//! text frame. Decoding into typed events lives in `parse_market_event` so
//! the stream manager and tests can share it.

use super::rest::BinanceConfig;
use crate::errors::{ExchangeError, Result};
use crate::websocket::MonoioWebSocket;
use cryptobot_core::prelude::*;

use serde_json::Value;
use tracing::{debug, info};
use url::Url;

/// Single-stream Binance WebSocket client
pub struct BinanceWebSocketClient {
    base_url: String,
    stream: Option<String>,
    websocket: Option<MonoioWebSocket>,
}

impl BinanceWebSocketClient {
    pub fn new(config: &BinanceConfig) -> Self {
        Self {
            base_url: config.ws_url.trim_end_matches('/').to_string(),
            stream: None,
            websocket: None,
        }
    }

    /// Full URL of a raw stream
    pub fn stream_url(&self, stream: &str) -> String {
        format!("{}/ws/{}", self.base_url, stream)
    }

    /// Connect directly to `stream`, e.g. `btcusdt@ticker`
    pub async fn connect_single_stream(&mut self, stream: &str) -> Result<()> {
        let timer = PerfTimer::start("binance_ws_connect");

        let url = Url::parse(&self.stream_url(stream))?;
        info!("🔗 Connecting to Binance stream: {}", url);

        let websocket = MonoioWebSocket::connect(url).await?;
        self.websocket = Some(websocket);
        self.stream = Some(stream.to_string());

        timer.log_elapsed();
        info!("✅ Connected to stream: {}", stream);
        Ok(())
    }

    /// Next text payload, control frames are handled underneath
    pub async fn receive_raw(&mut self) -> Result<String> {
        let ws = self
            .websocket
            .as_mut()
            .ok_or_else(|| ExchangeError::NetworkError("WebSocket not connected".to_string()))?;
        let message = ws.receive_text().await?;
        debug!("Received WebSocket message: {}", message);
        Ok(message)
    }

    pub async fn close(&mut self) -> Result<()> {
        let stream = self.stream.take().unwrap_or_default();
        if let Some(mut ws) = self.websocket.take() {
            info!("🔌 Closing Binance stream {}", stream);
            ws.close(1000, "Normal closure").await?;
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.websocket.as_ref().is_some_and(|ws| ws.is_connected())
    }
}

/// Typed market stream events
#[derive(Debug, Clone, PartialEq)]
pub enum MarketDataEvent {
    Ticker(TickerUpdate),
    Kline(KlineUpdate),
}

/// `24hrTicker` payload
#[derive(Debug, Clone, PartialEq)]
pub struct TickerUpdate {
    pub symbol: String,
    pub price: Fixed,
    pub price_change: Fixed,
    pub price_change_percent: Fixed,
    pub volume: Fixed,
    pub quote_volume: Fixed,
    pub event_time: u64,
}

/// `kline` payload
#[derive(Debug, Clone, PartialEq)]
pub struct KlineUpdate {
    pub symbol: String,
    pub interval: String,
    pub open_time: u64,
    pub close_time: u64,
    pub open: Fixed,
    pub high: Fixed,
    pub low: Fixed,
    pub close: Fixed,
    pub volume: Fixed,
    pub is_closed: bool,
}

/// Decode a stream payload.
///
/// Accepts both the raw form (`{"e":"24hrTicker",...}`) and the combined
/// form (`{"stream":"...","data":{...}}`). Event types other than ticker and
/// kline give `Ok(None)`.
pub fn parse_market_event(json: &Value) -> Result<Option<MarketDataEvent>> {
    let data = if json.get("stream").is_some() {
        &json["data"]
    } else {
        json
    };

    match data["e"].as_str() {
        Some("24hrTicker") => parse_ticker(data).map(|t| Some(MarketDataEvent::Ticker(t))),
        Some("kline") => parse_kline(data).map(|k| Some(MarketDataEvent::Kline(k))),
        _ => Ok(None),
    }
}

fn parse_ticker(data: &Value) -> Result<TickerUpdate> {
    Ok(TickerUpdate {
        symbol: str_field(data, "s")?,
        price: fixed_field(data, "c")?,
        price_change: fixed_field(data, "p")?,
        price_change_percent: fixed_field(data, "P")?,
        volume: fixed_field(data, "v")?,
        quote_volume: fixed_field(data, "q")?,
        event_time: data["E"].as_u64().unwrap_or(0),
    })
}

fn parse_kline(data: &Value) -> Result<KlineUpdate> {
    let k = &data["k"];
    Ok(KlineUpdate {
        symbol: str_field(k, "s")?,
        interval: str_field(k, "i")?,
        open_time: k["t"].as_u64().unwrap_or(0),
        close_time: k["T"].as_u64().unwrap_or(0),
        open: fixed_field(k, "o")?,
        high: fixed_field(k, "h")?,
        low: fixed_field(k, "l")?,
        close: fixed_field(k, "c")?,
        volume: fixed_field(k, "v")?,
        is_closed: k["x"].as_bool().unwrap_or(false),
    })
}

fn str_field(data: &Value, key: &str) -> Result<String> {
    data[key]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ExchangeError::InvalidResponse(format!("missing field {key}")))
}

fn fixed_field(data: &Value, key: &str) -> Result<Fixed> {
    let raw = data[key]
        .as_str()
        .ok_or_else(|| ExchangeError::InvalidResponse(format!("missing field {key}")))?;
    Fixed::from_str_exact(raw)
        .map_err(|_| ExchangeError::InvalidResponse(format!("invalid decimal in {key}: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptobot_core::fixed;
    use serde_json::json;

    #[test]
    fn test_stream_url() {
        let client = BinanceWebSocketClient::new(&BinanceConfig::testnet());
        assert_eq!(
            client.stream_url("btcusdt@ticker"),
            "wss://stream.testnet.binance.vision/ws/btcusdt@ticker"
        );
        assert!(!client.is_connected());
    }

    #[test]
    fn test_parse_ticker() {
        let payload = json!({
            "e": "24hrTicker", "E": 1672515782136u64, "s": "BTCUSDT",
            "p": "-120.50", "P": "-0.28", "c": "42000.10",
            "v": "1500.25", "q": "63010500.00"
        });
        let Some(MarketDataEvent::Ticker(ticker)) = parse_market_event(&payload).unwrap() else {
            panic!("expected ticker");
        };
        assert_eq!(ticker.symbol, "BTCUSDT");
        assert_eq!(ticker.price, fixed!(42000.10));
        assert_eq!(ticker.price_change, Fixed::from_str_exact("-120.50").unwrap());
        assert_eq!(ticker.event_time, 1672515782136);
    }

    #[test]
    fn test_parse_combined_kline() {
        let payload = json!({
            "stream": "bnbbtc@kline_1m",
            "data": {
                "e": "kline", "E": 1672515782136u64, "s": "BNBBTC",
                "k": {
                    "t": 1672515780000u64, "T": 1672515839999u64, "s": "BNBBTC", "i": "1m",
                    "o": "0.0010", "c": "0.0020", "h": "0.0025", "l": "0.0015",
                    "v": "1000", "x": false
                }
            }
        });
        let Some(MarketDataEvent::Kline(kline)) = parse_market_event(&payload).unwrap() else {
            panic!("expected kline");
        };
        assert_eq!(kline.interval, "1m");
        assert_eq!(kline.high, fixed!(0.0025));
        assert!(!kline.is_closed);
    }

    #[test]
    fn test_other_events_ignored() {
        let trade = json!({"e": "trade", "s": "BTCUSDT", "p": "1"});
        assert_eq!(parse_market_event(&trade).unwrap(), None);

        let ack = json!({"result": null, "id": 1});
        assert_eq!(parse_market_event(&ack).unwrap(), None);
    }

    #[test]
    fn test_malformed_ticker() {
        let payload = json!({"e": "24hrTicker", "s": "BTCUSDT", "c": "abc"});
        assert!(matches!(
            parse_market_event(&payload),
            Err(ExchangeError::InvalidResponse(_))
        ));
    }
}
