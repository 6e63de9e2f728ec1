//! # CryptoBot Exchanges
//!
//! Binance spot client on monoio.
//!
//! ## Architecture
//!
//! - **monoio HTTPS client** - rustls over monoio TCP, one request per connection
//! - **WebSocket streams** - one socket per worker thread
//! - **Exact decimals** - prices and quantities stay `Fixed`
//! - **Filter-aware sizing** - quantities clamped to notional and lot rules

pub mod binance;
pub mod errors;
pub mod http;
pub mod traits;
pub mod types;
pub mod websocket;

// Re-export main types
pub use binance::{BinanceConfig, BinanceRestClient, ThreadedStreamManager};
pub use errors::{ExchangeError, Result};
pub use http::MonoioHttpsClient;
pub use traits::MarketDataSource;
pub use types::*;
pub use websocket::MonoioWebSocket;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::binance::{
        BinanceConfig, BinanceRestClient, LotRounding, MarketDataEvent, StreamMessage,
        SymbolFilters, ThreadedStreamManager, get_valid_buy_quantity, get_valid_sell_quantity,
    };
    pub use crate::errors::{ExchangeError, Result};
    pub use crate::traits::MarketDataSource;
    pub use crate::types::*;
    pub use cryptobot_core::prelude::*;
}
