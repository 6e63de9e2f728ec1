//! Binance spot integration
//!
//! REST and stream clients, request signing, symbol filters and the order
//! sizing helpers built on them.

pub mod auth;
pub mod filters;
pub mod history;
pub mod quantity;
pub mod rest;
pub mod stream_manager;
pub mod types;
pub mod websocket;

pub use auth::{BinanceCredentials, BinanceSigner};
pub use filters::{LotSize, NotionalRange, SymbolFilters};
pub use history::{historical_klines, parse_time_spec, KLINES_PAGE_LIMIT};
pub use quantity::{
    get_symbol_filters, get_valid_buy_quantity, get_valid_buy_quantity_with,
    get_valid_sell_quantity, get_valid_sell_quantity_with, normalize_quantity, LotRounding,
};
pub use rest::{BinanceConfig, BinanceRestClient, OrderParams, WithdrawRequest};
pub use stream_manager::{StreamMessage, ThreadedStreamManager};
pub use types::*;
pub use websocket::{BinanceWebSocketClient, KlineUpdate, MarketDataEvent, TickerUpdate};
