//! Test support for CryptoBot
//!
//! `MockMarket` stands in for the Binance REST client so quantity
//! normalization and kline pagination can be exercised without network
//! access. Live checks against the real API are `#[ignore]`d.

pub mod mock;

pub use mock::{kline, lot_size, notional, symbol_info, MockMarket};

#[cfg(test)]
mod history_tests;
#[cfg(test)]
mod live_tests;
#[cfg(test)]
mod quantity_tests;
