//! Market data seam
//!
//! Quantity normalization and kline pagination only need three read-only
//! queries. They are written against this trait so tests can swap in a mock
//! market with fixed prices and filters.

use crate::binance::types::{BinanceKline, SymbolInfo};
use crate::errors::Result;
use crate::types::KlineInterval;
use async_trait::async_trait;
use cryptobot_core::Fixed;

/// Read-only market queries
///
/// Futures are `?Send` because monoio runs everything on the current thread.
#[async_trait(?Send)]
pub trait MarketDataSource {
    /// Trading rules for `symbol`, `None` when the exchange does not list it
    async fn symbol_info(&self, symbol: &str) -> Result<Option<SymbolInfo>>;

    /// Latest traded price of `symbol`
    async fn symbol_price(&self, symbol: &str) -> Result<Fixed>;

    /// One page of candles, oldest first
    async fn klines(
        &self,
        symbol: &str,
        interval: KlineInterval,
        start_time: Option<u64>,
        end_time: Option<u64>,
        limit: Option<u32>,
    ) -> Result<Vec<BinanceKline>>;
}
