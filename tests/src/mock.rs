//! In-memory market data source

use async_trait::async_trait;
use cryptobot_core::Fixed;
use cryptobot_exchanges::binance::types::{BinanceKline, SymbolFilter, SymbolInfo};
use cryptobot_exchanges::errors::{ExchangeError, INVALID_SYMBOL_CODE, Result};
use cryptobot_exchanges::traits::MarketDataSource;
use cryptobot_exchanges::types::KlineInterval;

use std::cell::RefCell;
use std::collections::HashMap;

/// A kline page request as seen by the mock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KlineRequest {
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    pub limit: Option<u32>,
}

/// Fixed prices, filters and candles
#[derive(Debug, Default)]
pub struct MockMarket {
    symbols: HashMap<String, SymbolInfo>,
    prices: HashMap<String, Fixed>,
    klines: Vec<BinanceKline>,
    reject_unknown: bool,
    kline_requests: RefCell<Vec<KlineRequest>>,
}

impl MockMarket {
    pub fn new() -> Self {
        Self::default()
    }

    /// List a symbol at `price`
    pub fn with_symbol(mut self, info: SymbolInfo, price: Fixed) -> Self {
        self.prices.insert(info.symbol.clone(), price);
        self.symbols.insert(info.symbol.clone(), info);
        self
    }

    /// Answer unknown symbols with Binance's `-1121` error instead of `None`
    pub fn rejecting_unknown_symbols(mut self) -> Self {
        self.reject_unknown = true;
        self
    }

    /// Candles served by `klines`, oldest first
    pub fn with_klines(mut self, klines: Vec<BinanceKline>) -> Self {
        self.klines = klines;
        self
    }

    pub fn kline_requests(&self) -> Vec<KlineRequest> {
        self.kline_requests.borrow().clone()
    }

    fn unknown(&self, symbol: &str) -> Result<()> {
        if self.reject_unknown {
            return Err(ExchangeError::ApiError {
                code: INVALID_SYMBOL_CODE,
                msg: format!("Invalid symbol {symbol}."),
            });
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl MarketDataSource for MockMarket {
    async fn symbol_info(&self, symbol: &str) -> Result<Option<SymbolInfo>> {
        match self.symbols.get(symbol) {
            Some(info) => Ok(Some(info.clone())),
            None => self.unknown(symbol).map(|_| None),
        }
    }

    async fn symbol_price(&self, symbol: &str) -> Result<Fixed> {
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| ExchangeError::SymbolNotFound(symbol.to_string()))
    }

    async fn klines(
        &self,
        _symbol: &str,
        _interval: KlineInterval,
        start_time: Option<u64>,
        end_time: Option<u64>,
        limit: Option<u32>,
    ) -> Result<Vec<BinanceKline>> {
        self.kline_requests.borrow_mut().push(KlineRequest {
            start_time,
            end_time,
            limit,
        });

        let limit = limit.unwrap_or(500) as usize;
        Ok(self
            .klines
            .iter()
            .filter(|k| start_time.map_or(true, |s| k.open_time >= s))
            .filter(|k| end_time.map_or(true, |e| k.open_time <= e))
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Exchange info for a symbol with the given sizing rules
pub fn symbol_info(symbol: &str, precision: u32, filters: Vec<SymbolFilter>) -> SymbolInfo {
    SymbolInfo {
        symbol: symbol.to_string(),
        status: "TRADING".to_string(),
        base_asset: symbol.chars().take(3).collect(),
        base_asset_precision: 8,
        quote_asset: symbol.chars().skip(3).collect(),
        quote_precision: precision,
        quote_asset_precision: precision,
        order_types: vec!["LIMIT".to_string(), "MARKET".to_string()],
        filters,
    }
}

pub fn lot_size(min: Fixed, max: Fixed, step: Fixed) -> SymbolFilter {
    SymbolFilter::LotSize {
        min_qty: min,
        max_qty: max,
        step_size: step,
    }
}

pub fn notional(min: Fixed, max: Fixed) -> SymbolFilter {
    SymbolFilter::Notional {
        min_notional: min,
        max_notional: max,
        apply_min_to_market: true,
        apply_max_to_market: false,
    }
}

/// A flat candle opening at `open_time`
pub fn kline(open_time: u64, interval: KlineInterval) -> BinanceKline {
    let one = Fixed::from_i64(1);
    BinanceKline {
        open_time,
        open: one,
        high: one,
        low: one,
        close: one,
        volume: Fixed::from_i64(10),
        close_time: open_time + interval.duration_ms() - 1,
        quote_asset_volume: Fixed::from_i64(10),
        number_of_trades: 1,
        taker_buy_base_asset_volume: Fixed::from_i64(5),
        taker_buy_quote_asset_volume: Fixed::from_i64(5),
    }
}
