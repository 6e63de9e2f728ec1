//! Binance wire models
//!
//! Binance encodes prices and quantities as strings; every such field is a
//! `Fixed`, which deserializes from strings and JSON numbers alike.

use crate::types::{OrderSide, OrderStatus};
use cryptobot_core::Fixed;
use serde::{Deserialize, Serialize};

/// Response of `/api/v3/exchangeInfo`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeInfo {
    pub timezone: String,
    pub server_time: u64,
    pub symbols: Vec<SymbolInfo>,
}

/// Trading rules for one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    pub base_asset: String,
    #[serde(default)]
    pub base_asset_precision: u32,
    pub quote_asset: String,
    pub quote_precision: u32,
    #[serde(default)]
    pub quote_asset_precision: u32,
    #[serde(default)]
    pub order_types: Vec<String>,
    pub filters: Vec<SymbolFilter>,
}

impl SymbolInfo {
    pub fn lot_size(&self) -> Option<&SymbolFilter> {
        self.filters.iter().find(|f| matches!(f, SymbolFilter::LotSize { .. }))
    }

    pub fn notional(&self) -> Option<&SymbolFilter> {
        self.filters.iter().find(|f| matches!(f, SymbolFilter::Notional { .. }))
    }
}

/// One entry of a symbol's `filters` array, tagged by `filterType`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "filterType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SymbolFilter {
    #[serde(rename_all = "camelCase")]
    PriceFilter {
        min_price: Fixed,
        max_price: Fixed,
        tick_size: Fixed,
    },
    #[serde(rename_all = "camelCase")]
    LotSize {
        min_qty: Fixed,
        max_qty: Fixed,
        step_size: Fixed,
    },
    #[serde(rename_all = "camelCase")]
    Notional {
        min_notional: Fixed,
        max_notional: Fixed,
        #[serde(default)]
        apply_min_to_market: bool,
        #[serde(default)]
        apply_max_to_market: bool,
    },
    #[serde(rename_all = "camelCase")]
    MinNotional {
        min_notional: Fixed,
        #[serde(default)]
        apply_to_market: bool,
    },
    /// Filters the client does not interpret
    #[serde(other)]
    Other,
}

/// Response of `/api/v3/account`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub maker_commission: u32,
    pub taker_commission: u32,
    pub buyer_commission: u32,
    pub seller_commission: u32,
    pub can_trade: bool,
    pub can_withdraw: bool,
    pub can_deposit: bool,
    pub update_time: u64,
    pub account_type: String,
    pub balances: Vec<Balance>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl AccountInfo {
    /// Balance of `asset`, if the account lists it
    pub fn balance(&self, asset: &str) -> Option<&Balance> {
        self.balances.iter().find(|b| b.asset.eq_ignore_ascii_case(asset))
    }

    /// Balances with a non-zero free or locked amount
    pub fn non_zero_balances(&self) -> impl Iterator<Item = &Balance> {
        self.balances.iter().filter(|b| !b.total().is_zero())
    }
}

/// Asset balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub free: Fixed,
    pub locked: Fixed,
}

impl Balance {
    pub fn total(&self) -> Fixed {
        self.free + self.locked
    }
}

/// Response of `/api/v3/ticker/price`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTicker {
    pub symbol: String,
    pub price: Fixed,
}

/// Candlestick as returned by `/api/v3/klines`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawKline", into = "RawKline")]
pub struct BinanceKline {
    pub open_time: u64,
    pub open: Fixed,
    pub high: Fixed,
    pub low: Fixed,
    pub close: Fixed,
    pub volume: Fixed,
    pub close_time: u64,
    pub quote_asset_volume: Fixed,
    pub number_of_trades: u64,
    pub taker_buy_base_asset_volume: Fixed,
    pub taker_buy_quote_asset_volume: Fixed,
}

/// Positional wire form: a 12-element JSON array, the last element unused
#[derive(Serialize, Deserialize)]
struct RawKline(
    u64,
    Fixed,
    Fixed,
    Fixed,
    Fixed,
    Fixed,
    u64,
    Fixed,
    u64,
    Fixed,
    Fixed,
    serde_json::Value,
);

impl From<RawKline> for BinanceKline {
    fn from(raw: RawKline) -> Self {
        Self {
            open_time: raw.0,
            open: raw.1,
            high: raw.2,
            low: raw.3,
            close: raw.4,
            volume: raw.5,
            close_time: raw.6,
            quote_asset_volume: raw.7,
            number_of_trades: raw.8,
            taker_buy_base_asset_volume: raw.9,
            taker_buy_quote_asset_volume: raw.10,
        }
    }
}

impl From<BinanceKline> for RawKline {
    fn from(k: BinanceKline) -> Self {
        RawKline(
            k.open_time,
            k.open,
            k.high,
            k.low,
            k.close,
            k.volume,
            k.close_time,
            k.quote_asset_volume,
            k.number_of_trades,
            k.taker_buy_base_asset_volume,
            k.taker_buy_quote_asset_volume,
            serde_json::Value::String("0".to_string()),
        )
    }
}

/// Fill of a market or immediately matched order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    pub price: Fixed,
    pub qty: Fixed,
    pub commission: Fixed,
    pub commission_asset: String,
    #[serde(default)]
    pub trade_id: u64,
}

/// Response of `POST /api/v3/order` (FULL response type)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderResponse {
    pub symbol: String,
    pub order_id: u64,
    #[serde(default)]
    pub order_list_id: i64,
    pub client_order_id: String,
    pub transact_time: u64,
    #[serde(default)]
    pub price: Fixed,
    #[serde(default)]
    pub orig_qty: Fixed,
    #[serde(default)]
    pub executed_qty: Fixed,
    #[serde(rename = "cummulativeQuoteQty", default)]
    pub cumulative_quote_qty: Fixed,
    pub status: OrderStatus,
    #[serde(default)]
    pub time_in_force: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub side: OrderSide,
    #[serde(default)]
    pub fills: Vec<Fill>,
}

impl NewOrderResponse {
    /// Volume-weighted fill price, if anything filled
    pub fn average_fill_price(&self) -> Option<Fixed> {
        if self.executed_qty.is_positive() {
            self.cumulative_quote_qty.checked_div(self.executed_qty).ok()
        } else {
            None
        }
    }
}

/// Response of `DELETE /api/v3/order`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderResponse {
    pub symbol: String,
    pub orig_client_order_id: String,
    pub order_id: u64,
    #[serde(default)]
    pub order_list_id: i64,
    pub client_order_id: String,
    #[serde(default)]
    pub transact_time: u64,
    pub price: Fixed,
    pub orig_qty: Fixed,
    pub executed_qty: Fixed,
    #[serde(rename = "cummulativeQuoteQty")]
    pub cumulative_quote_qty: Fixed,
    pub status: OrderStatus,
    pub time_in_force: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub side: OrderSide,
}

/// Response of `GET /api/v3/order`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOrderResponse {
    pub symbol: String,
    pub order_id: u64,
    #[serde(default)]
    pub order_list_id: i64,
    pub client_order_id: String,
    pub price: Fixed,
    pub orig_qty: Fixed,
    pub executed_qty: Fixed,
    #[serde(rename = "cummulativeQuoteQty")]
    pub cumulative_quote_qty: Fixed,
    pub status: OrderStatus,
    pub time_in_force: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub side: OrderSide,
    #[serde(default)]
    pub stop_price: Fixed,
    #[serde(default)]
    pub iceberg_qty: Fixed,
    pub time: u64,
    pub update_time: u64,
    pub is_working: bool,
    #[serde(default)]
    pub orig_quote_order_qty: Fixed,
}

/// Response of `/sapi/v1/capital/withdraw/apply`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawResponse {
    pub id: String,
}

/// Error body Binance returns with non-2xx statuses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinanceApiError {
    pub code: i64,
    pub msg: String,
}
