//! Binance REST API client using monoio
//!
//! Every call opens a fresh HTTPS connection through `MonoioHttpsClient`.
//! Public endpoints go out as plain GETs; SIGNED endpoints get `timestamp`,
//! `recvWindow` and `signature` appended by `BinanceSigner`.

use crate::binance::auth::{API_KEY_HEADER, BinanceCredentials, BinanceSigner};
use crate::binance::history::{historical_klines, parse_time_spec};
use crate::binance::types::*;
use crate::errors::{ExchangeError, Result};
use crate::http::{HttpResponse, MonoioHttpsClient};
use crate::traits::MarketDataSource;
use crate::types::{KlineInterval, OrderSide, OrderType, TimeInForce};
use cryptobot_core::prelude::*;
use cryptobot_core::log_order;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// Environment variable holding the API key
pub const ENV_API_KEY: &str = "binance_api";
/// Environment variable holding the API secret
pub const ENV_API_SECRET: &str = "binance_secret";
/// Optional environment variable switching to testnet endpoints
pub const ENV_TESTNET: &str = "binance_testnet";
/// Optional environment variable overriding `recvWindow` (milliseconds)
pub const ENV_RECV_WINDOW: &str = "binance_recv_window";

/// Prefix of generated `newClientOrderId` values
const CLIENT_ORDER_PREFIX: &str = "CBOT";

/// Binance exchange configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinanceConfig {
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
    pub ws_url: String,
    pub testnet: bool,
    pub recv_window_ms: u64,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            base_url: "https://api.binance.com".to_string(),
            ws_url: "wss://stream.binance.com:9443".to_string(),
            testnet: false,
            recv_window_ms: 5000,
        }
    }
}

impl BinanceConfig {
    pub fn testnet() -> Self {
        Self {
            base_url: "https://testnet.binance.vision".to_string(),
            ws_url: "wss://stream.testnet.binance.vision".to_string(),
            testnet: true,
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self.api_secret = api_secret.into();
        self
    }

    pub fn with_recv_window(mut self, recv_window_ms: u64) -> Self {
        self.recv_window_ms = recv_window_ms;
        self
    }

    /// Mainnet or testnet (per `binance_testnet`) with credentials from the environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let testnet = lookup(ENV_TESTNET)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let mut config = if testnet { Self::testnet() } else { Self::default() };

        if let Some(raw) = lookup(ENV_RECV_WINDOW) {
            let recv_window_ms = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| (1..=60_000).contains(ms))
                .ok_or_else(|| ExchangeError::InvalidConfig(format!("{ENV_RECV_WINDOW}={raw}")))?;
            config = config.with_recv_window(recv_window_ms);
        }

        let read = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ExchangeError::MissingCredentials(name.to_string()))
        };
        Ok(config.with_credentials(read(ENV_API_KEY)?, read(ENV_API_SECRET)?))
    }

    pub fn credentials(&self) -> BinanceCredentials {
        BinanceCredentials::new(self.api_key.clone(), self.api_secret.clone())
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials().is_valid()
    }
}

/// Parameters of `POST /api/v3/order`
#[derive(Debug, Clone, PartialEq)]
pub struct OrderParams {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Option<Fixed>,
    pub price: Option<Fixed>,
    pub time_in_force: Option<TimeInForce>,
}

impl OrderParams {
    pub fn market(symbol: impl Into<String>, side: OrderSide, quantity: Fixed) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity: Some(quantity),
            price: None,
            time_in_force: None,
        }
    }

    /// Good-till-cancelled limit order
    pub fn limit(symbol: impl Into<String>, side: OrderSide, quantity: Fixed, price: Fixed) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            quantity: Some(quantity),
            price: Some(price),
            time_in_force: Some(TimeInForce::GoodTillCanceled),
        }
    }

    /// Request parameters with a freshly generated client order id
    pub fn to_params(&self) -> Result<Vec<(&'static str, String)>> {
        let mut params = vec![
            ("symbol", self.symbol.to_uppercase()),
            ("side", self.side.as_str().to_string()),
            ("type", self.order_type.as_str().to_string()),
        ];

        let qty = self
            .quantity
            .ok_or_else(|| ExchangeError::InvalidOrder(format!("{} order needs a quantity", self.order_type)))?;
        if !qty.is_positive() {
            return Err(ExchangeError::InvalidOrder(format!("quantity must be positive, got {qty}")));
        }
        params.push(("quantity", qty.normalize().to_string()));

        if self.order_type == OrderType::Limit {
            let price = self
                .price
                .filter(|p| p.is_positive())
                .ok_or_else(|| ExchangeError::InvalidOrder("LIMIT order needs a positive price".to_string()))?;
            params.push(("price", price.normalize().to_string()));
            let tif = self.time_in_force.unwrap_or(TimeInForce::GoodTillCanceled);
            params.push(("timeInForce", tif.as_str().to_string()));
        }

        params.push(("newClientOrderId", generate_id_with_prefix(CLIENT_ORDER_PREFIX)));
        params.push(("newOrderRespType", "FULL".to_string()));

        Ok(params)
    }
}

/// Parameters of `POST /sapi/v1/capital/withdraw/apply`
#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawRequest {
    pub coin: String,
    pub address: String,
    pub amount: Fixed,
    pub network: Option<String>,
    pub address_tag: Option<String>,
    pub name: Option<String>,
}

impl WithdrawRequest {
    pub fn new(coin: impl Into<String>, address: impl Into<String>, amount: Fixed) -> Self {
        Self {
            coin: coin.into(),
            address: address.into(),
            amount,
            network: None,
            address_tag: None,
            name: None,
        }
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn to_params(&self) -> Result<Vec<(&'static str, String)>> {
        if !self.amount.is_positive() {
            return Err(ExchangeError::InvalidOrder(format!(
                "withdraw amount must be positive, got {}",
                self.amount
            )));
        }

        let mut params = vec![
            ("coin", self.coin.to_uppercase()),
            ("address", self.address.clone()),
            ("amount", self.amount.normalize().to_string()),
        ];
        if let Some(network) = &self.network {
            params.push(("network", network.clone()));
        }
        if let Some(tag) = &self.address_tag {
            params.push(("addressTag", tag.clone()));
        }
        if let Some(name) = &self.name {
            params.push(("name", name.clone()));
        }
        Ok(params)
    }
}

/// Map a raw response to its body, turning failures into typed errors
pub fn check_response(response: HttpResponse) -> Result<String> {
    if response.is_success() {
        return Ok(response.body);
    }

    match serde_json::from_str::<BinanceApiError>(&response.body) {
        Ok(api_error) => Err(ExchangeError::ApiError {
            code: api_error.code,
            msg: api_error.msg,
        }),
        Err(_) => Err(ExchangeError::HttpError(response.status, response.body)),
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        ExchangeError::SerializationError(format!("{e}: {preview}"))
    })
}

/// Binance spot REST client
pub struct BinanceRestClient {
    config: BinanceConfig,
    base_url: String,
    https_client: MonoioHttpsClient,
    signer: Option<BinanceSigner>,
}

impl BinanceRestClient {
    /// Create a client; signed endpoints are available only with credentials
    pub fn new(config: BinanceConfig) -> Result<Self> {
        let parsed = url::Url::parse(&config.base_url)?;
        let base_url = parsed.as_str().trim_end_matches('/').to_string();

        let signer = if config.has_credentials() {
            Some(BinanceSigner::new(config.credentials())?)
        } else {
            None
        };

        info!("🔗 Binance REST client created");
        info!("   Base URL: {}", base_url);
        info!("   Testnet: {}", config.testnet);
        info!("   Signed endpoints: {}", signer.is_some());

        Ok(Self {
            config,
            base_url,
            https_client: MonoioHttpsClient::new(),
            signer,
        })
    }

    pub fn config(&self) -> &BinanceConfig {
        &self.config
    }

    /// Test connectivity
    pub async fn ping(&self) -> Result<()> {
        let _: serde_json::Value = self.public_get("/api/v3/ping", &[]).await?;
        Ok(())
    }

    /// Exchange server time in milliseconds
    pub async fn server_time(&self) -> Result<u64> {
        let response: serde_json::Value = self.public_get("/api/v3/time", &[]).await?;
        response["serverTime"]
            .as_u64()
            .ok_or_else(|| ExchangeError::InvalidResponse("Missing serverTime".to_string()))
    }

    /// Trading rules for one symbol; `Ok(None)` when Binance does not know it
    pub async fn get_symbol_info(&self, symbol: &str) -> Result<Option<SymbolInfo>> {
        let symbol = symbol.to_uppercase();
        let params = [("symbol", symbol.clone())];

        match self.public_get::<ExchangeInfo>("/api/v3/exchangeInfo", &params).await {
            Ok(info) => Ok(info.symbols.into_iter().find(|s| s.symbol == symbol)),
            Err(e) if e.is_invalid_symbol() => {
                debug!("Symbol {} unknown to exchange", symbol);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Account information (SIGNED)
    pub async fn get_account(&self) -> Result<AccountInfo> {
        self.signed_request("GET", "/api/v3/account", &[]).await
    }

    /// Balance of one asset, `None` when the account does not list it
    pub async fn get_asset_balance(&self, asset: &str) -> Result<Option<Balance>> {
        let account = self.get_account().await?;
        Ok(account.balance(asset).cloned())
    }

    /// Latest price for a symbol
    pub async fn get_symbol_ticker(&self, symbol: &str) -> Result<PriceTicker> {
        self.public_get("/api/v3/ticker/price", &[("symbol", symbol.to_uppercase())])
            .await
    }

    /// One page of candles (at most `limit`, Binance caps it at 1000)
    pub async fn get_klines(
        &self,
        symbol: &str,
        interval: KlineInterval,
        start_time: Option<u64>,
        end_time: Option<u64>,
        limit: Option<u32>,
    ) -> Result<Vec<BinanceKline>> {
        let mut params = vec![
            ("symbol", symbol.to_uppercase()),
            ("interval", interval.as_str().to_string()),
        ];
        if let Some(start) = start_time {
            params.push(("startTime", start.to_string()));
        }
        if let Some(end) = end_time {
            params.push(("endTime", end.to_string()));
        }
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }

        self.public_get("/api/v3/klines", &params).await
    }

    /// All candles between two human-readable times, e.g. `"7 days ago UTC"`
    pub async fn get_historical_klines(
        &self,
        symbol: &str,
        interval: KlineInterval,
        start_str: &str,
        end_str: Option<&str>,
    ) -> Result<Vec<BinanceKline>> {
        let now = Utc::now();
        let start = parse_time_spec(start_str, now)?;
        let end = end_str.map(|s| parse_time_spec(s, now)).transpose()?;
        historical_klines(self, symbol, interval, start, end).await
    }

    /// Place an order (SIGNED)
    pub async fn create_order(&self, order: &OrderParams) -> Result<NewOrderResponse> {
        let params = order.to_params()?;
        let response: NewOrderResponse = self.signed_request("POST", "/api/v3/order", &params).await?;
        log_order!(
            format!("{} {} {}", response.side, response.order_type, response.status),
            response.order_id,
            response.symbol
        );
        Ok(response)
    }

    pub async fn order_market_buy(&self, symbol: &str, quantity: Fixed) -> Result<NewOrderResponse> {
        self.create_order(&OrderParams::market(symbol, OrderSide::Buy, quantity))
            .await
    }

    pub async fn order_market_sell(&self, symbol: &str, quantity: Fixed) -> Result<NewOrderResponse> {
        self.create_order(&OrderParams::market(symbol, OrderSide::Sell, quantity))
            .await
    }

    pub async fn order_limit_buy(&self, symbol: &str, quantity: Fixed, price: Fixed) -> Result<NewOrderResponse> {
        self.create_order(&OrderParams::limit(symbol, OrderSide::Buy, quantity, price))
            .await
    }

    pub async fn order_limit_sell(&self, symbol: &str, quantity: Fixed, price: Fixed) -> Result<NewOrderResponse> {
        self.create_order(&OrderParams::limit(symbol, OrderSide::Sell, quantity, price))
            .await
    }

    /// Query an order's current state (SIGNED)
    pub async fn get_order(&self, symbol: &str, order_id: u64) -> Result<QueryOrderResponse> {
        let params = [("symbol", symbol.to_uppercase()), ("orderId", order_id.to_string())];
        self.signed_request("GET", "/api/v3/order", &params).await
    }

    /// Cancel an open order (SIGNED)
    pub async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<CancelOrderResponse> {
        let params = [("symbol", symbol.to_uppercase()), ("orderId", order_id.to_string())];
        let response: CancelOrderResponse = self.signed_request("DELETE", "/api/v3/order", &params).await?;
        log_order!("CANCELED", response.order_id, response.symbol);
        Ok(response)
    }

    /// Submit a withdrawal (SIGNED, wallet endpoint)
    pub async fn withdraw(&self, request: &WithdrawRequest) -> Result<WithdrawResponse> {
        let params = request.to_params()?;
        let response: WithdrawResponse = self
            .signed_request("POST", "/sapi/v1/capital/withdraw/apply", &params)
            .await?;
        info!(
            "💸 Withdrawal {} submitted: {} {} to {}",
            response.id, request.amount, request.coin, request.address
        );
        Ok(response)
    }

    async fn public_get<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, String)]) -> Result<T> {
        let timer = PerfTimer::start(format!("binance_get_{endpoint}"));

        let query = crate::binance::auth::build_query_string(params);
        let url = if query.is_empty() {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}{}?{}", self.base_url, endpoint, query)
        };
        debug!("📡 GET {}", url);

        let response = self.https_client.get(&url).await?;
        let body = check_response(response)?;

        timer.log_elapsed();
        decode(&body)
    }

    async fn signed_request<T: DeserializeOwned>(
        &self,
        method: &str,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| ExchangeError::MissingCredentials(format!("{ENV_API_KEY}/{ENV_API_SECRET}")))?;

        let timer = PerfTimer::start(format!("binance_signed_{endpoint}"));

        let query = signer.signed_query(params, self.config.recv_window_ms)?;
        let url = format!("{}{}?{}", self.base_url, endpoint, query);
        debug!("📡 {} {}{} (signed)", method, self.base_url, endpoint);

        let headers = [(API_KEY_HEADER, signer.api_key())];
        let response = self
            .https_client
            .request_with_headers(method, &url, None, &headers)
            .await?;
        let body = check_response(response)?;

        timer.log_elapsed();
        decode(&body)
    }
}

#[async_trait(?Send)]
impl MarketDataSource for BinanceRestClient {
    async fn symbol_info(&self, symbol: &str) -> Result<Option<SymbolInfo>> {
        self.get_symbol_info(symbol).await
    }

    async fn symbol_price(&self, symbol: &str) -> Result<Fixed> {
        Ok(self.get_symbol_ticker(symbol).await?.price)
    }

    async fn klines(
        &self,
        symbol: &str,
        interval: KlineInterval,
        start_time: Option<u64>,
        end_time: Option<u64>,
        limit: Option<u32>,
    ) -> Result<Vec<BinanceKline>> {
        self.get_klines(symbol, interval, start_time, end_time, limit).await
    }
}
