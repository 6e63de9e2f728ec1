//! Binance request signing
//!
//! SIGNED endpoints take `timestamp` and `recvWindow` in the query string,
//! followed by `signature`, the hex HMAC-SHA256 of everything before it keyed
//! with the API secret. The API key travels in the `X-MBX-APIKEY` header.

use crate::errors::{ExchangeError, Result};
use cryptobot_core::timestamp_ms;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// Binance API credentials
#[derive(Clone)]
pub struct BinanceCredentials {
    pub api_key: String,
    pub secret_key: String,
}

impl BinanceCredentials {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Both halves are present
    pub fn is_valid(&self) -> bool {
        !self.api_key.is_empty() && !self.secret_key.is_empty()
    }
}

// Keep secrets out of logs
impl fmt::Debug for BinanceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinanceCredentials")
            .field("api_key", &mask(&self.api_key))
            .field("secret_key", &"***")
            .finish()
    }
}

fn mask(key: &str) -> String {
    if key.chars().count() <= 8 {
        "***".to_string()
    } else {
        format!("{}***", key.chars().take(4).collect::<String>())
    }
}

/// HMAC-SHA256 request signer
#[derive(Debug, Clone)]
pub struct BinanceSigner {
    credentials: BinanceCredentials,
}

impl BinanceSigner {
    pub fn new(credentials: BinanceCredentials) -> Result<Self> {
        if !credentials.is_valid() {
            return Err(ExchangeError::MissingCredentials(
                "api key and secret are required for signed endpoints".to_string(),
            ));
        }
        Ok(Self { credentials })
    }

    pub fn api_key(&self) -> &str {
        &self.credentials.api_key
    }

    /// Hex HMAC-SHA256 of `payload`
    pub fn sign(&self, payload: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.credentials.secret_key.as_bytes())
            .map_err(|e| ExchangeError::SigningError(format!("HMAC setup failed: {e}")))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Signed query string using the current clock
    pub fn signed_query(&self, params: &[(&str, String)], recv_window_ms: u64) -> Result<String> {
        self.signed_query_at(params, recv_window_ms, timestamp_ms())
    }

    /// Signed query string for an explicit timestamp
    pub fn signed_query_at(
        &self,
        params: &[(&str, String)],
        recv_window_ms: u64,
        timestamp: u64,
    ) -> Result<String> {
        let mut query = build_query_string(params);
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&format!("recvWindow={recv_window_ms}&timestamp={timestamp}"));

        let signature = self.sign(&query)?;
        query.push_str("&signature=");
        query.push_str(&signature);
        Ok(query)
    }
}

/// URL-encoded query string, keys sorted for a stable signature
pub fn build_query_string(params: &[(&str, String)]) -> String {
    let mut pairs: Vec<_> = params.iter().collect();
    pairs.sort_by_key(|(k, _)| *k);

    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
