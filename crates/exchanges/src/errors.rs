//! Exchange-specific error types

use thiserror::Error;

/// Result type for exchange operations
pub type Result<T> = std::result::Result<T, ExchangeError>;

/// Binance error code for an unknown trading pair
pub const INVALID_SYMBOL_CODE: i64 = -1121;

/// Exchange operation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP error {0}: {1}")]
    HttpError(u16, String),

    /// Binance rejected the request with its own `{code, msg}` body
    #[error("Binance API error {code}: {msg}")]
    ApiError { code: i64, msg: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Signing error: {0}")]
    SigningError(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Symbol {symbol} has no {filter} filter")]
    MissingFilter { symbol: String, filter: String },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid time spec: {0}")]
    InvalidTimeSpec(String),

    #[error("Fixed point error: {0}")]
    FixedPointError(String),

    #[error("Client not initialized: {0}")]
    ClientNotInitialized(String),

    #[error("Stream not found: {0}")]
    StreamNotFound(String),
}

impl ExchangeError {
    /// True when Binance reported the symbol as unknown
    pub fn is_invalid_symbol(&self) -> bool {
        matches!(self, Self::ApiError { code, .. } if *code == INVALID_SYMBOL_CODE)
    }
}

impl From<cryptobot_core::fixed::FixedError> for ExchangeError {
    fn from(err: cryptobot_core::fixed::FixedError) -> Self {
        Self::FixedPointError(err.to_string())
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<url::ParseError> for ExchangeError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}
