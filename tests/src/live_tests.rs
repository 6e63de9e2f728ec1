//! Checks against the real Binance API
//!
//! Ignored by default, run with `cargo test -p cryptobot-tests -- --ignored`.
//! Signed checks read `binance_api` / `binance_secret` (a `.env` file works)
//! and honor `binance_testnet=true`.

use cryptobot_core::fixed;
use cryptobot_exchanges::binance::{
    get_symbol_filters, get_valid_buy_quantity, BinanceConfig, BinanceRestClient,
};
use cryptobot_exchanges::errors::ExchangeError;
use cryptobot_exchanges::types::KlineInterval;
use rstest::*;
use tracing::info;

/// Public endpoints only
#[fixture]
fn public_client() -> BinanceRestClient {
    cryptobot_core::init_logging();
    BinanceRestClient::new(BinanceConfig::default()).expect("Failed to create REST client")
}

/// Credentials from the environment
#[fixture]
fn signed_client() -> BinanceRestClient {
    dotenv::dotenv().ok();
    cryptobot_core::init_logging();
    let config = BinanceConfig::from_env().expect("binance_api / binance_secret must be set");
    BinanceRestClient::new(config).expect("Failed to create REST client")
}

#[rstest]
#[monoio::test(enable_timer = true)]
#[ignore]
async fn test_ping_and_time(public_client: BinanceRestClient) {
    public_client.ping().await.unwrap();
    let server_time = public_client.server_time().await.unwrap();
    info!("Server time: {}", server_time);
    assert!(server_time > 1_600_000_000_000);
}

#[rstest]
#[case("BNBUSDT")]
#[case("BTCUSDT")]
#[monoio::test(enable_timer = true)]
#[ignore]
async fn test_live_filters(public_client: BinanceRestClient, #[case] symbol: &str) {
    let filters = get_symbol_filters(&public_client, symbol).await.unwrap();
    assert!(filters.lot_size.step.is_positive());
    assert!(filters.lot_size.min <= filters.lot_size.max);

    let qty = get_valid_buy_quantity(&public_client, symbol, fixed!(20)).await.unwrap();
    assert!(qty >= filters.lot_size.min && qty <= filters.lot_size.max);
}

#[rstest]
#[monoio::test(enable_timer = true)]
#[ignore]
async fn test_live_unknown_symbol(public_client: BinanceRestClient) {
    assert!(public_client.get_symbol_info("NOTAPAIR").await.unwrap().is_none());
    let err = get_symbol_filters(&public_client, "NOTAPAIR").await.unwrap_err();
    assert_eq!(err, ExchangeError::SymbolNotFound("NOTAPAIR".to_string()));
}

#[rstest]
#[monoio::test(enable_timer = true)]
#[ignore]
async fn test_live_history(public_client: BinanceRestClient) {
    let klines = public_client
        .get_historical_klines("ETHUSDT", KlineInterval::OneDay, "7 days ago UTC", None)
        .await
        .unwrap();
    assert!((7..=8).contains(&klines.len()));
}

#[rstest]
#[monoio::test(enable_timer = true)]
#[ignore]
async fn test_live_account(signed_client: BinanceRestClient) {
    let account = signed_client.get_account().await.unwrap();
    for balance in account.non_zero_balances() {
        info!("{}: free {} locked {}", balance.asset, balance.free, balance.locked);
    }
}
