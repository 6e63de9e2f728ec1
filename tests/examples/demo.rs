//! Binance walkthrough
//!
//! Account queries, ticker and kline streams, historical candles, market and
//! limit orders, and a withdrawal. Reads `binance_api` / `binance_secret`
//! (set `binance_testnet=true` for the spot testnet). Every step talks to
//! the real exchange and any error aborts the run.
//!
//! ```text
//! cargo run -p cryptobot-tests --example demo
//! ```

use cryptobot_core::prelude::*;
use cryptobot_exchanges::binance::{
    get_valid_buy_quantity, get_valid_sell_quantity, BinanceConfig, BinanceRestClient,
    StreamMessage, ThreadedStreamManager, WithdrawRequest,
};
use cryptobot_exchanges::types::KlineInterval;

use monoio::time::sleep;
use std::time::Duration;
use tracing::info;

const STREAM_WINDOW: Duration = Duration::from_secs(4);
const WITHDRAW_ADDRESS: &str = "0x73c3F0A96094E31fC3168f915e4Deb9D8Ff5239F";

fn handle_socket_message(msg: StreamMessage) {
    println!("message type: {}", msg.event_type().unwrap_or("unknown"));
    match msg.market_event() {
        Ok(Some(event)) => println!("{event:?}"),
        _ => println!("{}", msg.payload),
    }
}

#[monoio::main(enable_timer = true)]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    // ========================
    // Setup
    // ========================
    let config = BinanceConfig::from_env()?;
    info!("🚀 Binance demo ({})", if config.testnet { "testnet" } else { "mainnet" });
    let client = BinanceRestClient::new(config.clone())?;

    // ========================
    // Account information
    // ========================
    let account = client.get_account().await?;
    println!(
        "account type {} can trade {} can withdraw {}",
        account.account_type, account.can_trade, account.can_withdraw
    );
    for balance in account.non_zero_balances() {
        println!("  {}: free {} locked {}", balance.asset, balance.free, balance.locked);
    }
    let btc_free = client
        .get_asset_balance("BTC")
        .await?
        .map(|b| b.free)
        .unwrap_or_default();
    println!("{btc_free}");

    // ========================
    // Current prices
    // ========================
    let mut twm = ThreadedStreamManager::new(config.clone());
    twm.start();

    println!("{}", client.get_symbol_ticker("BTCUSDT").await?.price);

    let btc_ticker = twm.start_symbol_ticker_socket(handle_socket_message, "BTCUSDT")?;
    sleep(STREAM_WINDOW).await;
    twm.stop_socket(&btc_ticker)?;

    // ========================
    // Historical prices
    // ========================
    let klines = client
        .get_historical_klines("ETHUSDT", KlineInterval::OneDay, "7 days ago UTC", None)
        .await?;
    for k in &klines {
        println!(
            "{} open {} high {} low {} close {} volume {}",
            Timestamp::from_millis(k.open_time),
            k.open,
            k.high,
            k.low,
            k.close,
            k.volume
        );
    }

    twm.start_kline_socket(handle_socket_message, "BNBBTC", KlineInterval::OneMinute)?;
    info!("Active streams: {:?}", twm.active_streams());
    sleep(STREAM_WINDOW).await;
    twm.stop();

    // ========================
    // Market orders
    // ========================
    let buy_quantity = get_valid_buy_quantity(&client, "BNBUSDT", Fixed::from_i64(1)).await?;
    let buy_order = client.order_market_buy("BNBUSDT", buy_quantity).await?;
    println!(
        "market buy {} {} avg price {}",
        buy_order.order_id,
        buy_order.status,
        buy_order.average_fill_price().unwrap_or_default()
    );

    let sell_quantity = get_valid_sell_quantity(&client, "BNBUSDT", buy_quantity).await?;
    let sell_order = client.order_market_sell("BNBUSDT", sell_quantity).await?;
    println!(
        "market sell {} {} avg price {}",
        sell_order.order_id,
        sell_order.status,
        sell_order.average_fill_price().unwrap_or_default()
    );

    // ========================
    // Limit orders
    // ========================
    let limits = [
        ("buy", Fixed::from_i64(500)),
        ("sell", Fixed::from_i64(800)),
    ];
    let quantity = Fixed::from_str_exact("0.1")?;
    for (side, price) in limits {
        let order = if side == "buy" {
            client.order_limit_buy("BNBUSDT", quantity, price).await?
        } else {
            client.order_limit_sell("BNBUSDT", quantity, price).await?
        };

        sleep(STREAM_WINDOW).await;

        let status = client.get_order(&order.symbol, order.order_id).await?;
        println!("Status of {side} order: {}", status.status);
        if !status.status.is_final() {
            client.cancel_order(&order.symbol, order.order_id).await?;
        }
    }

    // ========================
    // Transferring crypto
    // ========================
    let withdrawal = WithdrawRequest::new("BNB", WITHDRAW_ADDRESS, Fixed::from_str_exact("0.01")?)
        .with_network("BSC");
    let result = client.withdraw(&withdrawal).await?;
    println!("withdrawal id {}", result.id);

    Ok(())
}
