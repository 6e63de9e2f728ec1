//! Kline pagination against a mocked market

use crate::mock::{kline, KlineRequest, MockMarket};
use chrono::{TimeZone, Utc};
use cryptobot_exchanges::binance::{historical_klines, parse_time_spec, KLINES_PAGE_LIMIT};
use cryptobot_exchanges::types::KlineInterval;
use rstest::*;

const T0: u64 = 1_700_000_000_000;

fn minute_candles(count: u64) -> Vec<cryptobot_exchanges::binance::BinanceKline> {
    let step = KlineInterval::OneMinute.duration_ms();
    (0..count)
        .map(|i| kline(T0 + i * step, KlineInterval::OneMinute))
        .collect()
}

fn market(count: u64) -> MockMarket {
    MockMarket::new().with_klines(minute_candles(count))
}

fn request_starts(requests: &[KlineRequest]) -> Vec<Option<u64>> {
    requests.iter().map(|r| r.start_time).collect()
}

#[rstest]
#[case(0, 0, 1)]
#[case(10, 10, 1)]
#[case(1000, 1000, 2)] // full page then an empty one
#[case(2500, 2500, 3)]
#[monoio::test]
async fn test_pages_until_short_page(
    #[case] available: u64,
    #[case] expected: usize,
    #[case] pages: usize,
) {
    let market = market(available);
    let klines = historical_klines(&market, "ETHUSDT", KlineInterval::OneMinute, T0, None)
        .await
        .unwrap();

    assert_eq!(klines.len(), expected);
    assert_eq!(market.kline_requests().len(), pages);
    assert!(market
        .kline_requests()
        .iter()
        .all(|r| r.limit == Some(KLINES_PAGE_LIMIT)));
}

#[monoio::test]
async fn test_never_requests_a_candle_twice() {
    let market = market(2500);
    let klines = historical_klines(&market, "ETHUSDT", KlineInterval::OneMinute, T0, None)
        .await
        .unwrap();

    assert!(klines.windows(2).all(|w| w[0].open_time < w[1].open_time));

    let step = KlineInterval::OneMinute.duration_ms();
    assert_eq!(
        request_starts(&market.kline_requests()),
        vec![Some(T0), Some(T0 + 1000 * step), Some(T0 + 2000 * step)]
    );
}

#[monoio::test]
async fn test_stops_at_end_time() {
    let market = market(5000);
    let step = KlineInterval::OneMinute.duration_ms();
    let end = T0 + 1499 * step;

    let klines = historical_klines(&market, "ETHUSDT", KlineInterval::OneMinute, T0, Some(end))
        .await
        .unwrap();

    assert_eq!(klines.len(), 1500);
    assert_eq!(klines.last().map(|k| k.open_time), Some(end));
    assert!(market.kline_requests().iter().all(|r| r.end_time == Some(end)));
}

#[monoio::test]
async fn test_start_after_end_fetches_nothing() {
    let market = market(10);
    let klines = historical_klines(&market, "ETHUSDT", KlineInterval::OneMinute, T0 + 1, Some(T0))
        .await
        .unwrap();

    assert!(klines.is_empty());
    assert!(market.kline_requests().is_empty());
}

#[monoio::test]
async fn test_relative_start() {
    let day = KlineInterval::OneDay;
    let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
    let first_open = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap().timestamp_millis() as u64;
    let candles = (0..10).map(|i| kline(first_open + i * day.duration_ms(), day)).collect();
    let market = MockMarket::new().with_klines(candles);

    let start = parse_time_spec("7 days ago UTC", now).unwrap();
    let klines = historical_klines(&market, "ETHUSDT", day, start, None).await.unwrap();

    // 3 March through 10 March
    assert_eq!(klines.len(), 8);
    assert_eq!(klines[0].open_time, start);
}
