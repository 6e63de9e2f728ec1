//! Historical candles
//!
//! `/api/v3/klines` returns at most 1000 candles per call. `historical_klines`
//! walks forward page by page until it reaches the end time or runs out of
//! data. `parse_time_spec` turns strings like `"7 days ago UTC"` into epoch
//! milliseconds.

use crate::binance::types::BinanceKline;
use crate::errors::{ExchangeError, Result};
use crate::traits::MarketDataSource;
use crate::types::KlineInterval;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

/// Largest page Binance serves
pub const KLINES_PAGE_LIMIT: u32 = 1000;

/// Fetch every candle from `start_ms` up to `end_ms` (or the latest one)
pub async fn historical_klines<S>(
    source: &S,
    symbol: &str,
    interval: KlineInterval,
    start_ms: u64,
    end_ms: Option<u64>,
) -> Result<Vec<BinanceKline>>
where
    S: MarketDataSource + ?Sized,
{
    let mut klines = Vec::new();
    let mut start = start_ms;
    let mut pages = 0u32;

    loop {
        if end_ms.is_some_and(|end| start > end) {
            break;
        }

        let page = source
            .klines(symbol, interval, Some(start), end_ms, Some(KLINES_PAGE_LIMIT))
            .await?;
        pages += 1;

        let Some(last) = page.last() else {
            break;
        };
        let next_start = last.close_time.saturating_add(1);
        let page_len = page.len();
        klines.extend(page);

        // A short page is the newest data available
        if page_len < KLINES_PAGE_LIMIT as usize || next_start <= start {
            break;
        }
        start = next_start;
    }

    debug!(
        "📈 {} {} candles for {} in {} page(s)",
        klines.len(),
        interval,
        symbol,
        pages
    );
    Ok(klines)
}

/// Parse a point in time into epoch milliseconds, relative to `now`.
///
/// Accepted forms: `now`, `N <second|minute|hour|day|week>[s] ago [UTC]`,
/// epoch milliseconds, `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, `1 Dec, 2017`
/// and RFC 3339. Dates without a zone are UTC.
pub fn parse_time_spec(spec: &str, now: DateTime<Utc>) -> Result<u64> {
    let invalid = || ExchangeError::InvalidTimeSpec(spec.to_string());

    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let lower = trimmed.to_ascii_lowercase();
    let body = lower.strip_suffix("utc").map(str::trim_end).unwrap_or(&lower);

    if body == "now" {
        return to_millis(now).ok_or_else(invalid);
    }

    if body.chars().all(|c| c.is_ascii_digit()) {
        return body.parse::<u64>().map_err(|_| invalid());
    }

    if let Some(relative) = body.strip_suffix("ago") {
        let mut parts = relative.split_whitespace();
        let (Some(count), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };
        let count: i64 = count.parse().map_err(|_| invalid())?;
        let span = match unit.trim_end_matches('s') {
            "second" | "sec" => Duration::try_seconds(count),
            "minute" | "min" => Duration::try_minutes(count),
            "hour" => Duration::try_hours(count),
            "day" => Duration::try_days(count),
            "week" => Duration::try_weeks(count),
            _ => None,
        }
        .ok_or_else(invalid)?;
        return now
            .checked_sub_signed(span)
            .and_then(to_millis)
            .ok_or_else(invalid);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return to_millis(dt.with_timezone(&Utc)).ok_or_else(invalid);
    }

    let naive_body = trimmed
        .get(..trimmed.len() - (lower.len() - body.len()))
        .unwrap_or(trimmed)
        .trim();

    if let Ok(dt) = NaiveDateTime::parse_from_str(naive_body, "%Y-%m-%d %H:%M:%S") {
        return to_millis(dt.and_utc()).ok_or_else(invalid);
    }

    for format in ["%Y-%m-%d", "%d %b, %Y", "%d %B, %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(naive_body, format) {
            let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
            return to_millis(midnight.and_utc()).ok_or_else(invalid);
        }
    }

    Err(invalid())
}

fn to_millis(dt: DateTime<Utc>) -> Option<u64> {
    u64::try_from(dt.timestamp_millis()).ok()
}
