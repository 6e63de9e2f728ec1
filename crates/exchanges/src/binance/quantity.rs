//! Filter-aware order sizing
//!
//! Turns a desired trade size into one the exchange is likely to accept:
//! clamp to the notional range at the current price, round to the symbol's
//! precision, round again to the lot step, then clamp to the lot bounds.

use crate::binance::filters::SymbolFilters;
use crate::errors::{ExchangeError, Result};
use crate::traits::MarketDataSource;
use cryptobot_core::Fixed;

use tracing::info;

/// How the lot step is applied after precision rounding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LotRounding {
    /// Round half-to-even to `trunc(log10(1 / step))` decimal places
    #[default]
    DecimalPlaces,
    /// Floor to an exact multiple of the step
    StepMultiple,
}

/// Normalize a base-asset `quantity` against `filters` at `price`
pub fn normalize_quantity(
    quantity: Fixed,
    price: Fixed,
    filters: &SymbolFilters,
    rounding: LotRounding,
) -> Result<Fixed> {
    if !price.is_positive() {
        return Err(ExchangeError::InvalidResponse(format!(
            "{} price must be positive, got {}",
            filters.symbol, price
        )));
    }

    let min_qty = filters.notional.min.checked_div(price)?;
    let max_qty = filters.notional.max.checked_div(price)?;
    let clamped = quantity.clamp_between(min_qty, max_qty);

    let rounded = clamped.round_dp(filters.precision);
    let stepped = match rounding {
        LotRounding::DecimalPlaces => rounded.round_to_decimals(filters.step_decimals())?,
        LotRounding::StepMultiple => rounded.floor_to_step(filters.lot_size.step)?,
    };

    Ok(stepped
        .clamp_between(filters.lot_size.min, filters.lot_size.max)
        .normalize())
}

/// Fetch and extract the sizing rules for `pair`
pub async fn get_symbol_filters<S>(source: &S, pair: &str) -> Result<SymbolFilters>
where
    S: MarketDataSource + ?Sized,
{
    let info = match source.symbol_info(pair).await {
        Ok(Some(info)) => info,
        Ok(None) => return Err(ExchangeError::SymbolNotFound(pair.to_string())),
        Err(e) if e.is_invalid_symbol() => {
            return Err(ExchangeError::SymbolNotFound(pair.to_string()));
        }
        Err(e) => return Err(e),
    };
    SymbolFilters::from_symbol_info(&info)
}

/// Base quantity to buy for roughly `desired_value_quote` of quote currency
pub async fn get_valid_buy_quantity<S>(
    source: &S,
    pair: &str,
    desired_value_quote: Fixed,
) -> Result<Fixed>
where
    S: MarketDataSource + ?Sized,
{
    get_valid_buy_quantity_with(source, pair, desired_value_quote, LotRounding::default()).await
}

/// [`get_valid_buy_quantity`] with an explicit lot rounding mode
pub async fn get_valid_buy_quantity_with<S>(
    source: &S,
    pair: &str,
    desired_value_quote: Fixed,
    rounding: LotRounding,
) -> Result<Fixed>
where
    S: MarketDataSource + ?Sized,
{
    let filters = get_symbol_filters(source, pair).await?;
    let price = source.symbol_price(pair).await?;
    if !price.is_positive() {
        return Err(ExchangeError::InvalidResponse(format!(
            "{pair} price must be positive, got {price}"
        )));
    }

    let desired_qty = desired_value_quote.checked_div(price)?;
    let quantity = normalize_quantity(desired_qty, price, &filters, rounding)?;

    info!("🛒 {} buy requested value: {}", pair, desired_value_quote);
    info!("🛒 {} buy post-processed quantity: {}", pair, quantity);
    info!("🛒 {} buy approx quote value: {}", pair, quantity * price);
    Ok(quantity)
}

/// Base quantity to sell for a desired `desired_qty`
pub async fn get_valid_sell_quantity<S>(source: &S, pair: &str, desired_qty: Fixed) -> Result<Fixed>
where
    S: MarketDataSource + ?Sized,
{
    get_valid_sell_quantity_with(source, pair, desired_qty, LotRounding::default()).await
}

/// [`get_valid_sell_quantity`] with an explicit lot rounding mode
pub async fn get_valid_sell_quantity_with<S>(
    source: &S,
    pair: &str,
    desired_qty: Fixed,
    rounding: LotRounding,
) -> Result<Fixed>
where
    S: MarketDataSource + ?Sized,
{
    let filters = get_symbol_filters(source, pair).await?;
    let price = source.symbol_price(pair).await?;
    let quantity = normalize_quantity(desired_qty, price, &filters, rounding)?;

    info!("💰 {} sell requested quantity: {}", pair, desired_qty);
    info!("💰 {} sell post-processed quantity: {}", pair, quantity);
    info!("💰 {} sell approx quote value: {}", pair, quantity * price);
    Ok(quantity)
}
