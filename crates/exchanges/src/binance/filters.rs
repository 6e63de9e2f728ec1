//! Trading rules needed to size an order
//!
//! Binance publishes a symbol's rules as a list of tagged filters. Quantity
//! normalization only needs three of them: the quote precision, the
//! `LOT_SIZE` bounds and the `NOTIONAL` value range.

use crate::binance::types::{SymbolFilter, SymbolInfo};
use crate::errors::{ExchangeError, Result};
use cryptobot_core::Fixed;

/// `LOT_SIZE` bounds on the base quantity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LotSize {
    pub min: Fixed,
    pub max: Fixed,
    pub step: Fixed,
}

/// `NOTIONAL` bounds on price * quantity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NotionalRange {
    pub min: Fixed,
    pub max: Fixed,
}

/// Rules for one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolFilters {
    pub symbol: String,
    /// Decimal places quantities are first rounded to
    pub precision: u32,
    pub lot_size: LotSize,
    pub notional: NotionalRange,
}

impl SymbolFilters {
    /// Extract the sizing rules from a symbol's exchange info.
    ///
    /// Fails with `MissingFilter` when `LOT_SIZE` or `NOTIONAL` is absent and
    /// with `InvalidFilter` when the step is not positive or a range is
    /// inverted.
    pub fn from_symbol_info(info: &SymbolInfo) -> Result<Self> {
        let missing = |filter: &str| ExchangeError::MissingFilter {
            symbol: info.symbol.clone(),
            filter: filter.to_string(),
        };

        let lot_size = match info.lot_size() {
            Some(SymbolFilter::LotSize {
                min_qty,
                max_qty,
                step_size,
            }) => LotSize {
                min: *min_qty,
                max: *max_qty,
                step: *step_size,
            },
            _ => return Err(missing("LOT_SIZE")),
        };

        let notional = match info.notional() {
            Some(SymbolFilter::Notional {
                min_notional,
                max_notional,
                ..
            }) => NotionalRange {
                min: *min_notional,
                max: *max_notional,
            },
            _ => return Err(missing("NOTIONAL")),
        };

        if !lot_size.step.is_positive() {
            return Err(ExchangeError::InvalidFilter(format!(
                "{} LOT_SIZE stepSize must be positive, got {}",
                info.symbol, lot_size.step
            )));
        }
        if lot_size.min > lot_size.max {
            return Err(ExchangeError::InvalidFilter(format!(
                "{} LOT_SIZE minQty {} exceeds maxQty {}",
                info.symbol, lot_size.min, lot_size.max
            )));
        }
        if notional.min > notional.max {
            return Err(ExchangeError::InvalidFilter(format!(
                "{} NOTIONAL minNotional {} exceeds maxNotional {}",
                info.symbol, notional.min, notional.max
            )));
        }

        Ok(Self {
            symbol: info.symbol.clone(),
            precision: info.quote_precision,
            lot_size,
            notional,
        })
    }

    /// Decimal places implied by the lot step: `trunc(log10(1 / step))`.
    ///
    /// `0.001` gives 3, `1` gives 0, `10` gives -1. Counted from the integer
    /// digits of `1 / step` (or `step`), with no float round trip.
    pub fn step_decimals(&self) -> i32 {
        let step = self.lot_size.step;
        if step <= Fixed::ONE {
            match Fixed::ONE.checked_div(step) {
                Ok(inverse) => inverse.integer_digits() as i32 - 1,
                Err(_) => 0,
            }
        } else {
            -(step.integer_digits() as i32 - 1)
        }
    }
}
