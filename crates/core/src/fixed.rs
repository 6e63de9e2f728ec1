//! Fixed-point arithmetic implementation
//!
//! `Fixed` wraps a `rust_decimal::Decimal` so prices, quantities and
//! notional values read from the exchange keep their exact decimal form.
//! Binance encodes every number as a string; `Fixed` deserializes from
//! either strings or JSON numbers.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;

/// Fixed-point decimal type for exact financial calculations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fixed {
    value: Decimal,
}

impl Fixed {
    /// Zero value
    pub const ZERO: Fixed = Fixed {
        value: Decimal::ZERO,
    };

    /// One value
    pub const ONE: Fixed = Fixed {
        value: Decimal::ONE,
    };

    /// Create a new Fixed from a Decimal
    fn from_decimal(value: Decimal) -> Self {
        Fixed { value }
    }

    /// Create a Fixed from an integer
    pub fn from_i64(value: i64) -> Self {
        Fixed {
            value: Decimal::from(value),
        }
    }

    /// Create a Fixed from a string, accepting plain and scientific notation
    pub fn from_str_exact(s: &str) -> Result<Self, FixedError> {
        let trimmed = s.trim();
        Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map(Self::from_decimal)
            .map_err(|_| FixedError::InvalidValue)
    }

    /// Number of digits after the decimal point in the current representation
    pub fn scale(&self) -> u32 {
        self.value.scale()
    }

    /// Strip trailing zeros (`0.02000000` -> `0.02`)
    pub fn normalize(&self) -> Self {
        Fixed {
            value: self.value.normalize(),
        }
    }

    /// Check if the value is zero
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Check if the value is strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.value > Decimal::ZERO
    }

    /// Round half-to-even to `dp` decimal places
    pub fn round_dp(&self, dp: u32) -> Self {
        Fixed {
            value: self
                .value
                .round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven),
        }
    }

    /// Round half-to-even to a possibly negative number of decimals.
    ///
    /// `-1` rounds to tens, `-2` to hundreds and so on.
    pub fn round_to_decimals(&self, decimals: i32) -> Result<Self, FixedError> {
        if decimals >= 0 {
            return Ok(self.round_dp(decimals as u32));
        }

        let factor = Decimal::from_i128_with_scale(10i128.pow(decimals.unsigned_abs()), 0);
        let scaled = self.value.checked_div(factor).ok_or(FixedError::Overflow)?;
        let rounded = scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
        rounded
            .checked_mul(factor)
            .map(Self::from_decimal)
            .ok_or(FixedError::Overflow)
    }

    /// Round down to the nearest multiple of `step`
    pub fn floor_to_step(&self, step: Fixed) -> Result<Self, FixedError> {
        if !step.is_positive() {
            return Err(FixedError::DivisionByZero);
        }
        let steps = self.checked_div(step)?.value.floor();
        steps
            .checked_mul(step.value)
            .map(Self::from_decimal)
            .ok_or(FixedError::Overflow)
    }

    /// Number of digits before the decimal point (`0` for values below one)
    pub fn integer_digits(&self) -> u32 {
        let mut n = self.value.trunc().abs();
        let mut digits = 0;
        while n >= Decimal::ONE {
            n = (n / Decimal::TEN).trunc();
            digits += 1;
        }
        digits
    }

    /// Division that reports a zero divisor instead of panicking
    pub fn checked_div(&self, rhs: Fixed) -> Result<Self, FixedError> {
        if rhs.is_zero() {
            return Err(FixedError::DivisionByZero);
        }
        self.value
            .checked_div(rhs.value)
            .map(Self::from_decimal)
            .ok_or(FixedError::Overflow)
    }

    /// Clamp into `[lower, upper]`, applying the lower bound first
    pub fn clamp_between(self, lower: Fixed, upper: Fixed) -> Self {
        self.max(lower).min(upper)
    }
}

/// Fixed-point arithmetic errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FixedError {
    #[error("Invalid value")]
    InvalidValue,
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Overflow in arithmetic operation")]
    Overflow,
}

impl Add for Fixed {
    type Output = Fixed;

    fn add(self, rhs: Self) -> Self::Output {
        Fixed {
            value: self.value + rhs.value,
        }
    }
}

impl Sub for Fixed {
    type Output = Fixed;

    fn sub(self, rhs: Self) -> Self::Output {
        Fixed {
            value: self.value - rhs.value,
        }
    }
}

impl Mul for Fixed {
    type Output = Fixed;

    fn mul(self, rhs: Self) -> Self::Output {
        Fixed {
            value: self.value * rhs.value,
        }
    }
}

impl Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.value, f)
    }
}

impl FromStr for Fixed {
    type Err = FixedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_exact(s)
    }
}

/// Convenience macro for creating Fixed values in tests and demos
#[macro_export]
macro_rules! fixed {
    ($value:expr) => {
        $crate::fixed::Fixed::from_str_exact(stringify!($value)).unwrap()
    };
}
