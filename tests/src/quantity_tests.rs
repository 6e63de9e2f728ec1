//! Order sizing against a mocked market
//!
//! Parameterized cases with rstest, invariants with proptest.

use crate::mock::{lot_size, notional, symbol_info, MockMarket};
use cryptobot_core::{fixed, Fixed};
use cryptobot_exchanges::binance::{
    get_symbol_filters, get_valid_buy_quantity, get_valid_buy_quantity_with,
    get_valid_sell_quantity, normalize_quantity, LotRounding, LotSize, NotionalRange,
    SymbolFilters,
};
use cryptobot_exchanges::errors::ExchangeError;
use proptest::prelude::*;
use rstest::*;

// ============================================================================
// FIXTURES
// ============================================================================

/// BNBUSDT at 500 with a 10 USDT minimum notional
#[fixture]
fn bnb_market() -> MockMarket {
    MockMarket::new().with_symbol(
        symbol_info(
            "BNBUSDT",
            8,
            vec![
                lot_size(fixed!(0.001), fixed!(900000), fixed!(0.001)),
                notional(fixed!(10), fixed!(9000000)),
            ],
        ),
        fixed!(500),
    )
}

/// A symbol whose 0.05 lot step is coarser than its implied decimal places
#[fixture]
fn coarse_step_market() -> MockMarket {
    MockMarket::new().with_symbol(
        symbol_info(
            "XYZUSDT",
            8,
            vec![
                lot_size(fixed!(0.05), fixed!(1000), fixed!(0.05)),
                notional(fixed!(1), fixed!(100000)),
            ],
        ),
        fixed!(1),
    )
}

fn parse(s: &str) -> Fixed {
    Fixed::from_str_exact(s).unwrap()
}

// ============================================================================
// BUY / SELL HELPERS
// ============================================================================

#[cfg(test)]
mod sizing_helpers {
    use super::*;

    #[rstest]
    #[case("1", "0.02")] // 0.002 raw, clamped up to 10 / 500
    #[case("25", "0.05")]
    #[case("12.3456", "0.025")] // 0.0246912 at 3 places
    #[case("1000", "2")]
    #[monoio::test]
    async fn test_buy_quantity(bnb_market: MockMarket, #[case] quote: &str, #[case] expected: &str) {
        let qty = get_valid_buy_quantity(&bnb_market, "BNBUSDT", parse(quote))
            .await
            .unwrap();
        assert_eq!(qty, parse(expected));
    }

    #[rstest]
    #[case("0.001", "0.02")] // below 10 / 500
    #[case("0.1234", "0.123")]
    #[case("0.1235", "0.124")] // exact tie, rounds to even
    #[case("5000000", "18000")] // capped by maxNotional / price
    #[monoio::test]
    async fn test_sell_quantity(bnb_market: MockMarket, #[case] desired: &str, #[case] expected: &str) {
        let qty = get_valid_sell_quantity(&bnb_market, "BNBUSDT", parse(desired))
            .await
            .unwrap();
        assert_eq!(qty, parse(expected));
    }

    #[rstest]
    #[monoio::test]
    async fn test_same_inputs_same_output(bnb_market: MockMarket) {
        let first = get_valid_buy_quantity(&bnb_market, "BNBUSDT", fixed!(7.77)).await.unwrap();
        let second = get_valid_buy_quantity(&bnb_market, "BNBUSDT", fixed!(7.77)).await.unwrap();
        assert_eq!(first, second);
    }

    #[rstest]
    #[monoio::test]
    async fn test_rounding_modes(coarse_step_market: MockMarket) {
        let places = get_valid_buy_quantity_with(
            &coarse_step_market,
            "XYZUSDT",
            fixed!(1.37),
            LotRounding::DecimalPlaces,
        )
        .await
        .unwrap();
        let multiple = get_valid_buy_quantity_with(
            &coarse_step_market,
            "XYZUSDT",
            fixed!(1.37),
            LotRounding::StepMultiple,
        )
        .await
        .unwrap();

        assert_eq!(places, fixed!(1.4));
        assert_eq!(multiple, fixed!(1.35));
    }

    #[rstest]
    #[monoio::test]
    async fn test_unknown_symbol(bnb_market: MockMarket) {
        let err = get_valid_buy_quantity(&bnb_market, "NOPEUSDT", fixed!(1)).await.unwrap_err();
        assert_eq!(err, ExchangeError::SymbolNotFound("NOPEUSDT".to_string()));

        let rejecting = bnb_market.rejecting_unknown_symbols();
        let err = get_valid_sell_quantity(&rejecting, "NOPEUSDT", fixed!(1)).await.unwrap_err();
        assert_eq!(err, ExchangeError::SymbolNotFound("NOPEUSDT".to_string()));
    }

    #[monoio::test]
    async fn test_missing_notional_filter() {
        let market = MockMarket::new().with_symbol(
            symbol_info("OLDUSDT", 8, vec![lot_size(fixed!(0.1), fixed!(100), fixed!(0.1))]),
            fixed!(2),
        );
        let err = get_symbol_filters(&market, "OLDUSDT").await.unwrap_err();
        assert_eq!(
            err,
            ExchangeError::MissingFilter {
                symbol: "OLDUSDT".to_string(),
                filter: "NOTIONAL".to_string(),
            }
        );
    }

    #[monoio::test]
    async fn test_zero_price_rejected() {
        let market = MockMarket::new().with_symbol(
            symbol_info(
                "ZEROUSDT",
                8,
                vec![
                    lot_size(fixed!(0.1), fixed!(100), fixed!(0.1)),
                    notional(fixed!(1), fixed!(1000)),
                ],
            ),
            fixed!(0),
        );
        let err = get_valid_buy_quantity(&market, "ZEROUSDT", fixed!(5)).await.unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidResponse(_)));
    }
}

// ============================================================================
// PROPERTIES
// ============================================================================

/// `units * 10^-scale`
fn scaled(units: i64, scale: u32) -> Fixed {
    Fixed::from_i64(units)
        .checked_div(Fixed::from_i64(10i64.pow(scale)))
        .unwrap()
}

/// Filter sets whose lot bounds are multiples of a power-of-ten step and
/// whose precision covers the step's decimals
fn filters_strategy() -> impl Strategy<Value = SymbolFilters> {
    (
        0u32..=6,
        0u32..=2,
        1i64..100,
        0i64..10_000,
        0i64..100_000,
        1i64..100_000_000,
    )
        .prop_map(|(step_scale, extra_precision, min_steps, span_steps, min_cents, span_cents)| {
            SymbolFilters {
                symbol: "PROPUSDT".to_string(),
                precision: step_scale + extra_precision,
                lot_size: LotSize {
                    min: scaled(min_steps, step_scale),
                    max: scaled(min_steps + span_steps, step_scale),
                    step: scaled(1, step_scale),
                },
                notional: NotionalRange {
                    min: scaled(min_cents, 2),
                    max: scaled(min_cents + span_cents, 2),
                },
            }
        })
}

fn rounding_strategy() -> impl Strategy<Value = LotRounding> {
    prop_oneof![Just(LotRounding::DecimalPlaces), Just(LotRounding::StepMultiple)]
}

proptest! {
    #[test]
    fn prop_within_lot_bounds(
        filters in filters_strategy(),
        rounding in rounding_strategy(),
        price_cents in 1i64..10_000_000,
        quantity_micros in 0i64..10_000_000_000,
    ) {
        let qty = normalize_quantity(scaled(quantity_micros, 6), scaled(price_cents, 2), &filters, rounding).unwrap();
        prop_assert!(qty >= filters.lot_size.min);
        prop_assert!(qty <= filters.lot_size.max);
    }

    #[test]
    fn prop_idempotent(
        filters in filters_strategy(),
        rounding in rounding_strategy(),
        price_cents in 1i64..10_000_000,
        quantity_micros in 0i64..10_000_000_000,
    ) {
        let price = scaled(price_cents, 2);
        let once = normalize_quantity(scaled(quantity_micros, 6), price, &filters, rounding).unwrap();
        let twice = normalize_quantity(once, price, &filters, rounding).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_never_exceeds_precision(
        filters in filters_strategy(),
        price_cents in 1i64..10_000_000,
        quantity_micros in 0i64..10_000_000_000,
    ) {
        let qty = normalize_quantity(
            scaled(quantity_micros, 6),
            scaled(price_cents, 2),
            &filters,
            LotRounding::DecimalPlaces,
        )
        .unwrap();
        prop_assert!(qty.normalize().scale() <= filters.precision);
    }
}
