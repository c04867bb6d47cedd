//! Property-based tests for pricing and stock arithmetic.

use proptest::prelude::*;
use rust_decimal::Decimal;
use shopcart_api::{
    repositories::normalize_code,
    services::{checkout::final_total, inventory::remaining_after, vouchers::discount_for},
};

/// Amounts with two decimal places, up to 1,000,000.00
fn money_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn percentage_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000).prop_map(|hundredths| Decimal::new(hundredths, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn discount_never_exceeds_cap(
        subtotal in money_strategy(),
        percentage in percentage_strategy(),
        max in money_strategy(),
    ) {
        let discount = discount_for(subtotal, percentage, max);
        prop_assert!(discount <= max);
        prop_assert!(discount >= Decimal::ZERO);
    }

    #[test]
    fn discount_never_exceeds_subtotal(
        subtotal in money_strategy(),
        percentage in percentage_strategy(),
        max in money_strategy(),
    ) {
        prop_assert!(discount_for(subtotal, percentage, max) <= subtotal);
    }

    #[test]
    fn discount_is_exact_percentage_capped_at_max(
        subtotal in money_strategy(),
        percentage in percentage_strategy(),
        max in money_strategy(),
    ) {
        let expected = (subtotal * percentage / Decimal::ONE_HUNDRED).min(max);
        prop_assert_eq!(discount_for(subtotal, percentage, max), expected);
    }

    #[test]
    fn total_is_subtotal_minus_discount_and_never_negative(
        subtotal in money_strategy(),
        discount in money_strategy(),
    ) {
        let total = final_total(subtotal, discount);
        prop_assert!(total >= Decimal::ZERO);
        if discount <= subtotal {
            prop_assert_eq!(total, subtotal - discount);
        } else {
            prop_assert_eq!(total, Decimal::ZERO);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn stock_never_goes_negative(available in 0i32..1_000_000, requested in 0i32..2_000_000) {
        match remaining_after(available, requested) {
            Some(remaining) => {
                prop_assert!(remaining >= 0);
                prop_assert_eq!(remaining + requested, available);
            }
            None => prop_assert!(requested > available),
        }
    }

    #[test]
    fn voucher_codes_normalize_idempotently(code in "[ a-zA-Z0-9]{0,16}") {
        let once = normalize_code(&code);
        prop_assert_eq!(normalize_code(&once), once.clone());
        prop_assert_eq!(once.trim(), once.as_str());
    }
}
