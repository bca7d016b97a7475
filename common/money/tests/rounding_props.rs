use bigdecimal::BigDecimal;
use common_money::{nearly_equal, round_half_up, round_with, Money, RoundingMode};
use proptest::prelude::*;
use std::str::FromStr;

proptest! {
    // Values exactly on a half-cent boundary move away from zero.
    #[test]
    fn half_up_midpoint_moves_away_from_zero(base_cents in -100_000i64..100_000) {
        let sign = if base_cents < 0 { "-" } else { "" };
        let abs = base_cents.abs();
        let val = BigDecimal::from_str(&format!("{sign}{}.{:02}5", abs / 100, abs % 100)).unwrap();
        let expected_cents = if base_cents < 0 { base_cents - 1 } else { base_cents + 1 };
        let expected = BigDecimal::from(expected_cents) / BigDecimal::from(100);
        prop_assert_eq!(round_half_up(&val, 2), expected);
    }

    // Bankers output is always either the half-up result or the truncated one.
    #[test]
    fn bankers_between_truncate_and_half_up(cents in 0i64..1_000_000, thousandth in 0i64..10) {
        let val = BigDecimal::from(cents * 10 + thousandth) / BigDecimal::from(1000);
        let bankers = round_with(RoundingMode::Bankers, &val, 2);
        let half_up = round_half_up(&val, 2);
        let truncated = round_with(RoundingMode::Truncate, &val, 2);
        prop_assert!(bankers == half_up || bankers == truncated, "input={val} bankers={bankers}");
    }

    // Truncation never exceeds half-up for non-negative amounts.
    #[test]
    fn truncate_monotonic_pos(v in 0i64..10_000_000) {
        let val = BigDecimal::from(v) / BigDecimal::from(1000);
        let truncated = round_with(RoundingMode::Truncate, &val, 2);
        prop_assert!(truncated <= round_half_up(&val, 2));
    }

    #[test]
    fn cents_roundtrip_is_exact(cents in -10_000_000i64..10_000_000) {
        let money = Money::from_cents(cents);
        prop_assert_eq!(Money::from_decimal(&money.to_decimal()), money);
        prop_assert!(nearly_equal(&money.to_decimal(), &money.to_decimal(), 0));
    }
}
