//! Profit-sharing tests
//!
//! Tests for the split of resale prices between the foundation and a
//! destination, including rounding and per-condition ratios.

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::models::ItemCondition;
use shared::profit::{split, ProfitSharePolicy, DAMAGED_SOURCE_PERCENT};
use shared::DomainError;
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_damaged_ratio_is_fixed() {
        assert_eq!(DAMAGED_SOURCE_PERCENT, 70);

        // Policy settings do not affect damaged goods
        let policy = ProfitSharePolicy {
            good_source_percent: Some(50),
            needs_repair_source_percent: Some(50),
        };
        let s = split(&policy, dec("25000"), ItemCondition::Damaged).unwrap();
        assert_eq!(s.source_share, dec("17500"));
        assert_eq!(s.destination_share, dec("7500"));
    }

    #[test]
    fn test_good_defaults_to_full_source_share() {
        let s = split(&ProfitSharePolicy::default(), dec("12000"), ItemCondition::Good).unwrap();
        assert_eq!(s.source_share, dec("12000"));
        assert_eq!(s.destination_share, Decimal::ZERO);
        assert_eq!((s.source_percent, s.destination_percent), (100, 0));
    }

    #[test]
    fn test_needs_repair_undefined_by_default() {
        let result = split(
            &ProfitSharePolicy::default(),
            dec("12000"),
            ItemCondition::NeedsRepair,
        );
        assert!(matches!(
            result,
            Err(DomainError::UndefinedProfitShare(ItemCondition::NeedsRepair))
        ));
    }

    #[test]
    fn test_configured_needs_repair_ratio() {
        let policy = ProfitSharePolicy {
            needs_repair_source_percent: Some(85),
            ..ProfitSharePolicy::default()
        };
        let s = split(&policy, dec("10000"), ItemCondition::NeedsRepair).unwrap();
        assert_eq!(s.source_share, dec("8500"));
        assert_eq!(s.destination_share, dec("1500"));
    }

    #[test]
    fn test_destination_share_rounds_down() {
        // 30% of 3333 is 999.9
        let s = split(&ProfitSharePolicy::default(), dec("3333"), ItemCondition::Damaged).unwrap();
        assert_eq!(s.destination_share, dec("999"));
        assert_eq!(s.source_share, dec("2334"));
    }

    #[test]
    fn test_fractional_price() {
        // 30% of 1000.50 is 300.15
        let s = split(&ProfitSharePolicy::default(), dec("1000.50"), ItemCondition::Damaged).unwrap();
        assert_eq!(s.destination_share, dec("300"));
        assert_eq!(s.source_share, dec("700.50"));
    }

    #[test]
    fn test_totals_for_quantity() {
        let s = split(&ProfitSharePolicy::default(), dec("10000"), ItemCondition::Damaged).unwrap();
        let (source, destination) = s.for_quantity(4).unwrap();
        assert_eq!(source, dec("28000"));
        assert_eq!(destination, dec("12000"));
    }

    #[test]
    fn test_zero_price() {
        let s = split(&ProfitSharePolicy::default(), Decimal::ZERO, ItemCondition::Damaged).unwrap();
        assert_eq!(s.source_share, Decimal::ZERO);
        assert_eq!(s.destination_share, Decimal::ZERO);
    }

    #[test]
    fn test_negative_price_rejected() {
        let result = split(&ProfitSharePolicy::default(), dec("-1"), ItemCondition::Good);
        assert!(matches!(result, Err(DomainError::Validation { field: "unit_price", .. })));
    }

    #[test]
    fn test_out_of_range_percent_rejected() {
        let policy = ProfitSharePolicy {
            good_source_percent: Some(120),
            needs_repair_source_percent: None,
        };
        assert!(split(&policy, dec("100"), ItemCondition::Good).is_err());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn price_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..100_000_000).prop_map(Decimal::from)
    }

    fn condition_strategy() -> impl Strategy<Value = ItemCondition> {
        prop_oneof![Just(ItemCondition::Good), Just(ItemCondition::Damaged)]
    }

    proptest! {
        /// Shares always add up to the price
        #[test]
        fn prop_shares_sum_to_price(price in price_strategy(), condition in condition_strategy()) {
            let s = split(&ProfitSharePolicy::default(), price, condition).unwrap();
            prop_assert_eq!(s.source_share + s.destination_share, price);
        }

        /// Whole-Rupiah prices give whole-Rupiah destination shares
        #[test]
        fn prop_destination_share_whole(price in price_strategy()) {
            let s = split(&ProfitSharePolicy::default(), price, ItemCondition::Damaged).unwrap();
            prop_assert_eq!(s.destination_share, s.destination_share.floor());
            prop_assert!(s.destination_share <= price * dec("0.3"));
        }

        /// Any configured ratio keeps both shares non-negative
        #[test]
        fn prop_configured_ratio_bounded(price in price_strategy(), percent in 0u8..=100) {
            let policy = ProfitSharePolicy {
                good_source_percent: Some(percent),
                needs_repair_source_percent: Some(percent),
            };
            for condition in [ItemCondition::Good, ItemCondition::NeedsRepair] {
                let s = split(&policy, price, condition).unwrap();
                prop_assert!(s.source_share >= Decimal::ZERO);
                prop_assert!(s.destination_share >= Decimal::ZERO);
                prop_assert_eq!(s.source_percent + s.destination_percent, 100);
            }
        }

        /// Totals scale linearly with quantity
        #[test]
        fn prop_totals_scale(price in price_strategy(), qty in 1i64..1000) {
            let s = split(&ProfitSharePolicy::default(), price, ItemCondition::Damaged).unwrap();
            let (source, destination) = s.for_quantity(qty).unwrap();
            prop_assert_eq!(source + destination, price * Decimal::from(qty));
        }
    }
}
