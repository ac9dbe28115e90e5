//! Transfer workflow tests
//!
//! Tests for transfers from foundation stock to destinations including:
//! - Approval policy per destination
//! - Status transitions and terminal states
//! - Pricing rules and quantity edits of pending transfers

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::models::{Destination, ItemCondition, TransferStatus};
use shared::transfer::{
    check_price, plan_create, plan_quantity_change, plan_reject, transition, ApprovalPolicy,
    QuantityAdjustment, TransferAction, TransferRequest,
};
use shared::DomainError;
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn request(quantity: i64, destination: Destination, condition: ItemCondition) -> TransferRequest {
    TransferRequest {
        quantity,
        destination,
        condition,
        unit_price: dec("15000"),
        source_cost: dec("10000"),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_cooperative_transfer_starts_pending() {
        let plan = plan_create(
            &ApprovalPolicy::default(),
            &request(20, Destination::Cooperative, ItemCondition::Good),
            70,
        )
        .unwrap();
        assert_eq!(plan.status, TransferStatus::Pending);
        assert!(!plan.creates_destination_stock);
    }

    #[test]
    fn test_kitchen_and_distribution_start_active() {
        for destination in [Destination::Kitchen, Destination::Distribution] {
            let plan = plan_create(
                &ApprovalPolicy::default(),
                &request(5, destination, ItemCondition::Good),
                70,
            )
            .unwrap();
            assert_eq!(plan.status, TransferStatus::Active);
            assert!(plan.creates_destination_stock);
        }
    }

    #[test]
    fn test_configured_approval_policy() {
        let policy = ApprovalPolicy {
            approval_required: vec![Destination::Cooperative, Destination::Distribution],
        };
        assert_eq!(policy.initial_status(Destination::Distribution), TransferStatus::Pending);
        assert_eq!(policy.initial_status(Destination::Kitchen), TransferStatus::Active);

        let open = ApprovalPolicy {
            approval_required: vec![],
        };
        for destination in Destination::ALL {
            assert_eq!(open.initial_status(destination), TransferStatus::Active);
        }
    }

    #[test]
    fn test_transfer_exceeding_stock_rejected() {
        let result = plan_create(
            &ApprovalPolicy::default(),
            &request(71, Destination::Kitchen, ItemCondition::Good),
            70,
        );
        assert!(matches!(
            result,
            Err(DomainError::InsufficientStock {
                available: 70,
                requested: 71
            })
        ));
    }

    #[test]
    fn test_cooperative_good_price_floor() {
        // Selling below cost is refused for good stock at the cooperative
        assert!(check_price(
            Destination::Cooperative,
            ItemCondition::Good,
            dec("9999"),
            dec("10000")
        )
        .is_err());
        assert!(check_price(
            Destination::Cooperative,
            ItemCondition::Good,
            dec("10000"),
            dec("10000")
        )
        .is_ok());

        // Damaged stock and other destinations may go below cost
        assert!(check_price(
            Destination::Cooperative,
            ItemCondition::Damaged,
            dec("1000"),
            dec("10000")
        )
        .is_ok());
        assert!(check_price(
            Destination::Kitchen,
            ItemCondition::Good,
            Decimal::ZERO,
            dec("10000")
        )
        .is_ok());
    }

    #[test]
    fn test_approval_path() {
        let approved = transition(TransferStatus::Pending, TransferAction::Approve).unwrap();
        assert_eq!(approved, TransferStatus::Approved);
        let active = transition(approved, TransferAction::Activate).unwrap();
        assert_eq!(active, TransferStatus::Active);
    }

    #[test]
    fn test_terminal_states_refuse_changes() {
        for from in [TransferStatus::Rejected, TransferStatus::Active] {
            assert!(from.is_terminal());
            for action in [
                TransferAction::Approve,
                TransferAction::Activate,
                TransferAction::Reject,
                TransferAction::Update,
                TransferAction::Delete,
            ] {
                assert!(matches!(
                    transition(from, action),
                    Err(DomainError::InvalidStateTransition { .. })
                ));
            }
        }
    }

    #[test]
    fn test_approved_cannot_be_rejected() {
        assert!(plan_reject(TransferStatus::Approved, "barang cacat").is_err());
    }

    #[test]
    fn test_rejection_reason_required() {
        assert!(matches!(
            plan_reject(TransferStatus::Pending, "   "),
            Err(DomainError::Validation { field: "reason", .. })
        ));
        assert_eq!(
            plan_reject(TransferStatus::Pending, "  barang cacat ").unwrap(),
            "barang cacat"
        );
    }

    #[test]
    fn test_quantity_edit_adjustments() {
        // 50 left on hand with 20 already out on the transfer
        assert_eq!(
            plan_quantity_change(TransferStatus::Pending, 20, 20, 50).unwrap(),
            QuantityAdjustment::Unchanged
        );
        assert_eq!(
            plan_quantity_change(TransferStatus::Pending, 20, 35, 50).unwrap(),
            QuantityAdjustment::Outbound(15)
        );
        assert_eq!(
            plan_quantity_change(TransferStatus::Pending, 20, 5, 50).unwrap(),
            QuantityAdjustment::Inbound(15)
        );
        assert!(matches!(
            plan_quantity_change(TransferStatus::Pending, 20, 71, 50),
            Err(DomainError::InsufficientStock {
                available: 70,
                requested: 71
            })
        ));
    }

    #[test]
    fn test_quantity_edit_only_while_pending() {
        assert!(plan_quantity_change(TransferStatus::Approved, 20, 25, 50).is_err());
    }

    #[test]
    fn test_destination_labels() {
        assert_eq!(Destination::Cooperative.label(), "Koperasi");
        assert_eq!(Destination::Kitchen.label(), "Dapur");
        assert_eq!(Destination::Distribution.label(), "Distribusi Bantuan");
        assert_eq!(Destination::from_str("koperasi").unwrap(), Destination::Cooperative);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn destination_strategy() -> impl Strategy<Value = Destination> {
        prop_oneof![
            Just(Destination::Cooperative),
            Just(Destination::Kitchen),
            Just(Destination::Distribution),
        ]
    }

    proptest! {
        /// A transfer is accepted exactly when stock covers it
        #[test]
        fn prop_transfer_bounded_by_stock(
            quantity in 1i64..1000,
            available in 0i64..1000,
            destination in destination_strategy(),
        ) {
            let result = plan_create(
                &ApprovalPolicy::default(),
                &request(quantity, destination, ItemCondition::Damaged),
                available,
            );
            prop_assert_eq!(result.is_ok(), quantity <= available);
        }

        /// Editing a pending transfer never overdraws the item
        #[test]
        fn prop_quantity_edit_conserves_stock(
            current in 1i64..500,
            requested in 1i64..1000,
            available in 0i64..500,
        ) {
            match plan_quantity_change(TransferStatus::Pending, current, requested, available) {
                Ok(QuantityAdjustment::Unchanged) => prop_assert_eq!(current, requested),
                Ok(QuantityAdjustment::Outbound(d)) => {
                    prop_assert!(d <= available);
                    prop_assert_eq!(current + d, requested);
                }
                Ok(QuantityAdjustment::Inbound(d)) => prop_assert_eq!(current - d, requested),
                Err(_) => prop_assert!(requested - current > available),
            }
        }
    }
}
