//! Transfer approval state machine
//!
//! ```text
//! Pending --approve--> Approved --activate--> Active
//!    \
//!     --reject--> Rejected
//! ```
//!
//! Destinations that need no approval skip straight to Active at creation.
//! Rejected and Active are terminal; editing and deleting are only allowed
//! while a transfer is still Pending.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::models::{Destination, ItemCondition, TransferStatus};

/// Operations that act on an existing transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferAction {
    Approve,
    Activate,
    Reject,
    Update,
    Delete,
}

impl TransferAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferAction::Approve => "approve",
            TransferAction::Activate => "activate",
            TransferAction::Reject => "reject",
            TransferAction::Update => "update",
            TransferAction::Delete => "delete",
        }
    }
}

/// Resulting status of `action` applied to a transfer in `from`
pub fn transition(from: TransferStatus, action: TransferAction) -> DomainResult<TransferStatus> {
    use TransferAction::*;
    use TransferStatus::*;

    match (from, action) {
        (Pending, Approve) => Ok(Approved),
        (Pending, Reject) => Ok(Rejected),
        (Pending, Update) | (Pending, Delete) => Ok(Pending),
        (Approved, Activate) => Ok(Active),
        _ => Err(DomainError::InvalidStateTransition {
            from,
            action: action.as_str(),
        }),
    }
}

/// Which destinations need an approval step before their stock is active
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPolicy {
    pub approval_required: Vec<Destination>,
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self {
            approval_required: vec![Destination::Cooperative],
        }
    }
}

impl ApprovalPolicy {
    pub fn requires_approval(&self, destination: Destination) -> bool {
        self.approval_required.contains(&destination)
    }

    pub fn initial_status(&self, destination: Destination) -> TransferStatus {
        if self.requires_approval(destination) {
            TransferStatus::Pending
        } else {
            TransferStatus::Active
        }
    }
}

/// Inputs checked before a transfer is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub quantity: i64,
    pub destination: Destination,
    pub condition: ItemCondition,
    pub unit_price: Decimal,
    /// Foundation's unit cost for the item
    pub source_cost: Decimal,
}

/// What creating a transfer will do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPlan {
    pub status: TransferStatus,
    /// Destination stock is established immediately for Active transfers
    pub creates_destination_stock: bool,
}

/// Validate a new transfer against the item's available stock
pub fn plan_create(
    policy: &ApprovalPolicy,
    request: &TransferRequest,
    available: i64,
) -> DomainResult<TransferPlan> {
    if request.quantity <= 0 {
        return Err(DomainError::validation(
            "quantity",
            "Quantity must be greater than zero",
        ));
    }
    if request.quantity > available {
        return Err(DomainError::InsufficientStock {
            available,
            requested: request.quantity,
        });
    }
    check_price(
        request.destination,
        request.condition,
        request.unit_price,
        request.source_cost,
    )?;

    let status = policy.initial_status(request.destination);
    Ok(TransferPlan {
        status,
        creates_destination_stock: status == TransferStatus::Active,
    })
}

/// Selling price rules: never negative, and good stock sold by the
/// cooperative may not go below the foundation's cost.
pub fn check_price(
    destination: Destination,
    condition: ItemCondition,
    unit_price: Decimal,
    source_cost: Decimal,
) -> DomainResult<()> {
    if unit_price < Decimal::ZERO {
        return Err(DomainError::validation(
            "unit_price",
            "Price cannot be negative",
        ));
    }
    if destination == Destination::Cooperative
        && condition == ItemCondition::Good
        && unit_price < source_cost
    {
        return Err(DomainError::validation(
            "unit_price",
            format!(
                "Selling price for good-condition stock must be at least the cost of {}",
                source_cost
            ),
        ));
    }
    Ok(())
}

/// Validate a rejection and return the trimmed reason
pub fn plan_reject(from: TransferStatus, reason: &str) -> DomainResult<String> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(DomainError::validation(
            "reason",
            "A rejection reason is required",
        ));
    }
    transition(from, TransferAction::Reject)?;
    Ok(reason.to_string())
}

/// Ledger adjustment needed when a pending transfer's quantity changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityAdjustment {
    Unchanged,
    /// Draw more stock from the item
    Outbound(i64),
    /// Return stock to the item
    Inbound(i64),
}

/// Plan a quantity edit of a pending transfer. `available` is the item's
/// current on-hand, which already excludes the transfer's existing quantity.
pub fn plan_quantity_change(
    from: TransferStatus,
    current: i64,
    requested: i64,
    available: i64,
) -> DomainResult<QuantityAdjustment> {
    transition(from, TransferAction::Update)?;
    if requested <= 0 {
        return Err(DomainError::validation(
            "quantity",
            "Quantity must be greater than zero",
        ));
    }

    let delta = requested - current;
    if delta > available {
        return Err(DomainError::InsufficientStock {
            available: available + current,
            requested,
        });
    }

    Ok(match delta {
        0 => QuantityAdjustment::Unchanged,
        d if d > 0 => QuantityAdjustment::Outbound(d),
        d => QuantityAdjustment::Inbound(-d),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn request(quantity: i64, destination: Destination) -> TransferRequest {
        TransferRequest {
            quantity,
            destination,
            condition: ItemCondition::Damaged,
            unit_price: Decimal::from(5000),
            source_cost: Decimal::from(8000),
        }
    }

    #[test]
    fn test_valid_transitions() {
        use TransferStatus::*;
        assert_eq!(transition(Pending, TransferAction::Approve).unwrap(), Approved);
        assert_eq!(transition(Pending, TransferAction::Reject).unwrap(), Rejected);
        assert_eq!(transition(Approved, TransferAction::Activate).unwrap(), Active);
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let actions = [
            TransferAction::Approve,
            TransferAction::Activate,
            TransferAction::Reject,
            TransferAction::Update,
            TransferAction::Delete,
        ];
        for status in [TransferStatus::Rejected, TransferStatus::Active] {
            assert!(status.is_terminal());
            for action in actions {
                assert!(matches!(
                    transition(status, action),
                    Err(DomainError::InvalidStateTransition { .. })
                ));
            }
        }
    }

    #[test]
    fn test_approved_cannot_be_rejected_or_edited() {
        for action in [TransferAction::Reject, TransferAction::Update, TransferAction::Delete] {
            let err = transition(TransferStatus::Approved, action).unwrap_err();
            assert_eq!(
                err,
                DomainError::InvalidStateTransition {
                    from: TransferStatus::Approved,
                    action: action.as_str(),
                }
            );
        }
    }

    #[test]
    fn test_pending_cannot_activate() {
        assert!(transition(TransferStatus::Pending, TransferAction::Activate).is_err());
    }

    #[test]
    fn test_default_policy_only_gates_cooperative() {
        let policy = ApprovalPolicy::default();
        assert_eq!(policy.initial_status(Destination::Cooperative), TransferStatus::Pending);
        assert_eq!(policy.initial_status(Destination::Kitchen), TransferStatus::Active);
        assert_eq!(policy.initial_status(Destination::Distribution), TransferStatus::Active);
    }

    #[test]
    fn test_plan_create_pending_for_cooperative() {
        let plan = plan_create(&ApprovalPolicy::default(), &request(20, Destination::Cooperative), 70).unwrap();
        assert_eq!(plan.status, TransferStatus::Pending);
        assert!(!plan.creates_destination_stock);
    }

    #[test]
    fn test_plan_create_active_for_kitchen() {
        let plan = plan_create(&ApprovalPolicy::default(), &request(5, Destination::Kitchen), 5).unwrap();
        assert_eq!(plan.status, TransferStatus::Active);
        assert!(plan.creates_destination_stock);
    }

    #[test]
    fn test_plan_create_insufficient_stock() {
        let err = plan_create(&ApprovalPolicy::default(), &request(71, Destination::Cooperative), 70).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                available: 70,
                requested: 71
            }
        );
    }

    #[test]
    fn test_good_stock_below_cost_rejected_for_cooperative() {
        let mut req = request(1, Destination::Cooperative);
        req.condition = ItemCondition::Good;
        let result = plan_create(&ApprovalPolicy::default(), &req, 10);
        assert!(matches!(result, Err(DomainError::Validation { field: "unit_price", .. })));

        // same price is fine for the kitchen
        req.destination = Destination::Kitchen;
        assert!(plan_create(&ApprovalPolicy::default(), &req, 10).is_ok());
    }

    #[test]
    fn test_reject_requires_reason() {
        assert!(plan_reject(TransferStatus::Pending, "   ").is_err());
        assert_eq!(plan_reject(TransferStatus::Pending, " barang cacat ").unwrap(), "barang cacat");
        assert!(matches!(
            plan_reject(TransferStatus::Active, "late"),
            Err(DomainError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_quantity_change() {
        use QuantityAdjustment::*;
        assert_eq!(plan_quantity_change(TransferStatus::Pending, 20, 20, 0).unwrap(), Unchanged);
        assert_eq!(plan_quantity_change(TransferStatus::Pending, 20, 25, 50).unwrap(), Outbound(5));
        assert_eq!(plan_quantity_change(TransferStatus::Pending, 20, 5, 0).unwrap(), Inbound(15));
        assert!(matches!(
            plan_quantity_change(TransferStatus::Pending, 20, 31, 10),
            Err(DomainError::InsufficientStock { available: 30, requested: 31 })
        ));
        assert!(plan_quantity_change(TransferStatus::Approved, 20, 10, 50).is_err());
    }

    proptest! {
        #[test]
        fn plan_never_exceeds_available(quantity in 1i64..1000, available in 0i64..1000) {
            let result = plan_create(&ApprovalPolicy::default(), &request(quantity, Destination::Kitchen), available);
            prop_assert_eq!(result.is_ok(), quantity <= available);
        }
    }
}
