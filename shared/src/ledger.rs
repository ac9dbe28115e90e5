//! Stock ledger projection
//!
//! On-hand quantity is never stored as an independent fact: it is the fold
//! of an item's ledger rows in `(transaction_date, seq)` order, where `seq`
//! is the insertion order assigned while the item row is locked.
//! Inbound adds its quantity, Outbound subtracts it and a Stocktake resets
//! the balance to the counted quantity. The backend uses [`replay`] after
//! every edit or delete to re-derive both the balance and the per-row
//! before/after snapshots.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::{StockTransaction, TransactionType};

/// The part of a ledger row that affects on-hand quantity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub transaction_type: TransactionType,
    pub quantity: Option<i64>,
    pub before_qty: Option<i64>,
    pub after_qty: Option<i64>,
    pub transaction_date: NaiveDate,
    /// Insertion order. Same-day rows replay in the order they were written.
    pub seq: i64,
}

impl From<&StockTransaction> for StockMovement {
    fn from(tx: &StockTransaction) -> Self {
        Self {
            id: tx.id,
            transaction_type: tx.transaction_type,
            quantity: tx.quantity,
            before_qty: tx.before_qty,
            after_qty: tx.after_qty,
            transaction_date: tx.transaction_date,
            seq: tx.seq,
        }
    }
}

impl StockMovement {
    /// Ordering key used for replay
    fn replay_key(&self) -> (NaiveDate, i64, Uuid) {
        (self.transaction_date, self.seq, self.id)
    }
}

/// Signed effect of a stored row: `+quantity`, `-quantity` or `after - before`
pub fn signed_effect(movement: &StockMovement) -> i64 {
    match movement.transaction_type {
        TransactionType::Inbound => movement.quantity.unwrap_or(0),
        TransactionType::Outbound => -movement.quantity.unwrap_or(0),
        TransactionType::Stocktake => {
            movement.after_qty.unwrap_or(0) - movement.before_qty.unwrap_or(0)
        }
    }
}

/// Apply one movement to an on-hand balance.
///
/// Fails when the movement is malformed or when an outbound would take the
/// balance below zero.
pub fn apply_movement(on_hand: i64, movement: &StockMovement) -> DomainResult<i64> {
    match movement.transaction_type {
        TransactionType::Inbound => {
            let quantity = positive_quantity(movement.quantity)?;
            on_hand
                .checked_add(quantity)
                .ok_or_else(|| DomainError::validation("quantity", "Quantity is too large"))
        }
        TransactionType::Outbound => {
            let quantity = positive_quantity(movement.quantity)?;
            if quantity > on_hand {
                return Err(DomainError::InsufficientStock {
                    available: on_hand,
                    requested: quantity,
                });
            }
            Ok(on_hand - quantity)
        }
        TransactionType::Stocktake => match movement.after_qty {
            Some(after) if after >= 0 => Ok(after),
            Some(_) => Err(DomainError::validation(
                "after_qty",
                "Counted quantity cannot be negative",
            )),
            None => Err(DomainError::validation(
                "after_qty",
                "Stocktake requires the counted quantity",
            )),
        },
    }
}

fn positive_quantity(quantity: Option<i64>) -> DomainResult<i64> {
    match quantity {
        Some(q) if q > 0 => Ok(q),
        _ => Err(DomainError::validation(
            "quantity",
            "Quantity must be greater than zero",
        )),
    }
}

/// Re-derived snapshots for one ledger row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayStep {
    pub id: Uuid,
    pub before_qty: i64,
    pub after_qty: i64,
}

/// Outcome of replaying an item's full ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    /// One step per row, in replay order
    pub steps: Vec<ReplayStep>,
    pub on_hand: i64,
}

impl Replay {
    /// Rows whose stored snapshots disagree with the replayed ones
    pub fn drifted<'a>(&'a self, stored: &'a [StockMovement]) -> impl Iterator<Item = &'a ReplayStep> {
        let by_id: HashMap<Uuid, &StockMovement> = stored.iter().map(|row| (row.id, row)).collect();
        self.steps.iter().filter(move |step| {
            by_id.get(&step.id).is_some_and(|row| {
                row.before_qty != Some(step.before_qty) || row.after_qty != Some(step.after_qty)
            })
        })
    }
}

/// Replay movements from an empty balance in ledger order.
///
/// Fails on the first movement that would drive the balance negative, so a
/// successful replay proves the history is consistent.
pub fn replay(movements: &[StockMovement]) -> DomainResult<Replay> {
    let mut ordered: Vec<&StockMovement> = movements.iter().collect();
    ordered.sort_by_key(|m| m.replay_key());

    let mut on_hand = 0i64;
    let mut steps = Vec::with_capacity(ordered.len());
    for movement in ordered {
        let before = on_hand;
        on_hand = apply_movement(on_hand, movement)?;
        steps.push(ReplayStep {
            id: movement.id,
            before_qty: before,
            after_qty: on_hand,
        });
    }

    Ok(Replay { steps, on_hand })
}

/// Final on-hand balance of a ledger
pub fn project_on_hand(movements: &[StockMovement]) -> DomainResult<i64> {
    replay(movements).map(|r| r.on_hand)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn movement(kind: TransactionType, quantity: i64, date: NaiveDate, seq: i64) -> StockMovement {
        StockMovement {
            id: Uuid::new_v4(),
            transaction_type: kind,
            quantity: Some(quantity),
            before_qty: None,
            after_qty: None,
            transaction_date: date,
            seq,
        }
    }

    fn stocktake(before: i64, after: i64, date: NaiveDate, seq: i64) -> StockMovement {
        StockMovement {
            id: Uuid::new_v4(),
            transaction_type: TransactionType::Stocktake,
            quantity: None,
            before_qty: Some(before),
            after_qty: Some(after),
            transaction_date: date,
            seq,
        }
    }

    #[test]
    fn test_signed_effect() {
        assert_eq!(signed_effect(&movement(TransactionType::Inbound, 5, day(1), 0)), 5);
        assert_eq!(signed_effect(&movement(TransactionType::Outbound, 5, day(1), 0)), -5);
        assert_eq!(signed_effect(&stocktake(12, 9, day(1), 0)), -3);
    }

    #[test]
    fn test_outbound_beyond_stock_fails() {
        let err = apply_movement(3, &movement(TransactionType::Outbound, 4, day(1), 0)).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                available: 3,
                requested: 4
            }
        );
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let result = apply_movement(3, &movement(TransactionType::Inbound, 0, day(1), 0));
        assert!(matches!(result, Err(DomainError::Validation { field: "quantity", .. })));
    }

    #[test]
    fn test_stocktake_is_absolute_reset() {
        let rows = vec![
            movement(TransactionType::Inbound, 100, day(1), 0),
            movement(TransactionType::Outbound, 30, day(2), 1),
            stocktake(70, 64, day(3), 2),
        ];
        assert_eq!(project_on_hand(&rows).unwrap(), 64);
    }

    #[test]
    fn test_stocktake_uses_replayed_before() {
        // stored before_qty is stale; the replay snapshot is authoritative
        let rows = vec![
            movement(TransactionType::Inbound, 10, day(1), 0),
            stocktake(999, 8, day(2), 1),
        ];
        let replayed = replay(&rows).unwrap();
        assert_eq!(replayed.steps[1].before_qty, 10);
        assert_eq!(replayed.steps[1].after_qty, 8);
        assert_eq!(replayed.drifted(&rows).count(), 2);
    }

    #[test]
    fn test_same_day_rows_replay_in_insertion_order() {
        // the inbound was written first even though its random id sorts last
        let mut inbound = movement(TransactionType::Inbound, 5, day(1), 1);
        let mut outbound = movement(TransactionType::Outbound, 5, day(1), 2);
        inbound.id = Uuid::from_u128(u128::MAX);
        outbound.id = Uuid::from_u128(1);

        let replayed = replay(&[outbound.clone(), inbound.clone()]).unwrap();
        assert_eq!(replayed.steps[0].id, inbound.id);
        assert_eq!(replayed.on_hand, 0);
    }

    #[test]
    fn test_drift_ignores_rows_not_in_replay() {
        let mut rows = vec![movement(TransactionType::Inbound, 4, day(1), 1)];
        rows[0].before_qty = Some(0);
        rows[0].after_qty = Some(4);
        let replayed = replay(&rows).unwrap();

        let unrelated = movement(TransactionType::Inbound, 9, day(1), 2);
        rows.push(unrelated);
        assert_eq!(replayed.drifted(&rows).count(), 0);
    }

    #[test]
    fn test_replay_orders_by_date_then_seq() {
        // recorded out of order: the outbound is back-dated after the inbound
        let inbound = movement(TransactionType::Inbound, 10, day(1), 5);
        let outbound = movement(TransactionType::Outbound, 4, day(2), 1);
        let replayed = replay(&[outbound.clone(), inbound.clone()]).unwrap();

        assert_eq!(replayed.steps[0].id, inbound.id);
        assert_eq!(replayed.steps[1].id, outbound.id);
        assert_eq!(replayed.on_hand, 6);
    }

    #[test]
    fn test_replay_fails_when_history_goes_negative() {
        let rows = vec![
            movement(TransactionType::Inbound, 5, day(2), 0),
            movement(TransactionType::Outbound, 3, day(1), 1),
        ];
        assert!(matches!(
            replay(&rows),
            Err(DomainError::InsufficientStock { available: 0, requested: 3 })
        ));
    }

    #[test]
    fn test_empty_ledger_projects_zero() {
        assert_eq!(project_on_hand(&[]).unwrap(), 0);
    }

    fn movement_strategy() -> impl Strategy<Value = (u8, i64)> {
        (0u8..3, 1i64..500)
    }

    proptest! {
        #[test]
        fn replayed_snapshots_conserve_stock(ops in prop::collection::vec(movement_strategy(), 0..40)) {
            let mut rows = Vec::new();
            let mut running = 0i64;
            for (i, (kind, qty)) in ops.into_iter().enumerate() {
                let seq = i as i64;
                let row = match kind {
                    0 => movement(TransactionType::Inbound, qty, day(1), seq),
                    1 if qty <= running => movement(TransactionType::Outbound, qty, day(1), seq),
                    1 => continue,
                    _ => stocktake(running, qty, day(1), seq),
                };
                running = apply_movement(running, &row).unwrap();
                rows.push(row);
            }

            let replayed = replay(&rows).unwrap();
            let total: i64 = replayed
                .steps
                .iter()
                .map(|s| s.after_qty - s.before_qty)
                .sum();
            prop_assert_eq!(total, replayed.on_hand);
            prop_assert_eq!(replayed.on_hand, running);
            prop_assert!(replayed.steps.iter().all(|s| s.after_qty >= 0));
        }

        #[test]
        fn replay_is_idempotent(quantities in prop::collection::vec(1i64..100, 1..20)) {
            let rows: Vec<_> = quantities
                .iter()
                .enumerate()
                .map(|(i, q)| movement(TransactionType::Inbound, *q, day(1), i as i64))
                .collect();
            let first = replay(&rows).unwrap();
            let second = replay(&rows).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
