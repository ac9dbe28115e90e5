//! Profit-sharing calculator for goods resold by a destination
//!
//! Damaged goods are split 70% to the foundation (source) and 30% to the
//! destination. The destination share is rounded down to whole Rupiah and
//! the source takes the remainder, so the two shares always add up to the
//! sale price exactly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::models::ItemCondition;
use crate::validation::line_total;

/// Source share for damaged goods, in percent
pub const DAMAGED_SOURCE_PERCENT: u8 = 70;

/// Source percentages for conditions whose ratio is not fixed.
/// `None` leaves the ratio undefined and the calculator refuses to guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitSharePolicy {
    pub good_source_percent: Option<u8>,
    pub needs_repair_source_percent: Option<u8>,
}

impl Default for ProfitSharePolicy {
    fn default() -> Self {
        Self {
            good_source_percent: Some(100),
            needs_repair_source_percent: None,
        }
    }
}

impl ProfitSharePolicy {
    /// Source percentage for a condition
    pub fn source_percent(&self, condition: ItemCondition) -> DomainResult<u8> {
        let percent = match condition {
            ItemCondition::Damaged => Some(DAMAGED_SOURCE_PERCENT),
            ItemCondition::Good => self.good_source_percent,
            ItemCondition::NeedsRepair => self.needs_repair_source_percent,
        }
        .ok_or(DomainError::UndefinedProfitShare(condition))?;

        if percent > 100 {
            return Err(DomainError::validation(
                "source_percent",
                format!("Profit share of {}% exceeds 100%", percent),
            ));
        }
        Ok(percent)
    }
}

/// Per-unit split of a sale price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitSplit {
    pub source_share: Decimal,
    pub destination_share: Decimal,
    pub source_percent: u8,
    pub destination_percent: u8,
}

impl ProfitSplit {
    /// Shares for `quantity` units, as `(source, destination)`
    pub fn for_quantity(&self, quantity: i64) -> DomainResult<(Decimal, Decimal)> {
        Ok((
            line_total(self.source_share, quantity)?,
            line_total(self.destination_share, quantity)?,
        ))
    }
}

/// Split `unit_price` between the foundation and the destination
pub fn split(
    policy: &ProfitSharePolicy,
    unit_price: Decimal,
    condition: ItemCondition,
) -> DomainResult<ProfitSplit> {
    if unit_price < Decimal::ZERO {
        return Err(DomainError::validation(
            "unit_price",
            "Price cannot be negative",
        ));
    }

    let source_percent = policy.source_percent(condition)?;
    let destination_percent = 100 - source_percent;

    let destination_share = unit_price
        .checked_mul(Decimal::from(destination_percent))
        .map(|scaled| (scaled / Decimal::ONE_HUNDRED).floor())
        .ok_or_else(|| DomainError::validation("unit_price", "Price is too large"))?;
    let source_share = unit_price - destination_share;

    Ok(ProfitSplit {
        source_share,
        destination_share,
        source_percent,
        destination_percent,
    })
}
