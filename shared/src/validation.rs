//! Validation utilities for the Inventaris platform
//!
//! Dates are checked against the business-local calendar day (WIB, UTC+7, by
//! default), not the server's UTC date.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::error::{DomainError, DomainResult};

// ============================================================================
// Calendar
// ============================================================================

/// Business-local date for `now` at the given UTC offset
pub fn business_today(now: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDate {
    (now + Duration::minutes(i64::from(utc_offset_minutes))).date_naive()
}

/// Transactions may be back-dated but never dated in the future
pub fn validate_transaction_date(date: NaiveDate, today: NaiveDate) -> Result<(), &'static str> {
    if date > today {
        return Err("Transaction date cannot be in the future");
    }
    Ok(())
}

// ============================================================================
// Stock Validations
// ============================================================================

/// Inbound, outbound and transfer quantities must be positive
pub fn validate_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Stocktake counts must be non-negative
pub fn validate_stocktake_counts(before: Option<i64>, after: i64) -> Result<(), &'static str> {
    if before.is_some_and(|b| b < 0) {
        return Err("Quantity before stocktake cannot be negative");
    }
    if after < 0 {
        return Err("Counted quantity cannot be negative");
    }
    Ok(())
}

/// Prices and costs are non-negative Rupiah amounts
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    Ok(())
}

/// `unit_price × quantity`, refusing amounts too large to represent
pub fn line_total(unit_price: Decimal, quantity: i64) -> DomainResult<Decimal> {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(|| DomainError::validation("quantity", "Total amount is too large"))
}

// ============================================================================
// Item Catalogue Validations
// ============================================================================

/// Item names are required and at most 200 characters
pub fn validate_item_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Item name is required");
    }
    if trimmed.chars().count() > 200 {
        return Err("Item name must be at most 200 characters");
    }
    Ok(())
}

/// Items flagged as expiring need an expiry date
pub fn validate_expiry(has_expiry: bool, expiry_date: Option<NaiveDate>) -> Result<(), &'static str> {
    if has_expiry && expiry_date.is_none() {
        return Err("Expiry date is required for items that expire");
    }
    Ok(())
}
