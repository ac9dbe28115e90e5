//! WebAssembly module for the Inventaris platform
//!
//! Provides client-side checks that mirror the server rules:
//! - Profit-split preview for destination sales
//! - Outbound quantity and transaction-date validation before submit
//! - On-hand projection over a ledger page

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use wasm_bindgen::prelude::*;

use shared::ledger::{self, StockMovement};
use shared::profit::{self, ProfitSharePolicy};
use shared::transfer::ApprovalPolicy;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("inventaris-wasm loaded"));
}

fn js_error(message: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&message.to_string())
}

fn parse_condition(condition: &str) -> Result<ItemCondition, JsValue> {
    serde_json::from_value(serde_json::Value::String(condition.to_string()))
        .map_err(|_| js_error(format!("Unknown condition: {}", condition)))
}

/// Split a unit price between the foundation and the destination.
///
/// `policy_json` overrides the default ratios for non-damaged goods, e.g.
/// `{"good_source_percent":100,"needs_repair_source_percent":80}`.
/// Returns the split as JSON.
#[wasm_bindgen]
pub fn calculate_profit_split(
    unit_price: &str,
    condition: &str,
    policy_json: Option<String>,
) -> Result<String, JsValue> {
    let price = Decimal::from_str(unit_price.trim())
        .map_err(|e| js_error(format!("Invalid price: {}", e)))?;
    let condition = parse_condition(condition)?;
    let policy = match policy_json {
        Some(json) => serde_json::from_str::<ProfitSharePolicy>(&json)
            .map_err(|e| js_error(format!("Invalid policy JSON: {}", e)))?,
        None => ProfitSharePolicy::default(),
    };

    let split = profit::split(&policy, price, condition).map_err(js_error)?;
    serde_json::to_string(&split).map_err(js_error)
}

/// Check an outbound or transfer quantity against on-hand stock
#[wasm_bindgen]
pub fn validate_outbound_quantity(on_hand: i64, quantity: i64) -> Result<(), JsValue> {
    check_outbound(on_hand, quantity).map_err(js_error)
}

fn check_outbound(on_hand: i64, quantity: i64) -> Result<(), String> {
    validate_quantity(quantity)?;
    if quantity > on_hand {
        return Err(format!(
            "Insufficient stock: available {}, requested {}",
            on_hand, quantity
        ));
    }
    Ok(())
}

/// Whether `date` (YYYY-MM-DD) is today or earlier in the business timezone
#[wasm_bindgen]
pub fn is_transaction_date_allowed(date: &str, utc_offset_minutes: i32) -> bool {
    let now = Utc
        .timestamp_millis_opt(js_sys::Date::now() as i64)
        .single()
        .unwrap_or_else(Utc::now);
    date_allowed_at(date, now, utc_offset_minutes)
}

fn date_allowed_at(date: &str, now: DateTime<Utc>, utc_offset_minutes: i32) -> bool {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| validate_transaction_date(d, business_today(now, utc_offset_minutes)).is_ok())
        .unwrap_or(false)
}

/// Project on-hand quantity from a JSON array of ledger rows
#[wasm_bindgen]
pub fn project_on_hand(movements_json: &str) -> Result<i64, JsValue> {
    let movements: Vec<StockMovement> = serde_json::from_str(movements_json)
        .map_err(|e| js_error(format!("Invalid ledger JSON: {}", e)))?;
    ledger::project_on_hand(&movements).map_err(js_error)
}

/// Status a new transfer to `destination` starts in under the default policy
#[wasm_bindgen]
pub fn transfer_initial_status(destination: &str) -> Result<String, JsValue> {
    let destination = Destination::from_str(destination).map_err(js_error)?;
    Ok(ApprovalPolicy::default()
        .initial_status(destination)
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profit_split_damaged() {
        let json = calculate_profit_split("10000", "rusak", None).unwrap();
        let split: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(split["source_percent"], 70);
        assert_eq!(split["destination_percent"], 30);
    }

    #[test]
    fn test_profit_split_policy_override() {
        let json = calculate_profit_split(
            "2000",
            "needs_repair",
            Some(r#"{"good_source_percent":100,"needs_repair_source_percent":50}"#.to_string()),
        )
        .unwrap();
        let split: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(split["destination_percent"], 50);
    }

    #[test]
    fn test_outbound_quantity() {
        assert!(validate_outbound_quantity(70, 70).is_ok());
        assert!(check_outbound(70, 1).is_ok());
    }

    #[test]
    fn test_outbound_quantity_over_stock() {
        assert_eq!(
            check_outbound(70, 71).unwrap_err(),
            "Insufficient stock: available 70, requested 71"
        );
        assert!(check_outbound(0, 1).is_err());
    }

    #[test]
    fn test_outbound_quantity_must_be_positive() {
        assert_eq!(check_outbound(70, 0).unwrap_err(), "Quantity must be greater than zero");
        assert!(check_outbound(70, -5).is_err());
    }

    #[test]
    fn test_date_allowed() {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 18, 30, 0).unwrap();
        // already July 1st in WIB
        assert!(date_allowed_at("2024-07-01", now, 420));
        assert!(!date_allowed_at("2024-07-01", now, 0));
        assert!(!date_allowed_at("not-a-date", now, 420));
    }

    #[test]
    fn test_project_on_hand() {
        let json = r#"[
            {"id":"00000000-0000-0000-0000-000000000001","transaction_type":"masuk","quantity":100,
             "before_qty":0,"after_qty":100,"transaction_date":"2024-01-01","seq":1},
            {"id":"00000000-0000-0000-0000-000000000002","transaction_type":"keluar","quantity":30,
             "before_qty":100,"after_qty":70,"transaction_date":"2024-01-02","seq":2}
        ]"#;
        assert_eq!(project_on_hand(json).unwrap(), 70);
    }

    #[test]
    fn test_transfer_initial_status() {
        assert_eq!(transfer_initial_status("koperasi").unwrap(), "pending");
        assert_eq!(transfer_initial_status("kitchen").unwrap(), "active");
    }
}
