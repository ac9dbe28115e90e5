//! Stock ledger models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Destination;

/// Stock transaction types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "stock_transaction_type", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    #[serde(alias = "masuk", alias = "Masuk")]
    Inbound,
    #[serde(alias = "keluar", alias = "Keluar")]
    Outbound,
    #[serde(alias = "Stocktake")]
    Stocktake,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Inbound => "inbound",
            TransactionType::Outbound => "outbound",
            TransactionType::Stocktake => "stocktake",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable ledger entry for one stock movement.
///
/// `before_qty`/`after_qty` are the on-hand snapshots around the movement.
/// For stocktakes `after_qty` is the counted quantity and is authoritative;
/// for inbound/outbound rows `quantity` is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockTransaction {
    pub id: Uuid,
    /// Insertion order, assigned by the database
    pub seq: i64,
    pub item_id: Uuid,
    pub transaction_type: TransactionType,
    pub quantity: Option<i64>,
    pub before_qty: Option<i64>,
    pub after_qty: Option<i64>,
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
    /// Recipient for outbound rows, supplier/donor for inbound rows
    pub counterparty: Option<String>,
    /// Destination channel when the row was posted by a transfer
    pub channel: Option<Destination>,
    pub transfer_id: Option<Uuid>,
    pub transaction_date: NaiveDate,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl StockTransaction {
    /// Rows posted by the transfer workflow are owned by it
    pub fn is_transfer_managed(&self) -> bool {
        self.transfer_id.is_some()
    }
}
