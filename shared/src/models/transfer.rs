//! Transfer and destination-stock models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ItemCondition, OwnerType};
use crate::error::DomainResult;
use crate::validation::line_total;

/// Internal channels the foundation moves stock into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "transfer_destination", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    #[serde(alias = "koperasi")]
    Cooperative,
    #[serde(alias = "dapur")]
    Kitchen,
    #[serde(alias = "distribusi")]
    Distribution,
}

impl Destination {
    pub const ALL: [Destination; 3] = [
        Destination::Cooperative,
        Destination::Kitchen,
        Destination::Distribution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Cooperative => "cooperative",
            Destination::Kitchen => "kitchen",
            Destination::Distribution => "distribution",
        }
    }

    /// Human label written into the ledger counterparty column
    pub fn label(&self) -> &'static str {
        match self {
            Destination::Cooperative => "Koperasi",
            Destination::Kitchen => "Dapur",
            Destination::Distribution => "Distribusi Bantuan",
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Destination {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cooperative" | "koperasi" => Ok(Destination::Cooperative),
            "kitchen" | "dapur" => Ok(Destination::Kitchen),
            "distribution" | "distribusi" => Ok(Destination::Distribution),
            other => Err(format!("unknown destination: {}", other)),
        }
    }
}

/// Transfer lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "transfer_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Approved,
    Rejected,
    Active,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Approved => "approved",
            TransferStatus::Rejected => "rejected",
            TransferStatus::Active => "active",
        }
    }

    /// Rejected and Active accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Rejected | TransferStatus::Active)
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A movement of stock from the foundation to a destination channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Transfer {
    pub id: Uuid,
    pub item_id: Uuid,
    pub quantity: i64,
    /// Unit price the destination sells at
    pub unit_price: Decimal,
    pub destination: Destination,
    pub condition: ItemCondition,
    pub status: TransferStatus,
    /// Foundation's unit cost (HPP) snapshotted at transfer time
    pub source_cost: Decimal,
    /// `source_cost * quantity`, recorded when the transfer is approved
    pub liability_amount: Option<Decimal>,
    pub rejection_reason: Option<String>,
    pub notes: Option<String>,
    pub transfer_date: NaiveDate,
    pub created_by: Option<Uuid>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transfer {
    /// What the destination owes the foundation: `source_cost × quantity`
    pub fn liability(&self) -> DomainResult<Decimal> {
        line_total(self.source_cost, self.quantity)
    }
}

/// Stock held at a destination once a transfer is active.
/// The goods stay attributed to `owner_type` while the destination sells them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DestinationStock {
    pub id: Uuid,
    pub transfer_id: Uuid,
    pub item_id: Uuid,
    pub destination: Destination,
    pub owner_type: OwnerType,
    pub condition: ItemCondition,
    pub unit_price: Decimal,
    pub quantity_available: i64,
    pub quantity_used: i64,
    pub created_at: DateTime<Utc>,
}

impl DestinationStock {
    pub fn remaining(&self) -> i64 {
        self.quantity_available - self.quantity_used
    }
}

/// A resale out of destination stock with its profit split
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DestinationSale {
    pub id: Uuid,
    pub destination_stock_id: Uuid,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub source_share_per_unit: Decimal,
    pub destination_share_per_unit: Decimal,
    pub source_share_total: Decimal,
    pub destination_share_total: Decimal,
    pub sale_date: NaiveDate,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
