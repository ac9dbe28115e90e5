//! Inventory item models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of stocked good
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "item_type", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Durable goods (furniture, electronics)
    #[serde(alias = "aset")]
    Asset,
    /// Consumables (rice, soap, stationery)
    #[serde(alias = "komoditas")]
    Commodity,
}

/// Physical condition of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "item_condition", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    #[serde(alias = "baik")]
    Good,
    #[serde(alias = "perlu_perbaikan")]
    NeedsRepair,
    #[serde(alias = "rusak")]
    Damaged,
}

impl ItemCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCondition::Good => "good",
            ItemCondition::NeedsRepair => "needs_repair",
            ItemCondition::Damaged => "damaged",
        }
    }
}

impl std::fmt::Display for ItemCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the foundation acquired an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "item_source", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ItemSource {
    #[serde(alias = "pembelian")]
    Purchase,
    #[serde(alias = "donasi")]
    Donation,
}

/// Which organisation the stock is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "owner_type", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OwnerType {
    #[serde(alias = "yayasan")]
    Foundation,
    #[serde(alias = "koperasi")]
    Cooperative,
}

/// A stocked good
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryItem {
    pub id: Uuid,
    pub name: String,
    pub item_type: ItemType,
    pub category: String,
    pub zone: String,
    pub location: String,
    pub condition: ItemCondition,
    /// `None` means the quantity is not tracked for this item
    pub on_hand: Option<i64>,
    pub unit: Option<String>,
    pub acquisition_cost: Option<Decimal>,
    pub source: Option<ItemSource>,
    pub min_stock: Option<i64>,
    pub has_expiry: bool,
    pub expiry_date: Option<NaiveDate>,
    pub owner_type: OwnerType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Quantity available for outbound movements. Untracked items hold nothing.
    pub fn available(&self) -> i64 {
        self.on_hand.unwrap_or(0)
    }
}
