//! Inventory item catalogue service

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use shared::models::{
    InventoryItem, ItemCondition, ItemSource, ItemType, OwnerType, TransactionType,
};
use shared::types::{PaginatedResponse, Pagination, SortDirection};
use shared::validation::{business_today, validate_expiry, validate_item_name, validate_price};

use crate::config::LedgerConfig;
use crate::error::{AppError, AppResult};
use crate::services::ledger::{insert_ledger_row, notify_stock_changed, NewLedgerRow, ITEM_COLUMNS};

/// Inventory item service
#[derive(Clone)]
pub struct ItemService {
    db: PgPool,
    config: LedgerConfig,
}

/// Input for creating an item
#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub item_type: ItemType,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub zone: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub location: String,
    pub condition: Option<ItemCondition>,
    /// Opening quantity; omitted means the item is not quantity-tracked
    #[validate(range(min = 0))]
    pub initial_quantity: Option<i64>,
    #[validate(length(max = 50))]
    pub unit: Option<String>,
    pub acquisition_cost: Option<Decimal>,
    pub source: Option<ItemSource>,
    #[validate(range(min = 0))]
    pub min_stock: Option<i64>,
    #[serde(default)]
    pub has_expiry: bool,
    pub expiry_date: Option<NaiveDate>,
    pub owner_type: Option<OwnerType>,
}

/// Descriptive fields of an item. Quantity changes go through the ledger.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateItemInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub item_type: Option<ItemType>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    #[validate(length(max = 100))]
    pub zone: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    pub condition: Option<ItemCondition>,
    #[validate(length(max = 50))]
    pub unit: Option<String>,
    pub acquisition_cost: Option<Decimal>,
    pub source: Option<ItemSource>,
    #[validate(range(min = 0))]
    pub min_stock: Option<i64>,
    pub has_expiry: Option<bool>,
    pub expiry_date: Option<NaiveDate>,
    pub owner_type: Option<OwnerType>,
}

/// Sortable columns for the item list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSort {
    #[default]
    Name,
    Category,
    OnHand,
    CreatedAt,
}

impl ItemSort {
    fn column(&self) -> &'static str {
        match self {
            ItemSort::Name => "name",
            ItemSort::Category => "category",
            ItemSort::OnHand => "on_hand",
            ItemSort::CreatedAt => "created_at",
        }
    }
}

/// Filters for the item list
#[derive(Debug, Default, Deserialize)]
pub struct ItemQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub condition: Option<ItemCondition>,
    pub item_type: Option<ItemType>,
    pub zone: Option<String>,
    pub location: Option<String>,
    pub owner_type: Option<OwnerType>,
    #[serde(default)]
    pub sort_by: ItemSort,
    #[serde(default = "ascending")]
    pub sort_dir: SortDirection,
}

fn ascending() -> SortDirection {
    SortDirection::Asc
}

fn check_item_fields(
    name: &str,
    acquisition_cost: Option<Decimal>,
    has_expiry: bool,
    expiry_date: Option<NaiveDate>,
) -> AppResult<()> {
    validate_item_name(name)
        .map_err(|msg| AppError::validation("name", msg, "Nama barang wajib diisi"))?;
    if let Some(cost) = acquisition_cost {
        validate_price(cost).map_err(|msg| {
            AppError::validation("acquisition_cost", msg, "Harga perolehan tidak boleh negatif")
        })?;
    }
    validate_expiry(has_expiry, expiry_date).map_err(|msg| {
        AppError::validation("expiry_date", msg, "Tanggal kedaluwarsa wajib diisi")
    })?;
    Ok(())
}

impl ItemService {
    /// Create a new ItemService instance
    pub fn new(db: PgPool, config: LedgerConfig) -> Self {
        Self { db, config }
    }

    /// Create an item. An opening quantity is posted as an inbound ledger row.
    pub async fn create_item(&self, user_id: Uuid, input: CreateItemInput) -> AppResult<InventoryItem> {
        check_item_fields(
            &input.name,
            input.acquisition_cost,
            input.has_expiry,
            input.expiry_date,
        )?;

        let mut tx = self.db.begin().await?;

        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            INSERT INTO inventory_items (
                name, item_type, category, zone, location, condition, on_hand, unit,
                acquisition_cost, source, min_stock, has_expiry, expiry_date, owner_type
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(input.item_type)
        .bind(&input.category)
        .bind(&input.zone)
        .bind(&input.location)
        .bind(input.condition.unwrap_or(ItemCondition::Good))
        .bind(input.initial_quantity)
        .bind(&input.unit)
        .bind(input.acquisition_cost)
        .bind(input.source)
        .bind(input.min_stock)
        .bind(input.has_expiry)
        .bind(input.expiry_date.filter(|_| input.has_expiry))
        .bind(input.owner_type.unwrap_or(OwnerType::Foundation))
        .fetch_one(&mut *tx)
        .await?;

        if let Some(quantity) = input.initial_quantity.filter(|q| *q > 0) {
            insert_ledger_row(
                &mut tx,
                NewLedgerRow {
                    item_id: item.id,
                    transaction_type: TransactionType::Inbound,
                    quantity: Some(quantity),
                    before_qty: 0,
                    after_qty: quantity,
                    unit_price: input.acquisition_cost,
                    counterparty: Some("Saldo awal"),
                    channel: None,
                    transfer_id: None,
                    transaction_date: business_today(Utc::now(), self.config.utc_offset_minutes),
                    notes: Some("Opening balance"),
                    created_by: Some(user_id),
                },
            )
            .await?;
            notify_stock_changed(&mut tx, item.id, quantity).await?;
        }

        tx.commit().await?;

        tracing::info!(item_id = %item.id, name = %item.name, on_hand = ?item.on_hand, "inventory item created");

        Ok(item)
    }

    /// Get an item by ID
    pub async fn get_item(&self, item_id: Uuid) -> AppResult<InventoryItem> {
        sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {} FROM inventory_items WHERE id = $1",
            ITEM_COLUMNS
        ))
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))
    }

    /// List items with filters, sorting and pagination
    pub async fn list_items(&self, query: ItemQuery) -> AppResult<PaginatedResponse<InventoryItem>> {
        let pagination = Pagination::from_query(query.page, query.per_page, self.config.max_page_size);
        let search = query.search.filter(|s| !s.trim().is_empty());

        const FILTERS: &str = r#"
            FROM inventory_items
            WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%' OR category ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR category = $2)
              AND ($3::item_condition IS NULL OR condition = $3)
              AND ($4::item_type IS NULL OR item_type = $4)
              AND ($5::text IS NULL OR zone = $5)
              AND ($6::text IS NULL OR location ILIKE '%' || $6 || '%')
              AND ($7::owner_type IS NULL OR owner_type = $7)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {}", FILTERS))
            .bind(&search)
            .bind(&query.category)
            .bind(query.condition)
            .bind(query.item_type)
            .bind(&query.zone)
            .bind(&query.location)
            .bind(query.owner_type)
            .fetch_one(&self.db)
            .await?;

        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {} {} ORDER BY {} {} NULLS LAST, id LIMIT $8 OFFSET $9",
            ITEM_COLUMNS,
            FILTERS,
            query.sort_by.column(),
            query.sort_dir.as_sql(),
        ))
        .bind(&search)
        .bind(&query.category)
        .bind(query.condition)
        .bind(query.item_type)
        .bind(&query.zone)
        .bind(&query.location)
        .bind(query.owner_type)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(items, pagination, total.max(0) as u64))
    }

    /// Update descriptive fields of an item
    pub async fn update_item(&self, item_id: Uuid, input: UpdateItemInput) -> AppResult<InventoryItem> {
        let existing = self.get_item(item_id).await?;

        let name = input.name.unwrap_or(existing.name);
        let acquisition_cost = input.acquisition_cost.or(existing.acquisition_cost);
        let has_expiry = input.has_expiry.unwrap_or(existing.has_expiry);
        let expiry_date = input.expiry_date.or(existing.expiry_date);
        check_item_fields(&name, acquisition_cost, has_expiry, expiry_date)?;

        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            UPDATE inventory_items
            SET name = $2, item_type = $3, category = $4, zone = $5, location = $6,
                condition = $7, unit = $8, acquisition_cost = $9, source = $10,
                min_stock = $11, has_expiry = $12, expiry_date = $13, owner_type = $14,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(item_id)
        .bind(name.trim())
        .bind(input.item_type.unwrap_or(existing.item_type))
        .bind(input.category.unwrap_or(existing.category))
        .bind(input.zone.unwrap_or(existing.zone))
        .bind(input.location.unwrap_or(existing.location))
        .bind(input.condition.unwrap_or(existing.condition))
        .bind(input.unit.or(existing.unit))
        .bind(acquisition_cost)
        .bind(input.source.or(existing.source))
        .bind(input.min_stock.or(existing.min_stock))
        .bind(has_expiry)
        .bind(expiry_date.filter(|_| has_expiry))
        .bind(input.owner_type.unwrap_or(existing.owner_type))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;

        Ok(item)
    }

    /// Delete an item together with its ledger
    pub async fn delete_item(&self, item_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let transfers = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM transfers WHERE item_id = $1",
        )
        .bind(item_id)
        .fetch_one(&mut *tx)
        .await?;

        if transfers > 0 {
            return Err(AppError::Conflict {
                resource: "item".to_string(),
                message: format!("Item is referenced by {} transfer(s)", transfers),
                message_id: format!("Barang masih digunakan oleh {} transfer", transfers),
            });
        }

        let result = sqlx::query("DELETE FROM inventory_items WHERE id = $1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Inventory item".to_string()));
        }

        tx.commit().await?;

        tracing::info!(item_id = %item_id, "inventory item deleted");

        Ok(())
    }

    /// Items at or below their minimum stock, or below the global threshold
    pub async fn low_stock(&self, threshold: Option<i64>) -> AppResult<Vec<InventoryItem>> {
        let threshold = threshold.unwrap_or(self.config.low_stock_threshold);

        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            SELECT {} FROM inventory_items
            WHERE on_hand IS NOT NULL
              AND (on_hand <= COALESCE(min_stock, $1) OR on_hand < $1)
            ORDER BY on_hand ASC, name ASC
            "#,
            ITEM_COLUMNS
        ))
        .bind(threshold)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    /// Items that expire within `days` (already expired items included)
    pub async fn near_expiry(&self, days: Option<i64>) -> AppResult<Vec<InventoryItem>> {
        let days = days.unwrap_or(self.config.expiry_window_days);
        if days < 0 {
            return Err(AppError::validation(
                "days",
                "Days must not be negative",
                "Jumlah hari tidak boleh negatif",
            ));
        }
        let today = business_today(Utc::now(), self.config.utc_offset_minutes);

        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            SELECT {} FROM inventory_items
            WHERE has_expiry AND expiry_date IS NOT NULL
              AND expiry_date <= $1::date + $2::int
            ORDER BY expiry_date ASC, name ASC
            "#,
            ITEM_COLUMNS
        ))
        .bind(today)
        // keeps today + days inside the date range
        .bind(days.min(36_500) as i32)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_item_fields() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1);
        assert!(check_item_fields("Beras", Some(Decimal::from(12_000)), true, date).is_ok());
        assert!(check_item_fields(" ", None, false, None).is_err());
        assert!(check_item_fields("Beras", Some(Decimal::from(-1)), false, None).is_err());
        assert!(matches!(
            check_item_fields("Susu", None, true, None),
            Err(AppError::Validation { ref field, .. }) if field == "expiry_date"
        ));
    }

    #[test]
    fn test_create_input_accepts_indonesian_values() {
        let input: CreateItemInput = serde_json::from_value(serde_json::json!({
            "name": "Sabun Mandi",
            "item_type": "komoditas",
            "category": "Kebersihan",
            "condition": "baik",
            "initial_quantity": 48,
            "owner_type": "yayasan",
            "source": "donasi"
        }))
        .unwrap();
        assert_eq!(input.item_type, ItemType::Commodity);
        assert_eq!(input.condition, Some(ItemCondition::Good));
        assert_eq!(input.owner_type, Some(OwnerType::Foundation));
        assert_eq!(input.source, Some(ItemSource::Donation));
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_item_query_defaults() {
        let query: ItemQuery = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(query.sort_by.column(), "name");
        assert_eq!(query.sort_dir, SortDirection::Asc);
    }
}
