//! Destination stock and resale service

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use shared::models::{Destination, DestinationSale, DestinationStock};
use shared::profit::{self, ProfitSharePolicy};
use shared::validation::{business_today, validate_transaction_date};

use crate::config::LedgerConfig;
use crate::error::{AppError, AppResult};

const STOCK_COLUMNS: &str = "id, transfer_id, item_id, destination, owner_type, condition, \
     unit_price, quantity_available, quantity_used, created_at";

const SALE_COLUMNS: &str = "id, destination_stock_id, quantity, unit_price, source_share_per_unit, \
     destination_share_per_unit, source_share_total, destination_share_total, sale_date, \
     created_by, created_at";

/// Destination stock service
#[derive(Clone)]
pub struct DestinationService {
    db: PgPool,
    ledger: LedgerConfig,
    profit: ProfitSharePolicy,
}

/// Filters for destination stock
#[derive(Debug, Default, Deserialize)]
pub struct DestinationStockQuery {
    pub destination: Option<Destination>,
    /// Only rows with quantity left to sell
    #[serde(default)]
    pub available_only: bool,
}

/// Input for recording a sale out of destination stock
#[derive(Debug, Deserialize, Validate)]
pub struct RecordSaleInput {
    #[validate(range(min = 1))]
    pub quantity: i64,
    /// Defaults to the stock's unit price
    pub unit_price: Option<Decimal>,
    pub sale_date: Option<NaiveDate>,
}

impl DestinationService {
    /// Create a new DestinationService instance
    pub fn new(db: PgPool, ledger: LedgerConfig, profit: ProfitSharePolicy) -> Self {
        Self { db, ledger, profit }
    }

    /// List destination stock
    pub async fn list_stock(&self, query: DestinationStockQuery) -> AppResult<Vec<DestinationStock>> {
        let rows = sqlx::query_as::<_, DestinationStock>(&format!(
            r#"
            SELECT {} FROM destination_stock
            WHERE ($1::transfer_destination IS NULL OR destination = $1)
              AND (NOT $2 OR quantity_used < quantity_available)
            ORDER BY created_at DESC
            "#,
            STOCK_COLUMNS
        ))
        .bind(query.destination)
        .bind(query.available_only)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Record a sale and its profit split
    pub async fn record_sale(
        &self,
        stock_id: Uuid,
        user_id: Uuid,
        input: RecordSaleInput,
    ) -> AppResult<DestinationSale> {
        let today = business_today(Utc::now(), self.ledger.utc_offset_minutes);
        let sale_date = input.sale_date.unwrap_or(today);
        validate_transaction_date(sale_date, today).map_err(|msg| {
            AppError::validation("sale_date", msg, "Tanggal penjualan tidak boleh di masa depan")
        })?;

        let mut tx = self.db.begin().await?;

        let stock = sqlx::query_as::<_, DestinationStock>(&format!(
            "SELECT {} FROM destination_stock WHERE id = $1 FOR UPDATE",
            STOCK_COLUMNS
        ))
        .bind(stock_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Destination stock".to_string()))?;

        if input.quantity <= 0 {
            return Err(AppError::validation(
                "quantity",
                "Quantity must be greater than zero",
                "Jumlah harus lebih dari nol",
            ));
        }
        if input.quantity > stock.remaining() {
            return Err(AppError::InsufficientStock {
                available: stock.remaining(),
                requested: input.quantity,
            });
        }

        let unit_price = input.unit_price.unwrap_or(stock.unit_price);
        let split = profit::split(&self.profit, unit_price, stock.condition)?;
        let (source_total, destination_total) = split.for_quantity(input.quantity)?;

        let sale = sqlx::query_as::<_, DestinationSale>(&format!(
            r#"
            INSERT INTO destination_sales (
                destination_stock_id, quantity, unit_price, source_share_per_unit,
                destination_share_per_unit, source_share_total, destination_share_total,
                sale_date, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            SALE_COLUMNS
        ))
        .bind(stock.id)
        .bind(input.quantity)
        .bind(unit_price)
        .bind(split.source_share)
        .bind(split.destination_share)
        .bind(source_total)
        .bind(destination_total)
        .bind(sale_date)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE destination_stock SET quantity_used = quantity_used + $2 WHERE id = $1")
            .bind(stock.id)
            .bind(input.quantity)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            stock_id = %stock.id,
            quantity = input.quantity,
            source_share = %source_total,
            destination_share = %destination_total,
            "destination sale recorded"
        );

        Ok(sale)
    }

    /// Sales recorded against one destination stock row
    pub async fn list_sales(&self, stock_id: Uuid) -> AppResult<Vec<DestinationSale>> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM destination_stock WHERE id = $1)",
        )
        .bind(stock_id)
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(AppError::NotFound("Destination stock".to_string()));
        }

        let sales = sqlx::query_as::<_, DestinationSale>(&format!(
            "SELECT {} FROM destination_sales WHERE destination_stock_id = $1 ORDER BY sale_date DESC, created_at DESC",
            SALE_COLUMNS
        ))
        .bind(stock_id)
        .fetch_all(&self.db)
        .await?;

        Ok(sales)
    }
}
