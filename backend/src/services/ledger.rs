//! Stock ledger service
//!
//! Every on-hand change goes through a ledger row written in the same
//! database transaction as the `inventory_items.on_hand` update. Edits and
//! deletes re-derive the item by replaying its whole ledger, so a change in
//! the middle of the history is checked against everything after it.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::ledger::{self, Replay, StockMovement};
use shared::models::{Destination, InventoryItem, StockTransaction, TransactionType};
use shared::types::{PaginatedResponse, Pagination, SortDirection};
use shared::validation::{
    business_today, line_total, validate_price, validate_stocktake_counts,
    validate_transaction_date,
};

use crate::config::LedgerConfig;
use crate::error::{AppError, AppResult};

pub(crate) const TRANSACTION_COLUMNS: &str = "t.id, t.seq, t.item_id, t.transaction_type, t.quantity, \
     t.before_qty, t.after_qty, t.unit_price, t.total_price, t.counterparty, t.channel, \
     t.transfer_id, t.transaction_date, t.notes, t.created_by, t.created_at";

pub(crate) const ITEM_COLUMNS: &str = "id, name, item_type, category, zone, location, condition, \
     on_hand, unit, acquisition_cost, source, min_stock, has_expiry, expiry_date, owner_type, \
     created_at, updated_at";

/// Stock ledger service
#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
    config: LedgerConfig,
}

/// Input for recording a stock movement
#[derive(Debug, Deserialize, Validate)]
pub struct RecordTransactionInput {
    pub item_id: Uuid,
    #[serde(alias = "type")]
    pub transaction_type: TransactionType,
    #[validate(range(min = 1))]
    pub quantity: Option<i64>,
    /// Stocktake only: the quantity the counter believed was on hand
    #[validate(range(min = 0))]
    pub before_qty: Option<i64>,
    /// Stocktake only: the counted quantity
    #[validate(range(min = 0))]
    pub after_qty: Option<i64>,
    pub unit_price: Option<Decimal>,
    #[validate(length(max = 200))]
    pub counterparty: Option<String>,
    pub transaction_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Patch for an existing ledger row. The transaction type cannot change.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTransactionInput {
    #[serde(alias = "type")]
    pub transaction_type: Option<TransactionType>,
    #[validate(range(min = 1))]
    pub quantity: Option<i64>,
    /// Stocktake only: corrected count
    #[validate(range(min = 0))]
    pub after_qty: Option<i64>,
    pub unit_price: Option<Decimal>,
    #[validate(length(max = 200))]
    pub counterparty: Option<String>,
    pub transaction_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Input for bulk deletion
#[derive(Debug, Deserialize, Validate)]
pub struct BulkDeleteInput {
    #[validate(length(min = 1, max = 500))]
    pub ids: Vec<Uuid>,
}

/// On-hand balance after a re-derivation
#[derive(Debug, Clone, Serialize)]
pub struct ItemBalance {
    pub item_id: Uuid,
    pub on_hand: i64,
}

/// Result of a bulk delete
#[derive(Debug, Clone, Serialize)]
pub struct BulkDeleteResult {
    pub deleted: Vec<Uuid>,
    pub missing: Vec<Uuid>,
    pub items: Vec<ItemBalance>,
}

/// Stored vs derived state of an item
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub item_id: Uuid,
    pub stored_on_hand: Option<i64>,
    pub derived_on_hand: i64,
    pub rows_checked: usize,
    pub rows_corrected: usize,
}

/// Sortable columns for the ledger list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSort {
    #[default]
    TransactionDate,
    CreatedAt,
    Quantity,
    ItemName,
}

impl TransactionSort {
    fn column(&self) -> &'static str {
        match self {
            TransactionSort::TransactionDate => "t.transaction_date",
            TransactionSort::CreatedAt => "t.created_at",
            TransactionSort::Quantity => "t.quantity",
            TransactionSort::ItemName => "i.name",
        }
    }
}

/// Filters for the ledger list
#[derive(Debug, Default, Deserialize)]
pub struct TransactionQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    #[serde(alias = "type")]
    pub transaction_type: Option<TransactionType>,
    pub item_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub counterparty: Option<String>,
    /// Free text over item name
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: TransactionSort,
    #[serde(default)]
    pub sort_dir: SortDirection,
}

/// Ledger row with its item name
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TransactionWithItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub transaction: StockTransaction,
    pub item_name: String,
}

/// A ledger row about to be written
pub(crate) struct NewLedgerRow<'a> {
    pub item_id: Uuid,
    pub transaction_type: TransactionType,
    pub quantity: Option<i64>,
    pub before_qty: i64,
    pub after_qty: i64,
    pub unit_price: Option<Decimal>,
    pub counterparty: Option<&'a str>,
    pub channel: Option<Destination>,
    pub transfer_id: Option<Uuid>,
    pub transaction_date: NaiveDate,
    pub notes: Option<&'a str>,
    pub created_by: Option<Uuid>,
}

/// Quantity and resulting balance of a validated movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PreparedMovement {
    pub quantity: Option<i64>,
    pub before_qty: i64,
    pub after_qty: i64,
}

/// Check a movement against the current balance without touching storage
pub(crate) fn prepare_movement(
    transaction_type: TransactionType,
    quantity: Option<i64>,
    after_qty: Option<i64>,
    available: i64,
) -> AppResult<PreparedMovement> {
    let quantity = match transaction_type {
        TransactionType::Stocktake => None,
        _ => quantity,
    };
    let movement = StockMovement {
        id: Uuid::nil(),
        transaction_type,
        quantity,
        before_qty: Some(available),
        after_qty,
        transaction_date: NaiveDate::MIN,
        seq: 0,
    };
    let after = ledger::apply_movement(available, &movement)?;
    Ok(PreparedMovement {
        quantity,
        before_qty: available,
        after_qty: after,
    })
}

fn total_price(unit_price: Option<Decimal>, quantity: Option<i64>) -> AppResult<Option<Decimal>> {
    match (unit_price, quantity) {
        (Some(price), Some(qty)) => Ok(Some(line_total(price, qty)?)),
        _ => Ok(None),
    }
}

fn date_error(message: &str) -> AppError {
    AppError::validation(
        "transaction_date",
        message,
        "Tanggal transaksi tidak boleh di masa depan",
    )
}

// ============================================================================
// Storage helpers shared with the transfer and item services
// ============================================================================

/// Lock an item row for the rest of the transaction
pub(crate) async fn lock_item(conn: &mut PgConnection, item_id: Uuid) -> AppResult<InventoryItem> {
    sqlx::query_as::<_, InventoryItem>(&format!(
        "SELECT {} FROM inventory_items WHERE id = $1 FOR UPDATE",
        ITEM_COLUMNS
    ))
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))
}

/// Insert a ledger row
pub(crate) async fn insert_ledger_row(
    conn: &mut PgConnection,
    row: NewLedgerRow<'_>,
) -> AppResult<StockTransaction> {
    let total = total_price(row.unit_price, row.quantity)?;
    let transaction = sqlx::query_as::<_, StockTransaction>(
        r#"
        INSERT INTO stock_transactions AS t (
            item_id, transaction_type, quantity, before_qty, after_qty, unit_price, total_price,
            counterparty, channel, transfer_id, transaction_date, notes, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING t.id, t.seq, t.item_id, t.transaction_type, t.quantity, t.before_qty, t.after_qty,
                  t.unit_price, t.total_price, t.counterparty, t.channel, t.transfer_id,
                  t.transaction_date, t.notes, t.created_by, t.created_at
        "#,
    )
    .bind(row.item_id)
    .bind(row.transaction_type)
    .bind(row.quantity)
    .bind(row.before_qty)
    .bind(row.after_qty)
    .bind(row.unit_price)
    .bind(total)
    .bind(row.counterparty)
    .bind(row.channel)
    .bind(row.transfer_id)
    .bind(row.transaction_date)
    .bind(row.notes)
    .bind(row.created_by)
    .fetch_one(&mut *conn)
    .await?;

    Ok(transaction)
}

/// Take `quantity` out of an item. The `WHERE` guard makes the update a
/// compare-and-swap even if the caller did not lock the row.
pub(crate) async fn draw_stock(
    conn: &mut PgConnection,
    item_id: Uuid,
    quantity: i64,
) -> AppResult<i64> {
    let updated = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE inventory_items
        SET on_hand = COALESCE(on_hand, 0) - $2, updated_at = NOW()
        WHERE id = $1 AND COALESCE(on_hand, 0) >= $2
        RETURNING on_hand
        "#,
    )
    .bind(item_id)
    .bind(quantity)
    .fetch_optional(&mut *conn)
    .await?;

    match updated {
        Some(on_hand) => {
            notify_stock_changed(conn, item_id, on_hand).await?;
            Ok(on_hand)
        }
        None => {
            let available = sqlx::query_scalar::<_, Option<i64>>(
                "SELECT on_hand FROM inventory_items WHERE id = $1",
            )
            .bind(item_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?
            .unwrap_or(0);

            Err(AppError::InsufficientStock {
                available,
                requested: quantity,
            })
        }
    }
}

/// Put `quantity` back into an item
pub(crate) async fn credit_stock(
    conn: &mut PgConnection,
    item_id: Uuid,
    quantity: i64,
) -> AppResult<i64> {
    let on_hand = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE inventory_items
        SET on_hand = COALESCE(on_hand, 0) + $2, updated_at = NOW()
        WHERE id = $1
        RETURNING on_hand
        "#,
    )
    .bind(item_id)
    .bind(quantity)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;

    notify_stock_changed(conn, item_id, on_hand).await?;
    Ok(on_hand)
}

async fn set_on_hand(conn: &mut PgConnection, item_id: Uuid, on_hand: i64) -> AppResult<()> {
    sqlx::query("UPDATE inventory_items SET on_hand = $2, updated_at = NOW() WHERE id = $1")
        .bind(item_id)
        .bind(on_hand)
        .execute(&mut *conn)
        .await?;

    notify_stock_changed(conn, item_id, on_hand).await
}

/// Publish an on-hand change for external alerting
pub(crate) async fn notify_stock_changed(
    conn: &mut PgConnection,
    item_id: Uuid,
    on_hand: i64,
) -> AppResult<()> {
    let payload = serde_json::json!({ "item_id": item_id, "on_hand": on_hand }).to_string();
    sqlx::query("SELECT pg_notify('stock_changed', $1)")
        .bind(payload)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Replay an item's full ledger, rewrite drifted snapshots and store the
/// derived on-hand. Fails, leaving the transaction to roll back, when the
/// history would go negative anywhere.
pub(crate) async fn rebuild_item(conn: &mut PgConnection, item_id: Uuid) -> AppResult<(Replay, usize)> {
    let rows = sqlx::query_as::<_, StockTransaction>(&format!(
        "SELECT {} FROM stock_transactions t WHERE t.item_id = $1 \
         ORDER BY t.transaction_date, t.seq",
        TRANSACTION_COLUMNS
    ))
    .bind(item_id)
    .fetch_all(&mut *conn)
    .await?;

    let movements: Vec<StockMovement> = rows.iter().map(StockMovement::from).collect();
    let replayed = ledger::replay(&movements)?;
    let drifted: Vec<_> = replayed.drifted(&movements).copied().collect();

    for step in &drifted {
        sqlx::query("UPDATE stock_transactions SET before_qty = $2, after_qty = $3 WHERE id = $1")
            .bind(step.id)
            .bind(step.before_qty)
            .bind(step.after_qty)
            .execute(&mut *conn)
            .await?;
    }

    // an item whose quantity was never tracked stays untracked while its ledger is empty
    let stored = sqlx::query_scalar::<_, Option<i64>>(
        r#"
        UPDATE inventory_items
        SET on_hand = CASE WHEN on_hand IS NULL AND $3 THEN NULL ELSE $2 END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING on_hand
        "#,
    )
    .bind(item_id)
    .bind(replayed.on_hand)
    .bind(movements.is_empty())
    .fetch_one(&mut *conn)
    .await?;

    if let Some(on_hand) = stored {
        notify_stock_changed(conn, item_id, on_hand).await?;
    }

    Ok((replayed, drifted.len()))
}

impl LedgerService {
    /// Create a new LedgerService instance
    pub fn new(db: PgPool, config: LedgerConfig) -> Self {
        Self { db, config }
    }

    fn today(&self) -> NaiveDate {
        business_today(Utc::now(), self.config.utc_offset_minutes)
    }

    /// Record an inbound, outbound or stocktake movement
    pub async fn record_transaction(
        &self,
        user_id: Uuid,
        input: RecordTransactionInput,
    ) -> AppResult<StockTransaction> {
        let today = self.today();
        let transaction_date = input.transaction_date.unwrap_or(today);
        validate_transaction_date(transaction_date, today).map_err(date_error)?;

        if input.transaction_type == TransactionType::Stocktake {
            let after = input.after_qty.ok_or_else(|| {
                AppError::validation(
                    "after_qty",
                    "Stocktake requires the counted quantity",
                    "Stock opname membutuhkan jumlah hasil hitung",
                )
            })?;
            validate_stocktake_counts(input.before_qty, after).map_err(|msg| {
                AppError::validation("after_qty", msg, "Jumlah stok tidak boleh negatif")
            })?;
        }
        if let Some(price) = input.unit_price {
            validate_price(price)
                .map_err(|msg| AppError::validation("unit_price", msg, "Harga tidak boleh negatif"))?;
        }

        let mut tx = self.db.begin().await?;

        let item = lock_item(&mut tx, input.item_id).await?;
        let available = item.available();
        let prepared = prepare_movement(
            input.transaction_type,
            input.quantity,
            input.after_qty,
            available,
        )?;

        if input.transaction_type == TransactionType::Stocktake {
            if let Some(counted_before) = input.before_qty.filter(|b| *b != available) {
                tracing::warn!(
                    item_id = %item.id,
                    recorded = available,
                    reported = counted_before,
                    "stocktake before-quantity differs from recorded stock"
                );
            }
        }

        let transaction = insert_ledger_row(
            &mut tx,
            NewLedgerRow {
                item_id: item.id,
                transaction_type: input.transaction_type,
                quantity: prepared.quantity,
                before_qty: prepared.before_qty,
                after_qty: prepared.after_qty,
                unit_price: input.unit_price,
                counterparty: input.counterparty.as_deref(),
                channel: None,
                transfer_id: None,
                transaction_date,
                notes: input.notes.as_deref(),
                created_by: Some(user_id),
            },
        )
        .await?;

        let backdated = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM stock_transactions WHERE item_id = $1 AND transaction_date > $2)",
        )
        .bind(item.id)
        .bind(transaction_date)
        .fetch_one(&mut *tx)
        .await?;

        let transaction = if backdated {
            // later rows must be re-checked against the inserted one
            rebuild_item(&mut tx, item.id).await?;
            self.fetch_transaction(&mut tx, transaction.id).await?
        } else {
            match (input.transaction_type, prepared.quantity) {
                (TransactionType::Outbound, Some(quantity)) => {
                    draw_stock(&mut tx, item.id, quantity).await?;
                }
                _ => set_on_hand(&mut tx, item.id, prepared.after_qty).await?,
            }
            transaction
        };

        tx.commit().await?;

        tracing::info!(
            transaction_id = %transaction.id,
            item_id = %transaction.item_id,
            kind = %transaction.transaction_type,
            before = ?transaction.before_qty,
            after = ?transaction.after_qty,
            "stock transaction recorded"
        );

        Ok(transaction)
    }

    async fn fetch_transaction(
        &self,
        conn: &mut PgConnection,
        transaction_id: Uuid,
    ) -> AppResult<StockTransaction> {
        sqlx::query_as::<_, StockTransaction>(&format!(
            "SELECT {} FROM stock_transactions t WHERE t.id = $1",
            TRANSACTION_COLUMNS
        ))
        .bind(transaction_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock transaction".to_string()))
    }

    /// Lock a ledger row that the caller may change, taking its item's lock
    /// first. Every writer locks the item before touching its ledger rows.
    async fn lock_editable(
        &self,
        conn: &mut PgConnection,
        transaction_id: Uuid,
    ) -> AppResult<StockTransaction> {
        let item_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT item_id FROM stock_transactions WHERE id = $1",
        )
        .bind(transaction_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock transaction".to_string()))?;

        lock_item(conn, item_id).await?;

        // re-read under the lock; a concurrent delete may have won
        let existing = sqlx::query_as::<_, StockTransaction>(&format!(
            "SELECT {} FROM stock_transactions t WHERE t.id = $1 FOR UPDATE",
            TRANSACTION_COLUMNS
        ))
        .bind(transaction_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock transaction".to_string()))?;

        if existing.is_transfer_managed() {
            return Err(AppError::validation(
                "transfer_id",
                "This entry belongs to a transfer; change the transfer instead",
                "Transaksi ini milik transfer; ubah melalui transfer",
            ));
        }
        Ok(existing)
    }

    /// Get a single ledger row
    pub async fn get_transaction(&self, transaction_id: Uuid) -> AppResult<TransactionWithItem> {
        sqlx::query_as::<_, TransactionWithItem>(&format!(
            "SELECT {}, i.name AS item_name FROM stock_transactions t \
             JOIN inventory_items i ON i.id = t.item_id WHERE t.id = $1",
            TRANSACTION_COLUMNS
        ))
        .bind(transaction_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock transaction".to_string()))
    }

    /// Edit a ledger row and re-derive its item
    pub async fn update_transaction(
        &self,
        transaction_id: Uuid,
        input: UpdateTransactionInput,
    ) -> AppResult<StockTransaction> {
        let mut tx = self.db.begin().await?;

        let existing = self.lock_editable(&mut tx, transaction_id).await?;
        if input
            .transaction_type
            .is_some_and(|t| t != existing.transaction_type)
        {
            return Err(AppError::validation(
                "transaction_type",
                "Transaction type cannot be changed",
                "Jenis transaksi tidak dapat diubah",
            ));
        }

        let transaction_date = input.transaction_date.unwrap_or(existing.transaction_date);
        validate_transaction_date(transaction_date, self.today()).map_err(date_error)?;

        let (quantity, after_qty) = match existing.transaction_type {
            TransactionType::Stocktake => (None, input.after_qty.or(existing.after_qty)),
            _ => (input.quantity.or(existing.quantity), existing.after_qty),
        };
        let unit_price = input.unit_price.or(existing.unit_price);
        if let Some(price) = unit_price {
            validate_price(price)
                .map_err(|msg| AppError::validation("unit_price", msg, "Harga tidak boleh negatif"))?;
        }
        let counterparty = input.counterparty.or(existing.counterparty);
        let notes = input.notes.or(existing.notes);
        let total = total_price(unit_price, quantity)?;

        sqlx::query(
            r#"
            UPDATE stock_transactions
            SET quantity = $2, after_qty = $3, unit_price = $4, total_price = $5,
                counterparty = $6, transaction_date = $7, notes = $8
            WHERE id = $1
            "#,
        )
        .bind(transaction_id)
        .bind(quantity)
        .bind(after_qty)
        .bind(unit_price)
        .bind(total)
        .bind(&counterparty)
        .bind(transaction_date)
        .bind(&notes)
        .execute(&mut *tx)
        .await?;

        let (replayed, _) = rebuild_item(&mut tx, existing.item_id).await?;
        let updated = self.fetch_transaction(&mut tx, transaction_id).await?;

        tx.commit().await?;

        tracing::info!(
            transaction_id = %transaction_id,
            item_id = %existing.item_id,
            on_hand = replayed.on_hand,
            "stock transaction updated"
        );

        Ok(updated)
    }

    /// Delete a ledger row and re-derive its item
    pub async fn delete_transaction(&self, transaction_id: Uuid) -> AppResult<ItemBalance> {
        let mut tx = self.db.begin().await?;

        let existing = self.lock_editable(&mut tx, transaction_id).await?;

        sqlx::query("DELETE FROM stock_transactions WHERE id = $1")
            .bind(transaction_id)
            .execute(&mut *tx)
            .await?;

        let (replayed, _) = rebuild_item(&mut tx, existing.item_id).await?;

        tx.commit().await?;

        tracing::info!(
            transaction_id = %transaction_id,
            item_id = %existing.item_id,
            on_hand = replayed.on_hand,
            "stock transaction deleted"
        );

        Ok(ItemBalance {
            item_id: existing.item_id,
            on_hand: replayed.on_hand,
        })
    }

    /// Delete many ledger rows atomically. Missing ids are reported back;
    /// any item that fails to reconcile aborts the whole batch.
    pub async fn delete_transactions(&self, ids: Vec<Uuid>) -> AppResult<BulkDeleteResult> {
        let mut tx = self.db.begin().await?;

        let mut item_ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT DISTINCT item_id FROM stock_transactions WHERE id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;
        item_ids.sort();

        // items before rows, ordered by id
        sqlx::query("SELECT id FROM inventory_items WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(&item_ids)
            .execute(&mut *tx)
            .await?;

        let found = sqlx::query_as::<_, (Uuid, Uuid, Option<Uuid>)>(
            "SELECT id, item_id, transfer_id FROM stock_transactions WHERE id = ANY($1) FOR UPDATE",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;

        if let Some((id, _, _)) = found.iter().find(|(_, _, transfer_id)| transfer_id.is_some()) {
            return Err(AppError::Validation {
                field: "ids".to_string(),
                message: format!("Entry {} belongs to a transfer and cannot be deleted here", id),
                message_id: format!("Transaksi {} milik transfer dan tidak dapat dihapus", id),
            });
        }

        let deleted: Vec<Uuid> = found.iter().map(|(id, _, _)| *id).collect();
        let mut missing: Vec<Uuid> = ids.iter().filter(|id| !deleted.contains(id)).copied().collect();
        missing.sort();
        missing.dedup();

        // rows deleted by a concurrent writer drop out of the rebuild
        item_ids.retain(|item_id| found.iter().any(|(_, row_item, _)| row_item == item_id));

        sqlx::query("DELETE FROM stock_transactions WHERE id = ANY($1)")
            .bind(&deleted)
            .execute(&mut *tx)
            .await?;

        let mut items = Vec::with_capacity(item_ids.len());
        for item_id in item_ids {
            let (replayed, _) = rebuild_item(&mut tx, item_id).await?;
            items.push(ItemBalance {
                item_id,
                on_hand: replayed.on_hand,
            });
        }

        tx.commit().await?;

        tracing::info!(
            deleted = deleted.len(),
            missing = missing.len(),
            items = items.len(),
            "stock transactions bulk deleted"
        );

        Ok(BulkDeleteResult {
            deleted,
            missing,
            items,
        })
    }

    /// List ledger rows with filters, sorting and pagination
    pub async fn list_transactions(
        &self,
        query: TransactionQuery,
    ) -> AppResult<PaginatedResponse<TransactionWithItem>> {
        let pagination = Pagination::from_query(query.page, query.per_page, self.config.max_page_size);
        let counterparty = query.counterparty.filter(|s| !s.trim().is_empty());
        let search = query.search.filter(|s| !s.trim().is_empty());

        const FILTERS: &str = r#"
            FROM stock_transactions t
            JOIN inventory_items i ON i.id = t.item_id
            WHERE ($1::stock_transaction_type IS NULL OR t.transaction_type = $1)
              AND ($2::uuid IS NULL OR t.item_id = $2)
              AND ($3::date IS NULL OR t.transaction_date >= $3)
              AND ($4::date IS NULL OR t.transaction_date <= $4)
              AND ($5::text IS NULL OR t.counterparty ILIKE '%' || $5 || '%')
              AND ($6::text IS NULL OR i.name ILIKE '%' || $6 || '%')
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {}", FILTERS))
            .bind(query.transaction_type)
            .bind(query.item_id)
            .bind(query.start_date)
            .bind(query.end_date)
            .bind(&counterparty)
            .bind(&search)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, TransactionWithItem>(&format!(
            "SELECT {}, i.name AS item_name {} ORDER BY {} {}, t.seq ASC LIMIT $7 OFFSET $8",
            TRANSACTION_COLUMNS,
            FILTERS,
            query.sort_by.column(),
            query.sort_dir.as_sql(),
        ))
        .bind(query.transaction_type)
        .bind(query.item_id)
        .bind(query.start_date)
        .bind(query.end_date)
        .bind(&counterparty)
        .bind(&search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(rows, pagination, total.max(0) as u64))
    }

    /// Replay an item's ledger and repair stored snapshots and on-hand
    pub async fn reconcile_item(&self, item_id: Uuid) -> AppResult<ReconcileReport> {
        let mut tx = self.db.begin().await?;

        let item = lock_item(&mut tx, item_id).await?;
        let (replayed, corrected) = rebuild_item(&mut tx, item_id).await?;

        tx.commit().await?;

        if item.on_hand.is_some_and(|stored| stored != replayed.on_hand) || corrected > 0 {
            tracing::warn!(
                item_id = %item_id,
                stored = ?item.on_hand,
                derived = replayed.on_hand,
                corrected,
                "stock drift repaired"
            );
        }

        Ok(ReconcileReport {
            item_id,
            stored_on_hand: item.on_hand,
            derived_on_hand: replayed.on_hand,
            rows_checked: replayed.steps.len(),
            rows_corrected: corrected,
        })
    }
}
