//! Transfer workflow service
//!
//! Stock leaves the item as soon as a transfer is created. A rejection puts
//! it back with a compensating inbound row, so the item's ledger always
//! explains its on-hand quantity. All rows posted here carry the
//! `transfer_id` and cannot be edited through the ledger endpoints.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::models::{Destination, ItemCondition, TransactionType, Transfer, TransferStatus};
use shared::transfer::{
    check_price, plan_create, plan_quantity_change, plan_reject, transition, ApprovalPolicy,
    QuantityAdjustment, TransferAction, TransferRequest,
};
use shared::types::{DateRange, PaginatedResponse, Pagination};
use shared::validation::business_today;

use crate::config::LedgerConfig;
use crate::error::{AppError, AppResult};
use crate::services::ledger::{
    credit_stock, draw_stock, insert_ledger_row, lock_item, rebuild_item, NewLedgerRow,
};

const TRANSFER_COLUMNS: &str = "id, item_id, quantity, unit_price, destination, condition, status, \
     source_cost, liability_amount, rejection_reason, notes, transfer_date, created_by, \
     approved_by, approved_at, rejected_by, rejected_at, activated_at, created_at, updated_at";

/// Transfer service
#[derive(Clone)]
pub struct TransferService {
    db: PgPool,
    ledger: LedgerConfig,
    policy: ApprovalPolicy,
}

/// Input for creating a transfer
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTransferInput {
    pub item_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i64,
    pub destination: Destination,
    /// Unit selling price at the destination
    #[serde(alias = "price")]
    pub unit_price: Decimal,
    /// Defaults to the item's current condition
    pub condition: Option<ItemCondition>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Input for approving a transfer
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ApproveTransferInput {
    /// Final selling price, if the approver changes it
    pub unit_price: Option<Decimal>,
    /// Condition found on inspection; drives the profit split once sold
    pub condition: Option<ItemCondition>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Input for rejecting a transfer
#[derive(Debug, Deserialize, Validate)]
pub struct RejectTransferInput {
    #[validate(length(min = 1, max = 2000))]
    pub reason: String,
}

/// Input for editing a pending transfer
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTransferInput {
    #[validate(range(min = 1))]
    pub quantity: Option<i64>,
    pub unit_price: Option<Decimal>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Filters for the transfer list
#[derive(Debug, Default, Deserialize)]
pub struct TransferQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<TransferStatus>,
    pub destination: Option<Destination>,
    pub item_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Transfer with its item name
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TransferWithItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub transfer: Transfer,
    pub item_name: String,
}

/// Transfer counts per status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusBreakdown {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub active: i64,
}

impl StatusBreakdown {
    fn add(&mut self, status: TransferStatus, count: i64) {
        match status {
            TransferStatus::Pending => self.pending += count,
            TransferStatus::Approved => self.approved += count,
            TransferStatus::Rejected => self.rejected += count,
            TransferStatus::Active => self.active += count,
        }
    }
}

/// Totals for one destination. Rejected transfers are excluded from the
/// totals but counted in the breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestinationSummary {
    pub destination: Destination,
    pub transfer_count: i64,
    pub total_quantity: i64,
    /// Σ source_cost × quantity
    pub total_value: Decimal,
    pub by_status: StatusBreakdown,
}

/// Totals over a date range
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodSummary {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub transfer_count: i64,
    pub total_quantity: i64,
    pub total_value: Decimal,
    pub by_status: StatusBreakdown,
    pub by_destination: Vec<DestinationSummary>,
}

/// Aggregated row from the summary query
#[derive(Debug, Clone, FromRow)]
pub(crate) struct StatusTotalsRow {
    pub destination: Destination,
    pub status: TransferStatus,
    pub transfer_count: i64,
    pub total_quantity: i64,
    pub total_value: Decimal,
}

/// Fold grouped rows into one summary per destination, in a fixed order
pub(crate) fn summarize_by_destination(rows: &[StatusTotalsRow]) -> Vec<DestinationSummary> {
    Destination::ALL
        .iter()
        .map(|destination| {
            let mut summary = DestinationSummary {
                destination: *destination,
                transfer_count: 0,
                total_quantity: 0,
                total_value: Decimal::ZERO,
                by_status: StatusBreakdown::default(),
            };
            for row in rows.iter().filter(|r| r.destination == *destination) {
                summary.by_status.add(row.status, row.transfer_count);
                if row.status != TransferStatus::Rejected {
                    summary.transfer_count += row.transfer_count;
                    summary.total_quantity += row.total_quantity;
                    summary.total_value += row.total_value;
                }
            }
            summary
        })
        .collect()
}

pub(crate) fn summarize_period(range: DateRange, rows: &[StatusTotalsRow]) -> PeriodSummary {
    let by_destination = summarize_by_destination(rows);
    let mut by_status = StatusBreakdown::default();
    for row in rows {
        by_status.add(row.status, row.transfer_count);
    }

    PeriodSummary {
        start_date: range.start,
        end_date: range.end,
        transfer_count: by_destination.iter().map(|d| d.transfer_count).sum(),
        total_quantity: by_destination.iter().map(|d| d.total_quantity).sum(),
        total_value: by_destination.iter().map(|d| d.total_value).sum(),
        by_status,
        by_destination,
    }
}

/// Transfers started on one day. Rejected transfers are left out because
/// their stock went back to the item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferTrendPoint {
    pub date: NaiveDate,
    pub transfer_count: i64,
    pub total_quantity: i64,
}

/// Aggregated row from the trend query
#[derive(Debug, Clone, FromRow)]
pub(crate) struct DailyStatusRow {
    pub transfer_date: NaiveDate,
    pub status: TransferStatus,
    pub transfer_count: i64,
    pub total_quantity: i64,
}

/// Fold per-day, per-status rows into one point per day, oldest first.
/// Days with only rejected transfers are omitted.
pub(crate) fn daily_trends(rows: &[DailyStatusRow]) -> Vec<TransferTrendPoint> {
    let mut points: Vec<TransferTrendPoint> = Vec::new();
    let mut ordered: Vec<&DailyStatusRow> = rows
        .iter()
        .filter(|row| row.status != TransferStatus::Rejected)
        .collect();
    ordered.sort_by_key(|row| row.transfer_date);

    for row in ordered {
        match points.last_mut() {
            Some(point) if point.date == row.transfer_date => {
                point.transfer_count += row.transfer_count;
                point.total_quantity += row.total_quantity;
            }
            _ => points.push(TransferTrendPoint {
                date: row.transfer_date,
                transfer_count: row.transfer_count,
                total_quantity: row.total_quantity,
            }),
        }
    }
    points
}

fn check_range(range: &DateRange) -> AppResult<()> {
    if !range.is_valid() {
        return Err(AppError::validation(
            "end",
            "End date must not be before start date",
            "Tanggal akhir tidak boleh sebelum tanggal awal",
        ));
    }
    Ok(())
}

fn rejection_label(destination: Destination) -> String {
    format!("Pengembalian dari {}", destination.label())
}

impl TransferService {
    /// Create a new TransferService instance
    pub fn new(db: PgPool, ledger: LedgerConfig, policy: ApprovalPolicy) -> Self {
        Self { db, ledger, policy }
    }

    fn today(&self) -> NaiveDate {
        business_today(Utc::now(), self.ledger.utc_offset_minutes)
    }

    async fn lock_transfer(&self, conn: &mut PgConnection, transfer_id: Uuid) -> AppResult<Transfer> {
        sqlx::query_as::<_, Transfer>(&format!(
            "SELECT {} FROM transfers WHERE id = $1 FOR UPDATE",
            TRANSFER_COLUMNS
        ))
        .bind(transfer_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Transfer".to_string()))
    }

    async fn insert_destination_stock(
        &self,
        conn: &mut PgConnection,
        transfer: &Transfer,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO destination_stock (
                transfer_id, item_id, destination, owner_type, condition, unit_price, quantity_available
            )
            VALUES ($1, $2, $3, 'foundation', $4, $5, $6)
            "#,
        )
        .bind(transfer.id)
        .bind(transfer.item_id)
        .bind(transfer.destination)
        .bind(transfer.condition)
        .bind(transfer.unit_price)
        .bind(transfer.quantity)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Create a transfer and take its quantity out of the item
    pub async fn create_transfer(&self, user_id: Uuid, input: CreateTransferInput) -> AppResult<Transfer> {
        let mut tx = self.db.begin().await?;

        let item = lock_item(&mut tx, input.item_id).await?;
        let source_cost = item.acquisition_cost.unwrap_or(Decimal::ZERO);
        let condition = input.condition.unwrap_or(item.condition);
        let available = item.available();

        let plan = plan_create(
            &self.policy,
            &TransferRequest {
                quantity: input.quantity,
                destination: input.destination,
                condition,
                unit_price: input.unit_price,
                source_cost,
            },
            available,
        )?;

        let transfer_date = self.today();
        let transfer = sqlx::query_as::<_, Transfer>(&format!(
            r#"
            INSERT INTO transfers (
                item_id, quantity, unit_price, destination, condition, status, source_cost,
                notes, transfer_date, created_by, activated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    CASE WHEN $6 = 'active'::transfer_status THEN NOW() END)
            RETURNING {}
            "#,
            TRANSFER_COLUMNS
        ))
        .bind(item.id)
        .bind(input.quantity)
        .bind(input.unit_price)
        .bind(input.destination)
        .bind(condition)
        .bind(plan.status)
        .bind(source_cost)
        .bind(&input.notes)
        .bind(transfer_date)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let on_hand = draw_stock(&mut tx, item.id, input.quantity).await?;

        insert_ledger_row(
            &mut tx,
            NewLedgerRow {
                item_id: item.id,
                transaction_type: TransactionType::Outbound,
                quantity: Some(input.quantity),
                before_qty: available,
                after_qty: on_hand,
                unit_price: Some(source_cost),
                counterparty: Some(input.destination.label()),
                channel: Some(input.destination),
                transfer_id: Some(transfer.id),
                transaction_date: transfer_date,
                notes: input.notes.as_deref(),
                created_by: Some(user_id),
            },
        )
        .await?;

        if plan.creates_destination_stock {
            self.insert_destination_stock(&mut tx, &transfer).await?;
        }

        tx.commit().await?;

        tracing::info!(
            transfer_id = %transfer.id,
            item_id = %item.id,
            quantity = transfer.quantity,
            destination = %transfer.destination,
            status = %transfer.status,
            "transfer created"
        );

        Ok(transfer)
    }

    /// Get a transfer by ID
    pub async fn get_transfer(&self, transfer_id: Uuid) -> AppResult<TransferWithItem> {
        sqlx::query_as::<_, TransferWithItem>(&format!(
            "SELECT {}, i.name AS item_name FROM transfers tr \
             JOIN inventory_items i ON i.id = tr.item_id WHERE tr.id = $1",
            prefixed_columns()
        ))
        .bind(transfer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Transfer".to_string()))
    }

    /// List transfers, newest first
    pub async fn list_transfers(
        &self,
        query: TransferQuery,
    ) -> AppResult<PaginatedResponse<TransferWithItem>> {
        let pagination = Pagination::from_query(query.page, query.per_page, self.ledger.max_page_size);

        const FILTERS: &str = r#"
            FROM transfers tr
            JOIN inventory_items i ON i.id = tr.item_id
            WHERE ($1::transfer_status IS NULL OR tr.status = $1)
              AND ($2::transfer_destination IS NULL OR tr.destination = $2)
              AND ($3::uuid IS NULL OR tr.item_id = $3)
              AND ($4::date IS NULL OR tr.transfer_date >= $4)
              AND ($5::date IS NULL OR tr.transfer_date <= $5)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {}", FILTERS))
            .bind(query.status)
            .bind(query.destination)
            .bind(query.item_id)
            .bind(query.start_date)
            .bind(query.end_date)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, TransferWithItem>(&format!(
            "SELECT {}, i.name AS item_name {} ORDER BY tr.created_at DESC, tr.id LIMIT $6 OFFSET $7",
            prefixed_columns(),
            FILTERS
        ))
        .bind(query.status)
        .bind(query.destination)
        .bind(query.item_id)
        .bind(query.start_date)
        .bind(query.end_date)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(rows, pagination, total.max(0) as u64))
    }

    /// Pending → Approved. Records the approver and the liability owed to the foundation.
    pub async fn approve_transfer(
        &self,
        transfer_id: Uuid,
        user_id: Uuid,
        input: ApproveTransferInput,
    ) -> AppResult<Transfer> {
        let mut tx = self.db.begin().await?;

        let transfer = self.lock_transfer(&mut tx, transfer_id).await?;
        let status = transition(transfer.status, TransferAction::Approve)?;

        let unit_price = input.unit_price.unwrap_or(transfer.unit_price);
        let condition = input.condition.unwrap_or(transfer.condition);
        check_price(transfer.destination, condition, unit_price, transfer.source_cost)?;
        let liability = transfer.liability()?;

        let approved = sqlx::query_as::<_, Transfer>(&format!(
            r#"
            UPDATE transfers
            SET status = $2, unit_price = $3, liability_amount = $4,
                notes = COALESCE($5, notes), approved_by = $6, approved_at = NOW(),
                condition = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            TRANSFER_COLUMNS
        ))
        .bind(transfer_id)
        .bind(status)
        .bind(unit_price)
        .bind(liability)
        .bind(&input.notes)
        .bind(user_id)
        .bind(condition)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            transfer_id = %transfer_id,
            approved_by = %user_id,
            liability = %liability,
            condition = %approved.condition,
            "transfer approved"
        );

        Ok(approved)
    }

    /// Approved → Active. Establishes the destination stock.
    pub async fn activate_transfer(&self, transfer_id: Uuid) -> AppResult<Transfer> {
        let mut tx = self.db.begin().await?;

        let transfer = self.lock_transfer(&mut tx, transfer_id).await?;
        let status = transition(transfer.status, TransferAction::Activate)?;

        let activated = sqlx::query_as::<_, Transfer>(&format!(
            r#"
            UPDATE transfers
            SET status = $2, activated_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            TRANSFER_COLUMNS
        ))
        .bind(transfer_id)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        self.insert_destination_stock(&mut tx, &activated).await?;

        tx.commit().await?;

        tracing::info!(transfer_id = %transfer_id, destination = %activated.destination, "transfer activated");

        Ok(activated)
    }

    /// Pending → Rejected. Credits the quantity back in the same database transaction.
    pub async fn reject_transfer(
        &self,
        transfer_id: Uuid,
        user_id: Uuid,
        input: RejectTransferInput,
    ) -> AppResult<Transfer> {
        let mut tx = self.db.begin().await?;

        let transfer = self.lock_transfer(&mut tx, transfer_id).await?;
        let reason = plan_reject(transfer.status, &input.reason)?;

        let item = lock_item(&mut tx, transfer.item_id).await?;
        let on_hand = credit_stock(&mut tx, item.id, transfer.quantity).await?;

        insert_ledger_row(
            &mut tx,
            NewLedgerRow {
                item_id: item.id,
                transaction_type: TransactionType::Inbound,
                quantity: Some(transfer.quantity),
                before_qty: item.available(),
                after_qty: on_hand,
                unit_price: Some(transfer.source_cost),
                counterparty: Some(&rejection_label(transfer.destination)),
                channel: Some(transfer.destination),
                transfer_id: Some(transfer.id),
                transaction_date: self.today(),
                notes: Some(&reason),
                created_by: Some(user_id),
            },
        )
        .await?;

        let rejected = sqlx::query_as::<_, Transfer>(&format!(
            r#"
            UPDATE transfers
            SET status = 'rejected', rejection_reason = $2, rejected_by = $3,
                rejected_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            TRANSFER_COLUMNS
        ))
        .bind(transfer_id)
        .bind(&reason)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::warn!(
            transfer_id = %transfer_id,
            item_id = %item.id,
            returned = transfer.quantity,
            reason = %reason,
            "transfer rejected, stock returned"
        );

        Ok(rejected)
    }

    /// Edit a pending transfer. A quantity change posts an adjustment row.
    pub async fn update_transfer(
        &self,
        transfer_id: Uuid,
        user_id: Uuid,
        input: UpdateTransferInput,
    ) -> AppResult<Transfer> {
        let mut tx = self.db.begin().await?;

        let transfer = self.lock_transfer(&mut tx, transfer_id).await?;
        transition(transfer.status, TransferAction::Update)?;

        let unit_price = input.unit_price.unwrap_or(transfer.unit_price);
        check_price(transfer.destination, transfer.condition, unit_price, transfer.source_cost)?;

        let quantity = input.quantity.unwrap_or(transfer.quantity);
        if quantity != transfer.quantity {
            let item = lock_item(&mut tx, transfer.item_id).await?;
            let available = item.available();
            let adjustment = plan_quantity_change(transfer.status, transfer.quantity, quantity, available)?;

            let (transaction_type, delta, after) = match adjustment {
                QuantityAdjustment::Outbound(delta) => (
                    TransactionType::Outbound,
                    delta,
                    draw_stock(&mut tx, item.id, delta).await?,
                ),
                QuantityAdjustment::Inbound(delta) => (
                    TransactionType::Inbound,
                    delta,
                    credit_stock(&mut tx, item.id, delta).await?,
                ),
                QuantityAdjustment::Unchanged => (TransactionType::Inbound, 0, available),
            };

            if delta > 0 {
                insert_ledger_row(
                    &mut tx,
                    NewLedgerRow {
                        item_id: item.id,
                        transaction_type,
                        quantity: Some(delta),
                        before_qty: available,
                        after_qty: after,
                        unit_price: Some(transfer.source_cost),
                        counterparty: Some(transfer.destination.label()),
                        channel: Some(transfer.destination),
                        transfer_id: Some(transfer.id),
                        transaction_date: self.today(),
                        notes: Some("Transfer quantity adjusted"),
                        created_by: Some(user_id),
                    },
                )
                .await?;
            }
        }

        let updated = sqlx::query_as::<_, Transfer>(&format!(
            r#"
            UPDATE transfers
            SET quantity = $2, unit_price = $3, notes = COALESCE($4, notes), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            TRANSFER_COLUMNS
        ))
        .bind(transfer_id)
        .bind(quantity)
        .bind(unit_price)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(transfer_id = %transfer_id, quantity, "transfer updated");

        Ok(updated)
    }

    /// Delete a pending transfer together with its ledger rows
    pub async fn delete_transfer(&self, transfer_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let transfer = self.lock_transfer(&mut tx, transfer_id).await?;
        transition(transfer.status, TransferAction::Delete)?;

        lock_item(&mut tx, transfer.item_id).await?;

        // linked ledger rows cascade
        sqlx::query("DELETE FROM transfers WHERE id = $1")
            .bind(transfer_id)
            .execute(&mut *tx)
            .await?;

        let (replayed, _) = rebuild_item(&mut tx, transfer.item_id).await?;

        tx.commit().await?;

        tracing::info!(
            transfer_id = %transfer_id,
            item_id = %transfer.item_id,
            on_hand = replayed.on_hand,
            "transfer deleted, stock restored"
        );

        Ok(())
    }

    async fn status_totals(&self, range: DateRange) -> AppResult<Vec<StatusTotalsRow>> {
        check_range(&range)?;

        let rows = sqlx::query_as::<_, StatusTotalsRow>(
            r#"
            SELECT destination, status,
                   COUNT(*) AS transfer_count,
                   COALESCE(SUM(quantity), 0)::BIGINT AS total_quantity,
                   COALESCE(SUM(source_cost * quantity), 0) AS total_value
            FROM transfers
            WHERE ($1::date IS NULL OR transfer_date >= $1)
              AND ($2::date IS NULL OR transfer_date <= $2)
            GROUP BY destination, status
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Per-destination totals
    pub async fn summary_by_destination(&self, range: DateRange) -> AppResult<Vec<DestinationSummary>> {
        let rows = self.status_totals(range).await?;
        Ok(summarize_by_destination(&rows))
    }

    /// Totals for a period with status and destination breakdowns
    pub async fn period_summary(&self, range: DateRange) -> AppResult<PeriodSummary> {
        let rows = self.status_totals(range).await?;
        Ok(summarize_period(range, &rows))
    }

    /// Daily transfer counts and quantities for charting
    pub async fn trends(&self, range: DateRange) -> AppResult<Vec<TransferTrendPoint>> {
        check_range(&range)?;

        let rows = sqlx::query_as::<_, DailyStatusRow>(
            r#"
            SELECT transfer_date, status,
                   COUNT(*) AS transfer_count,
                   COALESCE(SUM(quantity), 0)::BIGINT AS total_quantity
            FROM transfers
            WHERE ($1::date IS NULL OR transfer_date >= $1)
              AND ($2::date IS NULL OR transfer_date <= $2)
            GROUP BY transfer_date, status
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(daily_trends(&rows))
    }
}

fn prefixed_columns() -> String {
    TRANSFER_COLUMNS
        .split(',')
        .map(|c| format!("tr.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
