//! HTTP handlers for stock ledger endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::models::StockTransaction;
use shared::types::PaginatedResponse;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::{permissions, CurrentUser};
use crate::services::ledger::{
    BulkDeleteInput, BulkDeleteResult, ItemBalance, RecordTransactionInput, TransactionQuery,
    TransactionWithItem, UpdateTransactionInput,
};
use crate::services::LedgerService;
use crate::AppState;

fn ledger_service(state: &AppState) -> LedgerService {
    LedgerService::new(state.db.clone(), state.config.ledger.clone())
}

/// Record an inbound, outbound or stocktake movement
pub async fn record_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordTransactionInput>,
) -> AppResult<(StatusCode, Json<StockTransaction>)> {
    current_user.0.require(permissions::INVENTORY_WRITE)?;
    input.validate()?;

    let transaction = ledger_service(&state)
        .record_transaction(current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// List ledger rows with filters and pagination
pub async fn list_transactions(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<TransactionQuery>,
) -> AppResult<Json<PaginatedResponse<TransactionWithItem>>> {
    let transactions = ledger_service(&state).list_transactions(query).await?;
    Ok(Json(transactions))
}

/// Get a single ledger row
pub async fn get_transaction(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(transaction_id): Path<Uuid>,
) -> AppResult<Json<TransactionWithItem>> {
    let transaction = ledger_service(&state).get_transaction(transaction_id).await?;
    Ok(Json(transaction))
}

/// Edit a ledger row
pub async fn update_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transaction_id): Path<Uuid>,
    Json(input): Json<UpdateTransactionInput>,
) -> AppResult<Json<StockTransaction>> {
    current_user.0.require(permissions::INVENTORY_WRITE)?;
    input.validate()?;

    let transaction = ledger_service(&state)
        .update_transaction(transaction_id, input)
        .await?;
    Ok(Json(transaction))
}

/// Delete a ledger row
pub async fn delete_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transaction_id): Path<Uuid>,
) -> AppResult<Json<ItemBalance>> {
    current_user.0.require(permissions::INVENTORY_WRITE)?;

    let balance = ledger_service(&state)
        .delete_transaction(transaction_id)
        .await?;
    Ok(Json(balance))
}

/// Delete several ledger rows at once
pub async fn bulk_delete_transactions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<BulkDeleteInput>,
) -> AppResult<Json<BulkDeleteResult>> {
    current_user.0.require(permissions::INVENTORY_WRITE)?;
    input.validate()?;

    let result = ledger_service(&state).delete_transactions(input.ids).await?;
    Ok(Json(result))
}
