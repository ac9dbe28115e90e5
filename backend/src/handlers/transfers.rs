//! HTTP handlers for transfer endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::models::Transfer;
use shared::types::{DateRange, PaginatedResponse};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::{permissions, CurrentUser};
use crate::services::transfers::{
    ApproveTransferInput, CreateTransferInput, DestinationSummary, PeriodSummary,
    RejectTransferInput, TransferQuery, TransferTrendPoint, TransferWithItem, UpdateTransferInput,
};
use crate::services::TransferService;
use crate::AppState;

fn transfer_service(state: &AppState) -> TransferService {
    TransferService::new(
        state.db.clone(),
        state.config.ledger.clone(),
        state.config.approval_policy(),
    )
}

/// Create a transfer to a destination
pub async fn create_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateTransferInput>,
) -> AppResult<(StatusCode, Json<Transfer>)> {
    current_user.0.require(permissions::TRANSFERS_WRITE)?;
    input.validate()?;

    let transfer = transfer_service(&state)
        .create_transfer(current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(transfer)))
}

/// List transfers with filters and pagination
pub async fn list_transfers(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<TransferQuery>,
) -> AppResult<Json<PaginatedResponse<TransferWithItem>>> {
    let transfers = transfer_service(&state).list_transfers(query).await?;
    Ok(Json(transfers))
}

/// Get a single transfer
pub async fn get_transfer(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<TransferWithItem>> {
    let transfer = transfer_service(&state).get_transfer(transfer_id).await?;
    Ok(Json(transfer))
}

/// Approve a pending transfer
pub async fn approve_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
    Json(input): Json<ApproveTransferInput>,
) -> AppResult<Json<Transfer>> {
    current_user.0.require(permissions::TRANSFERS_APPROVE)?;
    input.validate()?;

    let transfer = transfer_service(&state)
        .approve_transfer(transfer_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(transfer))
}

/// Activate an approved transfer
pub async fn activate_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<Transfer>> {
    current_user.0.require(permissions::TRANSFERS_WRITE)?;

    let transfer = transfer_service(&state).activate_transfer(transfer_id).await?;
    Ok(Json(transfer))
}

/// Reject a pending transfer and return its stock
pub async fn reject_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
    Json(input): Json<RejectTransferInput>,
) -> AppResult<Json<Transfer>> {
    current_user.0.require(permissions::TRANSFERS_APPROVE)?;
    input.validate()?;

    let transfer = transfer_service(&state)
        .reject_transfer(transfer_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(transfer))
}

/// Edit a pending transfer
pub async fn update_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
    Json(input): Json<UpdateTransferInput>,
) -> AppResult<Json<Transfer>> {
    current_user.0.require(permissions::TRANSFERS_WRITE)?;
    input.validate()?;

    let transfer = transfer_service(&state)
        .update_transfer(transfer_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(transfer))
}

/// Delete a pending transfer
pub async fn delete_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    current_user.0.require(permissions::TRANSFERS_WRITE)?;

    transfer_service(&state).delete_transfer(transfer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Per-destination totals
pub async fn get_destination_summary(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(range): Query<DateRange>,
) -> AppResult<Json<Vec<DestinationSummary>>> {
    let summary = transfer_service(&state).summary_by_destination(range).await?;
    Ok(Json(summary))
}

/// Totals for a period
pub async fn get_period_summary(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(range): Query<DateRange>,
) -> AppResult<Json<PeriodSummary>> {
    let summary = transfer_service(&state).period_summary(range).await?;
    Ok(Json(summary))
}

/// Daily transfer counts and quantities
pub async fn get_transfer_trends(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(range): Query<DateRange>,
) -> AppResult<Json<Vec<TransferTrendPoint>>> {
    let trends = transfer_service(&state).trends(range).await?;
    Ok(Json(trends))
}
