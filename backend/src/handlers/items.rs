//! HTTP handlers for inventory item endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::models::InventoryItem;
use shared::types::PaginatedResponse;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::{permissions, CurrentUser};
use crate::services::items::{CreateItemInput, ItemQuery, UpdateItemInput};
use crate::services::ledger::ReconcileReport;
use crate::services::{ItemService, LedgerService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LowStockParams {
    pub threshold: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct NearExpiryParams {
    pub days: Option<i64>,
}

fn item_service(state: &AppState) -> ItemService {
    ItemService::new(state.db.clone(), state.config.ledger.clone())
}

/// Create an item, optionally with an opening balance
pub async fn create_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateItemInput>,
) -> AppResult<(StatusCode, Json<InventoryItem>)> {
    current_user.0.require(permissions::INVENTORY_WRITE)?;
    input.validate()?;

    let item = item_service(&state)
        .create_item(current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// List items with filters and pagination
pub async fn list_items(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ItemQuery>,
) -> AppResult<Json<PaginatedResponse<InventoryItem>>> {
    let items = item_service(&state).list_items(query).await?;
    Ok(Json(items))
}

/// Get a single item
pub async fn get_item(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<InventoryItem>> {
    let item = item_service(&state).get_item(item_id).await?;
    Ok(Json(item))
}

/// Update item master data
pub async fn update_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<UpdateItemInput>,
) -> AppResult<Json<InventoryItem>> {
    current_user.0.require(permissions::INVENTORY_WRITE)?;
    input.validate()?;

    let item = item_service(&state).update_item(item_id, input).await?;
    Ok(Json(item))
}

/// Delete an item and its ledger
pub async fn delete_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    current_user.0.require(permissions::INVENTORY_WRITE)?;

    item_service(&state).delete_item(item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Items at or under their minimum stock
pub async fn get_low_stock_items(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(params): Query<LowStockParams>,
) -> AppResult<Json<Vec<InventoryItem>>> {
    let items = item_service(&state).low_stock(params.threshold).await?;
    Ok(Json(items))
}

/// Items expiring inside the window
pub async fn get_near_expiry_items(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(params): Query<NearExpiryParams>,
) -> AppResult<Json<Vec<InventoryItem>>> {
    let items = item_service(&state).near_expiry(params.days).await?;
    Ok(Json(items))
}

/// Re-derive an item's snapshots and on-hand from its ledger
pub async fn reconcile_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<ReconcileReport>> {
    current_user.0.require(permissions::INVENTORY_WRITE)?;

    let service = LedgerService::new(state.db.clone(), state.config.ledger.clone());
    let report = service.reconcile_item(item_id).await?;
    Ok(Json(report))
}
