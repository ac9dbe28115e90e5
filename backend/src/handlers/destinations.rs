//! HTTP handlers for destination stock and sales

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::models::{DestinationSale, DestinationStock};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::{permissions, CurrentUser};
use crate::services::destinations::{DestinationStockQuery, RecordSaleInput};
use crate::services::DestinationService;
use crate::AppState;

fn destination_service(state: &AppState) -> DestinationService {
    DestinationService::new(
        state.db.clone(),
        state.config.ledger.clone(),
        state.config.profit_policy(),
    )
}

/// List destination stock
pub async fn list_destination_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<DestinationStockQuery>,
) -> AppResult<Json<Vec<DestinationStock>>> {
    let stock = destination_service(&state).list_stock(query).await?;
    Ok(Json(stock))
}

/// Record a sale out of destination stock
pub async fn record_destination_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stock_id): Path<Uuid>,
    Json(input): Json<RecordSaleInput>,
) -> AppResult<(StatusCode, Json<DestinationSale>)> {
    current_user.0.require(permissions::TRANSFERS_WRITE)?;
    input.validate()?;

    let sale = destination_service(&state)
        .record_sale(stock_id, current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// Sales recorded against a destination stock row
pub async fn list_destination_sales(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(stock_id): Path<Uuid>,
) -> AppResult<Json<Vec<DestinationSale>>> {
    let sales = destination_service(&state).list_sales(stock_id).await?;
    Ok(Json(sales))
}
