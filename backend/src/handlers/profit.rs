//! Profit-split calculator endpoint

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::ItemCondition;
use shared::profit::{self, ProfitSplit};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ProfitSplitRequest {
    pub unit_price: Decimal,
    pub condition: ItemCondition,
    /// Optional quantity for totals
    pub quantity: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ProfitSplitResponse {
    #[serde(flatten)]
    pub split: ProfitSplit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_total: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_total: Option<Decimal>,
}

/// Split a unit price between the source and the destination
pub async fn calculate_profit_split(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(request): Json<ProfitSplitRequest>,
) -> AppResult<Json<ProfitSplitResponse>> {
    if request.quantity.is_some_and(|q| q <= 0) {
        return Err(AppError::validation(
            "quantity",
            "Quantity must be greater than zero",
            "Jumlah harus lebih dari nol",
        ));
    }

    let split = profit::split(&state.config.profit_policy(), request.unit_price, request.condition)?;
    let totals = request.quantity.map(|q| split.for_quantity(q)).transpose()?;

    Ok(Json(ProfitSplitResponse {
        source_total: totals.map(|(source, _)| source),
        destination_total: totals.map(|(_, destination)| destination),
        split,
    }))
}
