//! Route definitions for the Inventaris API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - items and stock ledger
        .nest("/inventory", inventory_routes(state.clone()))
        // Protected routes - transfers
        .nest("/transfers", transfer_routes(state.clone()))
        // Protected routes - destination stock
        .nest("/destinations", destination_routes(state.clone()))
        // Protected routes - profit-split calculator
        .nest("/profit-split", profit_routes(state))
}

/// Item and ledger routes (protected)
fn inventory_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/items",
            get(handlers::list_items).post(handlers::create_item),
        )
        .route("/items/low-stock", get(handlers::get_low_stock_items))
        .route("/items/near-expiry", get(handlers::get_near_expiry_items))
        .route(
            "/items/:item_id",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::delete_item),
        )
        .route("/items/:item_id/reconcile", post(handlers::reconcile_item))
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::record_transaction),
        )
        .route(
            "/transactions/bulk-delete",
            post(handlers::bulk_delete_transactions),
        )
        .route(
            "/transactions/:transaction_id",
            get(handlers::get_transaction)
                .put(handlers::update_transaction)
                .delete(handlers::delete_transaction),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Transfer routes (protected)
fn transfer_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_transfers).post(handlers::create_transfer),
        )
        .route(
            "/summary/destinations",
            get(handlers::get_destination_summary),
        )
        .route("/summary/period", get(handlers::get_period_summary))
        .route("/summary/trends", get(handlers::get_transfer_trends))
        .route(
            "/:transfer_id",
            get(handlers::get_transfer)
                .put(handlers::update_transfer)
                .delete(handlers::delete_transfer),
        )
        .route("/:transfer_id/approve", post(handlers::approve_transfer))
        .route("/:transfer_id/activate", post(handlers::activate_transfer))
        .route("/:transfer_id/reject", post(handlers::reject_transfer))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Destination stock routes (protected)
fn destination_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/stock", get(handlers::list_destination_stock))
        .route(
            "/stock/:stock_id/sales",
            get(handlers::list_destination_sales).post(handlers::record_destination_sale),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Profit-split calculator routes (protected)
fn profit_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/calculate", post(handlers::calculate_profit_split))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
