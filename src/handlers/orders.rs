use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use uuid::Uuid;

use super::common::{created_response, no_content_response, success_response, ListParams};
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::orders::{CreateOrderRequest, UpdateOrderRequest};

/// Create a completed order from an explicit item list.
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.create_order(payload).await?;
    Ok(created_response(order))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = params.clamped();
    let orders = state
        .services
        .orders
        .list_orders(page, per_page, params.seller_id)
        .await?;
    Ok(success_response(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.get_order(order_id).await?;
    Ok(success_response(order))
}

/// Full-replacement update: items absent from the payload are removed and
/// their stock released.
pub async fn update_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.update_order(order_id, payload).await?;
    Ok(success_response(order))
}

pub async fn finalize_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.finalize_order(order_id).await?;
    Ok(success_response(order))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.cancel_order(order_id).await?;
    Ok(success_response(order))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.orders.delete_order(order_id).await?;
    Ok(no_content_response())
}

/// Totals plus per-line box/strip breakdown, consumed by the PDF renderer.
pub async fn order_invoice(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state.services.orders.invoice_data(order_id).await?;
    Ok(success_response(invoice))
}
