use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
};

use super::common::{created_response, success_response};
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::barcode::NewScannedProductRequest;
use crate::services::orders::ScanRequest;

/// Read-only lookup for the scanner UI: which code matched and what one scan
/// of it adds to the order.
pub async fn check_barcode(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let hit = state.services.barcode.check_barcode(&code).await?;
    Ok(success_response(hit))
}

/// Merge one scan into the seller's open order for today.
pub async fn scan(
    State(state): State<AppState>,
    Json(payload): Json<ScanRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state.services.orders.scan(payload).await?;
    Ok(success_response(result))
}

/// Register a product+variant on the fly after an unknown-barcode scan.
pub async fn create_product_from_scan(
    State(state): State<AppState>,
    Json(payload): Json<NewScannedProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state
        .services
        .barcode
        .create_product_from_scan(payload)
        .await?;
    Ok(created_response(created))
}
