use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use uuid::Uuid;

use super::common::{created_response, no_content_response, success_response, ListParams};
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::sellers::{CreateSellerRequest, UpdateSellerRequest};

pub async fn create_seller(
    State(state): State<AppState>,
    Json(payload): Json<CreateSellerRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let seller = state.services.sellers.create_seller(payload).await?;
    Ok(created_response(seller))
}

pub async fn list_sellers(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = params.clamped();
    let sellers = state
        .services
        .sellers
        .list_sellers(page, per_page, params.search)
        .await?;
    Ok(success_response(sellers))
}

pub async fn get_seller(
    State(state): State<AppState>,
    Path(seller_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let seller = state.services.sellers.get_seller(seller_id).await?;
    Ok(success_response(seller))
}

pub async fn update_seller(
    State(state): State<AppState>,
    Path(seller_id): Path<Uuid>,
    Json(payload): Json<UpdateSellerRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let seller = state
        .services
        .sellers
        .update_seller(seller_id, payload)
        .await?;
    Ok(success_response(seller))
}

pub async fn delete_seller(
    State(state): State<AppState>,
    Path(seller_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.sellers.delete_seller(seller_id).await?;
    Ok(no_content_response())
}
