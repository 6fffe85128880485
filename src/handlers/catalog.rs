use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use uuid::Uuid;

use super::common::{created_response, no_content_response, success_response, ListParams};
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::catalog::{
    CreateProductRequest, CreateVariantRequest, CreateVariationRequest, UpdateProductRequest,
    UpdateVariantRequest,
};

pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.catalog.create_product(payload).await?;
    Ok(created_response(product))
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = params.clamped();
    let products = state
        .services
        .catalog
        .list_products(page, per_page, params.search)
        .await?;
    Ok(success_response(products))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state
        .services
        .catalog
        .update_product(product_id, payload)
        .await?;
    Ok(success_response(product))
}

pub async fn create_variation(
    State(state): State<AppState>,
    Json(payload): Json<CreateVariationRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let variation = state.services.catalog.create_variation(payload).await?;
    Ok(created_response(variation))
}

pub async fn list_variations(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let variations = state.services.catalog.list_variations().await?;
    Ok(success_response(variations))
}

pub async fn create_variant(
    State(state): State<AppState>,
    Json(payload): Json<CreateVariantRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let variant = state.services.catalog.create_variant(payload).await?;
    Ok(created_response(variant))
}

pub async fn list_variants(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = params.clamped();
    let variants = state
        .services
        .catalog
        .list_variants(page, per_page, params.search, params.include_deleted)
        .await?;
    Ok(success_response(variants))
}

pub async fn update_variant(
    State(state): State<AppState>,
    Path(variant_id): Path<Uuid>,
    Json(payload): Json<UpdateVariantRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let variant = state
        .services
        .catalog
        .update_variant(variant_id, payload)
        .await?;
    Ok(success_response(variant))
}

pub async fn delete_variant(
    State(state): State<AppState>,
    Path(variant_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.catalog.delete_variant(variant_id).await?;
    Ok(no_content_response())
}
