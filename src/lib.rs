//! Godown API Library
//!
//! Inventory and order management for FMCG distribution: sellers, products
//! with strip/box packaged variants, barcode scanning, and GST-aware order
//! billing. Order operations are transactional; stock and totals never
//! drift apart.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use axum::{extract::State, response::Json, routing::get, Router};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrappers
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    let orders = Router::new()
        .route(
            "/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route(
            "/orders/:id",
            get(handlers::orders::get_order)
                .put(handlers::orders::update_order)
                .delete(handlers::orders::delete_order),
        )
        .route(
            "/orders/:id/finalize",
            axum::routing::post(handlers::orders::finalize_order),
        )
        .route(
            "/orders/:id/cancel",
            axum::routing::post(handlers::orders::cancel_order),
        )
        .route("/orders/:id/invoice", get(handlers::orders::order_invoice));

    let scan = Router::new()
        .route("/scan", axum::routing::post(handlers::scan::scan))
        .route("/scan/:barcode", get(handlers::scan::check_barcode))
        .route(
            "/scanned-products",
            axum::routing::post(handlers::scan::create_product_from_scan),
        );

    let sellers = Router::new()
        .route(
            "/sellers",
            get(handlers::sellers::list_sellers).post(handlers::sellers::create_seller),
        )
        .route(
            "/sellers/:id",
            get(handlers::sellers::get_seller)
                .put(handlers::sellers::update_seller)
                .delete(handlers::sellers::delete_seller),
        );

    let catalog = Router::new()
        .route(
            "/products",
            get(handlers::catalog::list_products).post(handlers::catalog::create_product),
        )
        .route(
            "/products/:id",
            axum::routing::put(handlers::catalog::update_product),
        )
        .route(
            "/variations",
            get(handlers::catalog::list_variations).post(handlers::catalog::create_variation),
        )
        .route(
            "/variants",
            get(handlers::catalog::list_variants).post(handlers::catalog::create_variant),
        )
        .route(
            "/variants/:id",
            axum::routing::put(handlers::catalog::update_variant)
                .delete(handlers::catalog::delete_variant),
        );

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(orders)
        .merge(scan)
        .merge(sellers)
        .merge(catalog)
}

async fn api_status() -> ApiResult<Value> {
    let version = env!("CARGO_PKG_VERSION");
    let git = option_env!("GIT_HASH").unwrap_or("unknown");
    let build_time = option_env!("BUILD_TIME").unwrap_or("unknown");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "git": git,
        "build_time": build_time,
        "service": "godown-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
