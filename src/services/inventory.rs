//! Stock ledger operations.
//!
//! Every function here takes the caller's transaction; stock never moves
//! outside one. The decrement is a single conditional UPDATE so concurrent
//! reservations against the same variant cannot oversell, with or without an
//! explicit row lock.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::entities::{product, product_variation, variation};
use crate::errors::ServiceError;

/// Atomically checks and decrements `stock_in_hand`.
///
/// Fails with `InsufficientStock` (carrying product/variation names and the
/// available count) when the guard `stock_in_hand >= quantity` does not hold.
pub async fn reserve<C: ConnectionTrait>(
    conn: &C,
    variant_id: Uuid,
    quantity: i32,
) -> Result<(), ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::ValidationError(format!(
            "Reservation quantity must be positive, got {}",
            quantity
        )));
    }

    let result = product_variation::Entity::update_many()
        .col_expr(
            product_variation::Column::StockInHand,
            Expr::col(product_variation::Column::StockInHand).sub(quantity),
        )
        .col_expr(
            product_variation::Column::UpdatedAt,
            Expr::value(Utc::now()),
        )
        .filter(product_variation::Column::Id.eq(variant_id))
        .filter(product_variation::Column::StockInHand.gte(quantity))
        .filter(product_variation::Column::DeletedAt.is_null())
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(stock_failure(conn, variant_id, quantity).await);
    }

    Ok(())
}

/// Unconditionally returns quantity to stock (item shrunk or removed).
///
/// Works on soft-deleted variants too: an order may release stock it holds
/// against a variant that has since been retired from the catalog.
pub async fn release<C: ConnectionTrait>(
    conn: &C,
    variant_id: Uuid,
    quantity: i32,
) -> Result<(), ServiceError> {
    if quantity == 0 {
        return Ok(());
    }
    if quantity < 0 {
        return Err(ServiceError::ValidationError(format!(
            "Release quantity must be non-negative, got {}",
            quantity
        )));
    }

    let result = product_variation::Entity::update_many()
        .col_expr(
            product_variation::Column::StockInHand,
            Expr::col(product_variation::Column::StockInHand).add(quantity),
        )
        .col_expr(
            product_variation::Column::UpdatedAt,
            Expr::value(Utc::now()),
        )
        .filter(product_variation::Column::Id.eq(variant_id))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::NotFound(format!(
            "Product variant {} not found",
            variant_id
        )));
    }

    Ok(())
}

/// Finds a live variant by either its unit-level or box-level barcode.
pub async fn find_by_barcode<C: ConnectionTrait>(
    conn: &C,
    code: &str,
) -> Result<Option<product_variation::Model>, ServiceError> {
    let variant = product_variation::Entity::find()
        .filter(
            Condition::any()
                .add(product_variation::Column::UnitBarcode.eq(code))
                .add(product_variation::Column::BoxBarcode.eq(code)),
        )
        .filter(product_variation::Column::DeletedAt.is_null())
        .one(conn)
        .await?;
    Ok(variant)
}

/// Finds a live (non-deleted) variant by id.
pub async fn find_active<C: ConnectionTrait>(
    conn: &C,
    variant_id: Uuid,
) -> Result<Option<product_variation::Model>, ServiceError> {
    let variant = product_variation::Entity::find_by_id(variant_id)
        .filter(product_variation::Column::DeletedAt.is_null())
        .one(conn)
        .await?;
    Ok(variant)
}

/// Loads a variant together with its product and variation names.
pub async fn variant_with_names<C: ConnectionTrait>(
    conn: &C,
    variant_id: Uuid,
) -> Result<Option<(product_variation::Model, String, String)>, ServiceError> {
    let Some(variant) = find_active(conn, variant_id).await? else {
        return Ok(None);
    };

    let product_name = product::Entity::find_by_id(variant.product_id)
        .one(conn)
        .await?
        .map(|p| p.name)
        .unwrap_or_else(|| "unknown".to_string());
    let variation_name = variation::Entity::find_by_id(variant.variation_id)
        .one(conn)
        .await?
        .map(|v| v.name)
        .unwrap_or_else(|| "unknown".to_string());

    Ok(Some((variant, product_name, variation_name)))
}

async fn stock_failure<C: ConnectionTrait>(
    conn: &C,
    variant_id: Uuid,
    requested: i32,
) -> ServiceError {
    match variant_with_names(conn, variant_id).await {
        Ok(Some((variant, product_name, variation_name))) => ServiceError::InsufficientStock {
            product: product_name,
            variant: variation_name,
            requested,
            available: variant.stock_in_hand,
        },
        Ok(None) => {
            ServiceError::NotFound(format!("Product variant {} not found", variant_id))
        }
        Err(err) => err,
    }
}
