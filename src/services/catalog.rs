//! Catalog maintenance: products, variations, and sellable variants.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{product, product_variation, variation};
use crate::errors::ServiceError;
use crate::services::inventory;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: String,
    pub gst_percent: Decimal,
    pub hsn_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub gst_percent: Option<Decimal>,
    pub hsn_code: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateVariationRequest {
    #[validate(length(min = 1, message = "Variation name is required"))]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateVariantRequest {
    pub product_id: Uuid,
    pub variation_id: Uuid,
    pub unit_price: Decimal,
    pub box_quantity: i32,
    pub stock_in_hand: i32,
    pub unit_barcode: Option<String>,
    pub box_barcode: Option<String>,
}

/// Absent fields are left unchanged. `stock_in_hand` here is an absolute
/// correction (stocktake); order flows never call this.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateVariantRequest {
    pub unit_price: Option<Decimal>,
    pub box_quantity: Option<i32>,
    pub stock_in_hand: Option<i32>,
    pub unit_barcode: Option<String>,
    pub box_barcode: Option<String>,
    pub is_active: Option<bool>,
}

/// Flattened row for the variant listing screen.
#[derive(Debug, Serialize, Deserialize)]
pub struct VariantRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub variation_id: Uuid,
    pub variation_name: String,
    pub unit_price: Decimal,
    pub gst_percent: Decimal,
    pub box_quantity: i32,
    pub stock_in_hand: i32,
    pub unit_barcode: Option<String>,
    pub box_barcode: Option<String>,
    pub is_active: bool,
    pub is_deleted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VariantListResponse {
    pub variants: Vec<VariantRow>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductListResponse {
    pub products: Vec<product::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;
        validate_gst(request.gst_percent)?;

        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            gst_percent: Set(request.gst_percent),
            hsn_code: Set(request.hsn_code),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            deleted_at: Set(None),
        }
        .insert(&*self.db)
        .await?;

        info!(product_id = %model.id, "Product created");
        Ok(model)
    }

    /// Changing `gst_percent` only affects future order lines; existing
    /// snapshots keep the rate they were billed at.
    #[instrument(skip(self, request), fields(product_id = %product_id))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        let product = product::Entity::find_by_id(product_id)
            .filter(product::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        if let Some(gst) = request.gst_percent {
            validate_gst(gst)?;
        }
        if let Some(name) = &request.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Product name cannot be empty".to_string(),
                ));
            }
        }

        let mut active: product::ActiveModel = product.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(gst) = request.gst_percent {
            active.gst_percent = Set(gst);
        }
        if let Some(hsn_code) = request.hsn_code {
            active.hsn_code = Set(Some(hsn_code));
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now()));

        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: u64,
        per_page: u64,
        search: Option<String>,
    ) -> Result<ProductListResponse, ServiceError> {
        let page = page.max(1);

        let mut query = product::Entity::find()
            .filter(product::Column::DeletedAt.is_null())
            .order_by_asc(product::Column::Name);

        if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            query = query.filter(product::Column::Name.like(&pattern));
        }

        let paginator = query.paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page - 1).await?;

        Ok(ProductListResponse {
            products,
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_variation(
        &self,
        request: CreateVariationRequest,
    ) -> Result<variation::Model, ServiceError> {
        request.validate()?;

        let now = Utc::now();
        let model = variation::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(&*self.db)
        .await?;

        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn list_variations(&self) -> Result<Vec<variation::Model>, ServiceError> {
        Ok(variation::Entity::find()
            .order_by_asc(variation::Column::Name)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    pub async fn create_variant(
        &self,
        request: CreateVariantRequest,
    ) -> Result<product_variation::Model, ServiceError> {
        if request.unit_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Unit price cannot be negative".to_string(),
            ));
        }
        if request.stock_in_hand < 0 {
            return Err(ServiceError::ValidationError(
                "Stock cannot be negative".to_string(),
            ));
        }
        if request.box_quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Box quantity must be positive".to_string(),
            ));
        }

        product::Entity::find_by_id(request.product_id)
            .filter(product::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", request.product_id))
            })?;
        variation::Entity::find_by_id(request.variation_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Variation {} not found", request.variation_id))
            })?;

        for code in [&request.unit_barcode, &request.box_barcode]
            .into_iter()
            .flatten()
        {
            if inventory::find_by_barcode(&*self.db, code).await?.is_some() {
                return Err(ServiceError::Conflict(format!(
                    "Barcode {} is already assigned to another variant",
                    code
                )));
            }
        }

        let now = Utc::now();
        let model = product_variation::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(request.product_id),
            variation_id: Set(request.variation_id),
            unit_price: Set(request.unit_price),
            box_quantity: Set(request.box_quantity),
            stock_in_hand: Set(request.stock_in_hand),
            unit_barcode: Set(request.unit_barcode),
            box_barcode: Set(request.box_barcode),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            deleted_at: Set(None),
        }
        .insert(&*self.db)
        .await?;

        info!(variant_id = %model.id, "Variant created");
        Ok(model)
    }

    #[instrument(skip(self, request), fields(variant_id = %variant_id))]
    pub async fn update_variant(
        &self,
        variant_id: Uuid,
        request: UpdateVariantRequest,
    ) -> Result<product_variation::Model, ServiceError> {
        let variant = inventory::find_active(&*self.db, variant_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product variant {} not found", variant_id))
            })?;

        if let Some(price) = request.unit_price {
            if price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Unit price cannot be negative".to_string(),
                ));
            }
        }
        if let Some(stock) = request.stock_in_hand {
            if stock < 0 {
                return Err(ServiceError::ValidationError(
                    "Stock cannot be negative".to_string(),
                ));
            }
        }
        if let Some(box_quantity) = request.box_quantity {
            if box_quantity <= 0 {
                return Err(ServiceError::ValidationError(
                    "Box quantity must be positive".to_string(),
                ));
            }
        }

        for code in [&request.unit_barcode, &request.box_barcode]
            .into_iter()
            .flatten()
        {
            if let Some(owner) = inventory::find_by_barcode(&*self.db, code).await? {
                if owner.id != variant_id {
                    return Err(ServiceError::Conflict(format!(
                        "Barcode {} is already assigned to another variant",
                        code
                    )));
                }
            }
        }

        let mut active: product_variation::ActiveModel = variant.into();
        if let Some(price) = request.unit_price {
            active.unit_price = Set(price);
        }
        if let Some(box_quantity) = request.box_quantity {
            active.box_quantity = Set(box_quantity);
        }
        if let Some(stock) = request.stock_in_hand {
            active.stock_in_hand = Set(stock);
        }
        if let Some(unit_barcode) = request.unit_barcode {
            active.unit_barcode = Set(Some(unit_barcode));
        }
        if let Some(box_barcode) = request.box_barcode {
            active.box_barcode = Set(Some(box_barcode));
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now()));

        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self), fields(variant_id = %variant_id))]
    pub async fn delete_variant(&self, variant_id: Uuid) -> Result<(), ServiceError> {
        let variant = inventory::find_active(&*self.db, variant_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product variant {} not found", variant_id))
            })?;

        let now = Utc::now();
        let mut active: product_variation::ActiveModel = variant.into();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(Some(now));
        active.update(&*self.db).await?;

        info!(variant_id = %variant_id, "Variant deleted");
        Ok(())
    }

    /// Variant listing with search across product name, variation name, and
    /// both barcodes. `include_deleted` surfaces retired rows for audits.
    #[instrument(skip(self))]
    pub async fn list_variants(
        &self,
        page: u64,
        per_page: u64,
        search: Option<String>,
        include_deleted: bool,
    ) -> Result<VariantListResponse, ServiceError> {
        let db = &*self.db;
        let page = page.max(1);

        let mut query = product_variation::Entity::find()
            .join(JoinType::InnerJoin, product_variation::Relation::Product.def())
            .join(
                JoinType::InnerJoin,
                product_variation::Relation::Variation.def(),
            )
            .order_by_desc(product_variation::Column::CreatedAt);

        if !include_deleted {
            query = query.filter(product_variation::Column::DeletedAt.is_null());
        }

        if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            query = query.filter(
                Condition::any()
                    .add(Expr::col((product::Entity, product::Column::Name)).like(&pattern))
                    .add(Expr::col((variation::Entity, variation::Column::Name)).like(&pattern))
                    .add(product_variation::Column::UnitBarcode.like(&pattern))
                    .add(product_variation::Column::BoxBarcode.like(&pattern)),
            );
        }

        let paginator = query.paginate(db, per_page);
        let total = paginator.num_items().await?;
        let variants = paginator.fetch_page(page - 1).await?;

        let product_ids: Vec<Uuid> = variants.iter().map(|v| v.product_id).collect();
        let products: HashMap<Uuid, product::Model> = product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let variation_ids: Vec<Uuid> = variants.iter().map(|v| v.variation_id).collect();
        let variations: HashMap<Uuid, String> = variation::Entity::find()
            .filter(variation::Column::Id.is_in(variation_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|v| (v.id, v.name))
            .collect();

        let rows = variants
            .into_iter()
            .map(|v| {
                let product = products.get(&v.product_id);
                VariantRow {
                    id: v.id,
                    product_id: v.product_id,
                    product_name: product
                        .map(|p| p.name.clone())
                        .unwrap_or_else(|| "unknown".to_string()),
                    variation_id: v.variation_id,
                    variation_name: variations
                        .get(&v.variation_id)
                        .cloned()
                        .unwrap_or_else(|| "unknown".to_string()),
                    unit_price: v.unit_price,
                    gst_percent: product
                        .map(|p| p.gst_percent)
                        .unwrap_or(Decimal::ZERO),
                    box_quantity: v.box_quantity,
                    stock_in_hand: v.stock_in_hand,
                    unit_barcode: v.unit_barcode,
                    box_barcode: v.box_barcode,
                    is_active: v.is_active,
                    is_deleted: v.deleted_at.is_some(),
                }
            })
            .collect();

        Ok(VariantListResponse {
            variants: rows,
            total,
            page,
            per_page,
        })
    }
}

fn validate_gst(gst_percent: Decimal) -> Result<(), ServiceError> {
    if gst_percent < Decimal::ZERO || gst_percent > Decimal::from(100) {
        return Err(ServiceError::ValidationError(
            "GST percent must be between 0 and 100".to_string(),
        ));
    }
    Ok(())
}
