use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{product, product_variation, variation};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::inventory;

/// Which barcode field a scanned code matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeKind {
    Unit,
    Box,
}

/// A resolved scan: the variant plus how many strips one scan represents.
#[derive(Debug, Clone)]
pub struct ScanHit {
    pub variant: product_variation::Model,
    pub product: product::Model,
    pub variation: variation::Model,
    pub kind: BarcodeKind,
    pub multiplier: i32,
}

/// Resolves a scanned code to a variant and a unit multiplier within the
/// caller's transaction. Box-level codes count for a full box of strips.
pub async fn resolve<C: ConnectionTrait>(conn: &C, code: &str) -> Result<ScanHit, ServiceError> {
    let variant = inventory::find_by_barcode(conn, code)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("No product found with barcode {}", code))
        })?;

    let product = product::Entity::find_by_id(variant.product_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Product {} not found", variant.product_id))
        })?;
    let variation = variation::Entity::find_by_id(variant.variation_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Variation {} not found", variant.variation_id))
        })?;

    let kind = if variant.unit_barcode.as_deref() == Some(code) {
        BarcodeKind::Unit
    } else {
        BarcodeKind::Box
    };
    let multiplier = match kind {
        BarcodeKind::Unit => 1,
        BarcodeKind::Box => variant.box_quantity.max(1),
    };

    Ok(ScanHit {
        variant,
        product,
        variation,
        kind,
        multiplier,
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BarcodeCheckResponse {
    pub kind: BarcodeKind,
    pub product_id: Uuid,
    pub variation_id: Uuid,
    pub product_variation_id: Uuid,
    pub product_name: String,
    pub variation_name: String,
    pub unit_price: Decimal,
    pub gst_percent: Decimal,
    pub box_quantity: i32,
    /// Strips added per scan of this code
    pub multiplier: i32,
    pub stock_in_hand: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct NewProductInput {
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: String,
    pub gst_percent: Decimal,
    pub hsn_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct NewVariationInput {
    #[validate(length(min = 1, message = "Variation name is required"))]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct NewVariantInput {
    pub unit_price: Decimal,
    #[validate(range(min = 1, message = "Box quantity must be at least 1"))]
    pub box_quantity: i32,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock_in_hand: i32,
    pub unit_barcode: Option<String>,
    pub box_barcode: Option<String>,
}

/// Payload for creating a product on the fly after an unknown-barcode scan.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct NewScannedProductRequest {
    #[validate]
    pub product: NewProductInput,
    #[validate]
    pub variation: NewVariationInput,
    #[validate]
    pub variant: NewVariantInput,
}

#[derive(Debug, Serialize)]
pub struct ScannedProductCreated {
    pub product: product::Model,
    pub variation: variation::Model,
    pub variant: product_variation::Model,
}

#[derive(Clone)]
pub struct BarcodeService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl BarcodeService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Read-only lookup backing the scanner UI: tells the caller which code
    /// matched and what one scan of it is worth.
    #[instrument(skip(self))]
    pub async fn check_barcode(&self, code: &str) -> Result<BarcodeCheckResponse, ServiceError> {
        let hit = resolve(&*self.db, code).await?;
        Ok(BarcodeCheckResponse {
            kind: hit.kind,
            product_id: hit.product.id,
            variation_id: hit.variation.id,
            product_variation_id: hit.variant.id,
            product_name: hit.product.name,
            variation_name: hit.variation.name,
            unit_price: hit.variant.unit_price,
            gst_percent: hit.product.gst_percent,
            box_quantity: hit.variant.box_quantity,
            multiplier: hit.multiplier,
            stock_in_hand: hit.variant.stock_in_hand,
        })
    }

    /// Creates product + variation + variant in one transaction. The new
    /// variant starts at the stock level supplied in the payload.
    #[instrument(skip(self, request), fields(product_name = %request.product.name))]
    pub async fn create_product_from_scan(
        &self,
        request: NewScannedProductRequest,
    ) -> Result<ScannedProductCreated, ServiceError> {
        request.validate()?;

        if request.variant.unit_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Unit price cannot be negative".to_string(),
            ));
        }
        if request.product.gst_percent < Decimal::ZERO
            || request.product.gst_percent > Decimal::from(100)
        {
            return Err(ServiceError::ValidationError(
                "GST percent must be between 0 and 100".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        for code in [&request.variant.unit_barcode, &request.variant.box_barcode]
            .into_iter()
            .flatten()
        {
            if inventory::find_by_barcode(&txn, code).await?.is_some() {
                return Err(ServiceError::Conflict(format!(
                    "Barcode {} is already assigned to another variant",
                    code
                )));
            }
        }

        let now = Utc::now();

        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.product.name.clone()),
            gst_percent: Set(request.product.gst_percent),
            hsn_code: Set(request.product.hsn_code.clone()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            deleted_at: Set(None),
        }
        .insert(&txn)
        .await?;

        let variation = variation::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.variation.name.clone()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(&txn)
        .await?;

        let variant = product_variation::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product.id),
            variation_id: Set(variation.id),
            unit_price: Set(request.variant.unit_price),
            box_quantity: Set(request.variant.box_quantity),
            stock_in_hand: Set(request.variant.stock_in_hand),
            unit_barcode: Set(request.variant.unit_barcode.clone()),
            box_barcode: Set(request.variant.box_barcode.clone()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            deleted_at: Set(None),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(product_id = %product.id, variant_id = %variant.id, "Product created from scan");
        self.event_sender
            .send_or_log(Event::ProductCreatedFromScan {
                product_id: product.id,
                variant_id: variant.id,
            })
            .await;

        Ok(ScannedProductCreated {
            product,
            variation,
            variant,
        })
    }
}
