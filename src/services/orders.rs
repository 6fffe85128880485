//! Order lifecycle: create, scan-merge, update, finalize, cancel, delete.
//!
//! Every entry point runs inside one database transaction: validate, adjust
//! stock per item, recompute the aggregate totals, commit. Any failure rolls
//! the whole operation back; stock and totals never drift apart.

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{
    order::{self, OrderStatus},
    order_item, product, product_variation, seller, variation,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::barcode::{self, BarcodeKind};
use crate::services::inventory;
use crate::services::pricing;

const SCAN_RETRY_LIMIT: u32 = 3;

/// One requested line. `variant` accepts the variant UUID, falling back to a
/// barcode lookup when the value does not parse or the id misses.
/// Price/GST are optional overrides; when absent the existing snapshot (or,
/// for new lines, the current catalog values) is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub variant: String,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
    pub gst_percent: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub seller_id: Uuid,
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<OrderItemInput>,
}

/// Full replacement set: items absent from the list are removed and their
/// stock released.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateOrderRequest {
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ScanRequest {
    pub seller_id: Uuid,
    #[validate(length(min = 1, message = "Barcode is required"))]
    pub barcode: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_variation_id: Uuid,
    pub product_name: String,
    pub variation_name: String,
    pub quantity: i32,
    pub box_quantity: i32,
    pub unit_price: Decimal,
    pub gst_percent: Decimal,
    pub gst_amount: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub seller_name: String,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub gst_total: Decimal,
    pub grand_total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub seller_name: String,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub gst_total: Decimal,
    pub grand_total: Decimal,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderSummary>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScanResponse {
    pub matched: BarcodeKind,
    pub quantity_added: i32,
    pub order: OrderResponse,
}

/// Per-line box/strip breakdown consumed by the invoice renderer.
#[derive(Debug, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub product_name: String,
    pub variation_name: String,
    pub quantity: i32,
    pub box_quantity: i32,
    pub boxes: i32,
    pub loose_strips: i32,
    pub unit_price: Decimal,
    pub gst_percent: Decimal,
    pub gst_amount: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvoiceData {
    pub order_id: Uuid,
    pub seller_name: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub subtotal: Decimal,
    pub gst_total: Decimal,
    pub grand_total: Decimal,
    pub lines: Vec<InvoiceLine>,
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    async fn send_event(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(event).await;
        }
    }

    /// Creates a completed order from an explicit item list.
    ///
    /// Items are processed in caller order; the first stock failure aborts
    /// the whole transaction, so partial reservations never persist.
    #[instrument(skip(self, request), fields(seller_id = %request.seller_id, item_count = request.items.len()))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;

        let txn = self.db.begin().await?;

        let seller = find_live_seller(&txn, request.seller_id).await?;
        let now = Utc::now();

        let order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            seller_id: Set(seller.id),
            status: Set(OrderStatus::Completed.to_string()),
            subtotal: Set(Decimal::ZERO),
            gst_total: Set(Decimal::ZERO),
            grand_total: Set(Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            deleted_at: Set(None),
        }
        .insert(&txn)
        .await?;

        let mut seen = HashSet::new();
        for (index, input) in request.items.iter().enumerate() {
            validate_quantity(index, input.quantity)?;
            let variant = resolve_variant(&txn, &input.variant).await?;
            if !seen.insert(variant.id) {
                return Err(ServiceError::ValidationError(format!(
                    "Item {}: variant {} appears more than once",
                    index + 1,
                    variant.id
                )));
            }
            inventory::reserve(&txn, variant.id, input.quantity).await?;
            insert_item(&txn, order.id, &variant, input, now).await?;
        }

        let order = write_totals(&txn, order, now).await?;
        txn.commit().await?;

        info!(order_id = %order.id, grand_total = %order.grand_total, "Order created");
        self.send_event(Event::OrderCreated(order.id)).await;

        self.get_order(order.id).await
    }

    /// Merges one scan into the seller's open order of the day, creating it
    /// if absent. A box-level code counts for a full box of strips; only the
    /// incremental quantity is reserved.
    ///
    /// Retries a few times on lock contention or a lost find-or-create race:
    /// repeated scans for the same seller all contend on the shared day order.
    #[instrument(skip(self, request), fields(seller_id = %request.seller_id, barcode = %request.barcode))]
    pub async fn scan(&self, request: ScanRequest) -> Result<ScanResponse, ServiceError> {
        request.validate()?;

        let mut attempts = 0;
        loop {
            match self.scan_once(&request).await {
                Err(ServiceError::DatabaseError(err))
                    if attempts < SCAN_RETRY_LIMIT
                        && (is_lock_contention(&err) || is_unique_violation(&err)) =>
                {
                    attempts += 1;
                    warn!(attempt = attempts, "Retrying scan after conflict: {}", err);
                    tokio::time::sleep(std::time::Duration::from_millis(25 << attempts)).await;
                }
                result => return result,
            }
        }
    }

    async fn scan_once(&self, request: &ScanRequest) -> Result<ScanResponse, ServiceError> {
        let txn = self.db.begin().await?;

        let seller = find_live_seller(&txn, request.seller_id).await?;
        let hit = barcode::resolve(&txn, &request.barcode).await?;
        let now = Utc::now();

        let day_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let day_end = day_start + ChronoDuration::days(1);

        let mut query = order::Entity::find()
            .filter(order::Column::SellerId.eq(seller.id))
            .filter(order::Column::Status.eq(OrderStatus::Open.to_string()))
            .filter(order::Column::DeletedAt.is_null());
        if txn.get_database_backend() == DbBackend::Postgres {
            // Concurrent scans for the same seller serialize on this row.
            // SQLite serializes writers at the connection level already.
            query = query.lock_exclusive();
        }

        // A unique index allows one live open order per seller. Locking an
        // empty result set protects nothing, so two first-scans of the day
        // can both reach the insert; the loser hits the index and the retry
        // loop picks up the winner's row.
        let order = match query.one(&txn).await? {
            Some(existing) if existing.created_at >= day_start && existing.created_at < day_end => {
                existing
            }
            stale => {
                if let Some(stale) = stale {
                    // A cart left open from a previous day closes out before
                    // today's order can exist.
                    info!(order_id = %stale.id, "Finalizing stale open order from a previous day");
                    let mut active: order::ActiveModel = stale.into();
                    active.status = Set(OrderStatus::Completed.to_string());
                    active.updated_at = Set(Some(now));
                    active.update(&txn).await?;
                }
                order::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    seller_id: Set(seller.id),
                    status: Set(OrderStatus::Open.to_string()),
                    subtotal: Set(Decimal::ZERO),
                    gst_total: Set(Decimal::ZERO),
                    grand_total: Set(Decimal::ZERO),
                    created_at: Set(now),
                    updated_at: Set(Some(now)),
                    deleted_at: Set(None),
                }
                .insert(&txn)
                .await?
            }
        };

        inventory::reserve(&txn, hit.variant.id, hit.multiplier).await?;

        let existing_item = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .filter(order_item::Column::ProductVariationId.eq(hit.variant.id))
            .one(&txn)
            .await?;

        match existing_item {
            Some(item) => {
                // Line amounts come from the cumulative quantity and the
                // snapshot taken when the line was first created.
                let quantity = item.quantity + hit.multiplier;
                let amounts = pricing::line_amounts(item.unit_price, quantity, item.gst_percent);
                let mut active: order_item::ActiveModel = item.into();
                active.quantity = Set(quantity);
                active.gst_amount = Set(amounts.gst_amount);
                active.total = Set(amounts.total);
                active.updated_at = Set(Some(now));
                active.update(&txn).await?;
            }
            None => {
                let input = OrderItemInput {
                    variant: hit.variant.id.to_string(),
                    quantity: hit.multiplier,
                    unit_price: None,
                    gst_percent: None,
                };
                insert_item(&txn, order.id, &hit.variant, &input, now).await?;
            }
        }

        let order = write_totals(&txn, order, now).await?;
        txn.commit().await?;

        info!(order_id = %order.id, variant_id = %hit.variant.id, added = hit.multiplier, "Scan merged");
        self.send_event(Event::OrderScanned {
            order_id: order.id,
            variant_id: hit.variant.id,
            quantity_added: hit.multiplier,
        })
        .await;

        Ok(ScanResponse {
            matched: hit.kind,
            quantity_added: hit.multiplier,
            order: self.get_order(order.id).await?,
        })
    }

    /// Replaces the order's item set, reconciling stock by quantity diff.
    ///
    /// Only the diff is reserved or released, so replaying the same payload
    /// changes neither totals nor net stock.
    #[instrument(skip(self, request), fields(order_id = %order_id, item_count = request.items.len()))]
    pub async fn update_order(
        &self,
        order_id: Uuid,
        request: UpdateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        let txn = self.db.begin().await?;

        let order = find_live_order(&txn, order_id).await?;
        let status = order_status(&order)?;
        if status == OrderStatus::Cancelled {
            return Err(ServiceError::InvalidOperation(
                "Cannot update a cancelled order".to_string(),
            ));
        }

        let existing: HashMap<Uuid, order_item::Model> = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|item| (item.product_variation_id, item))
            .collect();

        let now = Utc::now();
        let mut seen = HashSet::new();

        for (index, input) in request.items.iter().enumerate() {
            validate_quantity(index, input.quantity)?;
            let variant = resolve_variant(&txn, &input.variant).await?;
            if !seen.insert(variant.id) {
                return Err(ServiceError::ValidationError(format!(
                    "Item {}: variant {} appears more than once",
                    index + 1,
                    variant.id
                )));
            }

            let old_quantity = existing.get(&variant.id).map(|i| i.quantity).unwrap_or(0);
            let diff = input.quantity - old_quantity;
            if diff > 0 {
                // Stock already reflects the old reservation; only the
                // increase is guarded.
                inventory::reserve(&txn, variant.id, diff).await?;
            } else if diff < 0 {
                inventory::release(&txn, variant.id, -diff).await?;
            }

            match existing.get(&variant.id) {
                Some(item) => {
                    let (unit_price, gst_percent) =
                        snapshot_values(input, item.unit_price, item.gst_percent)?;
                    let amounts = pricing::line_amounts(unit_price, input.quantity, gst_percent);
                    let mut active: order_item::ActiveModel = item.clone().into();
                    active.quantity = Set(input.quantity);
                    active.unit_price = Set(unit_price);
                    active.gst_percent = Set(gst_percent);
                    active.gst_amount = Set(amounts.gst_amount);
                    active.total = Set(amounts.total);
                    active.updated_at = Set(Some(now));
                    active.update(&txn).await?;
                }
                None => {
                    insert_item(&txn, order.id, &variant, input, now).await?;
                }
            }
        }

        // Anything not in the incoming set is removed and its stock returned.
        for (variant_id, item) in &existing {
            if !seen.contains(variant_id) {
                inventory::release(&txn, *variant_id, item.quantity).await?;
                order_item::Entity::delete_by_id(item.id).exec(&txn).await?;
            }
        }

        let order = write_totals(&txn, order, now).await?;
        txn.commit().await?;

        info!(order_id = %order.id, grand_total = %order.grand_total, "Order updated");
        self.send_event(Event::OrderUpdated(order.id)).await;

        self.get_order(order_id).await
    }

    /// Closes the seller's accumulating scan cart: OPEN -> COMPLETED.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn finalize_order(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        let order = find_live_order(&*self.db, order_id).await?;
        let status = order_status(&order)?;
        if status != OrderStatus::Open {
            return Err(ServiceError::InvalidOperation(format!(
                "Only open orders can be finalized; order is {}",
                status
            )));
        }

        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Completed.to_string());
        active.updated_at = Set(Some(Utc::now()));
        let order = active.update(&*self.db).await?;

        info!(order_id = %order.id, "Order finalized");
        self.send_event(Event::OrderFinalized(order.id)).await;

        self.get_order(order_id).await
    }

    /// Cancels an order, returning all reserved quantities to stock.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_order(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        let txn = self.db.begin().await?;

        let order = find_live_order(&txn, order_id).await?;
        let status = order_status(&order)?;
        if status == OrderStatus::Cancelled {
            return Err(ServiceError::InvalidOperation(
                "Order is already cancelled".to_string(),
            ));
        }

        release_all_items(&txn, order.id).await?;

        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Cancelled.to_string());
        active.updated_at = Set(Some(Utc::now()));
        let order = active.update(&txn).await?;

        txn.commit().await?;

        info!(order_id = %order.id, "Order cancelled, stock released");
        self.send_event(Event::OrderCancelled(order.id)).await;

        self.get_order(order_id).await
    }

    /// Soft-deletes an order. Reservations held by the order are released,
    /// keeping deletion symmetric with the update/remove-item flow; orders
    /// already cancelled released their stock at cancellation.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn delete_order(&self, order_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let order = find_live_order(&txn, order_id).await?;
        let status = order_status(&order)?;
        if status != OrderStatus::Cancelled {
            release_all_items(&txn, order.id).await?;
        }

        let now = Utc::now();
        let mut active: order::ActiveModel = order.into();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(Some(now));
        active.update(&txn).await?;

        txn.commit().await?;

        info!(order_id = %order_id, "Order deleted");
        self.send_event(Event::OrderDeleted(order_id)).await;

        Ok(())
    }

    /// Loads an order with per-item product/variation names for display.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db;
        let order = find_live_order(db, order_id).await?;
        let status = order_status(&order)?;

        let seller_name = seller::Entity::find_by_id(order.seller_id)
            .one(db)
            .await?
            .map(|s| s.name)
            .unwrap_or_else(|| "unknown".to_string());

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(db)
            .await?;

        let lookup = ItemLookup::load(db, &items).await?;

        let item_responses = items
            .iter()
            .map(|item| {
                let (product_name, variation_name, box_quantity) = lookup.names_for(item);
                OrderItemResponse {
                    id: item.id,
                    product_id: item.product_id,
                    product_variation_id: item.product_variation_id,
                    product_name,
                    variation_name,
                    quantity: item.quantity,
                    box_quantity,
                    unit_price: item.unit_price,
                    gst_percent: item.gst_percent,
                    gst_amount: item.gst_amount,
                    total: item.total,
                }
            })
            .collect();

        Ok(OrderResponse {
            id: order.id,
            seller_id: order.seller_id,
            seller_name,
            status,
            subtotal: order.subtotal,
            gst_total: order.gst_total,
            grand_total: order.grand_total,
            created_at: order.created_at,
            updated_at: order.updated_at,
            items: item_responses,
        })
    }

    /// Lists non-deleted orders, newest first.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
        seller_id: Option<Uuid>,
    ) -> Result<OrderListResponse, ServiceError> {
        let db = &*self.db;
        let page = page.max(1);

        let mut query = order::Entity::find()
            .filter(order::Column::DeletedAt.is_null())
            .order_by_desc(order::Column::CreatedAt);
        if let Some(seller_id) = seller_id {
            query = query.filter(order::Column::SellerId.eq(seller_id));
        }

        let paginator = query.paginate(db, per_page);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;

        let seller_ids: Vec<Uuid> = orders.iter().map(|o| o.seller_id).collect();
        let sellers: HashMap<Uuid, String> = seller::Entity::find()
            .filter(seller::Column::Id.is_in(seller_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();

        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let counts: HashMap<Uuid, i64> = order_item::Entity::find()
            .select_only()
            .column(order_item::Column::OrderId)
            .column_as(order_item::Column::Id.count(), "item_count")
            .filter(order_item::Column::OrderId.is_in(order_ids))
            .group_by(order_item::Column::OrderId)
            .into_tuple::<(Uuid, i64)>()
            .all(db)
            .await?
            .into_iter()
            .collect();

        let summaries = orders
            .into_iter()
            .map(|o| {
                let status = order_status(&o)?;
                Ok(OrderSummary {
                    id: o.id,
                    seller_id: o.seller_id,
                    seller_name: sellers
                        .get(&o.seller_id)
                        .cloned()
                        .unwrap_or_else(|| "unknown".to_string()),
                    status,
                    subtotal: o.subtotal,
                    gst_total: o.gst_total,
                    grand_total: o.grand_total,
                    item_count: counts.get(&o.id).copied().unwrap_or(0),
                    created_at: o.created_at,
                })
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        Ok(OrderListResponse {
            orders: summaries,
            total,
            page,
            per_page,
        })
    }

    /// Builds the invoice projection: order totals plus the printed box/strip
    /// breakdown per line. Soft-deleted orders stay printable.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn invoice_data(&self, order_id: Uuid) -> Result<InvoiceData, ServiceError> {
        let db = &*self.db;

        let order = order::Entity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        let status = order_status(&order)?;

        let seller_name = seller::Entity::find_by_id(order.seller_id)
            .one(db)
            .await?
            .map(|s| s.name)
            .unwrap_or_else(|| "unknown".to_string());

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(db)
            .await?;

        let lookup = ItemLookup::load(db, &items).await?;

        let lines = items
            .iter()
            .map(|item| {
                let (product_name, variation_name, box_quantity) = lookup.names_for(item);
                let (boxes, loose_strips) = pricing::split_strips(item.quantity, box_quantity);
                InvoiceLine {
                    product_name,
                    variation_name,
                    quantity: item.quantity,
                    box_quantity,
                    boxes,
                    loose_strips,
                    unit_price: item.unit_price,
                    gst_percent: item.gst_percent,
                    gst_amount: item.gst_amount,
                    total: item.total,
                }
            })
            .collect();

        Ok(InvoiceData {
            order_id: order.id,
            seller_name,
            status,
            created_at: order.created_at,
            subtotal: order.subtotal,
            gst_total: order.gst_total,
            grand_total: order.grand_total,
            lines,
        })
    }
}

/// Batch-loaded display data for a set of order items. Soft-deleted catalog
/// rows are included: historical orders keep their names.
struct ItemLookup {
    variants: HashMap<Uuid, product_variation::Model>,
    products: HashMap<Uuid, String>,
    variations: HashMap<Uuid, String>,
}

impl ItemLookup {
    async fn load<C: ConnectionTrait>(
        conn: &C,
        items: &[order_item::Model],
    ) -> Result<Self, ServiceError> {
        let variant_ids: Vec<Uuid> = items.iter().map(|i| i.product_variation_id).collect();
        let variants: HashMap<Uuid, product_variation::Model> = product_variation::Entity::find()
            .filter(product_variation::Column::Id.is_in(variant_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|v| (v.id, v))
            .collect();

        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let products: HashMap<Uuid, String> = product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        let variation_ids: Vec<Uuid> = variants.values().map(|v| v.variation_id).collect();
        let variations: HashMap<Uuid, String> = variation::Entity::find()
            .filter(variation::Column::Id.is_in(variation_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|v| (v.id, v.name))
            .collect();

        Ok(Self {
            variants,
            products,
            variations,
        })
    }

    fn names_for(&self, item: &order_item::Model) -> (String, String, i32) {
        let product_name = self
            .products
            .get(&item.product_id)
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());
        let variant = self.variants.get(&item.product_variation_id);
        let variation_name = variant
            .and_then(|v| self.variations.get(&v.variation_id))
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());
        let box_quantity = variant.map(|v| v.box_quantity).unwrap_or(0);
        (product_name, variation_name, box_quantity)
    }
}

fn order_status(order: &order::Model) -> Result<OrderStatus, ServiceError> {
    order
        .order_status()
        .map_err(|_| ServiceError::InvalidStatus(order.status.clone()))
}

fn validate_quantity(index: usize, quantity: i32) -> Result<(), ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::ValidationError(format!(
            "Item {}: quantity must be a positive integer, got {}",
            index + 1,
            quantity
        )));
    }
    Ok(())
}

/// Applies explicit overrides on top of the existing snapshot defaults.
fn snapshot_values(
    input: &OrderItemInput,
    default_price: Decimal,
    default_gst: Decimal,
) -> Result<(Decimal, Decimal), ServiceError> {
    let unit_price = input.unit_price.unwrap_or(default_price);
    let gst_percent = input.gst_percent.unwrap_or(default_gst);
    if unit_price < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Unit price cannot be negative".to_string(),
        ));
    }
    if gst_percent < Decimal::ZERO || gst_percent > Decimal::from(100) {
        return Err(ServiceError::ValidationError(
            "GST percent must be between 0 and 100".to_string(),
        ));
    }
    Ok((unit_price, gst_percent))
}

/// Resolves a variant reference: UUID primary key first, then barcode.
/// Both attempts run on the caller's transaction.
async fn resolve_variant<C: ConnectionTrait>(
    conn: &C,
    identifier: &str,
) -> Result<product_variation::Model, ServiceError> {
    if let Ok(id) = Uuid::parse_str(identifier) {
        if let Some(variant) = inventory::find_active(conn, id).await? {
            return Ok(variant);
        }
    }
    inventory::find_by_barcode(conn, identifier)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Product variant {} not found", identifier))
        })
}

async fn find_live_seller<C: ConnectionTrait>(
    conn: &C,
    seller_id: Uuid,
) -> Result<seller::Model, ServiceError> {
    seller::Entity::find_by_id(seller_id)
        .filter(seller::Column::DeletedAt.is_null())
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Seller {} not found", seller_id)))
}

async fn find_live_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<order::Model, ServiceError> {
    order::Entity::find_by_id(order_id)
        .filter(order::Column::DeletedAt.is_null())
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
}

/// Inserts a new line, snapshotting price from the variant and GST from the
/// product unless the input overrides them.
async fn insert_item<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    variant: &product_variation::Model,
    input: &OrderItemInput,
    now: DateTime<Utc>,
) -> Result<order_item::Model, ServiceError> {
    let product = product::Entity::find_by_id(variant.product_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Product {} not found", variant.product_id))
        })?;

    let (unit_price, gst_percent) = snapshot_values(input, variant.unit_price, product.gst_percent)?;
    let amounts = pricing::line_amounts(unit_price, input.quantity, gst_percent);

    let item = order_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        product_id: Set(variant.product_id),
        product_variation_id: Set(variant.id),
        quantity: Set(input.quantity),
        unit_price: Set(unit_price),
        gst_percent: Set(gst_percent),
        gst_amount: Set(amounts.gst_amount),
        total: Set(amounts.total),
        created_at: Set(now),
        updated_at: Set(Some(now)),
    }
    .insert(conn)
    .await?;

    Ok(item)
}

/// Recomputes the aggregate from all current items and persists it. Totals
/// are always rebuilt in full; nothing is incremented in place.
async fn write_totals<C: ConnectionTrait>(
    conn: &C,
    order: order::Model,
    now: DateTime<Utc>,
) -> Result<order::Model, ServiceError> {
    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .all(conn)
        .await?;

    let mut subtotal = Decimal::ZERO;
    let mut gst_total = Decimal::ZERO;
    for item in &items {
        let amounts = pricing::line_amounts(item.unit_price, item.quantity, item.gst_percent);
        subtotal += amounts.base;
        gst_total += amounts.gst_amount;
    }
    let subtotal = pricing::round2(subtotal);
    let gst_total = pricing::round2(gst_total);
    let grand_total = pricing::round2(subtotal + gst_total);

    let mut active: order::ActiveModel = order.into();
    active.subtotal = Set(subtotal);
    active.gst_total = Set(gst_total);
    active.grand_total = Set(grand_total);
    active.updated_at = Set(Some(now));
    Ok(active.update(conn).await?)
}

/// Returns every item's full quantity to stock (cancel and delete flows).
async fn release_all_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<(), ServiceError> {
    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .all(conn)
        .await?;
    for item in items {
        inventory::release(conn, item.product_variation_id, item.quantity).await?;
    }
    Ok(())
}

/// Backend-agnostic sniff for retryable lock/serialization failures.
fn is_lock_contention(err: &DbErr) -> bool {
    let message = err.to_string().to_ascii_lowercase();
    message.contains("deadlock")
        || message.contains("could not serialize")
        || message.contains("database is locked")
        || message.contains("lock wait timeout")
}

/// A lost find-or-create race on the seller's open order surfaces as a
/// unique-index violation; the retry finds the winner's row instead.
fn is_unique_violation(err: &DbErr) -> bool {
    let message = err.to_string().to_ascii_lowercase();
    message.contains("unique constraint") || message.contains("duplicate key")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_contention_detection() {
        assert!(is_lock_contention(&DbErr::Custom(
            "Execution Error: database is locked".into()
        )));
        assert!(is_lock_contention(&DbErr::Custom(
            "ERROR: could not serialize access due to concurrent update".into()
        )));
        assert!(!is_lock_contention(&DbErr::Custom(
            "UNIQUE constraint failed: order_items.id".into()
        )));
    }

    #[test]
    fn unique_violation_detection() {
        assert!(is_unique_violation(&DbErr::Custom(
            "UNIQUE constraint failed: orders.seller_id".into()
        )));
        assert!(is_unique_violation(&DbErr::Custom(
            "ERROR: duplicate key value violates unique constraint \"uq_orders_seller_live_open\""
                .into()
        )));
        assert!(!is_unique_violation(&DbErr::Custom(
            "Execution Error: database is locked".into()
        )));
    }

    #[test]
    fn snapshot_overrides_win_over_defaults() {
        let input = OrderItemInput {
            variant: "x".into(),
            quantity: 1,
            unit_price: Some(Decimal::new(4250, 2)),
            gst_percent: None,
        };
        let (price, gst) = snapshot_values(&input, Decimal::new(9900, 2), Decimal::from(18))
            .expect("valid snapshot");
        assert_eq!(price, Decimal::new(4250, 2));
        assert_eq!(gst, Decimal::from(18));
    }

    #[test]
    fn snapshot_rejects_out_of_range_gst() {
        let input = OrderItemInput {
            variant: "x".into(),
            quantity: 1,
            unit_price: None,
            gst_percent: Some(Decimal::from(101)),
        };
        assert!(snapshot_values(&input, Decimal::ZERO, Decimal::ZERO).is_err());
    }
}
