use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::seller;
use crate::errors::ServiceError;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateSellerRequest {
    #[validate(length(min = 1, message = "Seller name is required"))]
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Absent fields are left unchanged.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateSellerRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SellerListResponse {
    pub sellers: Vec<seller::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone)]
pub struct SellerService {
    db: Arc<DbPool>,
}

impl SellerService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_seller(
        &self,
        request: CreateSellerRequest,
    ) -> Result<seller::Model, ServiceError> {
        request.validate()?;

        let now = Utc::now();
        let model = seller::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            phone: Set(request.phone),
            address: Set(request.address),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            deleted_at: Set(None),
        }
        .insert(&*self.db)
        .await?;

        info!(seller_id = %model.id, "Seller created");
        Ok(model)
    }

    #[instrument(skip(self), fields(seller_id = %seller_id))]
    pub async fn get_seller(&self, seller_id: Uuid) -> Result<seller::Model, ServiceError> {
        self.find_live(seller_id).await
    }

    #[instrument(skip(self))]
    pub async fn list_sellers(
        &self,
        page: u64,
        per_page: u64,
        search: Option<String>,
    ) -> Result<SellerListResponse, ServiceError> {
        let page = page.max(1);

        let mut query = seller::Entity::find()
            .filter(seller::Column::DeletedAt.is_null())
            .order_by_asc(seller::Column::Name);

        if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            query = query.filter(
                Condition::any()
                    .add(seller::Column::Name.like(&pattern))
                    .add(seller::Column::Phone.like(&pattern)),
            );
        }

        let paginator = query.paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let sellers = paginator.fetch_page(page - 1).await?;

        Ok(SellerListResponse {
            sellers,
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self, request), fields(seller_id = %seller_id))]
    pub async fn update_seller(
        &self,
        seller_id: Uuid,
        request: UpdateSellerRequest,
    ) -> Result<seller::Model, ServiceError> {
        let seller = self.find_live(seller_id).await?;

        if let Some(name) = &request.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Seller name cannot be empty".to_string(),
                ));
            }
        }

        let mut active: seller::ActiveModel = seller.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(phone) = request.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(address) = request.address {
            active.address = Set(Some(address));
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now()));

        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self), fields(seller_id = %seller_id))]
    pub async fn delete_seller(&self, seller_id: Uuid) -> Result<(), ServiceError> {
        let seller = self.find_live(seller_id).await?;

        let now = Utc::now();
        let mut active: seller::ActiveModel = seller.into();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(Some(now));
        active.update(&*self.db).await?;

        info!(seller_id = %seller_id, "Seller deleted");
        Ok(())
    }

    async fn find_live(&self, seller_id: Uuid) -> Result<seller::Model, ServiceError> {
        seller::Entity::find_by_id(seller_id)
            .filter(seller::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Seller {} not found", seller_id)))
    }
}
