pub mod catalog;
pub mod common;
pub mod orders;
pub mod scan;
pub mod sellers;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<crate::services::orders::OrderService>,
    pub sellers: Arc<crate::services::sellers::SellerService>,
    pub catalog: Arc<crate::services::catalog::CatalogService>,
    pub barcode: Arc<crate::services::barcode::BarcodeService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let orders = Arc::new(crate::services::orders::OrderService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let sellers = Arc::new(crate::services::sellers::SellerService::new(db_pool.clone()));
        let catalog = Arc::new(crate::services::catalog::CatalogService::new(db_pool.clone()));
        let barcode = Arc::new(crate::services::barcode::BarcodeService::new(
            db_pool,
            event_sender,
        ));

        Self {
            orders,
            sellers,
            catalog,
            barcode,
        }
    }
}
