use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use godown_api::{
    config::AppConfig,
    db,
    entities::{product_variation, seller},
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};

/// Helper harness for spinning up an application state backed by a SQLite
/// database file. Each harness gets its own file so tests can run in
/// parallel.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    db_file: std::path::PathBuf,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_file = std::env::temp_dir().join(format!("godown_test_{}.db", Uuid::new_v4()));
        let cfg = AppConfig::for_tests(format!("sqlite://{}?mode=rwc", db_file.display()));

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");

        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db_arc.clone(), Arc::new(event_sender.clone()));

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .nest("/api/v1", godown_api::api_v1_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            db_file,
            _event_task: event_task,
        }
    }

    /// Send a JSON request against the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Create a seller directly through the service layer.
    pub async fn seed_seller(&self, name: &str) -> seller::Model {
        self.state
            .services
            .sellers
            .create_seller(godown_api::services::sellers::CreateSellerRequest {
                name: name.to_string(),
                phone: Some("9000000000".to_string()),
                address: None,
            })
            .await
            .expect("seed seller for tests")
    }

    /// Create product + variation + variant in one go, returning the variant.
    #[allow(clippy::too_many_arguments)]
    pub async fn seed_variant(
        &self,
        product_name: &str,
        gst_percent: Decimal,
        variation_name: &str,
        unit_price: Decimal,
        box_quantity: i32,
        stock_in_hand: i32,
        unit_barcode: Option<&str>,
        box_barcode: Option<&str>,
    ) -> product_variation::Model {
        let catalog = self.state.services.catalog.clone();

        let product = catalog
            .create_product(godown_api::services::catalog::CreateProductRequest {
                name: product_name.to_string(),
                gst_percent,
                hsn_code: Some("3004".to_string()),
            })
            .await
            .expect("seed product for tests");

        let variation = catalog
            .create_variation(godown_api::services::catalog::CreateVariationRequest {
                name: variation_name.to_string(),
            })
            .await
            .expect("seed variation for tests");

        catalog
            .create_variant(godown_api::services::catalog::CreateVariantRequest {
                product_id: product.id,
                variation_id: variation.id,
                unit_price,
                box_quantity,
                stock_in_hand,
                unit_barcode: unit_barcode.map(str::to_string),
                box_barcode: box_barcode.map(str::to_string),
            })
            .await
            .expect("seed product variant for tests")
    }

    /// Current stock for a variant, read straight from the database.
    pub async fn stock_of(&self, variant_id: Uuid) -> i32 {
        product_variation::Entity::find()
            .filter(product_variation::Column::Id.eq(variant_id))
            .one(&*self.state.db)
            .await
            .expect("query variant stock")
            .expect("variant should exist")
            .stock_in_hand
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
        let _ = std::fs::remove_file(&self.db_file);
    }
}

/// Read a response body as JSON.
pub async fn body_json(response: axum::response::Response) -> Value {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&body_bytes).expect("parse response body")
}
