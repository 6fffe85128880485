mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use godown_api::errors::ServiceError;
use godown_api::services::inventory;

use common::TestApp;

// Concurrent reservations against one variant must never oversell: the
// decrement is a single conditional UPDATE, so each unit of stock is granted
// at most once no matter how the attempts interleave.
#[tokio::test]
async fn concurrent_reservations_never_oversell() {
    let app = TestApp::new().await;
    let variant = app
        .seed_variant("Glucose", Decimal::from(5), "500g", dec!(42.00), 10, 10, None, None)
        .await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let db = app.state.db.clone();
        let variant_id = variant.id;
        tasks.push(tokio::spawn(async move {
            inventory::reserve(&*db, variant_id, 3).await
        }));
    }

    let mut granted = 0;
    for task in tasks {
        match task.await.expect("reserve task panicked") {
            Ok(()) => granted += 1,
            Err(ServiceError::InsufficientStock {
                requested,
                available,
                ..
            }) => {
                assert_eq!(requested, 3);
                assert!(available < 3);
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    // 10 units cover at most three 3-unit reservations.
    assert_eq!(granted, 3);
    assert_eq!(app.stock_of(variant.id).await, 10 - granted * 3);
}

#[tokio::test]
async fn release_returns_stock_even_for_retired_variants() {
    let app = TestApp::new().await;
    let variant = app
        .seed_variant("Iron Tonic", Decimal::from(18), "200ml", dec!(130.00), 6, 20, None, None)
        .await;

    inventory::reserve(&*app.state.db, variant.id, 5)
        .await
        .expect("reserve");
    assert_eq!(app.stock_of(variant.id).await, 15);

    app.state
        .services
        .catalog
        .delete_variant(variant.id)
        .await
        .expect("soft delete variant");

    // An order shrinking after the catalog retired the variant still gets
    // its stock back.
    inventory::release(&*app.state.db, variant.id, 5)
        .await
        .expect("release");
    assert_eq!(app.stock_of(variant.id).await, 20);

    // But new reservations against a retired variant are refused.
    let err = inventory::reserve(&*app.state.db, variant.id, 1)
        .await
        .expect_err("reserve against deleted variant");
    assert!(matches!(err, ServiceError::NotFound(_)));
}
