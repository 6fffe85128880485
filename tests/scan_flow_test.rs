mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;
use uuid::Uuid;

use godown_api::entities::order;

use common::{body_json, TestApp};

#[tokio::test]
async fn box_and_unit_scans_accumulate_into_one_order() {
    let app = TestApp::new().await;
    let seller = app.seed_seller("Kulkarni Agencies").await;
    let variant = app
        .seed_variant(
            "Digestive Drops",
            Decimal::from(18),
            "30ml",
            dec!(60.00),
            12,
            50,
            Some("8901000000011"),
            Some("8901000000028"),
        )
        .await;

    // Box-level code counts for a full box of strips.
    let response = app
        .request(
            Method::POST,
            "/api/v1/scan",
            Some(json!({ "seller_id": seller.id.to_string(), "barcode": "8901000000028" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["matched"], "box");
    assert_eq!(body["data"]["quantity_added"], 12);
    assert_eq!(body["data"]["order"]["status"], "open");
    assert_eq!(body["data"]["order"]["items"][0]["quantity"], 12);
    let first_order_id = body["data"]["order"]["id"].as_str().unwrap().to_string();
    assert_eq!(app.stock_of(variant.id).await, 38);

    // Unit-level code adds one more strip to the same line.
    let response = app
        .request(
            Method::POST,
            "/api/v1/scan",
            Some(json!({ "seller_id": seller.id.to_string(), "barcode": "8901000000011" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["matched"], "unit");
    assert_eq!(body["data"]["quantity_added"], 1);
    assert_eq!(body["data"]["order"]["id"], first_order_id.as_str());
    assert_eq!(body["data"]["order"]["items"][0]["quantity"], 13);
    assert_eq!(app.stock_of(variant.id).await, 37);
}

#[tokio::test]
async fn each_seller_gets_their_own_day_order() {
    let app = TestApp::new().await;
    let first_seller = app.seed_seller("Shah Traders").await;
    let second_seller = app.seed_seller("Pillai Stores").await;
    app.seed_variant(
        "Cough Syrup",
        Decimal::from(5),
        "100ml",
        dec!(85.00),
        6,
        40,
        Some("8901000000103"),
        None,
    )
    .await;

    let scan = |seller_id: String| {
        app.request(
            Method::POST,
            "/api/v1/scan",
            Some(json!({ "seller_id": seller_id, "barcode": "8901000000103" })),
        )
    };

    let body = body_json(scan(first_seller.id.to_string()).await).await;
    let first_order = body["data"]["order"]["id"].as_str().unwrap().to_string();

    let body = body_json(scan(second_seller.id.to_string()).await).await;
    let second_order = body["data"]["order"]["id"].as_str().unwrap().to_string();
    assert_ne!(first_order, second_order);

    // A repeat scan for the first seller lands back on their order.
    let body = body_json(scan(first_seller.id.to_string()).await).await;
    assert_eq!(body["data"]["order"]["id"], first_order.as_str());
    assert_eq!(body["data"]["order"]["items"][0]["quantity"], 2);
}

#[tokio::test]
async fn finalize_closes_the_cart_and_later_scans_open_a_new_one() {
    let app = TestApp::new().await;
    let seller = app.seed_seller("Menon Medico").await;
    app.seed_variant(
        "Vitamin Strips",
        Decimal::from(18),
        "10s",
        dec!(45.00),
        10,
        30,
        Some("8901000000202"),
        None,
    )
    .await;

    let scan_payload = json!({ "seller_id": seller.id.to_string(), "barcode": "8901000000202" });
    let body = body_json(
        app.request(Method::POST, "/api/v1/scan", Some(scan_payload.clone()))
            .await,
    )
    .await;
    let order_id = body["data"]["order"]["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/finalize", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "completed");

    // Finalizing twice is invalid.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/finalize", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The next scan starts a fresh open order for the same seller.
    let body = body_json(
        app.request(Method::POST, "/api/v1/scan", Some(scan_payload))
            .await,
    )
    .await;
    assert_ne!(body["data"]["order"]["id"], order_id.as_str());
    assert_eq!(body["data"]["order"]["status"], "open");
}

#[tokio::test]
async fn a_box_scan_needs_a_full_box_in_stock() {
    let app = TestApp::new().await;
    let seller = app.seed_seller("Saxena Distributors").await;
    let variant = app
        .seed_variant(
            "Protein Sachets",
            Decimal::from(18),
            "20g",
            dec!(30.00),
            12,
            10,
            Some("8901000000301"),
            Some("8901000000318"),
        )
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/scan",
            Some(json!({ "seller_id": seller.id.to_string(), "barcode": "8901000000318" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("available 10"));
    assert_eq!(app.stock_of(variant.id).await, 10);

    // Unit scans still work below a full box.
    let response = app
        .request(
            Method::POST,
            "/api/v1/scan",
            Some(json!({ "seller_id": seller.id.to_string(), "barcode": "8901000000301" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.stock_of(variant.id).await, 9);
}

#[tokio::test]
async fn unknown_codes_can_be_registered_and_then_scanned() {
    let app = TestApp::new().await;
    let seller = app.seed_seller("Basu Pharma").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/scan",
            Some(json!({ "seller_id": seller.id.to_string(), "barcode": "8901000000400" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Register the product on the fly; the variant starts at the supplied
    // stock level.
    let response = app
        .request(
            Method::POST,
            "/api/v1/scanned-products",
            Some(json!({
                "product": { "name": "Herbal Tea", "gst_percent": "5", "hsn_code": "0902" },
                "variation": { "name": "25 bags" },
                "variant": {
                    "unit_price": "110.00",
                    "box_quantity": 6,
                    "stock_in_hand": 18,
                    "unit_barcode": "8901000000400",
                    "box_barcode": "8901000000417"
                }
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["variant"]["stock_in_hand"], 18);
    let variant_id: uuid::Uuid = body["data"]["variant"]["id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();

    let response = app
        .request(
            Method::POST,
            "/api/v1/scan",
            Some(json!({ "seller_id": seller.id.to_string(), "barcode": "8901000000400" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.stock_of(variant_id).await, 17);
}

#[tokio::test]
async fn barcode_check_reports_the_matched_kind_and_multiplier() {
    let app = TestApp::new().await;
    let variant = app
        .seed_variant(
            "Face Wash",
            Decimal::from(18),
            "50ml",
            dec!(95.00),
            8,
            24,
            Some("8901000000509"),
            Some("8901000000516"),
        )
        .await;

    let response = app
        .request(Method::GET, "/api/v1/scan/8901000000509", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["kind"], "unit");
    assert_eq!(body["data"]["multiplier"], 1);
    assert_eq!(body["data"]["product_name"], "Face Wash");
    assert_eq!(body["data"]["stock_in_hand"], 24);

    let response = app
        .request(Method::GET, "/api/v1/scan/8901000000516", None)
        .await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["kind"], "box");
    assert_eq!(body["data"]["multiplier"], 8);
    assert_eq!(
        body["data"]["product_variation_id"],
        variant.id.to_string()
    );

    let response = app
        .request(Method::GET, "/api/v1/scan/no-such-code", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn a_stale_open_cart_is_finalized_before_a_new_day_order() {
    let app = TestApp::new().await;
    let seller = app.seed_seller("Dutta Agencies").await;
    app.seed_variant(
        "Energy Bars",
        Decimal::from(18),
        "40g",
        dec!(50.00),
        6,
        30,
        Some("8901000000806"),
        None,
    )
    .await;

    let scan_payload = json!({ "seller_id": seller.id.to_string(), "barcode": "8901000000806" });
    let body = body_json(
        app.request(Method::POST, "/api/v1/scan", Some(scan_payload.clone()))
            .await,
    )
    .await;
    let stale_id: Uuid = body["data"]["order"]["id"].as_str().unwrap().parse().unwrap();

    // Age the cart by a day, as if it was never finalized yesterday.
    let stale = order::Entity::find_by_id(stale_id)
        .one(&*app.state.db)
        .await
        .expect("query order")
        .expect("order exists");
    let mut active: order::ActiveModel = stale.into();
    active.created_at = Set(Utc::now() - Duration::days(1));
    active.update(&*app.state.db).await.expect("backdate order");

    // Today's scan rolls the stale cart over and opens a fresh one.
    let body = body_json(
        app.request(Method::POST, "/api/v1/scan", Some(scan_payload))
            .await,
    )
    .await;
    let new_id = body["data"]["order"]["id"].as_str().unwrap();
    assert_ne!(new_id, stale_id.to_string());
    assert_eq!(body["data"]["order"]["status"], "open");
    assert_eq!(body["data"]["order"]["items"][0]["quantity"], 1);

    let response = app
        .request(Method::GET, &format!("/api/v1/orders/{}", stale_id), None)
        .await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "completed");
}

#[tokio::test]
async fn duplicate_barcodes_are_rejected_at_registration() {
    let app = TestApp::new().await;
    app.seed_variant(
        "Hand Cream",
        Decimal::from(18),
        "30g",
        dec!(70.00),
        6,
        12,
        Some("8901000000608"),
        None,
    )
    .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/scanned-products",
            Some(json!({
                "product": { "name": "Foot Cream", "gst_percent": "18" },
                "variation": { "name": "30g" },
                "variant": {
                    "unit_price": "75.00",
                    "box_quantity": 6,
                    "stock_in_hand": 10,
                    "unit_barcode": "8901000000608"
                }
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
