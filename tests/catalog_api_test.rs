mod common;

use axum::http::{Method, StatusCode};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use common::{body_json, TestApp};

#[tokio::test]
async fn status_and_health_probes_respond() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/status", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["service"], "godown-api");

    let response = app.request(Method::GET, "/api/v1/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["checks"]["database"], "healthy");
}

#[tokio::test]
async fn seller_crud_round_trip() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sellers",
            Some(json!({ "name": "Lakshmi Stores", "phone": "9876543210" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let seller_id = body["data"]["id"].as_str().expect("seller id").to_string();

    let response = app
        .request(Method::GET, "/api/v1/sellers?search=Lakshmi", None)
        .await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["sellers"][0]["name"], "Lakshmi Stores");

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/sellers/{}", seller_id),
            Some(json!({ "address": "14 Market Road" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["address"], "14 Market Road");

    let response = app
        .request(Method::DELETE, &format!("/api/v1/sellers/{}", seller_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(Method::GET, &format!("/api/v1/sellers/{}", seller_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_seller_name_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::POST, "/api/v1/sellers", Some(json!({ "name": "" })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn variant_listing_joins_names_and_hides_deleted_rows() {
    let app = TestApp::new().await;
    let variant = app
        .seed_variant(
            "Green Tea",
            Decimal::from(5),
            "100 bags",
            dec!(240.00),
            4,
            16,
            Some("8901000000707"),
            None,
        )
        .await;

    let response = app.request(Method::GET, "/api/v1/variants", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    let row = &body["data"]["variants"][0];
    assert_eq!(row["product_name"], "Green Tea");
    assert_eq!(row["variation_name"], "100 bags");
    assert_eq!(row["stock_in_hand"], 16);
    assert_eq!(row["is_deleted"], false);

    let response = app
        .request(Method::DELETE, &format!("/api/v1/variants/{}", variant.id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.request(Method::GET, "/api/v1/variants", None).await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], 0);

    // Audits can still see the retired row.
    let response = app
        .request(Method::GET, "/api/v1/variants?include_deleted=true", None)
        .await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["variants"][0]["is_deleted"], true);
}

#[tokio::test]
async fn product_gst_is_validated_on_create_and_update() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/products",
            Some(json!({ "name": "Moov", "gst_percent": "101" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::POST,
            "/api/v1/products",
            Some(json!({ "name": "Moov", "gst_percent": "18", "hsn_code": "3004" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let product_id = body["data"]["id"].as_str().expect("product id").to_string();

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/products/{}", product_id),
            Some(json!({ "gst_percent": "-1" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(Method::GET, "/api/v1/products?search=Moov", None)
        .await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn orders_listing_paginates_newest_first() {
    let app = TestApp::new().await;
    let seller = app.seed_seller("Agarwal & Co").await;
    let variant = app
        .seed_variant("Soap", Decimal::from(18), "75g", dec!(35.00), 12, 100, None, None)
        .await;

    for quantity in [1, 2, 3] {
        let response = app
            .request(
                Method::POST,
                "/api/v1/orders",
                Some(json!({
                    "seller_id": seller.id.to_string(),
                    "items": [{ "variant": variant.id.to_string(), "quantity": quantity }]
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .request(Method::GET, "/api/v1/orders?page=1&per_page=2", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["orders"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["data"]["orders"][0]["seller_name"], "Agarwal & Co");
    assert_eq!(body["data"]["orders"][0]["item_count"], 1);

    let filtered = app
        .request(
            Method::GET,
            &format!("/api/v1/orders?seller_id={}", uuid::Uuid::new_v4()),
            None,
        )
        .await;
    let body = body_json(filtered).await;
    assert_eq!(body["data"]["total"], 0);
}
