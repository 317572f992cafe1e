//! Router tests: requests go through the full axum stack against an
//! in-memory SQLite store.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use khata_db::{Database, DbConfig};
use khata_server::{router, AppState};
use serde_json::{json, Value};
use tower::util::ServiceExt;

async fn app() -> Router {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    router(AppState::new(db))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

#[tokio::test]
async fn test_root_and_health() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("Billing System API is running"));

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "sqlite");
}

#[tokio::test]
async fn test_customer_and_bill_flow() {
    let app = app().await;

    let (status, customer) = send(
        &app,
        Method::POST,
        "/api/customers/upsert",
        Some(json!({ "name": "Test Customer" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let customer_id = customer["id"].as_str().unwrap().to_string();

    let (_, again) = send(
        &app,
        Method::POST,
        "/api/customers/upsert",
        Some(json!({ "name": "test customer" })),
    )
    .await;
    assert_eq!(again["id"], customer["id"]);

    let (status, bill) = send(
        &app,
        Method::POST,
        "/api/bills",
        Some(json!({
            "customerId": customer_id,
            "customerName": "Test Customer",
            "date": "2025-11-29",
            "items": [{ "item": "خجور", "quantity": "1", "subtotal": 1000 }],
            "calculations": { "netAmount": 814.6 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(bill["billNumber"].as_str().unwrap().starts_with("BILL-"));
    let bill_id = bill["id"].as_str().unwrap().to_string();

    let (status, fetched) = send(&app, Method::GET, &format!("/api/bills/{bill_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["calculations"]["netAmount"], json!(814.6));

    let (_, by_name) = send(
        &app,
        Method::GET,
        "/api/bills?customerName=TEST%20CUSTOMER",
        None,
    )
    .await;
    assert_eq!(by_name.as_array().unwrap().len(), 1);

    let (_, by_id) = send(
        &app,
        Method::GET,
        &format!("/api/bills?customerId={customer_id}"),
        None,
    )
    .await;
    assert_eq!(by_id.as_array().unwrap().len(), 1);

    let (status, deleted) =
        send(&app, Method::DELETE, &format!("/api/bills/{bill_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({ "success": true }));

    let (status, body) = send(&app, Method::GET, &format!("/api/bills/{bill_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_error_mapping() {
    let app = app().await;

    let (status, body) = send(&app, Method::DELETE, "/api/ponch/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().is_some());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/customers/upsert",
        Some(json!({ "name": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (_, bill) = send(
        &app,
        Method::POST,
        "/api/bills",
        Some(json!({ "customerId": "c1", "customerName": "Ali" })),
    )
    .await;
    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/bills/{}", bill["id"].as_str().unwrap()),
        Some(json!({ "billNumber": "BILL-0" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    // Body that is JSON but not an object
    let (status, body) = send(&app, Method::POST, "/api/ponch", Some(json!([1, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_rename_conflict() {
    let app = app().await;

    send(&app, Method::POST, "/api/customers/upsert", Some(json!({ "name": "Ali" }))).await;
    let (_, gul) = send(
        &app,
        Method::POST,
        "/api/customers/upsert",
        Some(json!({ "name": "Gul" })),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/customers/{}", gul["id"].as_str().unwrap()),
        Some(json!({ "name": "ALI" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_cash_book_and_receipts() {
    let app = app().await;

    for (entry_type, amount) in [("CREDIT", 1000.0), ("DEBIT", 250.0)] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/roznamcha",
            Some(json!({ "type": entry_type, "amount": amount })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, summary) = send(&app, Method::GET, "/api/roznamcha/summary", None).await;
    assert_eq!(summary["balance"], json!(750.0));

    for number in ["P-001", "P-002"] {
        send(
            &app,
            Method::POST,
            "/api/ponch",
            Some(json!({ "ponchNumber": number, "amount": 100 })),
        )
        .await;
    }

    let (_, receipts) = send(&app, Method::GET, "/api/ponch", None).await;
    let numbers: Vec<&str> = receipts
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["ponchNumber"].as_str().unwrap())
        .collect();
    assert_eq!(numbers, vec!["P-002", "P-001"]);
}

#[tokio::test]
async fn test_cash_book_accepts_numbers_for_text_fields() {
    let app = app().await;

    let (status, entry) = send(
        &app,
        Method::POST,
        "/api/roznamcha",
        Some(json!({ "type": "DEBIT", "amount": 500, "debit": 500, "pageNo": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["debit"], json!("500"));
    assert_eq!(entry["pageNo"], json!("3"));

    let (status, entry) = send(
        &app,
        Method::POST,
        "/api/roznamcha",
        Some(json!({ "type": "DEBIT", "amount": "500" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["amount"], json!(500.0));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/roznamcha",
        Some(json!({ "type": "DEBIT", "amount": "abc" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}
