//! # HTTP Routes
//!
//! One module per collection. Every handler reads its body as a plain JSON
//! object and hands it to `parse_document`, so type errors come back as
//! `VALIDATION_ERROR` rather than axum's default rejection text.

pub mod bills;
pub mod customers;
pub mod ponch;
pub mod roznamcha;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use khata_core::Document;
use serde::Serialize;
use serde_json::json;

use crate::error::ApiResult;
use crate::AppState;

/// Body of every successful delete.
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub success: bool,
}

impl Deleted {
    pub fn ok() -> Json<Deleted> {
        Json(Deleted { success: true })
    }
}

/// Unwraps a JSON object body or reports why it was rejected.
pub(crate) fn body(payload: Result<Json<Document>, JsonRejection>) -> ApiResult<Document> {
    let Json(doc) = payload?;
    Ok(doc)
}

/// All routes, before state is attached.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(customers::routes())
        .merge(bills::routes())
        .merge(roznamcha::routes())
        .merge(ponch::routes())
}

async fn root() -> &'static str {
    "Billing System API is running"
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let backend = state.db.backend();
    if state.db.health_check().await {
        (StatusCode::OK, Json(json!({ "status": "ok", "store": backend })))
    } else {
        tracing::warn!(store = backend, "Health check failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable", "store": backend })),
        )
    }
}
