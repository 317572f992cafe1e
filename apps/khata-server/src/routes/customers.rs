//! Customer routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use khata_core::validation::parse_document;
use khata_core::{Customer, CustomerDraft, Document};
use serde::Deserialize;

use super::{body, Deleted};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct RenameRequest {
    #[serde(default)]
    name: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/customers", get(list_customers))
        .route("/api/customers/upsert", post(upsert_customer))
        .route(
            "/api/customers/{id}",
            put(rename_customer).delete(delete_customer),
        )
}

async fn list_customers(State(state): State<AppState>) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(state.db.customers().list().await?))
}

async fn upsert_customer(
    State(state): State<AppState>,
    payload: Result<Json<Document>, JsonRejection>,
) -> ApiResult<Json<Customer>> {
    let draft: CustomerDraft = parse_document("customer", body(payload)?)?;
    Ok(Json(state.db.customers().upsert(draft).await?))
}

async fn rename_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Document>, JsonRejection>,
) -> ApiResult<Json<Customer>> {
    let request: RenameRequest = parse_document("customer", body(payload)?)?;
    Ok(Json(state.db.customers().rename(&id, &request.name).await?))
}

async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Deleted>> {
    state.db.customers().delete(&id).await?;
    Ok(Deleted::ok())
}
