//! Bill routes.
//!
//! `GET /api/bills` narrows by `customerId` first, then `customerName`
//! (case-insensitive), else returns every bill.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use khata_core::validation::parse_document;
use khata_core::{Bill, BillDraft, BillPatch, Document};
use serde::Deserialize;

use super::{body, Deleted};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillQuery {
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/bills", get(list_bills).post(create_bill))
        .route(
            "/api/bills/{id}",
            get(get_bill).put(update_bill).delete(delete_bill),
        )
}

async fn list_bills(
    State(state): State<AppState>,
    Query(query): Query<BillQuery>,
) -> ApiResult<Json<Vec<Bill>>> {
    let ledger = state.db.bills();
    let bills = match (query.customer_id, query.customer_name) {
        (Some(customer_id), _) => ledger.list_by_customer_id(&customer_id).await?,
        (None, Some(name)) => ledger.list_by_customer_name(&name).await?,
        (None, None) => ledger.list().await?,
    };
    Ok(Json(bills))
}

async fn create_bill(
    State(state): State<AppState>,
    payload: Result<Json<Document>, JsonRejection>,
) -> ApiResult<Json<Bill>> {
    let draft: BillDraft = parse_document("bill", body(payload)?)?;
    Ok(Json(state.db.bills().create(draft).await?))
}

async fn get_bill(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Bill>> {
    Ok(Json(state.db.bills().get(&id).await?))
}

async fn update_bill(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Document>, JsonRejection>,
) -> ApiResult<Json<Bill>> {
    let patch: BillPatch = parse_document("bill", body(payload)?)?;
    Ok(Json(state.db.bills().update(&id, patch).await?))
}

async fn delete_bill(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Deleted>> {
    state.db.bills().delete(&id).await?;
    Ok(Deleted::ok())
}
