//! Ponch (receipt book) routes. Receipts are never edited.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use khata_core::validation::parse_document;
use khata_core::{Document, Receipt, ReceiptDraft};

use super::{body, Deleted};
use crate::error::ApiResult;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/ponch", get(list_receipts).post(create_receipt))
        .route("/api/ponch/{id}", delete(delete_receipt))
}

async fn list_receipts(State(state): State<AppState>) -> ApiResult<Json<Vec<Receipt>>> {
    Ok(Json(state.db.receipts().list().await?))
}

async fn create_receipt(
    State(state): State<AppState>,
    payload: Result<Json<Document>, JsonRejection>,
) -> ApiResult<Json<Receipt>> {
    let draft: ReceiptDraft = parse_document("receipt", body(payload)?)?;
    Ok(Json(state.db.receipts().create(draft).await?))
}

async fn delete_receipt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Deleted>> {
    state.db.receipts().delete(&id).await?;
    Ok(Deleted::ok())
}
