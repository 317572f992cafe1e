//! Roznamcha (cash book) routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use khata_core::validation::parse_document;
use khata_core::{CashSummary, Document, RoznamchaDraft, RoznamchaEntry, RoznamchaPatch};

use super::{body, Deleted};
use crate::error::ApiResult;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/roznamcha", get(list_entries).post(create_entry))
        .route("/api/roznamcha/summary", get(summary))
        .route(
            "/api/roznamcha/{id}",
            put(update_entry).delete(delete_entry),
        )
}

async fn list_entries(State(state): State<AppState>) -> ApiResult<Json<Vec<RoznamchaEntry>>> {
    Ok(Json(state.db.roznamcha().list().await?))
}

async fn create_entry(
    State(state): State<AppState>,
    payload: Result<Json<Document>, JsonRejection>,
) -> ApiResult<Json<RoznamchaEntry>> {
    let draft: RoznamchaDraft = parse_document("roznamcha entry", body(payload)?)?;
    Ok(Json(state.db.roznamcha().create(draft).await?))
}

async fn summary(State(state): State<AppState>) -> ApiResult<Json<CashSummary>> {
    Ok(Json(state.db.roznamcha().summary().await?))
}

async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Document>, JsonRejection>,
) -> ApiResult<Json<RoznamchaEntry>> {
    let patch: RoznamchaPatch = parse_document("roznamcha entry", body(payload)?)?;
    Ok(Json(state.db.roznamcha().update(&id, patch).await?))
}

async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Deleted>> {
    state.db.roznamcha().delete(&id).await?;
    Ok(Deleted::ok())
}
