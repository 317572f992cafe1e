//! # Khata Server
//!
//! REST routes for the billing frontend, mapped one-to-one onto khata-db
//! repositories.
//!
//! ## Request Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP request                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CorsLayer ── TraceLayer                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  routes::{customers, bills, roznamcha, ponch}                           │
//! │       │   Json<Document> ──► parse_document ──► typed draft / patch     │
//! │       ▼                                                                 │
//! │  AppState.db (Database) ──► DocumentStore                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Json<T>  or  ApiError ──► {"code", "error"}                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod routes;

use axum::http::{header, Method};
use axum::Router;
use khata_db::Database;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        AppState { db }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    routes::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
