//! # khata-db: Persistence Layer for Khata
//!
//! Durable, concurrency-safe storage for customers, bills, the roznamcha
//! cash book and the ponch receipt book.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Khata Data Flow                                  │
//! │                                                                         │
//! │  HTTP handler (POST /api/bills)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     khata-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────────┐  ┌─────────────┐  │   │
//! │  │   │   Database    │   │   Repositories     │  │  workflow   │  │   │
//! │  │   │   (pool.rs)   │──►│ CustomerDirectory  │  │ bill + cash │  │   │
//! │  │   │               │   │ BillLedger         │  │ book entry  │  │   │
//! │  │   │ DbConfig      │   │ CashBook           │  └─────────────┘  │   │
//! │  │   │ backend pick  │   │ ReceiptBook        │                   │   │
//! │  │   └───────────────┘   └─────────┬──────────┘                   │   │
//! │  │                                 ▼                               │   │
//! │  │             DocumentStore (+ CollectionLocks)                   │   │
//! │  │        SqliteStore  │  MongoStore behind LazyStore              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                 │                               │
//! │       ▼                                 ▼                               │
//! │  ./data/khata.db (SQLite, WAL)     mongodb://…/billing_system          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Backend configuration and the `Database` handle
//! - [`store`] - `DocumentStore` contract and its backends
//! - [`migrations`] - Embedded SQLite migrations
//! - [`repository`] - Typed repositories per collection
//! - [`workflow`] - Bill plus cash-book entry, with partial-failure reporting
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use khata_db::{Database, DbConfig};
//! use khata_core::CustomerDraft;
//!
//! let db = Database::new(DbConfig::sqlite("./data/khata.db")).await?;
//!
//! let customer = db.customers().upsert(CustomerDraft::named("Ali Khan")).await?;
//! let bills = db.bills().list_by_customer_id(&customer.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;
pub mod workflow;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, ErrorKind};
pub use pool::{Database, DbConfig, StoreBackend, DEFAULT_CONNECT_TIMEOUT};
pub use store::{DocumentStore, Filter, InsertOutcome, UpdateOutcome};
pub use workflow::RecordedBill;

// Repository re-exports for convenience
pub use repository::bill::BillLedger;
pub use repository::customer::CustomerDirectory;
pub use repository::ponch::ReceiptBook;
pub use repository::roznamcha::CashBook;
