//! # Repository Module
//!
//! Typed ledgers over the shared [`DocumentStore`](crate::store::DocumentStore).
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │  db.bills().list_by_customer_name("ali khan")                  │
//! │       ▼                                                                 │
//! │  BillLedger                                                            │
//! │  ├── validate draft / patch        (khata-core::validation)            │
//! │  ├── assign ids, numbers, timestamps                                   │
//! │  └── typed value ⇄ Document                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DocumentStore ("bills" collection)                                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CustomerDirectory`](customer::CustomerDirectory) - customers, unique by name
//! - [`BillLedger`](bill::BillLedger) - bills with generated bill numbers
//! - [`CashBook`](roznamcha::CashBook) - roznamcha debit/credit entries
//! - [`ReceiptBook`](ponch::ReceiptBook) - ponch payment receipts

use khata_core::document::{from_document, to_document, Document};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DbError, DbResult};

pub mod bill;
pub mod customer;
pub mod ponch;
pub mod roznamcha;

// =============================================================================
// Collection Names
// =============================================================================

pub const CUSTOMERS: &str = "customers";
pub const BILLS: &str = "bills";
pub const ROZNAMCHA: &str = "roznamcha";
pub const PONCH: &str = "ponch";

// =============================================================================
// Helpers
// =============================================================================

fn encode<T: Serialize>(value: &T) -> DbResult<Document> {
    Ok(to_document(value)?)
}

/// Decodes a stored record, naming the entity when it doesn't fit the type.
fn decode<T: DeserializeOwned>(entity: &str, doc: Document) -> DbResult<T> {
    from_document(doc).map_err(|e| DbError::Serialization(format!("{entity}: {e}")))
}

fn decode_all<T: DeserializeOwned>(entity: &str, docs: Vec<Document>) -> DbResult<Vec<T>> {
    docs.into_iter().map(|doc| decode(entity, doc)).collect()
}
