//! # khata-core: Domain Types for Khata
//!
//! This crate holds the entity model of the Khata billing backend as plain
//! data with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Khata Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 HTTP collaborator (khata-server)                │   │
//! │  │    /api/customers   /api/bills   /api/roznamcha   /api/ponch    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ repository calls                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    khata-db (Persistence)                       │   │
//! │  │   CustomerDirectory  BillLedger  CashBook  ReceiptBook          │   │
//! │  │                  DocumentStore (SQLite | Mongo)                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ khata-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ document  │  │ validation│  │   error   │  │   │
//! │  │   │ Customer  │  │ Document  │  │  drafts   │  │Validation │  │   │
//! │  │   │ Bill, ... │  │  merge    │  │  patches  │  │  Error    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities (Customer, Bill, RoznamchaEntry, Receipt), drafts and patches
//! - [`document`] - Schemaless `Document` records and the shallow-merge rule
//! - [`error`] - Validation error type
//! - [`lenient`] - Fields accepted as either text or number
//! - [`validation`] - Draft/patch validation and document parsing
//!
//! ## Design Principles
//!
//! 1. **Opaque financial data**: `items`, `totals`, `calculations` and
//!    `itemConfig` are computed by the caller and kept verbatim
//! 2. **Shallow merge**: updates replace top-level fields only
//! 3. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use khata_core::document::{shallow_merge, Document};
//! use serde_json::json;
//!
//! let mut bill: Document = serde_json::from_value(json!({
//!     "id": "b1",
//!     "items": [{ "item": "Khajoor", "subtotal": 1000 }],
//!     "calculations": { "netAmount": 814.6 }
//! })).unwrap();
//! let patch: Document = serde_json::from_value(json!({ "manualMazduri": "50" })).unwrap();
//!
//! shallow_merge(&mut bill, &patch);
//! assert_eq!(bill["manualMazduri"], "50");
//! assert_eq!(bill["calculations"]["netAmount"], 814.6);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod document;
pub mod error;
pub mod lenient;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use document::Document;
pub use error::ValidationError;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Prefix of every generated bill number (`BILL-<millis>-<sequence>`).
pub const BILL_NUMBER_PREFIX: &str = "BILL";

/// Format used for caller-facing calendar dates (`2025-11-29`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Maximum length of a customer name.
pub const MAX_NAME_LEN: usize = 200;
