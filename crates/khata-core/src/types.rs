//! # Domain Types
//!
//! Entities, creation drafts and update patches used throughout Khata.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │      Bill       │   │ RoznamchaEntry  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name (unique,  │   │  billNumber     │   │  type           │       │
//! │  │   any case)     │   │  items[]        │   │  DEBIT | CREDIT │       │
//! │  │  phone, address │   │  calculations{} │   │  amount         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │    Receipt      │   │    LineItem     │                             │
//! │  │  (Ponch)        │   │  schemaless     │                             │
//! │  │  ponchNumber    │   │  item, rate,    │                             │
//! │  │  amount         │   │  subtotal, ...  │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Drafts and Patches
//! - `*Draft`: what a caller supplies on create. Generated fields (id,
//!   billNumber, timestamps) are never part of a draft.
//! - `*Patch`: every field optional, unknown fields rejected. Serializes to
//!   a [`Document`] holding only the present fields, which the store
//!   shallow-merges over the existing record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::document::Document;
use crate::lenient;
use crate::DATE_FORMAT;

/// Returns `date` when it is present and non-blank, otherwise today's date.
pub fn date_or_today(date: Option<String>, now: DateTime<Utc>) -> String {
    match date {
        Some(d) if !d.trim().is_empty() => d,
        _ => now.format(DATE_FORMAT).to_string(),
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer of the merchant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Customer {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name. Unique under case-insensitive comparison; the casing of
    /// the first insert is kept.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for `CustomerDirectory::upsert`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl CustomerDraft {
    /// Draft holding only a name (the common upsert call).
    pub fn named(name: impl Into<String>) -> Self {
        CustomerDraft {
            name: name.into(),
            ..Default::default()
        }
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One row of a bill.
///
/// Kept exactly as the billing screen computed it (item, quantity, weightKg,
/// weightMan, rate, bardanaTotal, subtotal, ...). Nothing here is validated
/// or recomputed; the accessors only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItem(pub Document);

impl LineItem {
    /// The item name, when present as a string.
    pub fn name(&self) -> Option<&str> {
        self.0.get("item").and_then(Value::as_str)
    }

    /// The computed subtotal. Accepts numbers and numeric strings.
    pub fn subtotal(&self) -> Option<f64> {
        match self.0.get("subtotal")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

// =============================================================================
// Bill
// =============================================================================

/// A multi-item sales bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Bill {
    /// Store id (UUID v4).
    pub id: String,

    /// Human-facing number, assigned once at creation and never changed.
    pub bill_number: String,

    /// Bill kind label ("Bazar Bill", "Cheera Zameedara", ...).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub bill_type: Option<String>,

    pub customer_id: String,

    /// Denormalized so the bill stays readable after the customer is deleted.
    pub customer_name: String,

    pub date: String,

    #[serde(default)]
    #[ts(type = "Array<Record<string, unknown>>")]
    pub items: Vec<LineItem>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "Record<string, unknown> | null")]
    pub totals: Option<Document>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "Record<string, unknown> | null")]
    pub calculations: Option<Document>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_mazduri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "Record<string, unknown> | null")]
    pub item_config: Option<Document>,

    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
}

impl Bill {
    /// `calculations.netAmount` (or `totals.netAmount`) when numeric.
    pub fn net_amount(&self) -> Option<f64> {
        self.calculations
            .as_ref()
            .and_then(|c| c.get("netAmount"))
            .or_else(|| self.totals.as_ref().and_then(|t| t.get("netAmount")))
            .and_then(Value::as_f64)
    }
}

/// Input for `BillLedger::create`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillDraft {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub bill_type: Option<String>,
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub customer_name: String,
    /// Defaults to today's date when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totals: Option<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculations: Option<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::text")]
    pub manual_mazduri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_config: Option<Document>,
}

/// Partial update for a bill. `id`, `billNumber` and `timestamp` are not
/// patchable, so they are rejected as unknown fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BillPatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub bill_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<LineItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totals: Option<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculations: Option<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::text")]
    pub manual_mazduri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_config: Option<Document>,
}

// =============================================================================
// Roznamcha (Cash Book)
// =============================================================================

/// Direction of a cash-book entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum EntryType {
    Debit,
    Credit,
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryType::Debit => write!(f, "DEBIT"),
            EntryType::Credit => write!(f, "CREDIT"),
        }
    }
}

/// A daily cash-book line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RoznamchaEntry {
    pub id: String,

    #[serde(rename = "type")]
    pub entry_type: EntryType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_no: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_no: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Debit column as written in the book (free text).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debit: Option<String>,

    /// Credit column as written in the book (free text).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit: Option<String>,

    #[serde(default)]
    pub amount: f64,

    pub date: String,

    /// Opaque caller-defined correlation token (e.g. a bill number).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_code: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for `CashBook::create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoznamchaDraft {
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::text")]
    pub page_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::text")]
    pub check_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::text")]
    pub debit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::text")]
    pub credit: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_code: Option<String>,
}

impl RoznamchaDraft {
    /// Minimal draft: direction and amount.
    pub fn new(entry_type: EntryType, amount: f64) -> Self {
        RoznamchaDraft {
            entry_type,
            page_no: None,
            check_no: None,
            name: None,
            description: None,
            debit: None,
            credit: None,
            amount,
            date: None,
            entry_code: None,
        }
    }
}

/// Partial update for a cash-book entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RoznamchaPatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<EntryType>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::text")]
    pub page_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::text")]
    pub check_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::text")]
    pub debit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::text")]
    pub credit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional_number")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_code: Option<String>,
}

/// Totals over a set of cash-book entries. Informational only: the cash
/// book does not enforce any balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CashSummary {
    pub total_debit: f64,
    pub total_credit: f64,
    /// `total_credit - total_debit`.
    pub balance: f64,
    pub entries: usize,
}

impl CashSummary {
    /// Sums `amount` per entry type.
    pub fn from_entries(entries: &[RoznamchaEntry]) -> Self {
        let mut summary = CashSummary::default();
        for entry in entries {
            match entry.entry_type {
                EntryType::Debit => summary.total_debit += entry.amount,
                EntryType::Credit => summary.total_credit += entry.amount,
            }
        }
        summary.balance = summary.total_credit - summary.total_debit;
        summary.entries = entries.len();
        summary
    }
}

// =============================================================================
// Receipt (Ponch)
// =============================================================================

/// A receipt-book line recording a payment against a bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Receipt {
    pub id: String,

    /// Number printed on the physical receipt slip.
    pub ponch_number: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bill_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,

    #[serde(default)]
    pub amount: f64,

    pub date: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for `ReceiptBook::create`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptDraft {
    #[serde(default)]
    pub ponch_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bill_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
