//! # Bill Ledger
//!
//! Multi-item bills. The line items and their arithmetic arrive computed and
//! are stored as given.
//!
//! ## Bill Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── create(draft) → Bill { id, billNumber, timestamp }             │
//! │         billNumber is unique: insert_if_absent on "billNumber"         │
//! │                                                                         │
//! │  2. CORRECT (optional, any number of times)                            │
//! │     └── update(id, patch) → shallow merge                              │
//! │         id / billNumber / timestamp are not patchable                  │
//! │                                                                         │
//! │  3. DELETE (optional)                                                  │
//! │     └── delete(id) → hard delete, related entries untouched            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use khata_core::types::date_or_today;
use khata_core::validation::{validate_bill_draft, validate_bill_patch};
use khata_core::{Bill, BillDraft, BillPatch, BILL_NUMBER_PREFIX};
use tracing::{debug, info, warn};

use super::{decode, decode_all, encode, BILLS};
use crate::error::{DbError, DbResult};
use crate::store::{generate_record_id, DocumentStore, Filter, InsertOutcome};

const ENTITY: &str = "Bill";

static BILL_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Generates a bill number in format: BILL-<unix millis>-<NNNN>
///
/// ## Format
/// - millis: creation time in milliseconds since the epoch
/// - NNNN: per-process sequence (padded to 4 digits, grows past 9999)
///
/// ## Example
/// `BILL-1764410400123-0007`
///
/// Two bills created in the same millisecond by this process still differ
/// in the sequence part.
pub fn generate_bill_number() -> String {
    let millis = Utc::now().timestamp_millis();
    let seq = BILL_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{BILL_NUMBER_PREFIX}-{millis}-{seq:04}")
}

/// Repository for bills.
#[derive(Clone)]
pub struct BillLedger {
    store: Arc<dyn DocumentStore>,
}

impl BillLedger {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        BillLedger { store }
    }

    /// Records a new bill.
    ///
    /// ## Errors
    /// - `Validation` - missing customerId / customerName
    /// - `Conflict` - the generated billNumber already exists (another
    ///   process sharing the store)
    pub async fn create(&self, draft: BillDraft) -> DbResult<Bill> {
        validate_bill_draft(&draft)?;

        let now = Utc::now();
        let bill = Bill {
            id: generate_record_id(),
            bill_number: generate_bill_number(),
            bill_type: draft.bill_type,
            customer_id: draft.customer_id,
            customer_name: draft.customer_name,
            date: date_or_today(draft.date, now),
            items: draft.items,
            totals: draft.totals,
            calculations: draft.calculations,
            manual_mazduri: draft.manual_mazduri,
            item_config: draft.item_config,
            timestamp: now,
        };

        debug!(id = %bill.id, bill_number = %bill.bill_number, "Creating bill");

        let outcome = self
            .store
            .insert_if_absent(
                BILLS,
                &Filter::eq("billNumber", bill.bill_number.as_str()),
                encode(&bill)?,
            )
            .await?;

        match outcome {
            InsertOutcome::Inserted(doc) => {
                info!(
                    id = %bill.id,
                    bill_number = %bill.bill_number,
                    customer = %bill.customer_name,
                    items = bill.items.len(),
                    "Created bill"
                );
                decode(ENTITY, doc)
            }
            InsertOutcome::Existing(_) => {
                warn!(bill_number = %bill.bill_number, "Bill number already taken");
                Err(DbError::conflict("billNumber", bill.bill_number))
            }
        }
    }

    pub async fn get(&self, id: &str) -> DbResult<Bill> {
        debug!(id = %id, "Getting bill");
        match self.store.find_by_id(BILLS, id).await? {
            Some(doc) => decode(ENTITY, doc),
            None => Err(DbError::not_found(ENTITY, id)),
        }
    }

    /// All bills in creation order.
    pub async fn list(&self) -> DbResult<Vec<Bill>> {
        debug!("Listing bills");
        decode_all(ENTITY, self.store.list(BILLS).await?)
    }

    pub async fn list_by_customer_id(&self, customer_id: &str) -> DbResult<Vec<Bill>> {
        debug!(customer_id = %customer_id, "Listing bills by customer id");
        let docs = self
            .store
            .find(BILLS, &Filter::eq("customerId", customer_id))
            .await?;
        decode_all(ENTITY, docs)
    }

    /// Bills whose customerName equals `name` ignoring case. No trimming and
    /// no partial matches.
    pub async fn list_by_customer_name(&self, name: &str) -> DbResult<Vec<Bill>> {
        debug!(customer_name = %name, "Listing bills by customer name");
        let docs = self
            .store
            .find(BILLS, &Filter::eq_ignore_case("customerName", name))
            .await?;
        decode_all(ENTITY, docs)
    }

    /// Applies a correction. Fields absent from the patch keep their values;
    /// fields present replace the stored ones wholesale.
    pub async fn update(&self, id: &str, patch: BillPatch) -> DbResult<Bill> {
        validate_bill_patch(&patch)?;
        let partial = encode(&patch)?;
        debug!(id = %id, fields = partial.len(), "Updating bill");

        match self.store.update(BILLS, id, partial).await? {
            Some(doc) => {
                info!(id = %id, "Updated bill");
                decode(ENTITY, doc)
            }
            None => Err(DbError::not_found(ENTITY, id)),
        }
    }

    /// Hard delete. Cash-book entries and receipts referring to the bill
    /// are left as they are.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting bill");
        if self.store.delete(BILLS, id).await?.is_some() {
            info!(id = %id, "Deleted bill");
            Ok(())
        } else {
            Err(DbError::not_found(ENTITY, id))
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
