//! # Cash Book (Roznamcha)
//!
//! Daily debit/credit entries. `amount` is always non-negative; direction
//! comes from `type`.
//!
//! Entries stay editable and deletable. Every update and delete is logged at
//! INFO with the entry id and entry code, which is the audit trail for
//! corrections.

use std::sync::Arc;

use chrono::Utc;
use khata_core::types::date_or_today;
use khata_core::validation::{validate_roznamcha_draft, validate_roznamcha_patch};
use khata_core::{CashSummary, RoznamchaDraft, RoznamchaEntry, RoznamchaPatch};
use tracing::{debug, info};

use super::{decode, decode_all, encode, ROZNAMCHA};
use crate::error::{DbError, DbResult};
use crate::store::{generate_record_id, DocumentStore};

const ENTITY: &str = "RoznamchaEntry";

/// Repository for cash-book entries.
#[derive(Clone)]
pub struct CashBook {
    store: Arc<dyn DocumentStore>,
}

impl CashBook {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        CashBook { store }
    }

    pub async fn create(&self, draft: RoznamchaDraft) -> DbResult<RoznamchaEntry> {
        validate_roznamcha_draft(&draft)?;

        let now = Utc::now();
        let entry = RoznamchaEntry {
            id: generate_record_id(),
            entry_type: draft.entry_type,
            page_no: draft.page_no,
            check_no: draft.check_no,
            name: draft.name,
            description: draft.description,
            debit: draft.debit,
            credit: draft.credit,
            amount: draft.amount,
            date: date_or_today(draft.date, now),
            entry_code: draft.entry_code,
            created_at: now,
        };

        debug!(id = %entry.id, entry_type = %entry.entry_type, amount = entry.amount, "Creating cash-book entry");

        let doc = self.store.insert(ROZNAMCHA, encode(&entry)?).await?;
        decode(ENTITY, doc)
    }

    /// All entries in insertion order.
    pub async fn list(&self) -> DbResult<Vec<RoznamchaEntry>> {
        debug!("Listing cash-book entries");
        decode_all(ENTITY, self.store.list(ROZNAMCHA).await?)
    }

    pub async fn update(&self, id: &str, patch: RoznamchaPatch) -> DbResult<RoznamchaEntry> {
        validate_roznamcha_patch(&patch)?;
        let partial = encode(&patch)?;

        let entry: RoznamchaEntry = match self.store.update(ROZNAMCHA, id, partial).await? {
            Some(doc) => decode(ENTITY, doc)?,
            None => return Err(DbError::not_found(ENTITY, id)),
        };

        info!(
            id = %id,
            entry_code = entry.entry_code.as_deref().unwrap_or(""),
            entry_type = %entry.entry_type,
            amount = entry.amount,
            "Updated cash-book entry"
        );
        Ok(entry)
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let Some(removed) = self.store.delete(ROZNAMCHA, id).await? else {
            return Err(DbError::not_found(ENTITY, id));
        };
        let entry_code = removed
            .get("entryCode")
            .and_then(|code| code.as_str())
            .unwrap_or("");

        info!(id = %id, entry_code = %entry_code, "Deleted cash-book entry");
        Ok(())
    }

    /// Debit/credit totals over every entry. Display only.
    pub async fn summary(&self) -> DbResult<CashSummary> {
        let entries = self.list().await?;
        Ok(CashSummary::from_entries(&entries))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::repository::test_support::memory_db;
    use khata_core::EntryType;

    #[tokio::test]
    async fn test_create_and_list() {
        let db = memory_db().await;
        let book = db.roznamcha();

        let mut draft = RoznamchaDraft::new(EntryType::Credit, 1000.0);
        draft.name = Some("Ali".to_string());
        draft.entry_code = Some("BILL-1".to_string());
        let entry = book.create(draft).await.unwrap();

        assert_eq!(entry.entry_type, EntryType::Credit);
        assert_eq!(entry.amount, 1000.0);
        assert_eq!(entry.entry_code.as_deref(), Some("BILL-1"));

        book.create(RoznamchaDraft::new(EntryType::Debit, 250.0)).await.unwrap();

        let entries = book.list().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, entry.id);
    }

    #[tokio::test]
    async fn test_negative_amount_rejected() {
        let db = memory_db().await;
        let err = db
            .roznamcha()
            .create(RoznamchaDraft::new(EntryType::Debit, -5.0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = memory_db().await;
        let book = db.roznamcha();
        let entry = book.create(RoznamchaDraft::new(EntryType::Debit, 100.0)).await.unwrap();

        let patch = RoznamchaPatch {
            amount: Some(120.0),
            description: Some("corrected".to_string()),
            ..Default::default()
        };
        let updated = book.update(&entry.id, patch).await.unwrap();
        assert_eq!(updated.amount, 120.0);
        assert_eq!(updated.entry_type, EntryType::Debit);
        assert_eq!(updated.created_at, entry.created_at);

        let bad = RoznamchaPatch {
            amount: Some(-1.0),
            ..Default::default()
        };
        assert_eq!(
            book.update(&entry.id, bad).await.unwrap_err().kind(),
            ErrorKind::Validation
        );

        book.delete(&entry.id).await.unwrap();
        assert!(book.delete(&entry.id).await.unwrap_err().is_not_found());
        assert!(book
            .update(&entry.id, RoznamchaPatch::default())
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_summary() {
        let db = memory_db().await;
        let book = db.roznamcha();
        book.create(RoznamchaDraft::new(EntryType::Credit, 1000.0)).await.unwrap();
        book.create(RoznamchaDraft::new(EntryType::Debit, 300.0)).await.unwrap();

        let summary = book.summary().await.unwrap();
        assert_eq!(summary.total_credit, 1000.0);
        assert_eq!(summary.total_debit, 300.0);
        assert_eq!(summary.balance, 700.0);
        assert_eq!(summary.entries, 2);
    }
}
