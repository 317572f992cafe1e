//! # Receipt Book (Ponch)
//!
//! Payment receipts. Append and delete only; a wrong receipt is deleted and
//! written again.

use std::sync::Arc;

use chrono::Utc;
use khata_core::types::date_or_today;
use khata_core::validation::validate_receipt_draft;
use khata_core::{Receipt, ReceiptDraft};
use tracing::{debug, info};

use super::{decode, decode_all, encode, PONCH};
use crate::error::{DbError, DbResult};
use crate::store::{generate_record_id, DocumentStore};

const ENTITY: &str = "Receipt";

/// Repository for receipts.
#[derive(Clone)]
pub struct ReceiptBook {
    store: Arc<dyn DocumentStore>,
}

impl ReceiptBook {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        ReceiptBook { store }
    }

    pub async fn create(&self, draft: ReceiptDraft) -> DbResult<Receipt> {
        validate_receipt_draft(&draft)?;

        let now = Utc::now();
        let receipt = Receipt {
            id: generate_record_id(),
            ponch_number: draft.ponch_number,
            bill_number: draft.bill_number,
            customer_name: draft.customer_name,
            amount: draft.amount,
            date: date_or_today(draft.date, now),
            created_at: now,
        };

        let doc = self.store.insert(PONCH, encode(&receipt)?).await?;
        info!(id = %receipt.id, ponch_number = %receipt.ponch_number, amount = receipt.amount, "Recorded receipt");
        decode(ENTITY, doc)
    }

    /// All receipts, most recent first.
    pub async fn list(&self) -> DbResult<Vec<Receipt>> {
        debug!("Listing receipts");
        let mut receipts: Vec<Receipt> = decode_all(ENTITY, self.store.list(PONCH).await?)?;
        receipts.reverse();
        Ok(receipts)
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting receipt");
        if self.store.delete(PONCH, id).await?.is_some() {
            info!(id = %id, "Deleted receipt");
            Ok(())
        } else {
            Err(DbError::not_found(ENTITY, id))
        }
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

    fn draft(number: &str, amount: f64) -> ReceiptDraft {
        ReceiptDraft {
            ponch_number: number.to_string(),
            amount,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let db = memory_db().await;
        let book = db.receipts();
        book.create(draft("P-1", 100.0)).await.unwrap();
        book.create(draft("P-2", 200.0)).await.unwrap();
        book.create(draft("P-3", 300.0)).await.unwrap();

        let numbers: Vec<String> = book
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.ponch_number)
            .collect();
        assert_eq!(numbers, vec!["P-3", "P-2", "P-1"]);
    }

    #[tokio::test]
    async fn test_ponch_number_required() {
        let db = memory_db().await;
        let err = db.receipts().create(draft("  ", 100.0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = memory_db().await;
        let receipt = db.receipts().create(draft("P-9", 50.0)).await.unwrap();

        db.receipts().delete(&receipt.id).await.unwrap();
        assert!(db.receipts().list().await.unwrap().is_empty());
        assert!(db.receipts().delete(&receipt.id).await.unwrap_err().is_not_found());
    }
}
