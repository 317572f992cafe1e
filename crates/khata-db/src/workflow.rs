//! # Bill + Cash-Book Workflow
//!
//! Writing a bill and its matching cash-book line touches two collections.
//! There is no transaction spanning them:
//!
//! ```text
//! validate entry draft ──► create bill ──► create entry (entryCode = billNumber)
//!        │                      │                   │
//!        ▼                      ▼                   ▼
//!   Validation error       error, nothing      PartiallyCommitted {
//!   nothing written        written               committed: "bill BILL-…",
//!                                                source }
//! ```
//!
//! On `PartiallyCommitted` the bill exists and the caller decides whether to
//! retry the entry or delete the bill.

use khata_core::validation::validate_roznamcha_draft;
use khata_core::{Bill, BillDraft, RoznamchaDraft, RoznamchaEntry};
use serde::Serialize;
use tracing::error;

use crate::error::{DbError, DbResult};
use crate::pool::Database;

/// A bill together with the cash-book entry recorded for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedBill {
    pub bill: Bill,
    pub entry: RoznamchaEntry,
}

impl Database {
    /// Creates a bill and then its cash-book entry.
    ///
    /// The entry's `entryCode` defaults to the new bill number.
    pub async fn record_bill_with_entry(
        &self,
        bill: BillDraft,
        mut entry: RoznamchaDraft,
    ) -> DbResult<RecordedBill> {
        // Fail before anything is written when the entry could never succeed
        validate_roznamcha_draft(&entry)?;

        let bill = self.bills().create(bill).await?;

        if entry.entry_code.is_none() {
            entry.entry_code = Some(bill.bill_number.clone());
        }

        match self.roznamcha().create(entry).await {
            Ok(entry) => Ok(RecordedBill { bill, entry }),
            Err(source) => {
                error!(
                    bill_id = %bill.id,
                    bill_number = %bill.bill_number,
                    error = %source,
                    "Bill written but cash-book entry failed"
                );
                Err(DbError::PartiallyCommitted {
                    committed: format!("bill {} ({})", bill.bill_number, bill.id),
                    source: Box::new(source),
                })
            }
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
    use crate::repository::ROZNAMCHA;
    use crate::store::{DocumentStore, Filter, InsertOutcome, UpdateOutcome};
    use async_trait::async_trait;
    use khata_core::{Document, EntryType};
    use std::sync::Arc;

    /// Delegates to a real store but refuses writes to one collection.
    struct RefusingStore {
        inner: Arc<dyn DocumentStore>,
        refuse: &'static str,
    }

    impl RefusingStore {
        fn check(&self, collection: &str) -> DbResult<()> {
            if collection == self.refuse {
                Err(DbError::Unavailable("connection reset".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl DocumentStore for RefusingStore {
        fn backend(&self) -> &'static str {
            "refusing"
        }

        async fn list(&self, collection: &str) -> DbResult<Vec<Document>> {
            self.inner.list(collection).await
        }

        async fn insert(&self, collection: &str, record: Document) -> DbResult<Document> {
            self.check(collection)?;
            self.inner.insert(collection, record).await
        }

        async fn find_by_id(&self, collection: &str, id: &str) -> DbResult<Option<Document>> {
            self.inner.find_by_id(collection, id).await
        }

        async fn find_one(
            &self,
            collection: &str,
            filter: &Filter,
        ) -> DbResult<Option<Document>> {
            self.inner.find_one(collection, filter).await
        }

        async fn find(&self, collection: &str, filter: &Filter) -> DbResult<Vec<Document>> {
            self.inner.find(collection, filter).await
        }

        async fn update(
            &self,
            collection: &str,
            id: &str,
            partial: Document,
        ) -> DbResult<Option<Document>> {
            self.check(collection)?;
            self.inner.update(collection, id, partial).await
        }

        async fn update_if_unique(
            &self,
            collection: &str,
            id: &str,
            filter: &Filter,
            partial: Document,
        ) -> DbResult<UpdateOutcome> {
            self.check(collection)?;
            self.inner.update_if_unique(collection, id, filter, partial).await
        }

        async fn delete(&self, collection: &str, id: &str) -> DbResult<Option<Document>> {
            self.check(collection)?;
            self.inner.delete(collection, id).await
        }

        async fn insert_if_absent(
            &self,
            collection: &str,
            filter: &Filter,
            record: Document,
        ) -> DbResult<InsertOutcome> {
            self.check(collection)?;
            self.inner.insert_if_absent(collection, filter, record).await
        }

        async fn health_check(&self) -> bool {
            self.inner.health_check().await
        }
    }

    fn bill_draft() -> BillDraft {
        BillDraft {
            customer_id: "c1".to_string(),
            customer_name: "Ali".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_entry_code_defaults_to_bill_number() {
        let db = memory_db().await;
        let recorded = db
            .record_bill_with_entry(bill_draft(), RoznamchaDraft::new(EntryType::Credit, 814.6))
            .await
            .unwrap();

        assert_eq!(
            recorded.entry.entry_code.as_deref(),
            Some(recorded.bill.bill_number.as_str())
        );
        assert_eq!(db.roznamcha().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_entry_writes_nothing() {
        let db = memory_db().await;
        let err = db
            .record_bill_with_entry(bill_draft(), RoznamchaDraft::new(EntryType::Credit, -1.0))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(db.bills().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_names_committed_bill() {
        let real = memory_db().await;
        let db = Database::from_store(Arc::new(RefusingStore {
            inner: real.store().clone(),
            refuse: ROZNAMCHA,
        }));

        let err = db
            .record_bill_with_entry(bill_draft(), RoznamchaDraft::new(EntryType::Credit, 10.0))
            .await
            .unwrap_err();

        let bills = real.bills().list().await.unwrap();
        assert_eq!(bills.len(), 1);

        match err {
            DbError::PartiallyCommitted { committed, source } => {
                assert!(committed.contains(&bills[0].bill_number));
                assert!(matches!(*source, DbError::Unavailable(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(real.roznamcha().list().await.unwrap().is_empty());
    }
}
