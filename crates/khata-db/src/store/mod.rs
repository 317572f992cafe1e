//! # Document Store
//!
//! The collection-based CRUD contract every repository is built on.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       DocumentStore                                     │
//! │                                                                         │
//! │  list(c)                     → [Document]  insertion order              │
//! │  insert(c, doc)              → Document    id assigned if absent        │
//! │  find_by_id(c, id)           → Option<Document>                         │
//! │  find_one(c, filter)         → Option<Document>                         │
//! │  find(c, filter)             → [Document]  insertion order              │
//! │  update(c, id, partial)      → Option<Document>  shallow merge          │
//! │  update_if_unique(c, id, f, partial)                                    │
//! │                              → Updated(doc) | Taken(doc) | Missing      │
//! │  delete(c, id)               → Option<Document>  the removed record     │
//! │  insert_if_absent(c, f, doc) → Inserted(doc) | Existing(doc)            │
//! │                                                                         │
//! │  Backends (identical external behavior):                               │
//! │  ┌────────────────┐  ┌────────────────┐  ┌─────────────────────────┐  │
//! │  │  SqliteStore   │  │  MongoStore    │  │  LazyStore              │  │
//! │  │  embedded file │  │  remote        │  │  connect-once wrapper   │  │
//! │  └────────────────┘  └────────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write Serialization
//! Every mutating call takes the collection's async mutex from
//! [`CollectionLocks`] for the whole read-modify-write, so two writers on the
//! same collection never both act on the pre-mutation state. Different
//! collections never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use khata_core::document::{document_id, eq_ignore_case, Document, ID_FIELD};
use serde_json::Value;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::error::DbResult;

pub mod lazy;
pub mod mongo;
pub mod sqlite;

pub use lazy::LazyStore;
pub use mongo::MongoStore;
pub use sqlite::SqliteStore;

// =============================================================================
// Trait
// =============================================================================

/// Collection-based document storage.
///
/// Implementations must be interchangeable: callers never observe which
/// backend answered.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs (`sqlite`, `mongo`).
    fn backend(&self) -> &'static str;

    /// Full snapshot of a collection, in insertion order.
    async fn list(&self, collection: &str) -> DbResult<Vec<Document>>;

    /// Persists `record`, assigning an id when it has none.
    async fn insert(&self, collection: &str, record: Document) -> DbResult<Document>;

    async fn find_by_id(&self, collection: &str, id: &str) -> DbResult<Option<Document>>;

    /// First matching record in insertion order.
    async fn find_one(&self, collection: &str, filter: &Filter) -> DbResult<Option<Document>>;

    /// All matching records in insertion order.
    async fn find(&self, collection: &str, filter: &Filter) -> DbResult<Vec<Document>>;

    /// Shallow-merges `partial` over the stored record. `None` when absent.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Document,
    ) -> DbResult<Option<Document>>;

    /// Shallow-merges `partial` over record `id` unless a *different* record
    /// matches `filter`.
    ///
    /// The check and the write happen under the collection lock, so no insert
    /// or update on the collection can land between them.
    async fn update_if_unique(
        &self,
        collection: &str,
        id: &str,
        filter: &Filter,
        partial: Document,
    ) -> DbResult<UpdateOutcome>;

    /// Hard delete. Returns the removed record, `None` when absent.
    async fn delete(&self, collection: &str, id: &str) -> DbResult<Option<Document>>;

    /// Inserts `record` unless a record matching `filter` already exists.
    ///
    /// Check and insert happen under the collection lock, so concurrent
    /// callers with the same filter produce exactly one insert.
    async fn insert_if_absent(
        &self,
        collection: &str,
        filter: &Filter,
        record: Document,
    ) -> DbResult<InsertOutcome>;

    /// Checks if the backend is responsive.
    async fn health_check(&self) -> bool;
}

/// Result of [`DocumentStore::insert_if_absent`].
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// The record was new and is now stored (with its id).
    Inserted(Document),
    /// A matching record already existed; nothing was written.
    Existing(Document),
}

impl InsertOutcome {
    pub fn into_document(self) -> Document {
        match self {
            InsertOutcome::Inserted(doc) | InsertOutcome::Existing(doc) => doc,
        }
    }

    pub fn was_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }
}

/// Result of [`DocumentStore::update_if_unique`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The merged record, now stored.
    Updated(Document),
    /// Another record already matches the filter; nothing was written.
    Taken(Document),
    /// No record with that id.
    Missing,
}

/// The first record other than `id` that matches `filter`.
pub(crate) fn conflicting<'a, I>(records: I, id: &str, filter: &Filter) -> Option<&'a Document>
where
    I: IntoIterator<Item = &'a Document>,
{
    records
        .into_iter()
        .find(|doc| document_id(doc) != Some(id) && filter.matches(doc))
}

// =============================================================================
// Filter
// =============================================================================

/// Declarative record predicate.
///
/// Kept declarative (rather than a closure) so the remote backend can turn it
/// into a server-side query while the embedded backend evaluates it in memory.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Top-level field equals the JSON value exactly.
    Eq(String, Value),
    /// Top-level string field equals the text, ignoring case.
    EqIgnoreCase(String, String),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn eq_ignore_case(field: impl Into<String>, text: impl Into<String>) -> Self {
        Filter::EqIgnoreCase(field.into(), text.into())
    }

    /// The field the filter looks at.
    pub fn field(&self) -> &str {
        match self {
            Filter::Eq(field, _) | Filter::EqIgnoreCase(field, _) => field,
        }
    }

    /// Evaluates the filter against a record.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::Eq(field, expected) => doc.get(field) == Some(expected),
            Filter::EqIgnoreCase(field, text) => doc
                .get(field)
                .and_then(Value::as_str)
                .map(|actual| eq_ignore_case(actual, text))
                .unwrap_or(false),
        }
    }
}

// =============================================================================
// Id Generation
// =============================================================================

/// Generates a record id: random UUID v4, unrelated to the clock.
pub fn generate_record_id() -> String {
    Uuid::new_v4().to_string()
}

/// Returns the record's id, inserting a fresh one when missing or blank.
pub(crate) fn ensure_id(record: &mut Document) -> String {
    match document_id(record) {
        Some(id) if !id.trim().is_empty() => id.to_string(),
        _ => {
            let id = generate_record_id();
            record.insert(ID_FIELD.to_string(), Value::String(id.clone()));
            id
        }
    }
}

// =============================================================================
// Per-Collection Locks
// =============================================================================

/// One async mutex per collection name.
///
/// ```text
/// bills      ── Mutex ──► writer A ▶ writer B ▶ ...   (serialized)
/// roznamcha  ── Mutex ──► writer C                     (independent)
/// ```
#[derive(Debug, Default)]
pub struct CollectionLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl CollectionLocks {
    pub fn new() -> Self {
        CollectionLocks::default()
    }

    /// Waits for exclusive write access to `collection`.
    pub async fn acquire(&self, collection: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks
                .entry(collection.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_filter_eq() {
        let bill = doc(json!({ "customerId": "c1", "amount": 5 }));
        assert!(Filter::eq("customerId", "c1").matches(&bill));
        assert!(!Filter::eq("customerId", "C1").matches(&bill));
        assert!(Filter::eq("amount", 5).matches(&bill));
        assert!(!Filter::eq("missing", "x").matches(&bill));
    }

    #[test]
    fn test_filter_eq_ignore_case() {
        let bill = doc(json!({ "customerName": "Ali Khan", "amount": 5 }));
        assert!(Filter::eq_ignore_case("customerName", "ali khan").matches(&bill));
        assert!(Filter::eq_ignore_case("customerName", "ALI KHAN").matches(&bill));
        assert!(!Filter::eq_ignore_case("customerName", "ali").matches(&bill));
        // Non-string fields never match a text filter
        assert!(!Filter::eq_ignore_case("amount", "5").matches(&bill));
    }

    #[test]
    fn test_conflicting_skips_own_record() {
        let records = vec![
            doc(json!({ "id": "c1", "name": "Ali" })),
            doc(json!({ "id": "c2", "name": "Gul" })),
        ];
        let filter = Filter::eq_ignore_case("name", "ALI");

        assert!(conflicting(&records, "c1", &filter).is_none());
        assert_eq!(conflicting(&records, "c2", &filter), Some(&records[0]));
    }

    #[test]
    fn test_ensure_id() {
        let mut with_id = doc(json!({ "id": "given" }));
        assert_eq!(ensure_id(&mut with_id), "given");

        let mut without = doc(json!({ "name": "Ali" }));
        let id = ensure_id(&mut without);
        assert_eq!(without["id"], Value::String(id.clone()));
        assert!(Uuid::parse_str(&id).is_ok());

        let mut blank = doc(json!({ "id": "  " }));
        assert_ne!(ensure_id(&mut blank), "  ");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: std::collections::HashSet<String> =
            (0..1000).map(|_| generate_record_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[tokio::test]
    async fn test_locks_are_per_collection() {
        let locks = Arc::new(CollectionLocks::new());
        let _bills = locks.acquire("bills").await;

        // A different collection is not blocked
        let other = tokio::time::timeout(Duration::from_millis(100), locks.acquire("roznamcha")).await;
        assert!(other.is_ok());

        // The same collection is
        let same = tokio::time::timeout(Duration::from_millis(50), locks.acquire("bills")).await;
        assert!(same.is_err());
    }
}
