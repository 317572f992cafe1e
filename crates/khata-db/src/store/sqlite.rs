//! # SQLite File Store
//!
//! Embedded [`DocumentStore`] backed by a single SQLite file.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  documents                                                              │
//! │  ┌──────┬────────────┬──────────────┬──────────────────────────────┐   │
//! │  │ seq  │ collection │ id           │ body (JSON text)             │   │
//! │  ├──────┼────────────┼──────────────┼──────────────────────────────┤   │
//! │  │ 1    │ customers  │ 6f1c…        │ {"id":"6f1c…","name":"Ali"}  │   │
//! │  │ 2    │ bills      │ 0a93…        │ {"billNumber":"BILL-…",…}    │   │
//! │  └──────┴────────────┴──────────────┴──────────────────────────────┘   │
//! │                                                                         │
//! │  UNIQUE(collection, id)         insertion order = ORDER BY seq         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mutations take the collection lock first, then run inside one SQL
//! transaction, so a failed write leaves the previous row untouched.
//! Read-then-write transactions open with `BEGIN IMMEDIATE`: the file's write
//! lock is taken before the read, and a writer on another collection makes
//! them wait (up to `busy_timeout`) rather than fail.
//! Filters are evaluated in memory over the collection snapshot, which keeps
//! case-insensitive matching identical to the remote backend's.

use async_trait::async_trait;
use khata_core::document::{document_id, shallow_merge, Document, ID_FIELD};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use tracing::{debug, info};

use super::{conflicting, ensure_id, CollectionLocks, DocumentStore, Filter, InsertOutcome, UpdateOutcome};
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::pool::DbConfig;

/// SQLite-backed document store.
#[derive(Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
    locks: CollectionLocks,
}

impl SqliteStore {
    /// Wraps an existing pool. The schema must already be migrated.
    pub fn new(pool: SqlitePool) -> Self {
        SqliteStore {
            pool,
            locks: CollectionLocks::new(),
        }
    }

    /// Opens (creating if needed) the database file described by `config`.
    ///
    /// ## What This Does
    /// 1. Configures SQLite: WAL journal, NORMAL synchronous
    /// 2. Creates the connection pool
    /// 3. Runs migrations (if enabled)
    pub async fn open(config: &DbConfig, path: &std::path::Path) -> DbResult<Self> {
        info!(path = %path.display(), "Opening SQLite store");

        let in_memory = path.as_os_str() == ":memory:";

        let connect_options = if in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::Unavailable(e.to_string()))?
        } else {
            if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir).map_err(|e| {
                    DbError::Unavailable(format!("cannot create {}: {}", dir.display(), e))
                })?;
            }

            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                // Readers don't block the single writer
                .journal_mode(SqliteJournalMode::Wal)
                // May lose the last transaction on power loss, never corrupts
                .synchronous(SqliteSynchronous::Normal)
        };
        // Writers on other collections queue on the file lock
        let connect_options = connect_options.busy_timeout(config.connect_timeout);

        // An in-memory database lives as long as its one connection
        let (idle_timeout, max_lifetime) = if in_memory {
            (None, None)
        } else {
            (Some(config.idle_timeout), Some(config.max_lifetime))
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(idle_timeout)
            .max_lifetime(max_lifetime)
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::Unavailable(e.to_string()))?;

        info!(max_connections = config.max_connections, "SQLite pool created");

        if config.run_migrations {
            migrations::run_migrations(&pool).await?;
            let (total, applied) = migrations::migration_status(&pool).await?;
            debug!(total, applied, "Migration status");
        }

        Ok(SqliteStore::new(pool))
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the connection pool. Later calls fail with `Unavailable`.
    pub async fn close(&self) {
        info!("Closing SQLite pool");
        self.pool.close().await;
    }

    /// Opens a transaction holding the database write lock from the start.
    async fn begin_write(&self) -> DbResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    async fn bodies(&self, collection: &str) -> DbResult<Vec<Document>> {
        let bodies: Vec<String> = sqlx::query_scalar(
            "SELECT body FROM documents WHERE collection = ?1 ORDER BY seq",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        bodies.iter().map(|body| decode(body)).collect()
    }
}

fn decode(body: &str) -> DbResult<Document> {
    Ok(serde_json::from_str(body)?)
}

fn encode(record: &Document) -> DbResult<String> {
    Ok(serde_json::to_string(record)?)
}

async fn collection_in(
    tx: &mut Transaction<'static, Sqlite>,
    collection: &str,
) -> DbResult<Vec<Document>> {
    let bodies: Vec<String> = sqlx::query_scalar(
        "SELECT body FROM documents WHERE collection = ?1 ORDER BY seq",
    )
    .bind(collection)
    .fetch_all(&mut **tx)
    .await?;

    bodies.iter().map(|body| decode(body)).collect()
}

async fn replace_body(
    tx: &mut Transaction<'static, Sqlite>,
    collection: &str,
    id: &str,
    record: &Document,
) -> DbResult<()> {
    sqlx::query("UPDATE documents SET body = ?1 WHERE collection = ?2 AND id = ?3")
        .bind(encode(record)?)
        .bind(collection)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Maps a UNIQUE violation on insert to a conflict on the record id.
fn duplicate_id(id: &str) -> impl FnOnce(sqlx::Error) -> DbError + '_ {
    move |err| match DbError::from(err) {
        DbError::Conflict { .. } => DbError::conflict(ID_FIELD, id),
        other => other,
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn list(&self, collection: &str) -> DbResult<Vec<Document>> {
        self.bodies(collection).await
    }

    async fn insert(&self, collection: &str, mut record: Document) -> DbResult<Document> {
        let _guard = self.locks.acquire(collection).await;
        let id = ensure_id(&mut record);

        sqlx::query("INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)")
            .bind(collection)
            .bind(&id)
            .bind(encode(&record)?)
            .execute(&self.pool)
            .await
            .map_err(duplicate_id(&id))?;

        debug!(collection, id = %id, "Inserted document");
        Ok(record)
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> DbResult<Option<Document>> {
        let body: Option<String> =
            sqlx::query_scalar("SELECT body FROM documents WHERE collection = ?1 AND id = ?2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        body.as_deref().map(decode).transpose()
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> DbResult<Option<Document>> {
        Ok(self
            .bodies(collection)
            .await?
            .into_iter()
            .find(|doc| filter.matches(doc)))
    }

    async fn find(&self, collection: &str, filter: &Filter) -> DbResult<Vec<Document>> {
        Ok(self
            .bodies(collection)
            .await?
            .into_iter()
            .filter(|doc| filter.matches(doc))
            .collect())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Document,
    ) -> DbResult<Option<Document>> {
        let _guard = self.locks.acquire(collection).await;
        let mut tx = self.begin_write().await?;

        let body: Option<String> =
            sqlx::query_scalar("SELECT body FROM documents WHERE collection = ?1 AND id = ?2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(body) = body else {
            return Ok(None);
        };

        let mut record = decode(&body)?;
        shallow_merge(&mut record, &partial);
        replace_body(&mut tx, collection, id, &record).await?;

        tx.commit().await?;

        debug!(collection, id, fields = partial.len(), "Updated document");
        Ok(Some(record))
    }

    async fn update_if_unique(
        &self,
        collection: &str,
        id: &str,
        filter: &Filter,
        partial: Document,
    ) -> DbResult<UpdateOutcome> {
        let _guard = self.locks.acquire(collection).await;
        let mut tx = self.begin_write().await?;

        let records = collection_in(&mut tx, collection).await?;

        let Some(mut record) = records.iter().find(|doc| document_id(doc) == Some(id)).cloned()
        else {
            return Ok(UpdateOutcome::Missing);
        };
        if let Some(holder) = conflicting(&records, id, filter) {
            return Ok(UpdateOutcome::Taken(holder.clone()));
        }

        shallow_merge(&mut record, &partial);
        replace_body(&mut tx, collection, id, &record).await?;

        tx.commit().await?;

        debug!(collection, id, field = filter.field(), "Updated document (still unique)");
        Ok(UpdateOutcome::Updated(record))
    }

    async fn delete(&self, collection: &str, id: &str) -> DbResult<Option<Document>> {
        let _guard = self.locks.acquire(collection).await;

        let body: Option<String> = sqlx::query_scalar(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2 RETURNING body",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        body.as_deref().map(decode).transpose()
    }

    async fn insert_if_absent(
        &self,
        collection: &str,
        filter: &Filter,
        mut record: Document,
    ) -> DbResult<InsertOutcome> {
        let _guard = self.locks.acquire(collection).await;
        let mut tx = self.begin_write().await?;

        if let Some(existing) = collection_in(&mut tx, collection)
            .await?
            .into_iter()
            .find(|doc| filter.matches(doc))
        {
            return Ok(InsertOutcome::Existing(existing));
        }

        let id = ensure_id(&mut record);
        sqlx::query("INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)")
            .bind(collection)
            .bind(&id)
            .bind(encode(&record)?)
            .execute(&mut *tx)
            .await
            .map_err(duplicate_id(&id))?;

        tx.commit().await?;

        debug!(collection, id = %id, field = filter.field(), "Inserted document (was absent)");
        Ok(InsertOutcome::Inserted(record))
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::Arc;

    async fn store() -> SqliteStore {
        SqliteStore::open(&DbConfig::in_memory(), std::path::Path::new(":memory:"))
            .await
            .unwrap()
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_lists_in_order() {
        let store = store().await;

        let first = store.insert("customers", doc(json!({ "name": "Ali" }))).await.unwrap();
        store.insert("customers", doc(json!({ "name": "Bilal" }))).await.unwrap();
        store.insert("customers", doc(json!({ "name": "Chand" }))).await.unwrap();

        assert!(first.contains_key("id"));

        let names: Vec<Value> = store
            .list("customers")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d["name"].clone())
            .collect();
        assert_eq!(names, vec![json!("Ali"), json!("Bilal"), json!("Chand")]);
    }

    #[tokio::test]
    async fn test_collections_are_separate() {
        let store = store().await;
        store.insert("bills", doc(json!({ "id": "x" }))).await.unwrap();
        store.insert("ponch", doc(json!({ "id": "x" }))).await.unwrap();

        assert_eq!(store.list("bills").await.unwrap().len(), 1);
        assert!(store.list("customers").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_id_is_conflict() {
        let store = store().await;
        store.insert("bills", doc(json!({ "id": "b1" }))).await.unwrap();

        let err = store.insert("bills", doc(json!({ "id": "b1" }))).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { ref field, .. } if field == "id"));
    }

    #[tokio::test]
    async fn test_update_merges_shallowly() {
        let store = store().await;
        let bill = store
            .insert(
                "bills",
                doc(json!({
                    "items": [{ "item": "خجور" }],
                    "calculations": { "netAmount": 814.6 }
                })),
            )
            .await
            .unwrap();
        let id = bill["id"].as_str().unwrap().to_string();

        let updated = store
            .update("bills", &id, doc(json!({ "manualMazduri": "50", "id": "other" })))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated["id"], json!(id));
        assert_eq!(updated["manualMazduri"], json!("50"));
        assert_eq!(updated["calculations"]["netAmount"], json!(814.6));

        let stored = store.find_by_id("bills", &id).await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let store = store().await;
        assert!(store.update("bills", "nope", Document::new()).await.unwrap().is_none());
        assert!(store.delete("bills", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let store = store().await;
        let rec = store.insert("ponch", doc(json!({ "amount": 5 }))).await.unwrap();
        let id = rec["id"].as_str().unwrap();

        let removed = store.delete("ponch", id).await.unwrap().unwrap();
        assert_eq!(removed["amount"], json!(5));
        assert!(store.find_by_id("ponch", id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_with_filters() {
        let store = store().await;
        store.insert("bills", doc(json!({ "customerName": "Ali Khan", "n": 1 }))).await.unwrap();
        store.insert("bills", doc(json!({ "customerName": "Bilal", "n": 2 }))).await.unwrap();
        store.insert("bills", doc(json!({ "customerName": "ALI KHAN", "n": 3 }))).await.unwrap();

        let found = store
            .find("bills", &Filter::eq_ignore_case("customerName", "ali khan"))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0]["n"], json!(1));
        assert_eq!(found[1]["n"], json!(3));

        let one = store.find_one("bills", &Filter::eq("n", 2)).await.unwrap().unwrap();
        assert_eq!(one["customerName"], json!("Bilal"));
    }

    #[tokio::test]
    async fn test_insert_if_absent_concurrent() {
        let store = Arc::new(store().await);
        let filter = Filter::eq_ignore_case("name", "Ali");

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            let filter = filter.clone();
            let name = if i % 2 == 0 { "Ali" } else { "ali" };
            handles.push(tokio::spawn(async move {
                store
                    .insert_if_absent("customers", &filter, doc(json!({ "name": name })))
                    .await
                    .unwrap()
            }));
        }

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap().was_inserted() {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 1);
        assert_eq!(store.list("customers").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_if_unique() {
        let store = store().await;
        store.insert("customers", doc(json!({ "id": "c1", "name": "Ali" }))).await.unwrap();
        store.insert("customers", doc(json!({ "id": "c2", "name": "Bilal" }))).await.unwrap();

        let taken = store
            .update_if_unique(
                "customers",
                "c1",
                &Filter::eq_ignore_case("name", "BILAL"),
                doc(json!({ "name": "BILAL" })),
            )
            .await
            .unwrap();
        assert!(matches!(taken, UpdateOutcome::Taken(ref holder) if holder["id"] == json!("c2")));
        let unchanged = store.find_by_id("customers", "c1").await.unwrap().unwrap();
        assert_eq!(unchanged["name"], json!("Ali"));

        // The record's own name does not block it
        let updated = store
            .update_if_unique(
                "customers",
                "c1",
                &Filter::eq_ignore_case("name", "ALI"),
                doc(json!({ "name": "ALI" })),
            )
            .await
            .unwrap();
        assert!(matches!(updated, UpdateOutcome::Updated(ref record) if record["name"] == json!("ALI")));

        let missing = store
            .update_if_unique(
                "customers",
                "nope",
                &Filter::eq_ignore_case("name", "Zahid"),
                doc(json!({ "name": "Zahid" })),
            )
            .await
            .unwrap();
        assert_eq!(missing, UpdateOutcome::Missing);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_file_store_parallel_read_then_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("khata.db");
        let store = Arc::new(SqliteStore::open(&DbConfig::sqlite(&path), &path).await.unwrap());
        store.insert("bills", doc(json!({ "id": "b1", "n": 0 }))).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..100 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    store.update("bills", "b1", doc(json!({ "n": i }))).await.map(|_| ())
                } else {
                    store
                        .insert_if_absent(
                            "roznamcha",
                            &Filter::eq("n", i),
                            doc(json!({ "n": i })),
                        )
                        .await
                        .map(|_| ())
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.list("roznamcha").await.unwrap().len(), 50);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("khata.db");
        let config = DbConfig::sqlite(&path);

        {
            let store = SqliteStore::open(&config, &path).await.unwrap();
            store.insert("customers", doc(json!({ "id": "c1", "name": "Ali" }))).await.unwrap();
            store.close().await;
        }

        let store = SqliteStore::open(&config, &path).await.unwrap();
        let found = store.find_by_id("customers", "c1").await.unwrap().unwrap();
        assert_eq!(found["name"], json!("Ali"));
        assert!(store.health_check().await);
    }
}
