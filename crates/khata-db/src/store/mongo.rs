//! # MongoDB Store
//!
//! Remote [`DocumentStore`]. Each collection maps to a MongoDB collection of
//! the same name.
//!
//! ## Record Mapping
//! ```text
//! Document (JSON)                          MongoDB (BSON)
//! ─────────────────                        ──────────────
//! { "id": "6f1c…",            ◄──────►     { "_id": "6f1c…",
//!   "name": "Ali",                           "name": "Ali",
//!   "amount": 814.6 }                        "amount": 814.6 }
//!
//! Filter::Eq(f, v)            ──────►      { f: v }
//! Filter::EqIgnoreCase(f, t)  ──────►      { f: { $regex: "^<escaped t>$", $options: "i" } }
//! ```
//!
//! Lists sort by `$natural`, which is insertion order for collections that
//! only ever see inserts, updates in place and deletes.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use khata_core::document::{shallow_merge, Document, ID_FIELD};
use mongodb::bson::{self, doc, Bson, Document as BsonDocument};
use mongodb::options::{ClientOptions, FindOneOptions, FindOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use serde_json::Value;
use tracing::{debug, error, info};

use super::{conflicting, ensure_id, CollectionLocks, DocumentStore, Filter, InsertOutcome, UpdateOutcome};
use crate::error::{DbError, DbResult};
use crate::repository::BILLS;

const MONGO_ID: &str = "_id";

/// MongoDB-backed document store.
pub struct MongoStore {
    client: Client,
    db: Database,
    locks: CollectionLocks,
}

impl MongoStore {
    /// Connects, verifies the server answers, and ensures indexes.
    ///
    /// `timeout` bounds server selection and the initial socket connect, so
    /// an unreachable server fails with `Unavailable` instead of hanging.
    pub async fn connect(uri: &str, database: &str, timeout: Duration) -> DbResult<Self> {
        info!(database = %database, "Connecting to MongoDB");

        let mut options = ClientOptions::parse(uri).await.map_err(|e| {
            error!("Invalid MongoDB URI: {}", e);
            DbError::from(e)
        })?;
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);
        options.app_name = Some("khata".to_string());

        let client = Client::with_options(options)?;
        let db = client.database(database);

        db.run_command(doc! { "ping": 1 }, None).await.map_err(|e| {
            error!("MongoDB did not answer ping: {}", e);
            DbError::from(e)
        })?;

        let store = MongoStore {
            client,
            db,
            locks: CollectionLocks::new(),
        };
        store.initialize_indexes().await?;

        info!(database = %database, "Connected to MongoDB");
        Ok(store)
    }

    /// Creates the unique index on `bills.billNumber`.
    pub async fn initialize_indexes(&self) -> DbResult<()> {
        let bill_number_index = IndexModel::builder()
            .keys(doc! { "billNumber": 1 })
            .options(
                IndexOptions::builder()
                    .name("bill_number_unique".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.collection(BILLS)
            .create_index(bill_number_index, None)
            .await
            .map_err(|e| {
                error!("Failed to create billNumber index on bills: {}", e);
                DbError::from(e)
            })?;
        info!("Created unique index on bills.billNumber");

        Ok(())
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn collection(&self, name: &str) -> Collection<BsonDocument> {
        self.db.collection(name)
    }

    async fn first_match(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> DbResult<Option<Document>> {
        let options = FindOneOptions::builder()
            .sort(doc! { "$natural": 1 })
            .build();

        let found = self
            .collection(collection)
            .find_one(filter_query(filter)?, options)
            .await?;

        Ok(found.map(from_bson_document))
    }
}

impl std::fmt::Debug for MongoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoStore")
            .field("database", &self.db.name())
            .finish()
    }
}

// =============================================================================
// Conversions
// =============================================================================

/// JSON record → BSON document with `id` moved to `_id`.
fn to_bson_document(record: &Document) -> DbResult<BsonDocument> {
    let mut fields = record.clone();
    let id = fields.remove(ID_FIELD);
    fields.remove(MONGO_ID);

    let mut doc = bson::to_document(&fields).map_err(|e| DbError::Serialization(e.to_string()))?;
    if let Some(Value::String(id)) = id {
        doc.insert(MONGO_ID, id);
    }
    Ok(doc)
}

/// BSON document → JSON record with `_id` exposed as `id`.
fn from_bson_document(mut doc: BsonDocument) -> Document {
    let id = doc.remove(MONGO_ID).map(|id| match id {
        Bson::String(s) => s,
        Bson::ObjectId(oid) => oid.to_hex(),
        other => other.to_string(),
    });

    let mut record = match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Document::new(),
    };
    if let Some(id) = id {
        record.insert(ID_FIELD.to_string(), Value::String(id));
    }
    record
}

/// `$set` body for a partial update. Identifier fields are dropped.
fn set_document(partial: &Document) -> DbResult<BsonDocument> {
    let fields: Document = partial
        .iter()
        .filter(|(key, _)| key.as_str() != ID_FIELD && key.as_str() != MONGO_ID)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    bson::to_document(&fields).map_err(|e| DbError::Serialization(e.to_string()))
}

fn filter_query(filter: &Filter) -> DbResult<BsonDocument> {
    let field = match filter.field() {
        ID_FIELD => MONGO_ID,
        other => other,
    };

    match filter {
        Filter::Eq(_, value) => {
            let value = bson::to_bson(value).map_err(|e| DbError::Serialization(e.to_string()))?;
            Ok(doc! { field: value })
        }
        Filter::EqIgnoreCase(_, text) => Ok(doc! {
            field: {
                "$regex": format!("^{}$", escape_regex(text)),
                "$options": "i",
            }
        }),
    }
}

/// Escapes regex metacharacters so user text matches literally.
fn escape_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '\\' | '.' | '^' | '$' | '|' | '?' | '*' | '+' | '(' | ')' | '[' | ']' | '{' | '}'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// =============================================================================
// DocumentStore
// =============================================================================

#[async_trait]
impl DocumentStore for MongoStore {
    fn backend(&self) -> &'static str {
        "mongo"
    }

    async fn list(&self, collection: &str) -> DbResult<Vec<Document>> {
        let options = FindOptions::builder().sort(doc! { "$natural": 1 }).build();

        let docs: Vec<BsonDocument> = self
            .collection(collection)
            .find(None, options)
            .await?
            .try_collect()
            .await?;

        Ok(docs.into_iter().map(from_bson_document).collect())
    }

    async fn insert(&self, collection: &str, mut record: Document) -> DbResult<Document> {
        let _guard = self.locks.acquire(collection).await;
        let id = ensure_id(&mut record);

        self.collection(collection)
            .insert_one(to_bson_document(&record)?, None)
            .await?;

        debug!(collection, id = %id, "Inserted document");
        Ok(record)
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> DbResult<Option<Document>> {
        let found = self
            .collection(collection)
            .find_one(doc! { MONGO_ID: id }, None)
            .await?;

        Ok(found.map(from_bson_document))
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> DbResult<Option<Document>> {
        self.first_match(collection, filter).await
    }

    async fn find(&self, collection: &str, filter: &Filter) -> DbResult<Vec<Document>> {
        let options = FindOptions::builder().sort(doc! { "$natural": 1 }).build();

        let docs: Vec<BsonDocument> = self
            .collection(collection)
            .find(filter_query(filter)?, options)
            .await?
            .try_collect()
            .await?;

        Ok(docs.into_iter().map(from_bson_document).collect())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Document,
    ) -> DbResult<Option<Document>> {
        let _guard = self.locks.acquire(collection).await;

        let Some(mut record) = self.find_by_id(collection, id).await? else {
            return Ok(None);
        };

        let set = set_document(&partial)?;
        if set.is_empty() {
            return Ok(Some(record));
        }

        let result = self
            .collection(collection)
            .update_one(doc! { MONGO_ID: id }, doc! { "$set": set }, None)
            .await?;

        if result.matched_count == 0 {
            return Ok(None);
        }

        shallow_merge(&mut record, &partial);
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

        let Some(mut record) = self.find_by_id(collection, id).await? else {
            return Ok(UpdateOutcome::Missing);
        };

        let holders = self.find(collection, filter).await?;
        if let Some(holder) = conflicting(&holders, id, filter) {
            return Ok(UpdateOutcome::Taken(holder.clone()));
        }

        let set = set_document(&partial)?;
        if !set.is_empty() {
            let result = self
                .collection(collection)
                .update_one(doc! { MONGO_ID: id }, doc! { "$set": set }, None)
                .await?;
            if result.matched_count == 0 {
                return Ok(UpdateOutcome::Missing);
            }
        }

        shallow_merge(&mut record, &partial);
        debug!(collection, id, field = filter.field(), "Updated document (still unique)");
        Ok(UpdateOutcome::Updated(record))
    }

    async fn delete(&self, collection: &str, id: &str) -> DbResult<Option<Document>> {
        let _guard = self.locks.acquire(collection).await;

        let removed = self
            .collection(collection)
            .find_one_and_delete(doc! { MONGO_ID: id }, None)
            .await?;

        Ok(removed.map(from_bson_document))
    }

    async fn insert_if_absent(
        &self,
        collection: &str,
        filter: &Filter,
        mut record: Document,
    ) -> DbResult<InsertOutcome> {
        let _guard = self.locks.acquire(collection).await;

        if let Some(existing) = self.first_match(collection, filter).await? {
            return Ok(InsertOutcome::Existing(existing));
        }

        let id = ensure_id(&mut record);
        self.collection(collection)
            .insert_one(to_bson_document(&record)?, None)
            .await?;

        debug!(collection, id = %id, field = filter.field(), "Inserted document (was absent)");
        Ok(InsertOutcome::Inserted(record))
    }

    async fn health_check(&self) -> bool {
        self.db
            .run_command(doc! { "ping": 1 }, None)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc_of(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_record_id_maps_to_underscore_id() {
        let record = doc_of(json!({
            "id": "b1",
            "billNumber": "BILL-1",
            "calculations": { "netAmount": 814.6 },
            "items": [{ "item": "خجور", "quantity": 1 }]
        }));

        let bson_doc = to_bson_document(&record).unwrap();
        assert_eq!(bson_doc.get_str("_id").unwrap(), "b1");
        assert!(!bson_doc.contains_key("id"));

        let back = from_bson_document(bson_doc);
        assert_eq!(back["id"], json!("b1"));
        assert_eq!(back["calculations"]["netAmount"], json!(814.6));
        assert_eq!(back["items"][0]["item"], json!("خجور"));
        assert_eq!(back["items"][0]["quantity"], json!(1));
    }

    #[test]
    fn test_object_id_is_exposed_as_hex() {
        let oid = bson::oid::ObjectId::new();
        let record = from_bson_document(doc! { "_id": oid, "name": "Ali" });
        assert_eq!(record["id"], json!(oid.to_hex()));
    }

    #[test]
    fn test_set_document_drops_ids() {
        let set = set_document(&doc_of(json!({ "id": "x", "_id": "y", "date": "2025-11-29" })))
            .unwrap();
        assert_eq!(set, doc! { "date": "2025-11-29" });
    }

    #[test]
    fn test_filter_queries() {
        assert_eq!(
            filter_query(&Filter::eq("customerId", "c1")).unwrap(),
            doc! { "customerId": "c1" }
        );
        assert_eq!(
            filter_query(&Filter::eq("id", "c1")).unwrap(),
            doc! { "_id": "c1" }
        );
        assert_eq!(
            filter_query(&Filter::eq_ignore_case("name", "Ali (2)")).unwrap(),
            doc! { "name": { "$regex": "^Ali \\(2\\)$", "$options": "i" } }
        );
    }

    #[test]
    fn test_escape_regex() {
        assert_eq!(escape_regex("Ali Khan"), "Ali Khan");
        assert_eq!(escape_regex("a.b*c"), "a\\.b\\*c");
        assert_eq!(escape_regex("^$"), "\\^\\$");
        assert_eq!(escape_regex("خجور"), "خجور");
    }
}
