//! # Customer Directory
//!
//! Customers are unique by name under case-insensitive comparison.
//!
//! ## Upsert
//! ```text
//! upsert("ali khan")
//!      │
//!      ▼
//! trim + validate ──► ""?  ──► ValidationError::Required
//!      │
//!      ▼  (collection lock held)
//! any customer with lower(name) == "ali khan"?
//!      ├── yes ──► return it unchanged (stored casing kept)
//!      └── no  ──► insert { id, name, phone, address, createdAt }
//! ```
//!
//! Deleting a customer leaves their bills in place; bills carry the
//! customer name themselves.

use std::sync::Arc;

use chrono::Utc;
use khata_core::validation::validate_customer_name;
use khata_core::{Customer, CustomerDraft, Document};
use serde_json::Value;
use tracing::{debug, info};

use super::{decode, decode_all, encode, CUSTOMERS};
use crate::error::{DbError, DbResult};
use crate::store::{generate_record_id, DocumentStore, Filter, InsertOutcome, UpdateOutcome};

const ENTITY: &str = "Customer";

/// Repository for customers.
#[derive(Clone)]
pub struct CustomerDirectory {
    store: Arc<dyn DocumentStore>,
}

impl CustomerDirectory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        CustomerDirectory { store }
    }

    /// Returns the customer with this name (any casing), creating it if new.
    ///
    /// Concurrent upserts of the same new name create exactly one customer.
    /// An existing customer is returned as stored; the draft's phone and
    /// address are only used on creation.
    pub async fn upsert(&self, draft: CustomerDraft) -> DbResult<Customer> {
        let name = validate_customer_name(&draft.name)?;
        debug!(name = %name, "Upserting customer");

        let customer = Customer {
            id: generate_record_id(),
            name: name.clone(),
            phone: draft.phone,
            address: draft.address,
            created_at: Utc::now(),
        };

        let outcome = self
            .store
            .insert_if_absent(
                CUSTOMERS,
                &Filter::eq_ignore_case("name", name),
                encode(&customer)?,
            )
            .await?;

        if let InsertOutcome::Inserted(_) = &outcome {
            info!(id = %customer.id, name = %customer.name, "Created customer");
        }

        decode(ENTITY, outcome.into_document())
    }

    /// All customers in insertion order.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        debug!("Listing customers");
        decode_all(ENTITY, self.store.list(CUSTOMERS).await?)
    }

    pub async fn get(&self, id: &str) -> DbResult<Customer> {
        debug!(id = %id, "Getting customer");
        match self.store.find_by_id(CUSTOMERS, id).await? {
            Some(doc) => decode(ENTITY, doc),
            None => Err(DbError::not_found(ENTITY, id)),
        }
    }

    /// Corrects a customer's name.
    ///
    /// The uniqueness check and the write happen under one store lock, so a
    /// concurrent upsert of the same name cannot slip in between them.
    ///
    /// ## Errors
    /// - `Validation` - blank or overlong name
    /// - `NotFound` - no customer with `id`
    /// - `Conflict` - another customer already has the name (any casing)
    pub async fn rename(&self, id: &str, name: &str) -> DbResult<Customer> {
        let name = validate_customer_name(name)?;
        debug!(id = %id, name = %name, "Renaming customer");

        let mut patch = Document::new();
        patch.insert("name".to_string(), Value::String(name.clone()));

        let filter = Filter::eq_ignore_case("name", name.as_str());
        match self.store.update_if_unique(CUSTOMERS, id, &filter, patch).await? {
            UpdateOutcome::Updated(doc) => {
                info!(id = %id, name = %name, "Renamed customer");
                decode(ENTITY, doc)
            }
            UpdateOutcome::Taken(_) => Err(DbError::conflict("name", name)),
            UpdateOutcome::Missing => Err(DbError::not_found(ENTITY, id)),
        }
    }

    /// Removes the customer. Their bills are kept.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting customer");
        if self.store.delete(CUSTOMERS, id).await?.is_some() {
            info!(id = %id, "Deleted customer");
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
    use khata_core::ValidationError;

    #[tokio::test]
    async fn test_upsert_is_idempotent_across_casing() {
        let db = memory_db().await;
        let customers = db.customers();

        let first = customers.upsert(CustomerDraft::named("Ali Khan")).await.unwrap();
        let second = customers.upsert(CustomerDraft::named("ali khan")).await.unwrap();
        let third = customers.upsert(CustomerDraft::named("  ALI KHAN ")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.id, third.id);
        assert_eq!(second.name, "Ali Khan");
        assert_eq!(customers.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_keeps_existing_details() {
        let db = memory_db().await;
        let customers = db.customers();

        let created = customers
            .upsert(CustomerDraft {
                name: "Bilal".to_string(),
                phone: Some("0300-1234567".to_string()),
                address: None,
            })
            .await
            .unwrap();
        assert_eq!(created.phone.as_deref(), Some("0300-1234567"));

        let again = customers
            .upsert(CustomerDraft {
                name: "BILAL".to_string(),
                phone: Some("0000".to_string()),
                address: Some("Quetta".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(again, created);
    }

    #[tokio::test]
    async fn test_upsert_rejects_blank_name() {
        let db = memory_db().await;
        let err = db.customers().upsert(CustomerDraft::named("   ")).await.unwrap_err();

        assert!(matches!(
            err,
            DbError::Validation(ValidationError::Required { .. })
        ));
        assert!(db.customers().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_upserts_create_one_customer() {
        let db = memory_db().await;

        let mut handles = Vec::new();
        for i in 0..20 {
            let db = db.clone();
            let name = if i % 2 == 0 { "Haji Rehmat" } else { "HAJI REHMAT" };
            handles.push(tokio::spawn(async move {
                db.customers().upsert(CustomerDraft::named(name)).await.unwrap()
            }));
        }

        let mut ids = std::collections::HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap().id);
        }

        assert_eq!(ids.len(), 1);
        assert_eq!(db.customers().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rename() {
        let db = memory_db().await;
        let customers = db.customers();
        let ali = customers.upsert(CustomerDraft::named("Ali")).await.unwrap();
        customers.upsert(CustomerDraft::named("Bilal")).await.unwrap();

        let renamed = customers.rename(&ali.id, "Ali Khan").await.unwrap();
        assert_eq!(renamed.name, "Ali Khan");
        assert_eq!(renamed.id, ali.id);
        assert_eq!(renamed.created_at, ali.created_at);

        // Changing only the casing of one's own name is allowed
        assert!(customers.rename(&ali.id, "ALI KHAN").await.is_ok());

        let err = customers.rename(&ali.id, "bilal").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = customers.rename("missing", "Someone").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_get_and_delete() {
        let db = memory_db().await;
        let customers = db.customers();
        let ali = customers.upsert(CustomerDraft::named("Ali")).await.unwrap();

        assert_eq!(customers.get(&ali.id).await.unwrap(), ali);

        customers.delete(&ali.id).await.unwrap();
        assert!(customers.get(&ali.id).await.unwrap_err().is_not_found());
        assert!(customers.delete(&ali.id).await.unwrap_err().is_not_found());
    }
}
