//! # Lazy Store Handle
//!
//! Process-scoped store that connects on first use.
//!
//! ## Connection Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  caller A ──┐                                                           │
//! │  caller B ──┼──► pending? ──no──► start attempt (bounded by timeout)   │
//! │  caller C ──┘        │                    │                             │
//! │                     yes                   ▼                             │
//! │                      └──────► await the same shared attempt            │
//! │                                           │                             │
//! │                         ┌─────────────────┴─────────────┐               │
//! │                         ▼                               ▼               │
//! │                      Ok(store)                      Err(e)              │
//! │                  cached for the process      attempt cleared, every     │
//! │                                              waiter gets e, the next    │
//! │                                              call starts a new attempt  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use khata_core::Document;
use tracing::{info, warn};

use super::{DocumentStore, Filter, InsertOutcome, UpdateOutcome};
use crate::error::{DbError, DbResult};

type ConnectResult = Result<Arc<dyn DocumentStore>, DbError>;
type Connector = Box<dyn Fn() -> BoxFuture<'static, ConnectResult> + Send + Sync>;
type PendingConnect = Shared<BoxFuture<'static, ConnectResult>>;

/// Connects on first use and then hands out the same backend.
pub struct LazyStore {
    backend: &'static str,
    timeout: Duration,
    connector: Connector,
    ready: OnceLock<Arc<dyn DocumentStore>>,
    pending: Mutex<Option<PendingConnect>>,
}

impl LazyStore {
    /// Creates an unconnected handle. `connect` runs at most once per
    /// attempt, and each attempt is abandoned after `timeout`.
    pub fn new<F, Fut>(backend: &'static str, timeout: Duration, connect: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ConnectResult> + Send + 'static,
    {
        LazyStore {
            backend,
            timeout,
            connector: Box::new(move || connect().boxed()),
            ready: OnceLock::new(),
            pending: Mutex::new(None),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.ready.get().is_some()
    }

    /// Returns the connected backend, connecting if needed.
    pub async fn store(&self) -> DbResult<Arc<dyn DocumentStore>> {
        if let Some(store) = self.ready.get() {
            return Ok(store.clone());
        }

        let attempt = {
            let mut pending = self
                .pending
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            if let Some(store) = self.ready.get() {
                return Ok(store.clone());
            }

            match pending.as_ref() {
                Some(attempt) => attempt.clone(),
                None => {
                    let attempt = self.start_attempt();
                    *pending = Some(attempt.clone());
                    attempt
                }
            }
        };

        let result = attempt.clone().await;

        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match &result {
            Ok(store) => {
                if self.ready.set(store.clone()).is_ok() {
                    info!(backend = self.backend, "Store connected");
                }
            }
            Err(e) => warn!(backend = self.backend, error = %e, "Store connection failed"),
        }

        if pending
            .as_ref()
            .map(|current| current.ptr_eq(&attempt))
            .unwrap_or(false)
        {
            *pending = None;
        }

        result
    }

    fn start_attempt(&self) -> PendingConnect {
        let connect = (self.connector)();
        let timeout = self.timeout;
        let backend = self.backend;

        info!(backend, timeout_secs = timeout.as_secs_f64(), "Connecting store");

        async move {
            match tokio::time::timeout(timeout, connect).await {
                Ok(result) => result,
                Err(_) => Err(DbError::Unavailable(format!(
                    "{backend} connection timed out after {timeout:?}"
                ))),
            }
        }
        .boxed()
        .shared()
    }
}

impl std::fmt::Debug for LazyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyStore")
            .field("backend", &self.backend)
            .field("timeout", &self.timeout)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[async_trait]
impl DocumentStore for LazyStore {
    fn backend(&self) -> &'static str {
        self.backend
    }

    async fn list(&self, collection: &str) -> DbResult<Vec<Document>> {
        self.store().await?.list(collection).await
    }

    async fn insert(&self, collection: &str, record: Document) -> DbResult<Document> {
        self.store().await?.insert(collection, record).await
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> DbResult<Option<Document>> {
        self.store().await?.find_by_id(collection, id).await
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> DbResult<Option<Document>> {
        self.store().await?.find_one(collection, filter).await
    }

    async fn find(&self, collection: &str, filter: &Filter) -> DbResult<Vec<Document>> {
        self.store().await?.find(collection, filter).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Document,
    ) -> DbResult<Option<Document>> {
        self.store().await?.update(collection, id, partial).await
    }

    async fn update_if_unique(
        &self,
        collection: &str,
        id: &str,
        filter: &Filter,
        partial: Document,
    ) -> DbResult<UpdateOutcome> {
        self.store()
            .await?
            .update_if_unique(collection, id, filter, partial)
            .await
    }

    async fn delete(&self, collection: &str, id: &str) -> DbResult<Option<Document>> {
        self.store().await?.delete(collection, id).await
    }

    async fn insert_if_absent(
        &self,
        collection: &str,
        filter: &Filter,
        record: Document,
    ) -> DbResult<InsertOutcome> {
        self.store()
            .await?
            .insert_if_absent(collection, filter, record)
            .await
    }

    async fn health_check(&self) -> bool {
        match self.store().await {
            Ok(store) => store.health_check().await,
            Err(_) => false,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use crate::store::SqliteStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn memory_store() -> ConnectResult {
        let config = DbConfig::in_memory();
        let store = SqliteStore::open(&config, std::path::Path::new(":memory:")).await?;
        Ok(Arc::new(store))
    }

    #[tokio::test]
    async fn test_connects_once_under_concurrent_first_use() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let lazy = Arc::new(LazyStore::new("sqlite", Duration::from_secs(5), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                memory_store().await
            }
        }));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let lazy = lazy.clone();
            handles.push(tokio::spawn(async move { lazy.list("customers").await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().unwrap().is_empty());
        }

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(lazy.is_connected());

        // Later calls reuse the connected store
        lazy.list("bills").await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_connect_is_unavailable() {
        let lazy = LazyStore::new("mongo", Duration::from_secs(10), || {
            futures_util::future::pending::<ConnectResult>()
        });

        let err = lazy.list("customers").await.unwrap_err();
        assert!(matches!(err, DbError::Unavailable(_)));
        assert!(!lazy.is_connected());
        assert!(!lazy.health_check().await);
    }

    #[tokio::test]
    async fn test_failed_attempt_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let lazy = LazyStore::new("sqlite", Duration::from_secs(5), move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(DbError::Unavailable("connection refused".to_string()))
                } else {
                    memory_store().await
                }
            }
        });

        assert!(lazy.list("ponch").await.is_err());
        assert!(lazy.list("ponch").await.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
