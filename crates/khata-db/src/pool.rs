//! # Database Handle
//!
//! Store selection, configuration and repository access.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Handle                                    │
//! │                                                                         │
//! │  Server Startup                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::sqlite(path) | DbConfig::mongo(uri, db) | in_memory()       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await                                           │
//! │       │                                                                 │
//! │       ├── Sqlite ──► SqliteStore::open (pool + migrations, eager)      │
//! │       └── Mongo  ──► LazyStore(MongoStore::connect) (on first use)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Arc<dyn DocumentStore> shared by every repository                     │
//! │                                                                         │
//! │  db.customers()  db.bills()  db.roznamcha()  db.receipts()             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories are cheap handles around the shared store; create them per
//! request rather than caching them.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::error::DbResult;
use crate::repository::bill::BillLedger;
use crate::repository::customer::CustomerDirectory;
use crate::repository::ponch::ReceiptBook;
use crate::repository::roznamcha::CashBook;
use crate::store::{DocumentStore, LazyStore, MongoStore, SqliteStore};

/// Default bound on establishing a backend connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Configuration
// =============================================================================

/// Which backend holds the collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Embedded SQLite file. `:memory:` for a throwaway database.
    Sqlite { path: PathBuf },
    /// Remote MongoDB server.
    Mongo { uri: String, database: String },
}

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::sqlite("./data/khata.db")
///     .max_connections(5)
///     .connect_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub backend: StoreBackend,

    /// Maximum number of SQLite connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of SQLite connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Bound on opening a connection (SQLite pool acquire, MongoDB connect).
    /// Default: 10 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a SQLite connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Maximum lifetime of a SQLite connection.
    /// Default: 30 minutes
    pub max_lifetime: Duration,

    /// Whether to run SQLite migrations on open.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    fn with_backend(backend: StoreBackend) -> Self {
        DbConfig {
            backend,
            max_connections: 5,
            min_connections: 1,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
            run_migrations: true,
        }
    }

    /// SQLite file store. The file is created if it doesn't exist.
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        DbConfig::with_backend(StoreBackend::Sqlite { path: path.into() })
    }

    /// MongoDB store, connected lazily on first use.
    pub fn mongo(uri: impl Into<String>, database: impl Into<String>) -> Self {
        DbConfig::with_backend(StoreBackend::Mongo {
            uri: uri.into(),
            database: database.into(),
        })
    }

    /// Creates an in-memory database configuration (for testing).
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1, // In-memory requires single connection
            connect_timeout: Duration::from_secs(5),
            ..DbConfig::sqlite(":memory:")
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on open.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// ## Usage in Handlers
/// ```rust,ignore
/// async fn list_bills(State(state): State<AppState>) -> Result<Json<Vec<Bill>>, ApiError> {
///     Ok(Json(state.db.bills().list().await?))
/// }
/// ```
#[derive(Clone)]
pub struct Database {
    store: Arc<dyn DocumentStore>,
}

impl Database {
    /// Creates the database handle for the configured backend.
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use handle (MongoDB connects on first call)
    /// * `Err(DbError)` - SQLite open or migration failed
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let store: Arc<dyn DocumentStore> = match &config.backend {
            StoreBackend::Sqlite { path } => Arc::new(SqliteStore::open(&config, path).await?),
            StoreBackend::Mongo { uri, database } => {
                let uri = uri.clone();
                let database = database.clone();
                let timeout = config.connect_timeout;
                Arc::new(LazyStore::new("mongo", timeout, move || {
                    let uri = uri.clone();
                    let database = database.clone();
                    async move {
                        let store = MongoStore::connect(&uri, &database, timeout).await?;
                        Ok(Arc::new(store) as Arc<dyn DocumentStore>)
                    }
                }))
            }
        };

        info!(backend = store.backend(), "Database handle ready");
        Ok(Database { store })
    }

    /// Wraps an already-built store.
    pub fn from_store(store: Arc<dyn DocumentStore>) -> Self {
        Database { store }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Returns the customer directory.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let customer = db.customers().upsert(CustomerDraft::named("Ali")).await?;
    /// ```
    pub fn customers(&self) -> CustomerDirectory {
        CustomerDirectory::new(self.store.clone())
    }

    /// Returns the bill ledger.
    pub fn bills(&self) -> BillLedger {
        BillLedger::new(self.store.clone())
    }

    /// Returns the cash book (roznamcha).
    pub fn roznamcha(&self) -> CashBook {
        CashBook::new(self.store.clone())
    }

    /// Returns the receipt book (ponch).
    pub fn receipts(&self) -> ReceiptBook {
        ReceiptBook::new(self.store.clone())
    }

    /// Checks if the store is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        self.store.health_check().await
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("backend", &self.store.backend())
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
