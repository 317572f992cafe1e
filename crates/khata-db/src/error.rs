//! # Database Error Types
//!
//! Error types for store and repository operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error / mongodb::error::Error / serde_json::Error               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ErrorKind ← Validation | NotFound | Conflict | Unavailable | Internal  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (in khata-server) ← 400 / 404 / 409 / 503 / 500              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories add no recovery of their own: a backend failure reaches the
//! caller with its kind intact.

use khata_core::ValidationError;
use thiserror::Error;

/// Store and repository errors.
///
/// `Clone` so a single failed connection attempt can be handed to every
/// caller that was waiting on it.
#[derive(Debug, Clone, Error)]
pub enum DbError {
    /// Input rejected before touching the store.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Record id not present in the collection.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Uniqueness violation.
    ///
    /// ## When This Occurs
    /// - Duplicate `billNumber`
    /// - Renaming a customer onto a name another customer holds
    /// - Duplicate record id on insert
    #[error("Duplicate {field}: '{value}' already exists")]
    Conflict { field: String, value: String },

    /// Backend unreachable or timed out.
    ///
    /// ## When This Occurs
    /// - MongoDB server selection timed out
    /// - Connection attempt exceeded the configured timeout
    /// - SQLite file cannot be opened
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Backend rejected or failed a query.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored record could not be encoded/decoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A multi-collection workflow stopped after some writes committed.
    ///
    /// There are no cross-collection transactions, so `committed` names what
    /// is now persisted and must be compensated by the caller if needed.
    #[error("Partially committed ({committed}): {source}")]
    PartiallyCommitted {
        committed: String,
        #[source]
        source: Box<DbError>,
    },

    /// Internal error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Coarse classification used by the HTTP collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Unavailable,
    Internal,
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Conflict error.
    pub fn conflict(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::Conflict {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Validation(_) => ErrorKind::Validation,
            DbError::NotFound { .. } => ErrorKind::NotFound,
            DbError::Conflict { .. } => ErrorKind::Conflict,
            DbError::Unavailable(_) => ErrorKind::Unavailable,
            DbError::QueryFailed(_)
            | DbError::Serialization(_)
            | DbError::MigrationFailed(_)
            | DbError::PartiallyCommitted { .. }
            | DbError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database (UNIQUE)  → DbError::Conflict
/// sqlx::Error::Database (BUSY)    → DbError::Unavailable
/// sqlx::Error::Database (other)   → DbError::QueryFailed
/// sqlx::Error::PoolTimedOut       → DbError::Unavailable
/// sqlx::Error::PoolClosed / Io    → DbError::Unavailable
/// Other                           → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // "UNIQUE constraint failed: documents.collection, documents.id"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::Conflict {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if is_lock_contention(db_err.code().as_deref(), msg) {
                    DbError::Unavailable(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => {
                DbError::Unavailable("Timed out waiting for a SQLite connection".to_string())
            }

            sqlx::Error::PoolClosed => DbError::Unavailable("Pool is closed".to_string()),

            sqlx::Error::Io(e) => DbError::Unavailable(e.to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6), including their extended codes.
fn is_lock_contention(code: Option<&str>, message: &str) -> bool {
    let primary = code.and_then(|code| code.parse::<i32>().ok()).map(|code| code & 0xff);
    matches!(primary, Some(5 | 6))
        || message.contains("database is locked")
        || message.contains("database table is locked")
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Convert MongoDB driver errors to DbError.
///
/// ## Error Mapping
/// ```text
/// Write error code 11000         → DbError::Conflict (field from `dup key`)
/// ServerSelection / Io / pool    → DbError::Unavailable
/// BSON (de)serialization         → DbError::Serialization
/// Other                          → DbError::QueryFailed
/// ```
impl From<mongodb::error::Error> for DbError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind as MongoKind, WriteFailure};

        match err.kind.as_ref() {
            MongoKind::Write(WriteFailure::WriteError(write_err))
                if write_err.code == DUPLICATE_KEY_CODE =>
            {
                duplicate_key(&write_err.message)
            }
            MongoKind::ServerSelection { .. }
            | MongoKind::Io(_)
            | MongoKind::ConnectionPoolCleared { .. }
            | MongoKind::DnsResolve { .. } => DbError::Unavailable(err.to_string()),
            MongoKind::BsonSerialization(_) | MongoKind::BsonDeserialization(_) => {
                DbError::Serialization(err.to_string())
            }
            _ => DbError::QueryFailed(err.to_string()),
        }
    }
}

/// MongoDB duplicate key error code.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Reads the field and value out of an E11000 message.
///
/// `... index: bill_number_unique dup key: { billNumber: "BILL-1" }` names the
/// field as stored; `_id` is reported as the record's `id`.
fn duplicate_key(message: &str) -> DbError {
    let Some((_, key)) = message.split_once("dup key: {") else {
        return DbError::conflict("key", message);
    };
    let key = key.trim().trim_end_matches('}').trim();
    let Some((field, value)) = key.split_once(':') else {
        return DbError::conflict("key", message);
    };

    let field = match field.trim().trim_matches('"') {
        "_id" => "id",
        other => other,
    };
    DbError::conflict(field, value.trim().trim_matches('"'))
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================
