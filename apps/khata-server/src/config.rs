//! Server configuration module.
//!
//! Configuration is loaded from environment variables (after reading an
//! optional `.env` file) with fallback to defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use khata_db::{DbConfig, DEFAULT_CONNECT_TIMEOUT};

/// Which store backend the server runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    Mongo,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind (default: 0.0.0.0)
    pub bind_addr: String,

    /// HTTP port (default: 3001)
    pub port: u16,

    /// KHATA_STORE: `sqlite` (default) or `mongo`
    pub store: StoreKind,

    /// SQLite file path (default: ./data/khata.db)
    pub database_path: PathBuf,

    /// MongoDB connection string
    pub mongodb_uri: String,

    /// MongoDB database name (default: billing_system)
    pub mongodb_database: String,

    /// Bound on establishing the store connection
    pub connect_timeout: Duration,
}

impl ServerConfig {
    /// Load configuration from `.env` and environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is normal outside development
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = match lookup("KHATA_STORE").as_deref() {
            None | Some("sqlite") => StoreKind::Sqlite,
            Some("mongo") | Some("mongodb") => StoreKind::Mongo,
            Some(_) => return Err(ConfigError::InvalidValue("KHATA_STORE".to_string())),
        };

        let connect_timeout = match lookup("CONNECT_TIMEOUT_SECS") {
            Some(secs) => Duration::from_secs(
                secs.parse()
                    .map_err(|_| ConfigError::InvalidValue("CONNECT_TIMEOUT_SECS".to_string()))?,
            ),
            None => DEFAULT_CONNECT_TIMEOUT,
        };

        let config = ServerConfig {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),

            port: lookup("PORT")
                .unwrap_or_else(|| "3001".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,

            store,

            database_path: lookup("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/khata.db")),

            mongodb_uri: lookup("MONGODB_URI")
                .unwrap_or_else(|| "mongodb://localhost:27017/billing_system".to_string()),

            mongodb_database: lookup("MONGODB_DATABASE")
                .unwrap_or_else(|| "billing_system".to_string()),

            connect_timeout,
        };

        if config.connect_timeout.is_zero() {
            return Err(ConfigError::InvalidValue("CONNECT_TIMEOUT_SECS".to_string()));
        }

        Ok(config)
    }

    /// Address the listener binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("BIND_ADDR".to_string()))
    }

    /// Store configuration for `Database::new`.
    pub fn db_config(&self) -> DbConfig {
        let config = match self.store {
            StoreKind::Sqlite => DbConfig::sqlite(&self.database_path),
            StoreKind::Mongo => {
                DbConfig::mongo(self.mongodb_uri.clone(), self.mongodb_database.clone())
            }
        };
        config.connect_timeout(self.connect_timeout)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
