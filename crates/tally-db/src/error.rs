//! # Storage Error Types
//!
//! Error types for the Durable Store.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error            CodecError                                     │
//! │       │                     │                                           │
//! │       └─────────┬───────────┘                                           │
//! │                 ▼                                                       │
//! │  DbError (this module) ← Adds context and categorization               │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  DurableStore::load_or ← logs it and returns the fallback              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Payload decoding failures.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The payload carries a version tag this build does not know.
    #[error("Unsupported payload version: {0}")]
    UnsupportedVersion(String),

    /// The base64 envelope is damaged.
    #[error("Corrupt payload envelope: {0}")]
    Envelope(#[from] base64::DecodeError),

    /// The decoded bytes are not the expected JSON.
    #[error("Corrupt payload body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Key not present in the store.
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Stored value could not be decoded or encoded.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Returns true when the stored data itself is bad, as opposed to the
    /// backend being unavailable.
    pub fn is_corrupt_data(&self) -> bool {
        matches!(self, DbError::Codec(_))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → DbError::QueryFailed
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound("unknown".to_string()),
            sqlx::Error::Database(db_err) => DbError::QueryFailed(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Codec(CodecError::Json(err))
    }
}

/// Result type for storage operations.
pub type DbResult<T> = Result<T, DbError>;
