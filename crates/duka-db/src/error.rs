//! # Database Error Types
//!
//! Error types for storage, configuration and balance writes.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError ← Adds context and categorization                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PaymentError::PersistenceFailure { stage, source }                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UI shows the condition and offers a retry                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use thiserror::Error;

use duka_core::CoreError;

// =============================================================================
// DbError
// =============================================================================

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A conditional update lost to a concurrent writer.
    ///
    /// ## When This Occurs
    /// - Another process updated the customer between read and write
    ///   (`sync_version` no longer matches)
    #[error("{entity} {id} was modified concurrently (expected version {expected})")]
    VersionConflict {
        entity: String,
        id: String,
        expected: i64,
    },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // "UNIQUE constraint failed: <table>.<column>"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

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

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// PaymentError
// =============================================================================

/// Which durable write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    /// Writing the payment rows. The balance was not touched.
    Rows,
    /// Writing the balance. Rows may already be recorded; retrying the same
    /// request completes it without double-counting.
    Balance,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteStage::Rows => write!(f, "payment rows"),
            WriteStage::Balance => write!(f, "balance"),
        }
    }
}

/// What a balance reconciliation surfaces to its caller.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Rejected before any write.
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// The request itself is malformed (missing customer, bad method).
    #[error("Invalid payment: {0}")]
    Invalid(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// A read failed before anything was written.
    #[error("Storage unavailable: {0}")]
    Storage(#[source] DbError),

    /// The store rejected a write. Do not assume the balance was updated.
    #[error("Failed to persist {stage}: {source}")]
    PersistenceFailure {
        stage: WriteStage,
        #[source]
        source: DbError,
    },
}

impl PaymentError {
    pub fn persistence(stage: WriteStage, source: DbError) -> Self {
        PaymentError::PersistenceFailure { stage, source }
    }
}

impl From<CoreError> for PaymentError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidAmount { reason } => PaymentError::InvalidAmount { reason },
            CoreError::Validation(inner) => PaymentError::Invalid(inner.to_string()),
        }
    }
}

/// Result type for ledger operations.
pub type PaymentResult<T> = Result<T, PaymentError>;

// =============================================================================
// ConfigError
// =============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_maps_to_invalid_amount() {
        let err: PaymentError = CoreError::invalid_amount("KES 0.00 is not positive").into();
        assert!(matches!(err, PaymentError::InvalidAmount { .. }));
        assert_eq!(err.to_string(), "Invalid amount: KES 0.00 is not positive");
    }

    #[test]
    fn test_persistence_failure_message() {
        let err = PaymentError::persistence(
            WriteStage::Balance,
            DbError::QueryFailed("disk I/O error".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "Failed to persist balance: Query failed: disk I/O error"
        );
    }
}
