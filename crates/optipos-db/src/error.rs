//! # Database Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error / serde_json::Error                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (optipos-app) ← Bilingual toast for the frontend             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A second price for the same lens triple, or a reused invoice,
    /// work-order or refund number.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation, e.g. a work order whose invoice
    /// row is missing.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored JSON document could not be read or written.
    #[error("Invalid stored document: {0}")]
    Serialization(String),

    /// Every pooled connection is busy past the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Column named in a SQLite constraint message, e.g. `invoices.invoice_number`
/// out of `UNIQUE constraint failed: invoices.invoice_number`.
fn constrained_column(message: &str) -> String {
    message
        .rsplit_once(": ")
        .map(|(_, columns)| columns.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// ```text
/// RowNotFound                  → NotFound
/// Database(kind = Unique)      → UniqueViolation { field: "table.column" }
/// Database(kind = ForeignKey)  → ForeignKeyViolation
/// Database(other)              → QueryFailed
/// PoolTimedOut / PoolClosed    → PoolExhausted / ConnectionFailed
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation => DbError::UniqueViolation {
                    field: constrained_column(db_err.message()),
                    value: "unknown".to_string(),
                },
                ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation {
                    message: db_err.message().to_string(),
                },
                _ => DbError::QueryFailed(db_err.message().to_string()),
            },
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".to_string()),
            other => DbError::Internal(other.to_string()),
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
        DbError::Serialization(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            DbError::not_found("Invoice", "inv-1").to_string(),
            "Invoice not found: inv-1"
        );
        assert_eq!(
            DbError::duplicate("invoice_number", "INV-1").to_string(),
            "Duplicate invoice_number: 'INV-1' already exists"
        );
    }

    #[test]
    fn test_constrained_column() {
        assert_eq!(
            constrained_column("UNIQUE constraint failed: invoices.invoice_number"),
            "invoices.invoice_number"
        );
        assert_eq!(constrained_column("disk I/O error"), "unknown");
    }

    #[test]
    fn test_json_error_converts() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(DbError::from(err), DbError::Serialization(_)));
    }
}
