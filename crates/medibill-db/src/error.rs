//! # Database Error Types
//!
//! ```text
//! sqlx::Error ──► DbError ──► ServiceError (billing-api) ──► {code, message}
//! ```
//!
//! Besides the storage failures translated from `sqlx`, repositories raise
//! billing outcomes that only make sense inside a transaction:
//! [`DbError::AlreadyInvoiced`], [`DbError::InsufficientStock`] and
//! [`DbError::VersionConflict`]. Each one rolls back the transaction that
//! raised it.

use sqlx::error::ErrorKind;
use thiserror::Error;

/// SQLite primary result codes for lock contention.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE constraint rejected the write. `constraint` is SQLite's
    /// `table.column` list.
    #[error("Duplicate value for {constraint}")]
    UniqueViolation { constraint: String },

    #[error("Referenced record does not exist: {0}")]
    ForeignKeyViolation(String),

    /// The source document already has an invoice.
    #[error("{source_kind} {source_id} is already invoiced as {invoice_number}")]
    AlreadyInvoiced {
        source_kind: String,
        source_id: String,
        invoice_id: String,
        invoice_number: String,
    },

    /// Deducting stock would take a medication below zero.
    #[error("Insufficient stock for medication {medication_id}: requested {requested}, available {available}")]
    InsufficientStock {
        medication_id: String,
        requested: i64,
        available: i64,
    },

    /// Compare-and-swap on `version` lost to another writer.
    #[error("{entity} {id} was modified concurrently")]
    VersionConflict { entity: String, id: String },

    /// The write lock was still held when `busy_timeout` ran out.
    #[error("Database is busy")]
    Busy,

    #[error("No database connection available")]
    PoolExhausted,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored value no longer parses as its domain type.
    #[error("Corrupt {entity} row {id}: {reason}")]
    CorruptRow {
        entity: String,
        id: String,
        reason: String,
    },

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

    pub fn corrupt(entity: impl Into<String>, id: impl Into<String>, reason: impl ToString) -> Self {
        DbError::CorruptRow {
            entity: entity.into(),
            id: id.into(),
            reason: reason.to_string(),
        }
    }

    /// Failures a caller may retry unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::Busy | DbError::PoolExhausted | DbError::ConnectionFailed(_)
        )
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::UniqueViolation {
                        constraint: message
                            .rsplit(": ")
                            .next()
                            .unwrap_or(message.as_str())
                            .to_string(),
                    },
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation(message),
                    _ => match primary_code(db_err.code().as_deref()) {
                        Some(SQLITE_BUSY) | Some(SQLITE_LOCKED) => DbError::Busy,
                        _ => DbError::QueryFailed(message),
                    },
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            sqlx::Error::Io(e) => DbError::ConnectionFailed(e.to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

/// Extended result codes carry the primary code in their low byte.
fn primary_code(code: Option<&str>) -> Option<i32> {
    code.and_then(|c| c.parse::<i32>().ok()).map(|c| c & 0xff)
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_contention_is_transient() {
        assert!(DbError::Busy.is_transient());
        assert!(DbError::PoolExhausted.is_transient());
        assert!(!DbError::not_found("Invoice", "x").is_transient());
        assert!(!DbError::VersionConflict {
            entity: "Invoice".into(),
            id: "x".into()
        }
        .is_transient());
    }

    #[test]
    fn test_sqlx_pool_errors() {
        assert!(matches!(DbError::from(sqlx::Error::RowNotFound), DbError::NotFound { .. }));
        assert!(matches!(DbError::from(sqlx::Error::PoolTimedOut), DbError::PoolExhausted));
        assert!(DbError::from(sqlx::Error::PoolClosed).is_transient());
    }

    #[test]
    fn test_extended_busy_codes() {
        assert_eq!(primary_code(Some("5")), Some(SQLITE_BUSY));
        assert_eq!(primary_code(Some("517")), Some(SQLITE_BUSY));
        assert_eq!(primary_code(Some("262")), Some(SQLITE_LOCKED));
        assert_eq!(primary_code(None), None);
    }

    #[tokio::test]
    async fn test_constraint_errors_are_classified() {
        let db = crate::Database::new(crate::DbConfig::in_memory()).await.unwrap();

        sqlx::query("INSERT INTO hospitals (id, name, created_at) VALUES ('h', 'H', '2026-01-01')")
            .execute(db.pool())
            .await
            .unwrap();
        let duplicate = sqlx::query("INSERT INTO hospitals (id, name, created_at) VALUES ('h', 'H', '2026-01-01')")
            .execute(db.pool())
            .await
            .unwrap_err();
        match DbError::from(duplicate) {
            DbError::UniqueViolation { constraint } => assert_eq!(constraint, "hospitals.id"),
            other => panic!("unexpected {:?}", other),
        }

        let orphan = sqlx::query(
            "INSERT INTO patients (id, hospital_id, name, created_at) VALUES ('p', 'missing', 'P', '2026-01-01')",
        )
        .execute(db.pool())
        .await
        .unwrap_err();
        assert!(matches!(DbError::from(orphan), DbError::ForeignKeyViolation(_)));
    }
}
