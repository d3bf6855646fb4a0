//! # Local Store Errors
//!
//! Every repository call returns [`DbResult`]. Callers in the sync engine
//! wrap these in `SyncError::Database`; the loop that hit one logs it and
//! retries on its next tick.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sqlx::Error                         DbError                            │
//! │  ───────────                         ───────                            │
//! │  RowNotFound                   ──►   NotFound                           │
//! │  "UNIQUE constraint failed: t.c" ─►  UniqueViolation { field: "t.c" }   │
//! │  "FOREIGN KEY constraint failed" ─►  ForeignKeyViolation                │
//! │  "CHECK constraint failed: …"  ──►   ConstraintViolation                │
//! │  trigger RAISE(ABORT, …)       ──►   ConstraintViolation                │
//! │  ColumnDecode                  ──►   CorruptRow                         │
//! │  PoolTimedOut                  ──►   PoolExhausted                      │
//! │  PoolClosed                    ──►   ConnectionFailed                   │
//! │  anything else                 ──►   QueryFailed / Internal             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use lane_core::ValidationError;
use thiserror::Error;

/// Messages raised by the schema triggers in `001_initial_schema.sql`.
const TRIGGER_MESSAGES: [&str; 3] = ["cannot leave synced", "immutable", "append-only"];

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Row not found")]
    NotFound,

    /// A catalog payload listing the same UPC or PIN twice, or a reused
    /// transaction id.
    #[error("Duplicate {field}")]
    UniqueViolation { field: String },

    /// Line item written without its parent transaction.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// CHECK constraint or one of the status/snapshot triggers rejected the
    /// write.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Checkout input rejected before reaching SQLite.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored value no longer decodes into its domain type.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// True for rejections by the schema itself (unique, foreign key, CHECK,
    /// triggers).
    pub fn is_constraint(&self) -> bool {
        matches!(
            self,
            DbError::UniqueViolation { .. }
                | DbError::ForeignKeyViolation(_)
                | DbError::ConstraintViolation(_)
        )
    }

    fn from_sqlite_message(msg: &str) -> Self {
        if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
            DbError::UniqueViolation {
                field: field.to_string(),
            }
        } else if msg.starts_with("FOREIGN KEY constraint failed") {
            DbError::ForeignKeyViolation(msg.to_string())
        } else if msg.starts_with("CHECK constraint failed")
            || TRIGGER_MESSAGES.iter().any(|t| msg.contains(t))
        {
            DbError::ConstraintViolation(msg.to_string())
        } else {
            DbError::QueryFailed(msg.to_string())
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) => DbError::from_sqlite_message(db_err.message()),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::CorruptRow(format!("column {index}: {source}"))
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
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
    fn test_sqlite_messages_are_categorised() {
        let unique = DbError::from_sqlite_message("UNIQUE constraint failed: products.upc");
        assert!(matches!(&unique, DbError::UniqueViolation { field } if field == "products.upc"));

        let check = DbError::from_sqlite_message("CHECK constraint failed: price_cents >= 0");
        assert!(matches!(check, DbError::ConstraintViolation(_)));

        let trigger = DbError::from_sqlite_message("transaction is immutable");
        assert!(trigger.is_constraint());

        let other = DbError::from_sqlite_message("no such table: widgets");
        assert!(matches!(other, DbError::QueryFailed(_)));
        assert!(!other.is_constraint());
    }

    #[test]
    fn test_pool_timeout_maps_to_exhausted() {
        assert!(matches!(DbError::from(sqlx::Error::PoolTimedOut), DbError::PoolExhausted));
        assert!(matches!(DbError::from(sqlx::Error::RowNotFound), DbError::NotFound));
    }
}
