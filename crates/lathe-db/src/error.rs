//! # Storage Errors
//!
//! What can go wrong between a repository call and SQLite.
//!
//! ## Where Errors Come From
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sqlx::Error                      CoreError (rule checked inside a tx) │
//! │    ├── RowNotFound        ─┐        ├── QuoteLocked                     │
//! │    ├── UNIQUE failed       │        ├── StaleCalculation                │
//! │    ├── FOREIGN KEY failed  ├──►  DbError  ◄──┤                          │
//! │    ├── PoolTimedOut        │        └── Validation                      │
//! │    └── anything else      ─┘                                            │
//! │                                │                                        │
//! │                                ▼                                        │
//! │                  ApiError (server) picks the HTTP status                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use lathe_core::{CoreError, ValidationError};
use sqlx::error::ErrorKind;
use thiserror::Error;

/// Errors returned by every repository.
#[derive(Debug, Error)]
pub enum DbError {
    /// No row for the requested id.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the write.
    ///
    /// ## When This Occurs
    /// - Quote number already taken
    /// - Two first saves racing for the same calculation slot
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A reference points at a row that isn't there.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A business rule failed part-way through a transaction, which was
    /// rolled back.
    ///
    /// ## When This Occurs
    /// - Quote is no longer editable (`QuoteLocked`)
    /// - Optimistic version check failed (`StaleCalculation`)
    /// - Line item or part missing
    /// - Input validation
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A stored decimal column doesn't parse.
    #[error("Invalid {field} on {entity}: '{value}'")]
    InvalidData {
        entity: String,
        field: String,
        value: String,
    },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// SQLite refused the statement for another reason (CHECK, NOT NULL,
    /// syntax, locked database).
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// No connection freed up within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn invalid_data(
        entity: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        DbError::InvalidData {
            entity: entity.into(),
            field: field.into(),
            value: value.into(),
        }
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Core(CoreError::Validation(err))
    }
}

/// Classifies sqlx errors by the driver's error kind rather than by
/// message text. Repositories that know which value collided replace
/// the generic `UniqueViolation` with [`DbError::duplicate`].
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "unknown"),
            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation => {
                    // SQLite: "UNIQUE constraint failed: quotes.quote_number"
                    let column = db_err
                        .message()
                        .rsplit(": ")
                        .next()
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::duplicate(column, "unknown")
                }
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

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = DbError::not_found("Quote", 42);
        assert_eq!(err.to_string(), "Quote not found: 42");
    }

    #[test]
    fn test_core_errors_pass_through() {
        let err: DbError = CoreError::QuoteLocked {
            quote_id: 7,
            status: "sent".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Quote 7 is sent and can no longer be edited");
    }

    #[test]
    fn test_validation_becomes_core() {
        let err: DbError = ValidationError::InvalidAmount {
            field: "price".to_string(),
        }
        .into();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[test]
    fn test_pool_errors() {
        assert!(matches!(DbError::from(sqlx::Error::PoolTimedOut), DbError::PoolExhausted));
        assert!(matches!(
            DbError::from(sqlx::Error::PoolClosed),
            DbError::ConnectionFailed(_)
        ));
    }
}
