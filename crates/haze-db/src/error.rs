//! Errors raised by the ledger repositories.
//!
//! ```text
//!   sqlx::Error ──────────┐
//!   MigrateError ─────────┤
//!   CoreError (stock,     ├──► DbError ──► ApiError (status + JSON body)
//!   overpayment, ...) ────┘
//! ```
//!
//! Business rules that must be checked against live rows (stock on hand,
//! outstanding balances, the last admin) run inside the same transaction
//! as the write and surface as [`DbError::Rule`].

use haze_core::{CoreError, ValidationError};
use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A registered email, or any other UNIQUE column, is already taken.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A row points at a product, sale or payable that does not exist.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Delete refused because other rows still depend on it.
    #[error("{entity} {id} is still in use: {reason}")]
    InUse {
        entity: String,
        id: String,
        reason: String,
    },

    #[error(transparent)]
    Rule(#[from] CoreError),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// SQL that SQLite rejected, including CHECK constraint failures.
    #[error("Query failed: {0}")]
    QueryFailed(String),

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

    pub fn in_use(
        entity: impl Into<String>,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        DbError::InUse {
            entity: entity.into(),
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// `"UNIQUE constraint failed: users.email"` → `"users.email"`.
fn constrained_column(message: &str) -> &str {
    message
        .rsplit_once(": ")
        .map(|(_, column)| column)
        .unwrap_or("unknown")
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let message = db_err.message();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => {
                        DbError::duplicate(constrained_column(message), "unknown")
                    }
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation {
                        message: message.to_string(),
                    },
                    _ => DbError::QueryFailed(message.to_string()),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Rule(CoreError::Validation(err))
    }
}

pub type DbResult<T> = Result<T, DbError>;
