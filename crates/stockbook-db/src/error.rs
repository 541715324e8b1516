//! # Storage Errors
//!
//! [`DbError`] is what every repository returns. A business rule that
//! refused the write arrives unchanged as [`DbError::Rejected`]; everything
//! else is a storage condition classified from `sqlx::Error`.
//!
//! ```text
//!   CoreError ───────────────┐
//!   ValidationError ─► Core ─┼──► DbError ──► ApiError (status + code)
//!   sqlx::Error ─ classify ──┘
//! ```

use sqlx::error::{DatabaseError, ErrorKind};
use stockbook_core::{CoreError, ValidationError};
use thiserror::Error;

/// SQLITE_BUSY plus the BUSY_RECOVERY and BUSY_SNAPSHOT extended codes.
const SQLITE_BUSY_CODES: [&str; 3] = ["5", "261", "517"];

#[derive(Debug, Error)]
pub enum DbError {
    /// Refused by a business rule before anything was committed.
    #[error(transparent)]
    Rejected(#[from] CoreError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index fired: a duplicate category name, or one history row
    /// claimed by two debits.
    #[error("{field} '{value}' is already taken")]
    UniqueViolation { field: String, value: String },

    /// A row points at something missing, or something still points at it.
    #[error("Reference check failed: {message}")]
    ForeignKeyViolation { message: String },

    /// The write lock stayed busy longer than the configured busy timeout.
    #[error("Write lock busy: {0}")]
    Conflict(String),

    #[error("Cannot open database: {0}")]
    ConnectionFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    /// SQLite rejected the statement for any other reason.
    #[error("Statement failed: {0}")]
    QueryFailed(String),

    /// No pooled connection became free within the acquire timeout.
    #[error("No free database connection")]
    PoolExhausted,

    #[error("Unexpected storage error: {0}")]
    Internal(String),
}

pub type DbResult<T> = Result<T, DbError>;

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

    /// The business rejection carried by this error, if any.
    pub fn as_rejection(&self) -> Option<&CoreError> {
        match self {
            DbError::Rejected(err) => Some(err),
            _ => None,
        }
    }

    fn classify(err: &dyn DatabaseError) -> Self {
        let message = err.message().to_string();

        match err.kind() {
            ErrorKind::UniqueViolation => {
                // "UNIQUE constraint failed: categories.name"
                let field = message
                    .rsplit_once(": ")
                    .map(|(_, columns)| columns.to_string())
                    .unwrap_or_else(|| "value".to_string());
                DbError::UniqueViolation {
                    field,
                    value: String::new(),
                }
            }
            ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
            _ => {
                let busy = err
                    .code()
                    .is_some_and(|code| SQLITE_BUSY_CODES.contains(&code.as_ref()));
                if busy || message.contains("database is locked") {
                    DbError::Conflict(message)
                } else {
                    DbError::QueryFailed(message)
                }
            }
        }
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        CoreError::Validation(err).into()
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => DbError::classify(db_err.as_ref()),
            sqlx::Error::RowNotFound => DbError::not_found("Row", "unknown"),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_is_kept() {
        let err: DbError = CoreError::DebitNotFound("d-1".into()).into();
        assert!(matches!(
            err.as_rejection(),
            Some(CoreError::DebitNotFound(id)) if id == "d-1"
        ));
        assert_eq!(err.to_string(), "Debit not found: d-1");
    }

    #[test]
    fn test_validation_error_becomes_rejection() {
        let err: DbError = ValidationError::Required {
            field: "name".into(),
        }
        .into();
        assert!(matches!(
            err,
            DbError::Rejected(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_pool_timeout_maps_to_exhausted() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, DbError::PoolExhausted));
    }
}
