//! # HTTP Errors
//!
//! Handlers return `Result<_, ApiError>`. Every lower-layer error converts
//! into an [`ApiError`] through `From`, so `?` is enough at the call site.
//!
//! ```text
//!   DbError::Rejected(CoreError)       → 400 / 404 / 409 / 422 by rule
//!   DbError::Conflict, UniqueViolation → 409
//!   DbError::QueryFailed, Internal ... → 500, logged, generic message
//!   JsonRejection, QueryRejection      → 400
//!
//!   body: {"code": "INSUFFICIENT_STOCK", "message": "..."}
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::fmt;
use ts_rs::TS;

use stockbook_core::{CoreError, ValidationError};
use stockbook_db::DbError;

/// Error body returned by every failing endpoint.
///
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for 5f0c…: available 7, requested 8"
/// }
/// ```
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApiError {
    pub code: ErrorCode,
    /// Safe to show to the user. Never contains SQL.
    pub message: String,
}

/// Stable codes the frontend switches on. The status is derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    InsufficientStock,
    ExceedsTotal,
    /// Busy write lock, duplicate value or a row still in use.
    Conflict,
    DatabaseError,
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::InsufficientStock | ErrorCode::ExceedsTotal => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{resource} not found: {id}"))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            e if e.is_not_found() => ErrorCode::NotFound,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::ExceedsTotal { .. } => ErrorCode::ExceedsTotal,
            CoreError::AlreadyInDebit(_) | CoreError::ReferencedByDebit { .. } => {
                ErrorCode::Conflict
            }
            CoreError::Validation(_) | CoreError::InvalidDebitTotal { .. } => {
                ErrorCode::ValidationError
            }
            CoreError::Overflow(what) => {
                tracing::error!(%what, "Arithmetic overflow");
                return ApiError::internal("Amount out of range");
            }
            _ => ErrorCode::Internal,
        };

        ApiError::new(code, err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Storage details go to the log, never into the response body.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Rejected(core) => core.into(),
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, .. } => {
                ApiError::new(ErrorCode::Conflict, format!("{field} is already taken"))
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!(%message, "Reference check failed");
                ApiError::new(ErrorCode::Conflict, "Invalid or still-referenced record")
            }
            DbError::Conflict(e) => {
                tracing::warn!(error = %e, "Write lock busy");
                ApiError::new(ErrorCode::Conflict, "The record is busy, try again")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!(error = %e, "Cannot open database");
                ApiError::new(ErrorCode::DatabaseError, "Database unavailable")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!(error = %e, "Schema migration failed");
                ApiError::new(ErrorCode::DatabaseError, "Database unavailable")
            }
            DbError::QueryFailed(e) => {
                tracing::error!(error = %e, "Statement failed");
                ApiError::new(ErrorCode::DatabaseError, "Could not complete the request")
            }
            DbError::PoolExhausted => {
                tracing::error!("No free database connection");
                ApiError::new(ErrorCode::DatabaseError, "Server busy, try again")
            }
            DbError::Internal(e) => {
                tracing::error!(error = %e, "Unexpected storage error");
                ApiError::new(ErrorCode::DatabaseError, "Could not complete the request")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_codes() {
        let err: ApiError = CoreError::InsufficientStock {
            product_id: "p-1".into(),
            available: 7,
            requested: 8,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.message.contains("available 7"));

        let err: ApiError = CoreError::ExceedsTotal {
            debit_id: "d-1".into(),
            remaining_cents: 0,
        }
        .into();
        assert_eq!(err.code, ErrorCode::ExceedsTotal);

        let err: ApiError = CoreError::DebitNotFound("d-1".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: ApiError = CoreError::InvalidDebitTotal { total_cents: 0 }.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = CoreError::AlreadyInDebit("h-1".into()).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_db_errors_hide_internals() {
        let err: ApiError = DbError::QueryFailed("near \"SELEC\": syntax error".into()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("SELEC"));

        let err: ApiError = DbError::Conflict("database is locked".into()).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(!err.message.contains("locked"));

        let err: ApiError = DbError::duplicate("categories.name", "Drinks").into();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[test]
    fn test_rejection_passes_core_through() {
        let err: ApiError = DbError::Rejected(CoreError::ProductNotFound("p-9".into())).into();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(err.message.contains("p-9"));
    }

    #[test]
    fn test_serialized_shape() {
        let err = ApiError::validation("amount must be positive");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["message"], "amount must be positive");
    }
}
