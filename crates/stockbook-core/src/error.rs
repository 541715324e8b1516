//! # Domain Errors
//!
//! Two enums live here. [`ValidationError`] covers malformed input and is
//! raised before the store is touched. [`CoreError`] covers business rules
//! (stock, debit balance, debit membership) and wraps validation failures.
//! The database crate wraps `CoreError` again, and the HTTP layer turns the
//! result into a status plus a stable code:
//!
//! ```text
//!   ValidationError ─► CoreError ─► DbError::Rejected ─► ApiError
//!   "amount must be positive"       422 / 400 / 404 / 409 by variant
//! ```

use thiserror::Error;

/// A rule refused the operation. Never raised after a commit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Debit not found: {0}")]
    DebitNotFound(String),

    #[error("Sell history not found: {0}")]
    SellHistoryNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    /// `requested` units asked for while only `available` are on the shelf.
    /// Stock, revenue and history are left as they were.
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// `remaining_cents` is what the debit still owes (0 once paid).
    #[error("Payment exceeds debit total for {debit_id}: at most {remaining_cents} can still be paid")]
    ExceedsTotal {
        debit_id: String,
        remaining_cents: i64,
    },

    #[error("Debit total must be greater than zero, got {total_cents}")]
    InvalidDebitTotal { total_cents: i64 },

    /// Each history row can be owed on at most one debit.
    #[error("Sell history {0} already belongs to a debit")]
    AlreadyInDebit(String),

    #[error("{entity} {id} is referenced by a debit")]
    ReferencedByDebit { entity: String, id: String },

    /// Checked cents arithmetic left the `i64` range.
    #[error("Amount overflow while computing {0}")]
    Overflow(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Any of the `*NotFound` variants.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::ProductNotFound(_)
                | CoreError::ServiceNotFound(_)
                | CoreError::DebitNotFound(_)
                | CoreError::SellHistoryNotFound(_)
                | CoreError::CategoryNotFound(_)
        )
    }
}

/// Malformed input, detected before any store access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Empty after trimming.
    #[error("{field} is required")]
    Required { field: String },

    /// Length in characters, not bytes.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Ids that are not UUIDs, phone numbers with letters.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    #[error("{field} '{value}' is listed more than once")]
    Duplicate { field: String, value: String },

    #[error("{field} must contain between {min} and {max} entries")]
    BadLength { field: String, min: usize, max: usize },
}

pub type CoreResult<T> = Result<T, CoreError>;
