//! # Validation Module
//!
//! Input validation utilities for Stockbook.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler (apps/api)                                      │
//! │  ├── Type validation (JSON deserialization)                            │
//! │  └── THIS MODULE: rules checked before any store access                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Ledger arithmetic (ledger.rs)                                │
//! │  └── Stock and payment limits against the loaded row                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints (quantity >= 0, paid <= total)                  │
//! │  ├── UNIQUE (one debit per sell-history row)                           │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockbook_core::validation::{validate_name, validate_sell_amount};
//!
//! let name = validate_name("name", "  Rice 5kg ", 200).unwrap();
//! assert_eq!(name, "Rice 5kg");
//!
//! validate_sell_amount(3).unwrap();
//! ```

use chrono::NaiveDate;
use std::collections::HashSet;

use crate::error::ValidationError;
use crate::{MAX_BULK_SELL_LINES, MAX_DEBIT_ITEMS, MAX_SELL_AMOUNT};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Default page size for list queries.
pub const DEFAULT_LIST_LIMIT: i64 = 100;

/// Largest page size a list query may request.
pub const MAX_LIST_LIMIT: i64 = 500;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required display string and returns it trimmed.
///
/// ## Example
/// ```rust
/// use stockbook_core::validation::validate_name;
///
/// assert!(validate_name("name", "Rice", 200).is_ok());
/// assert!(validate_name("name", "   ", 200).is_err());
/// assert!(validate_name("name", &"A".repeat(201), 200).is_err());
/// ```
pub fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Validates an optional free-text field.
///
/// Blank input collapses to `None`.
pub fn validate_optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> ValidationResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) if text.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        Some(text) => Ok(Some(text.to_string())),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates the unit count of one sell line.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_SELL_AMOUNT
pub fn validate_sell_amount(amount: i64) -> ValidationResult<()> {
    if amount <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    if amount > MAX_SELL_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 1,
            max: MAX_SELL_AMOUNT,
        });
    }

    Ok(())
}

/// Validates the unit price charged in a sale.
///
/// Discounts and markups are fine, giving it away is not.
pub fn validate_sold_price_cents(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "soldPrice".to_string(),
        });
    }

    Ok(())
}

/// Validates a catalog price in cents.
///
/// ## Example
/// ```rust
/// use stockbook_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents("initialPrice", 1099).is_ok());
/// assert!(validate_price_cents("initialPrice", 0).is_ok());
/// assert!(validate_price_cents("initialPrice", -100).is_err());
/// ```
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a stock level set by a direct edit.
pub fn validate_stock_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity < 0 {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a payment amount in cents.
///
/// ## Rules
/// - Must be positive (> 0)
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    Ok(())
}

/// Validates an expense amount in cents.
pub fn validate_expense_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    Ok(())
}

/// Resolves an optional page size to a concrete limit.
///
/// ## Example
/// ```rust
/// use stockbook_core::validation::validate_limit;
///
/// assert_eq!(validate_limit(None).unwrap(), 100);
/// assert_eq!(validate_limit(Some(20)).unwrap(), 20);
/// assert!(validate_limit(Some(0)).is_err());
/// ```
pub fn validate_limit(limit: Option<i64>) -> ValidationResult<i64> {
    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);

    if !(1..=MAX_LIST_LIMIT).contains(&limit) {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: MAX_LIST_LIMIT,
        });
    }

    Ok(limit)
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines in a bulk sell.
///
/// ## Rules
/// - At least one line
/// - At most MAX_BULK_SELL_LINES
///
/// Repeated product ids are allowed; they apply in order.
pub fn validate_bulk_lines(count: usize) -> ValidationResult<()> {
    if count == 0 || count > MAX_BULK_SELL_LINES {
        return Err(ValidationError::BadLength {
            field: "items".to_string(),
            min: 1,
            max: MAX_BULK_SELL_LINES,
        });
    }

    Ok(())
}

/// Validates the list of sell-history ids a new debit will cover.
///
/// ## Rules
/// - Between 1 and MAX_DEBIT_ITEMS ids
/// - Each id is a UUID
/// - No id appears twice
pub fn validate_debit_history_ids(ids: &[String]) -> ValidationResult<()> {
    if ids.is_empty() || ids.len() > MAX_DEBIT_ITEMS {
        return Err(ValidationError::BadLength {
            field: "sellHistoryIds".to_string(),
            min: 1,
            max: MAX_DEBIT_ITEMS,
        });
    }

    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        validate_uuid("sellHistoryIds", id)?;
        if !seen.insert(id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "sellHistoryIds".to_string(),
                value: id.clone(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Date Validators
// =============================================================================

/// Validates an inclusive date range where either end may be open.
pub fn validate_date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> ValidationResult<()> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ValidationError::InvalidFormat {
                field: "from".to_string(),
                reason: format!("{} is after {}", from, to),
            });
        }
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use stockbook_core::validation::validate_uuid;
///
/// assert!(validate_uuid("productId", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("productId", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ID_A: &str = "550e8400-e29b-41d4-a716-446655440000";
    const ID_B: &str = "6ba7b810-9dad-11d1-80b4-00c04fd430c8";

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("name", " Soap ", 200).unwrap(), "Soap");
        assert!(validate_name("name", "", 200).is_err());
        assert!(validate_name("name", &"A".repeat(300), 200).is_err());
    }

    #[test]
    fn test_validate_optional_text() {
        assert_eq!(validate_optional_text("note", None, 10).unwrap(), None);
        assert_eq!(validate_optional_text("note", Some("  "), 10).unwrap(), None);
        assert_eq!(
            validate_optional_text("note", Some(" ok "), 10).unwrap(),
            Some("ok".to_string())
        );
        assert!(validate_optional_text("note", Some(&"x".repeat(11)), 10).is_err());
    }

    #[test]
    fn test_validate_sell_amount() {
        assert!(validate_sell_amount(1).is_ok());
        assert!(validate_sell_amount(MAX_SELL_AMOUNT).is_ok());

        assert!(validate_sell_amount(0).is_err());
        assert!(validate_sell_amount(-1).is_err());
        assert!(validate_sell_amount(MAX_SELL_AMOUNT + 1).is_err());
    }

    #[test]
    fn test_validate_prices() {
        assert!(validate_sold_price_cents(1).is_ok());
        assert!(validate_sold_price_cents(0).is_err());
        assert!(validate_price_cents("initialPrice", 0).is_ok());
        assert!(validate_price_cents("initialPrice", -1).is_err());
        assert!(validate_stock_quantity(0).is_ok());
        assert!(validate_stock_quantity(-5).is_err());
    }

    #[test]
    fn test_validate_limit() {
        assert_eq!(validate_limit(None).unwrap(), DEFAULT_LIST_LIMIT);
        assert_eq!(validate_limit(Some(MAX_LIST_LIMIT)).unwrap(), MAX_LIST_LIMIT);
        assert!(validate_limit(Some(MAX_LIST_LIMIT + 1)).is_err());
        assert!(validate_limit(Some(-3)).is_err());
    }

    #[test]
    fn test_validate_bulk_lines() {
        assert!(validate_bulk_lines(1).is_ok());
        assert!(validate_bulk_lines(MAX_BULK_SELL_LINES).is_ok());
        assert!(validate_bulk_lines(0).is_err());
        assert!(validate_bulk_lines(MAX_BULK_SELL_LINES + 1).is_err());
    }

    #[test]
    fn test_validate_debit_history_ids() {
        assert!(validate_debit_history_ids(&[ID_A.to_string(), ID_B.to_string()]).is_ok());
        assert!(validate_debit_history_ids(&[]).is_err());
        assert!(validate_debit_history_ids(&["nope".to_string()]).is_err());

        let err = validate_debit_history_ids(&[ID_A.to_string(), ID_A.to_string()]).unwrap_err();
        assert!(matches!(err, ValidationError::Duplicate { .. }));
    }

    #[test]
    fn test_validate_date_range() {
        let d1 = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        assert!(validate_date_range(Some(d1), Some(d2)).is_ok());
        assert!(validate_date_range(Some(d1), Some(d1)).is_ok());
        assert!(validate_date_range(None, Some(d1)).is_ok());
        assert!(validate_date_range(Some(d2), Some(d1)).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", ID_A).is_ok());
        assert!(validate_uuid("id", "").is_err());
        assert!(validate_uuid("id", "123").is_err());
    }
}
