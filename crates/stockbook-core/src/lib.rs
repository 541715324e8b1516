//! # stockbook-core: Pure Business Logic for Stockbook
//!
//! This crate holds the domain model of the shop ledger and every rule that
//! can be decided without touching the store.
//!
//! ```text
//!   web UI ──JSON──► apps/api ──► stockbook-db ──► SQLite
//!                                     │
//!                                     └─ calls ─► stockbook-core
//!                                                 types, money, ledger,
//!                                                 validation, error
//! ```
//!
//! Nothing here performs I/O. The database crate loads rows, hands them to
//! the functions in [`ledger`], and writes back whatever comes out.
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Product, Service, SellHistory, Debit, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`ledger`] - Sell and payment arithmetic, debit status derivation
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use stockbook_core::ledger::{ProductTotals, SaleLine};
//! use stockbook_core::money::Money;
//!
//! let totals = ProductTotals {
//!     quantity: 10,
//!     initial_price: Money::from_cents(500),
//!     total_sold: 0,
//!     revenue: Money::zero(),
//! };
//!
//! let line = SaleLine::new(3, 800).unwrap();
//! let after = totals.sell("p-1", &line).unwrap();
//! assert_eq!(after.quantity, 7);
//! assert_eq!(after.profit().unwrap().cents(), 900);
//! ```

pub mod error;
pub mod ledger;
pub mod money;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

/// Upper bound on lines in one bulk sell, which all share one write lock.
pub const MAX_BULK_SELL_LINES: usize = 100;

/// Maximum quantity accepted for a single sell line.
pub const MAX_SELL_AMOUNT: i64 = 1_000_000;

/// Maximum number of sell-history rows one debit may aggregate.
pub const MAX_DEBIT_ITEMS: usize = 200;
