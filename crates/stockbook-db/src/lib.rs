//! # stockbook-db: Database Layer for Stockbook
//!
//! SQLite persistence for the shop ledger: catalog, sell history, debits
//! and expenses. Every multi-row mutation runs in one sqlx transaction
//! and applies the pure arithmetic from `stockbook-core`.
//!
//! ```text
//!   handler ──► db.ledger().sell_product(id, 3, 800)
//!                 │  BEGIN
//!                 │  UPDATE products SET updated_at = ? WHERE id = ?   (claim)
//!                 │  SELECT * FROM products WHERE id = ?
//!                 │  ProductTotals::sell(...)                          (core)
//!                 │  UPDATE products SET quantity = ?, revenue_cents = ? ...
//!                 │  INSERT INTO sell_history ...
//!                 └  COMMIT
//! ```
//!
//! ## Modules
//!
//! - [`pool`] - [`Database`] handle and [`DbConfig`]
//! - [`migrations`] - Schema embedded from `migrations/sqlite`
//! - [`error`] - [`DbError`] and the `sqlx::Error` classification
//! - [`repository`] - One repository per table, plus the ledger writes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockbook_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("stockbook.db")).await?;
//!
//! let detail = db.ledger().sell_product(&product_id, 3, 800).await?;
//! println!("{} left", detail.product.quantity);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::category::CategoryRepository;
pub use repository::debit::{DebitRepository, NewDebit};
pub use repository::expense::{ExpenseRepository, NewDailyExpense, NewSupplyExpense};
pub use repository::ledger::{BulkSellLine, LedgerRepository};
pub use repository::product::{ProductFilter, ProductInput, ProductRepository};
pub use repository::report::ReportRepository;
pub use repository::sell_history::{HistoryFilter, SellHistoryRepository};
pub use repository::service::{ServiceInput, ServiceRepository};
