//! # Repository Module
//!
//! Database repository implementations for Stockbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.ledger().sell_product(&id, 3, 800)                         │
//! │       ▼                                                                 │
//! │  LedgerRepository                                                      │
//! │  ├── claim row (takes the write lock)                                  │
//! │  ├── load row                                                          │
//! │  ├── stockbook_core::ledger arithmetic                                 │
//! │  └── write absolute values, commit                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CategoryRepository`](category::CategoryRepository) - Category CRUD
//! - [`ProductRepository`](product::ProductRepository) - Product CRUD and detail
//! - [`ServiceRepository`](service::ServiceRepository) - Service CRUD and detail
//! - [`SellHistoryRepository`](sell_history::SellHistoryRepository) - History listing and correction
//! - [`DebitRepository`](debit::DebitRepository) - Debit creation and lookup
//! - [`ExpenseRepository`](expense::ExpenseRepository) - Daily and supply expenses
//! - [`LedgerRepository`](ledger::LedgerRepository) - Sell, bulk sell, pay debit
//! - [`ReportRepository`](report::ReportRepository) - Summary report
//!
//! Row-level helpers that take `&mut SqliteConnection` are shared between
//! repositories so one transaction can span several tables.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

pub mod category;
pub mod debit;
pub mod expense;
pub mod ledger;
pub mod product;
pub mod report;
pub mod sell_history;
pub mod service;

/// First instant of a calendar day (UTC).
pub(crate) fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// First instant of the following day, the exclusive end of `day`.
pub(crate) fn day_end(day: NaiveDate) -> Option<DateTime<Utc>> {
    day.succ_opt().map(day_start)
}

/// Generates a new primary key.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use stockbook_core::{Product, Service};

    use super::product::ProductInput;
    use super::service::ServiceInput;
    use crate::{Database, DbConfig};

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub async fn product(db: &Database, name: &str, quantity: i64, cost_cents: i64) -> Product {
        db.products()
            .create(&ProductInput {
                name: name.to_string(),
                category_id: None,
                quantity,
                initial_price_cents: cost_cents,
                selling_price_cents: cost_cents * 2,
            })
            .await
            .unwrap()
    }

    pub async fn service(db: &Database, name: &str, price_cents: i64) -> Service {
        db.services()
            .create(&ServiceInput {
                name: name.to_string(),
                default_price_cents: price_cents,
            })
            .await
            .unwrap()
    }
}
