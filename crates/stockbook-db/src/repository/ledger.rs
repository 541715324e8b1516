//! # Ledger Repository
//!
//! The atomic units of work: sell a product, sell a service, bulk sell,
//! pay a debit.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  claim: UPDATE <row> SET updated_at = now WHERE id = ?                  │
//! │    │   0 rows → NotFound (rollback)                                     │
//! │    │   later writers now wait on the lock (busy_timeout)                │
//! │    ▼                                                                    │
//! │  load row → stockbook_core::ledger → new absolute values                │
//! │    │   InsufficientStock / ExceedsTotal → rollback                      │
//! │    ▼                                                                    │
//! │  write row, append history (or debit state)                             │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `sqlx::Transaction` rolls back when dropped, so every early `?` return
//! leaves the store untouched.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::debit::{claim_debit, fetch_debit, load_debit_detail, write_debit_balance};
use crate::repository::new_id;
use crate::repository::product::{claim_product, fetch_product, load_product_detail, write_product};
use crate::repository::sell_history::insert_history;
use crate::repository::service::{claim_service, fetch_service, load_service_detail, write_service};
use stockbook_core::ledger::SaleLine;
use stockbook_core::validation::{validate_bulk_lines, validate_payment_amount, validate_uuid};
use stockbook_core::{
    BulkSellOutcome, CoreError, DebitDetail, Money, ProductDetail, SellHistory, SellTransaction,
    ServiceDetail,
};

/// One line of a bulk sell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkSellLine {
    pub product_id: String,
    pub amount: i64,
    pub sold_price_cents: i64,
}

impl BulkSellLine {
    pub fn new(product_id: &str, amount: i64, sold_price_cents: i64) -> Self {
        BulkSellLine {
            product_id: product_id.to_string(),
            amount,
            sold_price_cents,
        }
    }
}

/// Repository for the sell and payment transactions.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Sells `amount` units of a product at `sold_price_cents` each.
    ///
    /// ## Errors
    /// - `Validation` for a malformed id or a non-positive amount or price
    ///   (no store access)
    /// - `ProductNotFound`
    /// - `InsufficientStock` when `amount > quantity`; nothing is written
    pub async fn sell_product(
        &self,
        product_id: &str,
        amount: i64,
        sold_price_cents: i64,
    ) -> DbResult<ProductDetail> {
        validate_uuid("productId", product_id)?;
        let line = SaleLine::new(amount, sold_price_cents)?;
        let now = Utc::now();

        debug!(product_id = %product_id, amount, sold_price_cents, "Selling product");

        let mut tx = self.pool.begin().await?;
        claim_product(&mut tx, product_id, now).await?;

        let mut product = fetch_product(&mut tx, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        let totals = product
            .totals()
            .sell(product_id, &line)
            .inspect_err(|err| warn!(product_id = %product_id, %err, "Product sell rejected"))?;

        let history = SellHistory::for_product(
            new_id(),
            &product,
            line.amount,
            line.sold_price,
            line.total()?,
            None,
            now,
        );

        product.apply_totals(&totals)?;
        product.updated_at = now;
        write_product(&mut tx, &product).await?;
        insert_history(&mut tx, &history).await?;

        let detail = load_product_detail(&mut tx, product_id).await?;
        tx.commit().await?;

        info!(
            product_id = %product_id,
            amount,
            quantity = detail.product.quantity,
            profit_cents = detail.product.profit_cents,
            "Product sold"
        );
        Ok(detail)
    }

    /// Sells `amount` units of a service at `sold_price_cents` each.
    ///
    /// No stock check, no cost snapshot.
    pub async fn sell_service(
        &self,
        service_id: &str,
        amount: i64,
        sold_price_cents: i64,
    ) -> DbResult<ServiceDetail> {
        validate_uuid("serviceId", service_id)?;
        let line = SaleLine::new(amount, sold_price_cents)?;
        let now = Utc::now();

        debug!(service_id = %service_id, amount, sold_price_cents, "Selling service");

        let mut tx = self.pool.begin().await?;
        claim_service(&mut tx, service_id, now).await?;

        let mut service = fetch_service(&mut tx, service_id)
            .await?
            .ok_or_else(|| CoreError::ServiceNotFound(service_id.to_string()))?;

        let totals = service.totals().sell(&line)?;
        let history =
            SellHistory::for_service(new_id(), &service, line.amount, line.sold_price, line.total()?, now);

        service.apply_totals(&totals);
        service.updated_at = now;
        write_service(&mut tx, &service).await?;
        insert_history(&mut tx, &history).await?;

        let detail = load_service_detail(&mut tx, service_id).await?;
        tx.commit().await?;

        info!(
            service_id = %service_id,
            amount,
            revenue_cents = detail.service.revenue_cents,
            "Service sold"
        );
        Ok(detail)
    }

    /// Sells several products in one transaction.
    ///
    /// Every line is validated before the store is touched. Lines apply in
    /// order, so a product listed twice is checked against its running
    /// stock. The first failing line rolls back the whole batch, header
    /// included.
    pub async fn bulk_sell(&self, lines: &[BulkSellLine]) -> DbResult<BulkSellOutcome> {
        validate_bulk_lines(lines.len())?;
        let mut validated = Vec::with_capacity(lines.len());
        for line in lines {
            validate_uuid("productId", &line.product_id)?;
            validated.push((
                line.product_id.as_str(),
                SaleLine::new(line.amount, line.sold_price_cents)?,
            ));
        }

        let now = Utc::now();
        let transaction_id = new_id();

        debug!(transaction_id = %transaction_id, lines = lines.len(), "Bulk selling");

        let mut tx = self.pool.begin().await?;

        // The header insert is the first write and takes the lock.
        sqlx::query(
            "INSERT INTO sell_transactions (id, total_price_cents, item_count, created_at) VALUES (?1, 0, 0, ?2)",
        )
        .bind(&transaction_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let mut total = Money::zero();
        let mut history = Vec::with_capacity(validated.len());
        let mut product_order: Vec<&str> = Vec::new();

        for (index, (product_id, line)) in validated.iter().enumerate() {
            claim_product(&mut tx, product_id, now).await?;
            let mut product = fetch_product(&mut tx, product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

            let totals = product.totals().sell(product_id, line).inspect_err(|err| {
                warn!(transaction_id = %transaction_id, line = index, %err, "Bulk sell rejected")
            })?;
            let line_total = line.total()?;

            let row = SellHistory::for_product(
                new_id(),
                &product,
                line.amount,
                line.sold_price,
                line_total,
                Some(transaction_id.clone()),
                now,
            );

            product.apply_totals(&totals)?;
            product.updated_at = now;
            write_product(&mut tx, &product).await?;
            insert_history(&mut tx, &row).await?;

            total = total
                .checked_add(line_total)
                .ok_or_else(|| CoreError::Overflow("transaction total".to_string()))?;
            history.push(row);
            if !product_order.contains(product_id) {
                product_order.push(*product_id);
            }
        }

        let transaction = SellTransaction {
            id: transaction_id.clone(),
            total_price_cents: total.cents(),
            item_count: history.len() as i64,
            created_at: now,
        };

        sqlx::query(
            "UPDATE sell_transactions SET total_price_cents = ?2, item_count = ?3 WHERE id = ?1",
        )
        .bind(&transaction.id)
        .bind(transaction.total_price_cents)
        .bind(transaction.item_count)
        .execute(&mut *tx)
        .await?;

        let mut products = Vec::with_capacity(product_order.len());
        for product_id in product_order {
            let product = fetch_product(&mut tx, product_id)
                .await?
                .ok_or_else(|| DbError::not_found("Product", product_id))?;
            products.push(product);
        }

        tx.commit().await?;

        info!(
            transaction_id = %transaction.id,
            items = transaction.item_count,
            total_cents = transaction.total_price_cents,
            "Bulk sell committed"
        );

        Ok(BulkSellOutcome {
            transaction,
            products,
            history,
        })
    }

    /// Records one payment against a debit.
    ///
    /// ## Errors
    /// - `Validation` for a non-positive amount (no store access)
    /// - `DebitNotFound`
    /// - `ExceedsTotal` when `paid + amount > total`, carrying the remaining
    ///   balance; nothing is written
    pub async fn pay_debit(&self, debit_id: &str, amount_cents: i64) -> DbResult<DebitDetail> {
        validate_payment_amount(amount_cents)?;
        let now = Utc::now();

        debug!(debit_id = %debit_id, amount_cents, "Paying debit");

        let mut tx = self.pool.begin().await?;
        claim_debit(&mut tx, debit_id, now).await?;

        let mut debit = fetch_debit(&mut tx, debit_id)
            .await?
            .ok_or_else(|| CoreError::DebitNotFound(debit_id.to_string()))?;

        let balance = debit
            .balance()
            .apply_payment(debit_id, amount_cents, now)
            .inspect_err(|err| warn!(debit_id = %debit_id, %err, "Debit payment rejected"))?;

        debit.apply_balance(&balance);
        debit.updated_at = now;
        write_debit_balance(&mut tx, &debit).await?;

        let detail = load_debit_detail(&mut tx, debit_id).await?;
        tx.commit().await?;

        info!(
            debit_id = %debit_id,
            paid_cents = detail.debit.paid_amount_cents,
            status = %detail.debit.status,
            "Debit payment recorded"
        );
        Ok(detail)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::debit::NewDebit;
    use crate::repository::fixtures;
    use crate::Database;
    use stockbook_core::DebitStatus;

    async fn history_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM sell_history")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    async fn header_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM sell_transactions")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_sell_product_then_insufficient_stock() {
        let db = fixtures::db().await;
        let product = fixtures::product(&db, "Rice", 10, 5).await;

        let detail = db.ledger().sell_product(&product.id, 3, 8).await.unwrap();
        assert_eq!(detail.product.quantity, 7);
        assert_eq!(detail.product.revenue_cents, 24);
        assert_eq!(detail.product.total_sold, 3);
        assert_eq!(detail.product.profit_cents, 9);
        assert_eq!(detail.history.len(), 1);
        assert_eq!(detail.history[0].total_price_cents, 24);
        assert_eq!(detail.history[0].initial_price_cents, Some(5));

        let err = db.ledger().sell_product(&product.id, 8, 8).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Rejected(CoreError::InsufficientStock {
                available: 7,
                requested: 8,
                ..
            })
        ));

        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.quantity, 7);
        assert_eq!(after.revenue_cents, 24);
        assert_eq!(after.total_sold, 3);
        assert_eq!(history_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_sell_product_rejects_bad_input() {
        let db = fixtures::db().await;
        let product = fixtures::product(&db, "Rice", 10, 5).await;

        for (amount, price) in [(0, 8), (-1, 8), (1, 0)] {
            let err = db
                .ledger()
                .sell_product(&product.id, amount, price)
                .await
                .unwrap_err();
            assert!(matches!(err, DbError::Rejected(CoreError::Validation(_))));
        }

        let err = db.ledger().sell_product(&new_id(), 1, 8).await.unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::ProductNotFound(_))));

        let err = db.ledger().sell_product("missing", 1, 8).await.unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::Validation(_))));
        assert_eq!(history_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_sell_product_rejects_profit_overflow() {
        let db = fixtures::db().await;
        let product = fixtures::product(&db, "Gold", 10, i64::MAX / 2).await;

        let err = db.ledger().sell_product(&product.id, 3, 1).await.unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::Overflow(_))));

        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 10);
        assert_eq!(stored.total_sold, 0);
        assert_eq!(stored.profit_cents, 0);
        assert_eq!(history_count(&db).await, 0);

        let detail = db.ledger().sell_product(&product.id, 2, 1).await.unwrap();
        assert_eq!(detail.product.profit_cents, 2 - (i64::MAX / 2) * 2);
    }

    #[tokio::test]
    async fn test_sell_product_at_discount() {
        let db = fixtures::db().await;
        let product = fixtures::product(&db, "Rice", 10, 5).await;

        let detail = db.ledger().sell_product(&product.id, 2, 4).await.unwrap();
        assert_eq!(detail.product.profit_cents, 8 - 10);
    }

    #[tokio::test]
    async fn test_sell_service() {
        let db = fixtures::db().await;
        let service = fixtures::service(&db, "Repair", 1500).await;

        let detail = db.ledger().sell_service(&service.id, 2, 1200).await.unwrap();
        assert_eq!(detail.service.total_sold, 2);
        assert_eq!(detail.service.revenue_cents, 2400);
        assert_eq!(detail.history[0].initial_price_cents, None);
        assert_eq!(detail.history[0].product_id, None);

        let err = db.ledger().sell_service(&new_id(), 1, 100).await.unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::ServiceNotFound(_))));

        let err = db.ledger().sell_service("missing", 1, 100).await.unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_bulk_sell_commits_all_lines() {
        let db = fixtures::db().await;
        let rice = fixtures::product(&db, "Rice", 10, 5).await;
        let oil = fixtures::product(&db, "Oil", 4, 50).await;

        let outcome = db
            .ledger()
            .bulk_sell(&[
                BulkSellLine::new(&rice.id, 2, 8),
                BulkSellLine::new(&oil.id, 1, 70),
                BulkSellLine::new(&rice.id, 3, 7),
            ])
            .await
            .unwrap();

        assert_eq!(outcome.transaction.item_count, 3);
        assert_eq!(outcome.transaction.total_price_cents, 16 + 70 + 21);
        assert_eq!(outcome.products.len(), 2);
        assert_eq!(outcome.products[0].id, rice.id);
        assert_eq!(outcome.products[0].quantity, 5);
        assert_eq!(outcome.products[0].revenue_cents, 37);
        assert_eq!(outcome.products[1].quantity, 3);
        assert!(outcome
            .history
            .iter()
            .all(|h| h.transaction_id.as_deref() == Some(outcome.transaction.id.as_str())));

        let header = db
            .sell_history()
            .get_transaction(&outcome.transaction.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(header, outcome.transaction);
    }

    #[tokio::test]
    async fn test_bulk_sell_rolls_back_on_failing_line() {
        let db = fixtures::db().await;
        let a = fixtures::product(&db, "A", 10, 5).await;
        let b = fixtures::product(&db, "B", 10, 5).await;
        let c = fixtures::product(&db, "C", 1, 5).await;
        let d = fixtures::product(&db, "D", 10, 5).await;

        let err = db
            .ledger()
            .bulk_sell(&[
                BulkSellLine::new(&a.id, 1, 8),
                BulkSellLine::new(&b.id, 1, 8),
                BulkSellLine::new(&c.id, 2, 8),
                BulkSellLine::new(&d.id, 1, 8),
            ])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Rejected(CoreError::InsufficientStock { .. })
        ));

        for p in [&a, &b, &c, &d] {
            let stored = db.products().get_by_id(&p.id).await.unwrap().unwrap();
            assert_eq!(stored.quantity, p.quantity);
            assert_eq!(stored.total_sold, 0);
        }
        assert_eq!(history_count(&db).await, 0);
        assert_eq!(header_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_bulk_sell_repeated_product_uses_running_stock() {
        let db = fixtures::db().await;
        let rice = fixtures::product(&db, "Rice", 5, 5).await;

        let err = db
            .ledger()
            .bulk_sell(&[
                BulkSellLine::new(&rice.id, 3, 8),
                BulkSellLine::new(&rice.id, 3, 8),
            ])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Rejected(CoreError::InsufficientStock {
                available: 2,
                requested: 3,
                ..
            })
        ));

        let stored = db.products().get_by_id(&rice.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 5);
    }

    #[tokio::test]
    async fn test_bulk_sell_validates_before_store_access() {
        let db = fixtures::db().await;
        let rice = fixtures::product(&db, "Rice", 5, 5).await;

        let err = db.ledger().bulk_sell(&[]).await.unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::Validation(_))));

        let err = db
            .ledger()
            .bulk_sell(&[
                BulkSellLine::new(&rice.id, 1, 8),
                BulkSellLine::new(&rice.id, 0, 8),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::Validation(_))));
        assert_eq!(header_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_pay_debit_sequence() {
        let db = fixtures::db().await;
        let rice = fixtures::product(&db, "Rice", 10, 5).await;
        let sale = db.ledger().sell_product(&rice.id, 1, 100).await.unwrap();

        let debit = db
            .debits()
            .create(&NewDebit {
                customer_name: "Omar".to_string(),
                customer_phone: Some("0700".to_string()),
                note: None,
                sell_history_ids: vec![sale.history[0].id.clone()],
            })
            .await
            .unwrap();
        let id = debit.debit.id.clone();
        assert_eq!(debit.debit.total_amount_cents, 100);
        assert_eq!(debit.debit.status, DebitStatus::Pending);

        let detail = db.ledger().pay_debit(&id, 40).await.unwrap();
        assert_eq!(detail.debit.paid_amount_cents, 40);
        assert_eq!(detail.debit.status, DebitStatus::Partial);
        assert!(detail.debit.paid_at.is_none());

        let detail = db.ledger().pay_debit(&id, 60).await.unwrap();
        assert_eq!(detail.debit.paid_amount_cents, 100);
        assert_eq!(detail.debit.status, DebitStatus::Paid);
        let paid_at = detail.debit.paid_at.expect("paid_at set on settle");
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].product_name.as_deref(), Some("Rice"));

        let err = db.ledger().pay_debit(&id, 1).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Rejected(CoreError::ExceedsTotal {
                remaining_cents: 0,
                ..
            })
        ));

        let stored = db.debits().get_detail(&id).await.unwrap();
        assert_eq!(stored.debit.paid_amount_cents, 100);
        assert_eq!(stored.debit.paid_at, Some(paid_at));
    }

    #[tokio::test]
    async fn test_pay_debit_errors() {
        let db = fixtures::db().await;

        let err = db.ledger().pay_debit("missing", 10).await.unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::DebitNotFound(_))));

        let err = db.ledger().pay_debit("missing", 0).await.unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_concurrent_sells_do_not_lose_updates() {
        let dir = std::env::temp_dir().join(format!("stockbook-ledger-{}", new_id()));
        std::fs::create_dir_all(&dir).unwrap();
        let db = Database::new(crate::DbConfig::new(dir.join("test.db")).max_connections(4))
            .await
            .unwrap();
        let product = fixtures::product(&db, "Rice", 40, 5).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = db.clone();
            let id = product.id.clone();
            handles.push(tokio::spawn(async move {
                let mut sold = 0;
                for _ in 0..5 {
                    if db.ledger().sell_product(&id, 1, 8).await.is_ok() {
                        sold += 1;
                    }
                }
                sold
            }));
        }

        let mut sold = 0;
        for handle in handles {
            sold += handle.await.unwrap();
        }

        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 40 - sold);
        assert_eq!(stored.total_sold, sold);
        assert_eq!(stored.revenue_cents, sold * 8);
        assert_eq!(history_count(&db).await, sold);

        db.close().await;
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_concurrent_payments_do_not_lose_updates() {
        let dir = std::env::temp_dir().join(format!("stockbook-ledger-{}", new_id()));
        std::fs::create_dir_all(&dir).unwrap();
        let db = Database::new(crate::DbConfig::new(dir.join("test.db")).max_connections(4))
            .await
            .unwrap();
        let rice = fixtures::product(&db, "Rice", 10, 2).await;
        let sale = db.ledger().sell_product(&rice.id, 1, 5).await.unwrap();
        let debit = db
            .debits()
            .create(&NewDebit {
                customer_name: "Omar".to_string(),
                customer_phone: None,
                note: None,
                sell_history_ids: vec![sale.history[0].id.clone()],
            })
            .await
            .unwrap();
        let id = debit.debit.id.clone();
        assert_eq!(debit.debit.total_amount_cents, 5);

        let mut handles = Vec::new();
        for _ in 0..10 {
            let db = db.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                db.ledger().pay_debit(&id, 1).await.ok()
            }));
        }

        let mut paid = Vec::new();
        for handle in handles {
            if let Some(detail) = handle.await.unwrap() {
                paid.push(detail);
            }
        }
        let successes = paid.len() as i64;

        let stored = db.debits().get_detail(&id).await.unwrap();
        assert_eq!(stored.debit.paid_amount_cents, successes);
        assert!(stored.debit.paid_amount_cents <= stored.debit.total_amount_cents);

        let settled: Vec<_> = paid
            .iter()
            .filter(|d| d.debit.status == DebitStatus::Paid)
            .collect();
        if successes == 5 {
            assert_eq!(settled.len(), 1);
            assert_eq!(stored.debit.status, DebitStatus::Paid);
            assert!(stored.debit.paid_at.is_some());
            assert_eq!(stored.debit.paid_at, settled[0].debit.paid_at);
        } else {
            assert!(settled.is_empty());
            assert_eq!(stored.debit.paid_at, None);
        }

        db.close().await;
        let _ = std::fs::remove_dir_all(&dir);
    }
}
