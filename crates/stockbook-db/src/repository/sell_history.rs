//! # Sell History Repository
//!
//! Listing and correction of recorded sales.
//!
//! ## Correction Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  delete(history_id)                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DELETE ... WHERE id = ? AND NOT EXISTS(debit item) RETURNING *         │
//! │       │  (first statement: takes the write lock)                        │
//! │       ├── no row, id exists    → ReferencedByDebit                      │
//! │       ├── no row, id missing   → SellHistoryNotFound                    │
//! │       ▼                                                                 │
//! │  Product sale: quantity += amount, total_sold −= amount,               │
//! │                revenue −= total, profit recomputed                      │
//! │  Service sale: total_sold −= amount, revenue −= total                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Bulk-sell header shrinks (dropped at zero lines) → COMMIT              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::DbResult;
use crate::repository::product::{claim_product, fetch_product, write_product};
use crate::repository::service::{claim_service, fetch_service, write_service};
use crate::repository::{day_end, day_start};
use stockbook_core::validation::{validate_date_range, validate_limit};
use stockbook_core::{CoreError, SaleSubject, SellHistory, SellTransaction};

/// Optional list filters. All present filters must match.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub product_id: Option<String>,
    pub service_id: Option<String>,
    /// Inclusive first day.
    pub from: Option<NaiveDate>,
    /// Inclusive last day.
    pub to: Option<NaiveDate>,
    /// Defaults to 100, at most 500.
    pub limit: Option<i64>,
}

/// Repository for sell-history database operations.
#[derive(Debug, Clone)]
pub struct SellHistoryRepository {
    pool: SqlitePool,
}

impl SellHistoryRepository {
    /// Creates a new SellHistoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SellHistoryRepository { pool }
    }

    /// Lists sell history, newest first.
    pub async fn list(&self, filter: &HistoryFilter) -> DbResult<Vec<SellHistory>> {
        let limit = validate_limit(filter.limit)?;
        validate_date_range(filter.from, filter.to)?;

        debug!(?filter, "Listing sell history");

        let rows = sqlx::query_as::<_, SellHistory>(
            r#"
            SELECT * FROM sell_history
            WHERE (?1 IS NULL OR product_id = ?1)
              AND (?2 IS NULL OR service_id = ?2)
              AND (?3 IS NULL OR created_at >= ?3)
              AND (?4 IS NULL OR created_at < ?4)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?5
            "#,
        )
        .bind(&filter.product_id)
        .bind(&filter.service_id)
        .bind(filter.from.map(day_start))
        .bind(filter.to.and_then(day_end))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Gets one sell-history row.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<SellHistory>> {
        let mut conn = self.pool.acquire().await?;
        fetch_history(&mut conn, id).await
    }

    /// Gets a bulk-sell header.
    pub async fn get_transaction(&self, id: &str) -> DbResult<Option<SellTransaction>> {
        let header =
            sqlx::query_as::<_, SellTransaction>("SELECT * FROM sell_transactions WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(header)
    }

    /// Deletes a recorded sale and reverses its effect on the running totals.
    ///
    /// Returns the deleted row.
    pub async fn delete(&self, id: &str) -> DbResult<SellHistory> {
        debug!(id = %id, "Deleting sell history");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query_as::<_, SellHistory>(
            r#"
            DELETE FROM sell_history
            WHERE id = ?1
              AND NOT EXISTS (SELECT 1 FROM debit_items WHERE sell_history_id = ?1)
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = deleted else {
            if fetch_history(&mut tx, id).await?.is_some() {
                warn!(id = %id, "Sell history delete refused: row is in a debit");
                return Err(CoreError::ReferencedByDebit {
                    entity: "Sell history".to_string(),
                    id: id.to_string(),
                }
                .into());
            }
            return Err(CoreError::SellHistoryNotFound(id.to_string()).into());
        };

        match row.subject() {
            Some(SaleSubject::Product(product_id)) => {
                claim_product(&mut tx, &product_id, now).await?;
                if let Some(mut product) = fetch_product(&mut tx, &product_id).await? {
                    let totals = product.totals().unsell(row.amount, row.total_price())?;
                    product.apply_totals(&totals)?;
                    product.updated_at = now;
                    write_product(&mut tx, &product).await?;
                }
            }
            Some(SaleSubject::Service(service_id)) => {
                claim_service(&mut tx, &service_id, now).await?;
                if let Some(mut service) = fetch_service(&mut tx, &service_id).await? {
                    let totals = service.totals().unsell(row.amount, row.total_price())?;
                    service.apply_totals(&totals);
                    service.updated_at = now;
                    write_service(&mut tx, &service).await?;
                }
            }
            None => {
                warn!(id = %id, "Deleted sell history had no single subject");
            }
        }

        if let Some(transaction_id) = &row.transaction_id {
            sqlx::query(
                r#"
                UPDATE sell_transactions
                SET total_price_cents = total_price_cents - ?2,
                    item_count = item_count - 1
                WHERE id = ?1
                "#,
            )
            .bind(transaction_id)
            .bind(row.total_price_cents)
            .execute(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM sell_transactions WHERE id = ?1 AND item_count <= 0")
                .bind(transaction_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(id = %id, amount = row.amount, "Sell history deleted");
        Ok(row)
    }
}

// =============================================================================
// Row Helpers
// =============================================================================

/// Loads one history row on an existing connection.
pub(crate) async fn fetch_history(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<SellHistory>> {
    let row = sqlx::query_as::<_, SellHistory>("SELECT * FROM sell_history WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row)
}

/// All history of one product or service, newest first.
pub(crate) async fn history_for(
    conn: &mut SqliteConnection,
    subject: &SaleSubject,
) -> DbResult<Vec<SellHistory>> {
    let (sql, id) = match subject {
        SaleSubject::Product(id) => (
            "SELECT * FROM sell_history WHERE product_id = ?1 ORDER BY created_at DESC, rowid DESC",
            id,
        ),
        SaleSubject::Service(id) => (
            "SELECT * FROM sell_history WHERE service_id = ?1 ORDER BY created_at DESC, rowid DESC",
            id,
        ),
    };

    let rows = sqlx::query_as::<_, SellHistory>(sql)
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows)
}

/// Appends one history row.
pub(crate) async fn insert_history(conn: &mut SqliteConnection, row: &SellHistory) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sell_history (
            id, product_id, service_id, transaction_id,
            amount, sold_price_cents, total_price_cents, initial_price_cents,
            created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&row.id)
    .bind(&row.product_id)
    .bind(&row.service_id)
    .bind(&row.transaction_id)
    .bind(row.amount)
    .bind(row.sold_price_cents)
    .bind(row.total_price_cents)
    .bind(row.initial_price_cents)
    .bind(row.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::debit::NewDebit;
    use crate::repository::fixtures;
    use crate::repository::ledger::BulkSellLine;
    use crate::repository::product::ProductInput;

    #[tokio::test]
    async fn test_list_filters_by_subject_and_limit() {
        let db = fixtures::db().await;
        let rice = fixtures::product(&db, "Rice", 100, 5).await;
        let repair = fixtures::service(&db, "Repair", 1500).await;

        for _ in 0..3 {
            db.ledger().sell_product(&rice.id, 1, 8).await.unwrap();
        }
        db.ledger().sell_service(&repair.id, 1, 1500).await.unwrap();

        let all = db.sell_history().list(&HistoryFilter::default()).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].service_id.as_deref(), Some(repair.id.as_str()));

        let products_only = db
            .sell_history()
            .list(&HistoryFilter {
                product_id: Some(rice.id.clone()),
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(products_only.len(), 2);
        assert!(products_only.iter().all(|h| h.initial_price_cents == Some(5)));

        let err = db
            .sell_history()
            .list(&HistoryFilter {
                limit: Some(0),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_by_date_range() {
        let db = fixtures::db().await;
        let rice = fixtures::product(&db, "Rice", 10, 5).await;
        db.ledger().sell_product(&rice.id, 1, 8).await.unwrap();

        let today = Utc::now().date_naive();
        let yesterday = today.pred_opt().unwrap();

        let hits = db
            .sell_history()
            .list(&HistoryFilter {
                from: Some(today),
                to: Some(today),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let misses = db
            .sell_history()
            .list(&HistoryFilter {
                to: Some(yesterday),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn test_delete_restores_product_totals() {
        let db = fixtures::db().await;
        let rice = fixtures::product(&db, "Rice", 10, 5).await;
        db.ledger().sell_product(&rice.id, 2, 9).await.unwrap();
        let detail = db.ledger().sell_product(&rice.id, 3, 8).await.unwrap();

        let deleted = db.sell_history().delete(&detail.history[0].id).await.unwrap();
        assert_eq!(deleted.amount, 3);

        let product = db.products().get_by_id(&rice.id).await.unwrap().unwrap();
        assert_eq!(product.quantity, 8);
        assert_eq!(product.total_sold, 2);
        assert_eq!(product.revenue_cents, 18);
        assert_eq!(product.profit_cents, 18 - 10);

        let err = db.sell_history().delete(&deleted.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Rejected(CoreError::SellHistoryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_restores_service_totals() {
        let db = fixtures::db().await;
        let repair = fixtures::service(&db, "Repair", 1500).await;
        let detail = db.ledger().sell_service(&repair.id, 2, 1500).await.unwrap();

        db.sell_history().delete(&detail.history[0].id).await.unwrap();

        let service = db.services().get_by_id(&repair.id).await.unwrap().unwrap();
        assert_eq!(service.total_sold, 0);
        assert_eq!(service.revenue_cents, 0);
    }

    #[tokio::test]
    async fn test_delete_refused_while_in_debit() {
        let db = fixtures::db().await;
        let rice = fixtures::product(&db, "Rice", 10, 5).await;
        let detail = db.ledger().sell_product(&rice.id, 1, 8).await.unwrap();
        let history_id = detail.history[0].id.clone();

        db.debits()
            .create(&NewDebit {
                customer_name: "Sara".to_string(),
                customer_phone: None,
                note: None,
                sell_history_ids: vec![history_id.clone()],
            })
            .await
            .unwrap();

        let err = db.sell_history().delete(&history_id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Rejected(CoreError::ReferencedByDebit { .. })
        ));

        let product = db.products().get_by_id(&rice.id).await.unwrap().unwrap();
        assert_eq!(product.quantity, 9);
        assert!(db.sell_history().get_by_id(&history_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_refused_when_stock_would_overflow() {
        let db = fixtures::db().await;
        let rice = fixtures::product(&db, "Rice", 10, 5).await;
        let detail = db.ledger().sell_product(&rice.id, 1, 8).await.unwrap();
        let history_id = detail.history[0].id.clone();

        db.products()
            .update(
                &rice.id,
                &ProductInput {
                    name: "Rice".to_string(),
                    category_id: None,
                    quantity: i64::MAX,
                    initial_price_cents: 5,
                    selling_price_cents: 10,
                },
            )
            .await
            .unwrap();

        let err = db.sell_history().delete(&history_id).await.unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::Overflow(_))));

        let product = db.products().get_by_id(&rice.id).await.unwrap().unwrap();
        assert_eq!(product.quantity, i64::MAX);
        assert_eq!(product.total_sold, 1);
        assert_eq!(product.revenue_cents, 8);
        assert!(db.sell_history().get_by_id(&history_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_shrinks_bulk_header() {
        let db = fixtures::db().await;
        let rice = fixtures::product(&db, "Rice", 10, 5).await;
        let oil = fixtures::product(&db, "Oil", 10, 50).await;

        let outcome = db
            .ledger()
            .bulk_sell(&[
                BulkSellLine::new(&rice.id, 2, 10),
                BulkSellLine::new(&oil.id, 1, 80),
            ])
            .await
            .unwrap();
        assert_eq!(outcome.transaction.item_count, 2);

        db.sell_history().delete(&outcome.history[0].id).await.unwrap();
        let header = db
            .sell_history()
            .get_transaction(&outcome.transaction.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(header.item_count, 1);
        assert_eq!(header.total_price_cents, 80);

        db.sell_history().delete(&outcome.history[1].id).await.unwrap();
        assert!(db
            .sell_history()
            .get_transaction(&outcome.transaction.id)
            .await
            .unwrap()
            .is_none());
    }
}
