//! # Report Repository
//!
//! Aggregates sell history, expenses and open debits into a
//! [`SummaryReport`]. The arithmetic lives in
//! [`SummaryReport::compute`]; this module only gathers the sums.
//!
//! Sales are bounded by `created_at` (whole UTC days), expenses by
//! `spent_on`. Outstanding debits ignore the range.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::{day_end, day_start};
use stockbook_core::ledger::{ReportInputs, SummaryReport};
use stockbook_core::validation::validate_date_range;
use stockbook_core::Money;

/// Repository for report queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Builds the summary for an inclusive, optionally open date range.
    pub async fn summary(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> DbResult<SummaryReport> {
        validate_date_range(from, to)?;
        debug!(?from, ?to, "Building summary report");

        let starts_at = from.map(day_start);
        let ends_before = to.and_then(day_end);

        // One read transaction so every sum sees the same snapshot.
        let mut tx = self.pool.begin().await?;

        let (product_revenue, product_cost, service_revenue): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN product_id IS NOT NULL THEN total_price_cents END), 0),
                COALESCE(SUM(CASE WHEN product_id IS NOT NULL THEN amount * initial_price_cents END), 0),
                COALESCE(SUM(CASE WHEN service_id IS NOT NULL THEN total_price_cents END), 0)
            FROM sell_history
            WHERE (?1 IS NULL OR created_at >= ?1)
              AND (?2 IS NULL OR created_at < ?2)
            "#,
        )
        .bind(starts_at)
        .bind(ends_before)
        .fetch_one(&mut *tx)
        .await?;

        let daily_expenses: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0) FROM daily_expenses
            WHERE (?1 IS NULL OR spent_on >= ?1)
              AND (?2 IS NULL OR spent_on <= ?2)
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&mut *tx)
        .await?;

        let supply_expenses: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0) FROM supply_expenses
            WHERE (?1 IS NULL OR spent_on >= ?1)
              AND (?2 IS NULL OR spent_on <= ?2)
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&mut *tx)
        .await?;

        let outstanding_debits: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_amount_cents - paid_amount_cents), 0)
            FROM debits
            WHERE status != 'PAID'
            "#,
        )
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SummaryReport::compute(&ReportInputs {
            product_revenue: Money::from_cents(product_revenue),
            product_cost: Money::from_cents(product_cost),
            service_revenue: Money::from_cents(service_revenue),
            daily_expenses: Money::from_cents(daily_expenses),
            supply_expenses: Money::from_cents(supply_expenses),
            outstanding_debits: Money::from_cents(outstanding_debits),
        }))
    }
}
