//! # Debit Repository
//!
//! Creation and lookup of customer debits. Payments go through
//! [`LedgerRepository::pay_debit`](super::ledger::LedgerRepository::pay_debit).
//!
//! ## Debit Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. SELL on credit                                                      │
//! │     └── sell_product() / sell_service() → SellHistory rows             │
//! │                                                                         │
//! │  2. CREATE DEBIT                                                        │
//! │     └── create(customer, [history ids]) → Debit { PENDING }            │
//! │         total = Σ history.total_price, fixed from now on               │
//! │                                                                         │
//! │  3. COLLECT                                                             │
//! │     └── pay_debit(40) → PARTIAL                                         │
//! │     └── pay_debit(60) → PAID, paid_at stamped                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use crate::repository::sell_history::fetch_history;
use stockbook_core::ledger::{debit_total, DebitBalance};
use stockbook_core::validation::{validate_debit_history_ids, validate_name, validate_optional_text};
use stockbook_core::{CoreError, Debit, DebitDetail, DebitLine, DebitStatus};

/// Input for a new debit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDebit {
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub note: Option<String>,
    pub sell_history_ids: Vec<String>,
}

/// Repository for debit database operations.
#[derive(Debug, Clone)]
pub struct DebitRepository {
    pool: SqlitePool,
}

impl DebitRepository {
    /// Creates a new DebitRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DebitRepository { pool }
    }

    /// Creates a debit over existing sales.
    ///
    /// ## Errors
    /// - `Validation` for a blank name or an empty/duplicated id list
    /// - `SellHistoryNotFound` for an unknown history id
    /// - `AlreadyInDebit` when a history row is already claimed
    /// - `InvalidDebitTotal` when the rows sum to zero
    pub async fn create(&self, input: &NewDebit) -> DbResult<DebitDetail> {
        let customer_name = validate_name("customerName", &input.customer_name, 200)?;
        let customer_phone =
            validate_optional_text("customerPhone", input.customer_phone.as_deref(), 40)?;
        let note = validate_optional_text("note", input.note.as_deref(), 1000)?;
        validate_debit_history_ids(&input.sell_history_ids)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let mut line_totals = Vec::with_capacity(input.sell_history_ids.len());
        for history_id in &input.sell_history_ids {
            let row = fetch_history(&mut tx, history_id)
                .await?
                .ok_or_else(|| CoreError::SellHistoryNotFound(history_id.clone()))?;

            let claimed: Option<String> =
                sqlx::query_scalar("SELECT debit_id FROM debit_items WHERE sell_history_id = ?1")
                    .bind(history_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if let Some(debit_id) = claimed {
                warn!(history_id = %history_id, debit_id = %debit_id, "Sell history already in a debit");
                return Err(CoreError::AlreadyInDebit(history_id.clone()).into());
            }

            line_totals.push(row.total_price());
        }

        let balance = DebitBalance::open(debit_total(line_totals)?)?;
        let debit = Debit {
            id: new_id(),
            customer_name,
            customer_phone,
            note,
            total_amount_cents: balance.total.cents(),
            paid_amount_cents: balance.paid.cents(),
            status: balance.status(),
            paid_at: None,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %debit.id, total_cents = debit.total_amount_cents, "Creating debit");

        sqlx::query(
            r#"
            INSERT INTO debits (
                id, customer_name, customer_phone, note,
                total_amount_cents, paid_amount_cents, status, paid_at,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&debit.id)
        .bind(&debit.customer_name)
        .bind(&debit.customer_phone)
        .bind(&debit.note)
        .bind(debit.total_amount_cents)
        .bind(debit.paid_amount_cents)
        .bind(debit.status)
        .bind(debit.paid_at)
        .bind(debit.created_at)
        .bind(debit.updated_at)
        .execute(&mut *tx)
        .await?;

        for history_id in &input.sell_history_ids {
            sqlx::query(
                "INSERT INTO debit_items (id, debit_id, sell_history_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(new_id())
            .bind(&debit.id)
            .bind(history_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { .. } => {
                    DbError::Rejected(CoreError::AlreadyInDebit(history_id.clone()))
                }
                other => other,
            })?;
        }

        let detail = load_debit_detail(&mut tx, &debit.id).await?;
        tx.commit().await?;

        info!(
            id = %debit.id,
            items = detail.items.len(),
            total_cents = debit.total_amount_cents,
            "Debit created"
        );
        Ok(detail)
    }

    /// Gets a debit with its items.
    pub async fn get_detail(&self, id: &str) -> DbResult<DebitDetail> {
        let mut conn = self.pool.acquire().await?;
        load_debit_detail(&mut conn, id).await
    }

    /// Lists debits, newest first, optionally by status.
    pub async fn list(&self, status: Option<DebitStatus>) -> DbResult<Vec<Debit>> {
        let debits = sqlx::query_as::<_, Debit>(
            r#"
            SELECT * FROM debits
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(debits)
    }
}

// =============================================================================
// Row Helpers
// =============================================================================

/// Loads one debit on an existing connection.
pub(crate) async fn fetch_debit(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Debit>> {
    let debit = sqlx::query_as::<_, Debit>("SELECT * FROM debits WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(debit)
}

/// Touches the debit row so the enclosing transaction holds the write lock.
pub(crate) async fn claim_debit(
    conn: &mut SqliteConnection,
    id: &str,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE debits SET updated_at = ?2 WHERE id = ?1")
        .bind(id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::DebitNotFound(id.to_string()).into());
    }
    Ok(())
}

/// Writes the payment state of a debit.
pub(crate) async fn write_debit_balance(conn: &mut SqliteConnection, debit: &Debit) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE debits
        SET paid_amount_cents = ?2, status = ?3, paid_at = ?4, updated_at = ?5
        WHERE id = ?1
        "#,
    )
    .bind(&debit.id)
    .bind(debit.paid_amount_cents)
    .bind(debit.status)
    .bind(debit.paid_at)
    .bind(debit.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Loads a debit with its items and their sale context.
pub(crate) async fn load_debit_detail(conn: &mut SqliteConnection, id: &str) -> DbResult<DebitDetail> {
    let debit = fetch_debit(conn, id)
        .await?
        .ok_or_else(|| CoreError::DebitNotFound(id.to_string()))?;

    let items = sqlx::query_as::<_, DebitLine>(
        r#"
        SELECT
            di.id,
            di.sell_history_id,
            h.amount,
            h.sold_price_cents,
            h.total_price_cents,
            h.product_id,
            p.name AS product_name,
            c.name AS category_name,
            h.service_id,
            s.name AS service_name,
            h.created_at AS sold_at
        FROM debit_items di
        JOIN sell_history h ON h.id = di.sell_history_id
        LEFT JOIN products p ON p.id = h.product_id
        LEFT JOIN categories c ON c.id = p.category_id
        LEFT JOIN services s ON s.id = h.service_id
        WHERE di.debit_id = ?1
        ORDER BY h.created_at, di.rowid
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(DebitDetail { debit, items })
}
