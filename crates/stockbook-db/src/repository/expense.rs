//! # Expense Repository
//!
//! Daily running costs and supplier purchases. Both kinds feed the
//! summary report; neither touches stock.

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use stockbook_core::validation::{
    validate_date_range, validate_expense_amount, validate_name, validate_optional_text,
};
use stockbook_core::{DailyExpense, SupplyExpense, ValidationError};

const MAX_TITLE: usize = 200;
const MAX_NOTE: usize = 1000;

/// Input for a daily expense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDailyExpense {
    pub title: String,
    pub amount_cents: i64,
    pub note: Option<String>,
    pub spent_on: NaiveDate,
}

/// Input for a supply expense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSupplyExpense {
    pub supplier: String,
    pub description: String,
    pub amount_cents: i64,
    pub quantity: Option<i64>,
    pub note: Option<String>,
    pub spent_on: NaiveDate,
}

/// Repository for expense database operations.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    /// Creates a new ExpenseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    // =========================================================================
    // Daily
    // =========================================================================

    /// Records a daily expense.
    pub async fn create_daily(&self, input: &NewDailyExpense) -> DbResult<DailyExpense> {
        validate_expense_amount(input.amount_cents)?;
        let expense = DailyExpense {
            id: new_id(),
            title: validate_name("title", &input.title, MAX_TITLE)?,
            amount_cents: input.amount_cents,
            note: validate_optional_text("note", input.note.as_deref(), MAX_NOTE)?,
            spent_on: input.spent_on,
            created_at: Utc::now(),
        };

        debug!(id = %expense.id, amount_cents = expense.amount_cents, "Creating daily expense");

        sqlx::query(
            r#"
            INSERT INTO daily_expenses (id, title, amount_cents, note, spent_on, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&expense.id)
        .bind(&expense.title)
        .bind(expense.amount_cents)
        .bind(&expense.note)
        .bind(expense.spent_on)
        .bind(expense.created_at)
        .execute(&self.pool)
        .await?;

        info!(id = %expense.id, "Daily expense created");
        Ok(expense)
    }

    /// Lists daily expenses, newest first. Both bounds are inclusive.
    pub async fn list_daily(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> DbResult<Vec<DailyExpense>> {
        validate_date_range(from, to)?;

        let expenses = sqlx::query_as::<_, DailyExpense>(
            r#"
            SELECT * FROM daily_expenses
            WHERE (?1 IS NULL OR spent_on >= ?1)
              AND (?2 IS NULL OR spent_on <= ?2)
            ORDER BY spent_on DESC, created_at DESC, rowid DESC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }

    /// Deletes a daily expense.
    pub async fn delete_daily(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM daily_expenses WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("DailyExpense", id));
        }

        info!(id = %id, "Daily expense deleted");
        Ok(())
    }

    // =========================================================================
    // Supply
    // =========================================================================

    /// Records a purchase from a supplier.
    pub async fn create_supply(&self, input: &NewSupplyExpense) -> DbResult<SupplyExpense> {
        validate_expense_amount(input.amount_cents)?;
        if matches!(input.quantity, Some(q) if q <= 0) {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }

        let expense = SupplyExpense {
            id: new_id(),
            supplier: validate_name("supplier", &input.supplier, MAX_TITLE)?,
            description: validate_name("description", &input.description, MAX_NOTE)?,
            amount_cents: input.amount_cents,
            quantity: input.quantity,
            note: validate_optional_text("note", input.note.as_deref(), MAX_NOTE)?,
            spent_on: input.spent_on,
            created_at: Utc::now(),
        };

        debug!(
            id = %expense.id,
            supplier = %expense.supplier,
            amount_cents = expense.amount_cents,
            "Creating supply expense"
        );

        sqlx::query(
            r#"
            INSERT INTO supply_expenses (
                id, supplier, description, amount_cents, quantity, note,
                spent_on, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&expense.id)
        .bind(&expense.supplier)
        .bind(&expense.description)
        .bind(expense.amount_cents)
        .bind(expense.quantity)
        .bind(&expense.note)
        .bind(expense.spent_on)
        .bind(expense.created_at)
        .execute(&self.pool)
        .await?;

        info!(id = %expense.id, "Supply expense created");
        Ok(expense)
    }

    /// Lists supply expenses, newest first. Both bounds are inclusive.
    pub async fn list_supply(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> DbResult<Vec<SupplyExpense>> {
        validate_date_range(from, to)?;

        let expenses = sqlx::query_as::<_, SupplyExpense>(
            r#"
            SELECT * FROM supply_expenses
            WHERE (?1 IS NULL OR spent_on >= ?1)
              AND (?2 IS NULL OR spent_on <= ?2)
            ORDER BY spent_on DESC, created_at DESC, rowid DESC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }

    /// Deletes a supply expense.
    pub async fn delete_supply(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM supply_expenses WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SupplyExpense", id));
        }

        info!(id = %id, "Supply expense deleted");
        Ok(())
    }
}
