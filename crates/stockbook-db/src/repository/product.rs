//! # Product Repository
//!
//! Catalog operations for stocked products.
//!
//! Selling lives in [`LedgerRepository`](super::ledger::LedgerRepository);
//! this module covers direct edits. A direct edit may change the unit cost,
//! in which case the stored profit is recomputed from the running totals in
//! the same transaction.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::DbResult;
use crate::repository::category::{ensure_category, fetch_category};
use crate::repository::new_id;
use crate::repository::sell_history::history_for;
use stockbook_core::validation::{
    validate_name, validate_optional_text, validate_price_cents, validate_stock_quantity,
};
use stockbook_core::{CoreError, Money, Product, ProductDetail, SaleSubject};

const MAX_PRODUCT_NAME: usize = 200;
const MAX_SEARCH: usize = 100;

/// Editable product fields, used for both create and full update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInput {
    pub name: String,
    pub category_id: Option<String>,
    pub quantity: i64,
    pub initial_price_cents: i64,
    pub selling_price_cents: i64,
}

impl ProductInput {
    fn validated(&self) -> DbResult<ProductInput> {
        let name = validate_name("name", &self.name, MAX_PRODUCT_NAME)?;
        validate_stock_quantity(self.quantity)?;
        validate_price_cents("initialPrice", self.initial_price_cents)?;
        validate_price_cents("sellingPrice", self.selling_price_cents)?;

        Ok(ProductInput {
            name,
            category_id: self
                .category_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            ..self.clone()
        })
    }
}

/// Optional list filters.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Case-insensitive substring of the name.
    pub search: Option<String>,
    pub category_id: Option<String>,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product with zeroed sales totals.
    pub async fn create(&self, input: &ProductInput) -> DbResult<Product> {
        let input = input.validated()?;
        let mut conn = self.pool.acquire().await?;

        if let Some(category_id) = &input.category_id {
            ensure_category(&mut conn, category_id).await?;
        }

        let now = Utc::now();
        let product = Product {
            id: new_id(),
            name: input.name,
            category_id: input.category_id,
            quantity: input.quantity,
            initial_price_cents: input.initial_price_cents,
            selling_price_cents: input.selling_price_cents,
            total_sold: 0,
            revenue_cents: 0,
            profit_cents: 0,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Creating product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category_id, quantity,
                initial_price_cents, selling_price_cents,
                total_sold, revenue_cents, profit_cents,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(product.quantity)
        .bind(product.initial_price_cents)
        .bind(product.selling_price_cents)
        .bind(product.total_sold)
        .bind(product.revenue_cents)
        .bind(product.profit_cents)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *conn)
        .await?;

        info!(id = %product.id, quantity = product.quantity, "Product created");
        Ok(product)
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    /// Gets a product with its category and history, newest first.
    pub async fn get_detail(&self, id: &str) -> DbResult<ProductDetail> {
        let mut conn = self.pool.acquire().await?;
        load_product_detail(&mut conn, id).await
    }

    /// Lists products by name.
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        let search = validate_optional_text("search", filter.search.as_deref(), MAX_SEARCH)?;

        debug!(search = ?search, category_id = ?filter.category_id, "Listing products");

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE (?1 IS NULL OR name LIKE '%' || ?1 || '%')
              AND (?2 IS NULL OR category_id = ?2)
            ORDER BY name COLLATE NOCASE, rowid
            "#,
        )
        .bind(search)
        .bind(&filter.category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Replaces the editable fields of a product.
    ///
    /// Sales totals are kept; profit follows the new unit cost.
    pub async fn update(&self, id: &str, input: &ProductInput) -> DbResult<Product> {
        let input = input.validated()?;
        let now = Utc::now();

        debug!(id = %id, "Updating product");

        let mut tx = self.pool.begin().await?;
        claim_product(&mut tx, id, now).await?;

        if let Some(category_id) = &input.category_id {
            ensure_category(&mut tx, category_id).await?;
        }

        let mut product = fetch_product(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;

        let mut totals = product
            .totals()
            .reprice(Money::from_cents(input.initial_price_cents))?;
        totals.quantity = input.quantity;
        product.apply_totals(&totals)?;
        product.name = input.name;
        product.category_id = input.category_id;
        product.selling_price_cents = input.selling_price_cents;
        product.updated_at = now;

        write_product(&mut tx, &product).await?;
        tx.commit().await?;

        info!(id = %id, profit_cents = product.profit_cents, "Product updated");
        Ok(product)
    }

    /// Deletes a product and its sell history.
    ///
    /// Refused while any of that history belongs to a debit. Bulk-sell
    /// headers that lose lines are shrunk, and dropped once empty.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let mut tx = self.pool.begin().await?;
        claim_product(&mut tx, id, Utc::now()).await?;

        let referenced: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM debit_items di
            JOIN sell_history h ON h.id = di.sell_history_id
            WHERE h.product_id = ?1
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if referenced > 0 {
            warn!(id = %id, referenced, "Product delete refused: history is in a debit");
            return Err(CoreError::ReferencedByDebit {
                entity: "Product".to_string(),
                id: id.to_string(),
            }
            .into());
        }

        sqlx::query(
            r#"
            UPDATE sell_transactions
            SET total_price_cents = total_price_cents - (
                    SELECT COALESCE(SUM(h.total_price_cents), 0) FROM sell_history h
                    WHERE h.transaction_id = sell_transactions.id AND h.product_id = ?1
                ),
                item_count = item_count - (
                    SELECT COUNT(*) FROM sell_history h
                    WHERE h.transaction_id = sell_transactions.id AND h.product_id = ?1
                )
            WHERE id IN (
                SELECT transaction_id FROM sell_history
                WHERE product_id = ?1 AND transaction_id IS NOT NULL
            )
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM sell_transactions WHERE item_count <= 0")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(id = %id, "Product deleted");
        Ok(())
    }
}

// =============================================================================
// Row Helpers
// =============================================================================

/// Loads one product on an existing connection.
pub(crate) async fn fetch_product(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(product)
}

/// Touches the product row so the enclosing transaction holds the write
/// lock before anything is read.
pub(crate) async fn claim_product(
    conn: &mut SqliteConnection,
    id: &str,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE products SET updated_at = ?2 WHERE id = ?1")
        .bind(id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::ProductNotFound(id.to_string()).into());
    }
    Ok(())
}

/// Writes every mutable column of a product.
pub(crate) async fn write_product(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE products SET
            name = ?2,
            category_id = ?3,
            quantity = ?4,
            initial_price_cents = ?5,
            selling_price_cents = ?6,
            total_sold = ?7,
            revenue_cents = ?8,
            profit_cents = ?9,
            updated_at = ?10
        WHERE id = ?1
        "#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(&product.category_id)
    .bind(product.quantity)
    .bind(product.initial_price_cents)
    .bind(product.selling_price_cents)
    .bind(product.total_sold)
    .bind(product.revenue_cents)
    .bind(product.profit_cents)
    .bind(product.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Loads a product with its category and history.
pub(crate) async fn load_product_detail(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<ProductDetail> {
    let product = fetch_product(conn, id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;

    let category = match &product.category_id {
        Some(category_id) => fetch_category(conn, category_id).await?,
        None => None,
    };

    let history = history_for(conn, &SaleSubject::Product(product.id.clone())).await?;

    Ok(ProductDetail {
        product,
        category,
        history,
    })
}
