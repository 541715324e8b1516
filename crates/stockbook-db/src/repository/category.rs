//! # Category Repository
//!
//! Product groupings. Deleting a category detaches its products
//! (`ON DELETE SET NULL`), it never deletes them.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use stockbook_core::validation::validate_name;
use stockbook_core::{Category, CoreError};

const MAX_CATEGORY_NAME: usize = 100;

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Creates a category. Names are unique.
    pub async fn create(&self, name: &str) -> DbResult<Category> {
        let name = validate_name("name", name, MAX_CATEGORY_NAME)?;
        let now = Utc::now();

        let category = Category {
            id: new_id(),
            name,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %category.id, name = %category.name, "Creating category");

        sqlx::query(
            "INSERT INTO categories (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("category name", &category.name),
            other => other,
        })?;

        info!(id = %category.id, "Category created");
        Ok(category)
    }

    /// Lists all categories by name.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories ORDER BY name COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Gets a category by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Category>> {
        let mut conn = self.pool.acquire().await?;
        fetch_category(&mut conn, id).await
    }

    /// Renames a category.
    pub async fn rename(&self, id: &str, name: &str) -> DbResult<Category> {
        let name = validate_name("name", name, MAX_CATEGORY_NAME)?;

        debug!(id = %id, name = %name, "Renaming category");

        let updated = sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = ?2, updated_at = ?3 WHERE id = ?1 RETURNING *",
        )
        .bind(id)
        .bind(&name)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("category name", &name),
            other => other,
        })?;

        updated.ok_or_else(|| CoreError::CategoryNotFound(id.to_string()).into())
    }

    /// Deletes a category; its products keep existing without one.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting category");

        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::CategoryNotFound(id.to_string()).into());
        }

        info!(id = %id, "Category deleted");
        Ok(())
    }
}

/// Loads one category on an existing connection.
pub(crate) async fn fetch_category(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(category)
}

/// Fails with `CategoryNotFound` unless the category exists.
pub(crate) async fn ensure_category(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    match fetch_category(conn, id).await? {
        Some(_) => Ok(()),
        None => Err(CoreError::CategoryNotFound(id.to_string()).into()),
    }
}
