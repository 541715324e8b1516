//! # Service Repository
//!
//! Catalog operations for services. Services have no stock and no unit
//! cost; their profit is never stored.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::DbResult;
use crate::repository::new_id;
use crate::repository::sell_history::history_for;
use stockbook_core::validation::{validate_name, validate_optional_text, validate_price_cents};
use stockbook_core::{CoreError, SaleSubject, Service, ServiceDetail};

const MAX_SERVICE_NAME: usize = 200;

/// Editable service fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInput {
    pub name: String,
    pub default_price_cents: i64,
}

impl ServiceInput {
    fn validated(&self) -> DbResult<ServiceInput> {
        let name = validate_name("name", &self.name, MAX_SERVICE_NAME)?;
        validate_price_cents("defaultPrice", self.default_price_cents)?;
        Ok(ServiceInput {
            name,
            default_price_cents: self.default_price_cents,
        })
    }
}

/// Repository for service database operations.
#[derive(Debug, Clone)]
pub struct ServiceRepository {
    pool: SqlitePool,
}

impl ServiceRepository {
    /// Creates a new ServiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ServiceRepository { pool }
    }

    /// Creates a service with zeroed totals.
    pub async fn create(&self, input: &ServiceInput) -> DbResult<Service> {
        let input = input.validated()?;
        let now = Utc::now();

        let service = Service {
            id: new_id(),
            name: input.name,
            default_price_cents: input.default_price_cents,
            total_sold: 0,
            revenue_cents: 0,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %service.id, name = %service.name, "Creating service");

        sqlx::query(
            r#"
            INSERT INTO services (
                id, name, default_price_cents, total_sold, revenue_cents,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&service.id)
        .bind(&service.name)
        .bind(service.default_price_cents)
        .bind(service.total_sold)
        .bind(service.revenue_cents)
        .bind(service.created_at)
        .bind(service.updated_at)
        .execute(&self.pool)
        .await?;

        info!(id = %service.id, "Service created");
        Ok(service)
    }

    /// Gets a service by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Service>> {
        let mut conn = self.pool.acquire().await?;
        fetch_service(&mut conn, id).await
    }

    /// Gets a service with its history, newest first.
    pub async fn get_detail(&self, id: &str) -> DbResult<ServiceDetail> {
        let mut conn = self.pool.acquire().await?;
        load_service_detail(&mut conn, id).await
    }

    /// Lists services by name.
    pub async fn list(&self, search: Option<&str>) -> DbResult<Vec<Service>> {
        let search = validate_optional_text("search", search, 100)?;

        let services = sqlx::query_as::<_, Service>(
            r#"
            SELECT * FROM services
            WHERE (?1 IS NULL OR name LIKE '%' || ?1 || '%')
            ORDER BY name COLLATE NOCASE, rowid
            "#,
        )
        .bind(search)
        .fetch_all(&self.pool)
        .await?;

        Ok(services)
    }

    /// Renames a service or changes its default price.
    pub async fn update(&self, id: &str, input: &ServiceInput) -> DbResult<Service> {
        let input = input.validated()?;

        debug!(id = %id, "Updating service");

        let updated = sqlx::query_as::<_, Service>(
            r#"
            UPDATE services
            SET name = ?2, default_price_cents = ?3, updated_at = ?4
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.default_price_cents)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| CoreError::ServiceNotFound(id.to_string()).into())
    }

    /// Deletes a service and its sell history.
    ///
    /// Refused while any of that history belongs to a debit.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting service");

        let mut tx = self.pool.begin().await?;
        claim_service(&mut tx, id, Utc::now()).await?;

        let referenced: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM debit_items di
            JOIN sell_history h ON h.id = di.sell_history_id
            WHERE h.service_id = ?1
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if referenced > 0 {
            warn!(id = %id, referenced, "Service delete refused: history is in a debit");
            return Err(CoreError::ReferencedByDebit {
                entity: "Service".to_string(),
                id: id.to_string(),
            }
            .into());
        }

        sqlx::query("DELETE FROM services WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(id = %id, "Service deleted");
        Ok(())
    }
}

// =============================================================================
// Row Helpers
// =============================================================================

/// Loads one service on an existing connection.
pub(crate) async fn fetch_service(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Service>> {
    let service = sqlx::query_as::<_, Service>("SELECT * FROM services WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(service)
}

/// Touches the service row so the enclosing transaction holds the write lock.
pub(crate) async fn claim_service(
    conn: &mut SqliteConnection,
    id: &str,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE services SET updated_at = ?2 WHERE id = ?1")
        .bind(id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::ServiceNotFound(id.to_string()).into());
    }
    Ok(())
}

/// Writes the running totals of a service.
pub(crate) async fn write_service(conn: &mut SqliteConnection, service: &Service) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE services
        SET total_sold = ?2, revenue_cents = ?3, updated_at = ?4
        WHERE id = ?1
        "#,
    )
    .bind(&service.id)
    .bind(service.total_sold)
    .bind(service.revenue_cents)
    .bind(service.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Loads a service with its history.
pub(crate) async fn load_service_detail(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<ServiceDetail> {
    let service = fetch_service(conn, id)
        .await?
        .ok_or_else(|| CoreError::ServiceNotFound(id.to_string()))?;

    let history = history_for(conn, &SaleSubject::Service(service.id.clone())).await?;

    Ok(ServiceDetail { service, history })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::fixtures;

    #[tokio::test]
    async fn test_create_update_list() {
        let db = fixtures::db().await;
        let repair = fixtures::service(&db, "Phone repair", 1500).await;
        fixtures::service(&db, "Delivery", 300).await;

        let updated = db
            .services()
            .update(
                &repair.id,
                &ServiceInput {
                    name: "Screen repair".to_string(),
                    default_price_cents: 2000,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Screen repair");
        assert_eq!(updated.default_price_cents, 2000);

        let names: Vec<String> = db
            .services()
            .list(None)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Delivery", "Screen repair"]);

        let hits = db.services().list(Some("screen")).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_negative_price_rejected() {
        let db = fixtures::db().await;
        let err = db
            .services()
            .create(&ServiceInput {
                name: "Repair".to_string(),
                default_price_cents: -1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_cascades_history() {
        let db = fixtures::db().await;
        let repair = fixtures::service(&db, "Repair", 1500).await;
        let detail = db.ledger().sell_service(&repair.id, 1, 1500).await.unwrap();

        db.services().delete(&repair.id).await.unwrap();

        assert!(db.services().get_by_id(&repair.id).await.unwrap().is_none());
        assert!(db
            .sell_history()
            .get_by_id(&detail.history[0].id)
            .await
            .unwrap()
            .is_none());

        let err = db.services().delete(&repair.id).await.unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::ServiceNotFound(_))));
    }
}
