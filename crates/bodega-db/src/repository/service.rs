//! # Service Repository
//!
//! Catalog access for sellable services. Services never touch inventory,
//! so this repository is read/insert only.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use bodega_core::Service;

const SELECT_SERVICE: &str = r#"
    SELECT id, store_id, name, price_cents, tax_rate_bps,
           is_active, created_at, updated_at
    FROM services
"#;

/// Repository for service catalog operations.
#[derive(Debug, Clone)]
pub struct ServiceRepository {
    pool: SqlitePool,
}

impl ServiceRepository {
    /// Creates a new ServiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ServiceRepository { pool }
    }

    /// Gets a service by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Service>> {
        let service = sqlx::query_as::<_, Service>(&format!("{SELECT_SERVICE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(service)
    }

    /// Lists active services for a store.
    pub async fn list_active(&self, store_id: &str) -> DbResult<Vec<Service>> {
        let services = sqlx::query_as::<_, Service>(&format!(
            "{SELECT_SERVICE} WHERE store_id = ?1 AND is_active = 1 ORDER BY name"
        ))
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(services)
    }

    /// Inserts a service.
    pub async fn insert(&self, service: &Service) -> DbResult<()> {
        debug!(id = %service.id, name = %service.name, "Inserting service");

        sqlx::query(
            r#"
            INSERT INTO services (
                id, store_id, name, price_cents, tax_rate_bps,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&service.id)
        .bind(&service.store_id)
        .bind(&service.name)
        .bind(service.price_cents)
        .bind(service.tax_rate_bps)
        .bind(service.is_active)
        .bind(service.created_at)
        .bind(service.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Fetches a service inside an open transaction.
pub async fn fetch_service_tx(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Service>> {
    let service = sqlx::query_as::<_, Service>(&format!("{SELECT_SERVICE} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(service)
}
