//! # Product Batch Repository
//!
//! Expiration-dated lots and the receiving/adjustment flows that create and
//! correct them. All quantity changes are posted through the stock ledger so
//! `current_quantity == initial_quantity + Σ batch movements` holds.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::ledger::{post_batch_movement_tx, post_movement_tx, NewStockMovement};
use bodega_core::{BatchSnapshot, MovementType, ProductBatch};

const SELECT_BATCH: &str = r#"
    SELECT id, product_id, batch_number, initial_quantity, current_quantity,
           expiration_date, cost_cents, created_at
    FROM product_batches
"#;

/// A batch to create from a receiving flow.
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub store_id: String,
    pub product_id: String,
    pub batch_number: Option<String>,
    pub quantity: i64,
    pub expiration_date: Option<DateTime<Utc>>,
    pub cost_cents: Option<i64>,
    pub user_id: Option<String>,
}

/// Repository for product batch operations.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    /// Creates a new BatchRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    /// Gets a batch by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ProductBatch>> {
        let batch = sqlx::query_as::<_, ProductBatch>(&format!("{SELECT_BATCH} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(batch)
    }

    /// Lists all batches for a product, earliest expiration first.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<ProductBatch>> {
        let batches = sqlx::query_as::<_, ProductBatch>(&format!(
            "{SELECT_BATCH} WHERE product_id = ?1 \
             ORDER BY expiration_date IS NULL, expiration_date, created_at"
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(batches)
    }

    /// Returns the next batch to expire that still holds stock, if any.
    /// Feeds expiring-stock alerts.
    pub async fn next_expiring(&self, product_id: &str) -> DbResult<Option<ProductBatch>> {
        let batch = sqlx::query_as::<_, ProductBatch>(&format!(
            "{SELECT_BATCH} WHERE product_id = ?1 AND current_quantity > 0 \
             AND expiration_date IS NOT NULL \
             ORDER BY expiration_date LIMIT 1"
        ))
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(batch)
    }

    /// Creates a batch from received stock.
    ///
    /// Inserts the batch row at zero, then posts a `purchase` movement and
    /// its batch companion in the same transaction, which brings both the
    /// batch counter and the product aggregate up by `quantity`.
    pub async fn create_batch(&self, new: NewBatch) -> DbResult<ProductBatch> {
        if new.quantity <= 0 {
            return Err(DbError::Internal(format!(
                "batch quantity must be positive, got {}",
                new.quantity
            )));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(product_id = %new.product_id, quantity = new.quantity, "Creating batch");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO product_batches (
                id, product_id, batch_number, initial_quantity,
                current_quantity, expiration_date, cost_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?7)
            "#,
        )
        .bind(&id)
        .bind(&new.product_id)
        .bind(&new.batch_number)
        .bind(new.quantity)
        .bind(new.expiration_date)
        .bind(new.cost_cents)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let movement_id = post_movement_tx(
            &mut tx,
            &NewStockMovement {
                store_id: new.store_id.clone(),
                product_id: new.product_id.clone(),
                movement_type: MovementType::Purchase,
                quantity: new.quantity,
                reason: new
                    .batch_number
                    .as_ref()
                    .map(|n| format!("batch {n} received")),
                sale_id: None,
                user_id: new.user_id.clone(),
            },
        )
        .await?;

        post_batch_movement_tx(&mut tx, &id, &movement_id, new.quantity).await?;

        tx.commit().await?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("ProductBatch", &id))
    }

    /// Manually corrects a batch's quantity by a signed delta.
    ///
    /// Posts an `adjustment` movement and its batch companion; the guards
    /// reject any delta that would take either counter below zero.
    pub async fn adjust_batch(
        &self,
        store_id: &str,
        batch_id: &str,
        delta: i64,
        reason: Option<String>,
        user_id: Option<String>,
    ) -> DbResult<ProductBatch> {
        let batch = self
            .get_by_id(batch_id)
            .await?
            .ok_or_else(|| DbError::not_found("ProductBatch", batch_id))?;

        let mut tx = self.pool.begin().await?;

        let movement_id = post_movement_tx(
            &mut tx,
            &NewStockMovement {
                store_id: store_id.to_string(),
                product_id: batch.product_id.clone(),
                movement_type: MovementType::Adjustment,
                quantity: delta,
                reason,
                sale_id: None,
                user_id,
            },
        )
        .await?;

        post_batch_movement_tx(&mut tx, batch_id, &movement_id, delta).await?;

        tx.commit().await?;

        self.get_by_id(batch_id)
            .await?
            .ok_or_else(|| DbError::not_found("ProductBatch", batch_id))
    }

    /// Re-aligns a product's aggregate counter with the sum of its batch
    /// counters by posting the difference as an adjustment movement.
    ///
    /// A no-op when the figures already agree. Returns the posted delta.
    pub async fn reconcile_product_stock(
        &self,
        store_id: &str,
        product_id: &str,
    ) -> DbResult<i64> {
        let mut tx = self.pool.begin().await?;

        let batch_sum: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(current_quantity), 0) FROM product_batches WHERE product_id = ?1",
        )
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;

        let current: i64 = sqlx::query_scalar("SELECT current_stock FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        let delta = batch_sum - current;
        if delta == 0 {
            return Ok(0);
        }

        info!(product_id, current, batch_sum, delta, "Reconciling product stock to batch sum");

        post_movement_tx(
            &mut tx,
            &NewStockMovement {
                store_id: store_id.to_string(),
                product_id: product_id.to_string(),
                movement_type: MovementType::Adjustment,
                quantity: delta,
                reason: Some("reconciled to batch sum".to_string()),
                sale_id: None,
                user_id: None,
            },
        )
        .await?;

        tx.commit().await?;
        Ok(delta)
    }
}

/// Snapshots a product's batches inside an open transaction, for the FEFO
/// allocator. Only batches with remaining units are returned.
pub async fn batch_snapshots_tx(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<Vec<BatchSnapshot>> {
    let rows = sqlx::query_as::<_, ProductBatch>(&format!(
        "{SELECT_BATCH} WHERE product_id = ?1 AND current_quantity > 0"
    ))
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|b| BatchSnapshot {
            batch_id: b.id,
            current_quantity: b.current_quantity,
            expiration_date: b.expiration_date,
            created_at: b.created_at,
        })
        .collect())
}
