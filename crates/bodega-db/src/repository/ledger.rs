//! # Stock Ledger Store
//!
//! Append-only recording of inventory changes with derived counters.
//!
//! ## The two-table write
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  post_movement_tx                                                       │
//! │                                                                         │
//! │   1. INSERT stock_movements (immutable history row)                    │
//! │   2. UPDATE products                                                    │
//! │        SET current_stock = current_stock + ?delta                       │
//! │        WHERE id = ? AND current_stock + ?delta >= 0                     │
//! │             │                                                           │
//! │             └── rows_affected == 0  →  InsufficientStock                │
//! │                                                                         │
//! │  post_batch_movement_tx does the same against product_batches.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The counter update is always a relative delta evaluated by the database,
//! never a read-modify-write in application memory. Two transactions racing
//! the same product serialize on the row; the loser's guard re-evaluates
//! against the winner's committed value.
//!
//! History is append-only: corrections are posted as new movements with the
//! opposite sign.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use bodega_core::{MovementType, StockMovement};

// =============================================================================
// New-movement inputs
// =============================================================================

/// A stock movement to post against a product.
#[derive(Debug, Clone)]
pub struct NewStockMovement {
    pub store_id: String,
    pub product_id: String,
    pub movement_type: MovementType,
    /// Signed: positive adds stock, negative depletes.
    pub quantity: i64,
    pub reason: Option<String>,
    pub sale_id: Option<String>,
    pub user_id: Option<String>,
}

// =============================================================================
// Ledger store
// =============================================================================

/// Pool-holding handle for ledger reads and standalone postings.
///
/// The sale coordinator uses the `_tx` functions below instead, inside its
/// own transaction.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    /// Creates a new StockLedger.
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    /// Posts a single movement in its own transaction.
    ///
    /// For manual adjustments and receiving flows that aren't part of a
    /// larger unit of work.
    pub async fn post_movement(&self, movement: NewStockMovement) -> DbResult<String> {
        let mut tx = self.pool.begin().await?;
        let id = post_movement_tx(&mut tx, &movement).await?;
        tx.commit().await?;
        Ok(id)
    }

    /// Lists the movement history for a product, newest first.
    pub async fn movements_for_product(
        &self,
        product_id: &str,
        limit: i64,
    ) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, store_id, product_id, movement_type, quantity,
                   reason, sale_id, user_id, created_at
            FROM stock_movements
            WHERE product_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }
}

// =============================================================================
// Transactional postings
// =============================================================================

/// Appends a stock movement row and applies its delta to the product's
/// aggregate counter, inside the caller's transaction.
///
/// Returns the new movement's id. Fails with
/// [`DbError::InsufficientStock`] when the guarded update matches no row,
/// which aborts the caller's transaction and rolls the history row back
/// with it.
pub async fn post_movement_tx(
    conn: &mut SqliteConnection,
    movement: &NewStockMovement,
) -> DbResult<String> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    debug!(
        product_id = %movement.product_id,
        quantity = movement.quantity,
        movement_type = ?movement.movement_type,
        "Posting stock movement"
    );

    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, store_id, product_id, movement_type, quantity,
            reason, sale_id, user_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&id)
    .bind(&movement.store_id)
    .bind(&movement.product_id)
    .bind(movement.movement_type)
    .bind(movement.quantity)
    .bind(&movement.reason)
    .bind(&movement.sale_id)
    .bind(&movement.user_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    // Guarded relative delta: the database evaluates the new value, and the
    // WHERE clause refuses to take the counter below zero.
    let result = sqlx::query(
        r#"
        UPDATE products
        SET current_stock = current_stock + ?2, updated_at = ?3
        WHERE id = ?1 AND current_stock + ?2 >= 0
        "#,
    )
    .bind(&movement.product_id)
    .bind(movement.quantity)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InsufficientStock {
            product_id: movement.product_id.clone(),
        });
    }

    Ok(id)
}

/// Appends a batch movement row tied to a stock movement and applies its
/// delta to the batch counter, inside the caller's transaction.
pub async fn post_batch_movement_tx(
    conn: &mut SqliteConnection,
    batch_id: &str,
    stock_movement_id: &str,
    quantity: i64,
) -> DbResult<String> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    debug!(batch_id = %batch_id, quantity, "Posting batch stock movement");

    sqlx::query(
        r#"
        INSERT INTO batch_stock_movements (
            id, batch_id, stock_movement_id, quantity, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&id)
    .bind(batch_id)
    .bind(stock_movement_id)
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let result = sqlx::query(
        r#"
        UPDATE product_batches
        SET current_quantity = current_quantity + ?2
        WHERE id = ?1 AND current_quantity + ?2 >= 0
        "#,
    )
    .bind(batch_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InsufficientBatchStock {
            batch_id: batch_id.to_string(),
        });
    }

    Ok(id)
}
