//! # Sale Repository
//!
//! Reads and transactional writes for sales and sale items.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Inside the coordinator's transaction:                                  │
//! │                                                                         │
//! │    insert_sale_tx()      → Sale { status: Pending }                     │
//! │    insert_item_tx() × N  → SaleItem (name/SKU snapshots)               │
//! │    ... ledger postings ...                                              │
//! │    complete_sale_tx()    → Sale { status: Completed, completed_at }     │
//! │    COMMIT                                                               │
//! │                                                                         │
//! │  A sale is only ever visible to readers as Completed: any failure      │
//! │  before COMMIT rolls the pending row back out of existence.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use bodega_core::{Sale, SaleItem, SaleStatus};

const SELECT_SALE: &str = r#"
    SELECT id, store_id, user_id, status, payment_method,
           subtotal_cents, tax_cents, discount_cents, total_cents,
           amount_paid_cents, change_cents, customer_name, customer_email,
           customer_phone, notes, created_at, completed_at
    FROM sales
"#;

const SELECT_ITEM: &str = r#"
    SELECT id, sale_id, product_id, service_id, name_snapshot, sku_snapshot,
           quantity, unit_price_cents, discount_cents, tax_rate_bps,
           tax_amount_cents, line_total_cents, created_at
    FROM sale_items
"#;

/// Repository for sale reads.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!("{SELECT_SALE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    /// Gets all items for a sale, in insertion order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(&format!(
            "{SELECT_ITEM} WHERE sale_id = ?1 ORDER BY created_at, id"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Lists recent sales for a store, newest first, optionally filtered
    /// by status.
    pub async fn list(
        &self,
        store_id: &str,
        status: Option<SaleStatus>,
        limit: i64,
    ) -> DbResult<Vec<Sale>> {
        let sales = match status {
            Some(status) => {
                sqlx::query_as::<_, Sale>(&format!(
                    "{SELECT_SALE} WHERE store_id = ?1 AND status = ?2 \
                     ORDER BY created_at DESC LIMIT ?3"
                ))
                .bind(store_id)
                .bind(status)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Sale>(&format!(
                    "{SELECT_SALE} WHERE store_id = ?1 ORDER BY created_at DESC LIMIT ?2"
                ))
                .bind(store_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(sales)
    }
}

// =============================================================================
// Transactional writes (coordinator only)
// =============================================================================

/// Inserts a sale header inside an open transaction.
pub async fn insert_sale_tx(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, total = sale.total_cents, "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, store_id, user_id, status, payment_method,
            subtotal_cents, tax_cents, discount_cents, total_cents,
            amount_paid_cents, change_cents, customer_name, customer_email,
            customer_phone, notes, created_at, completed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                  ?15, ?16, ?17)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.store_id)
    .bind(&sale.user_id)
    .bind(sale.status)
    .bind(sale.payment_method)
    .bind(sale.subtotal_cents)
    .bind(sale.tax_cents)
    .bind(sale.discount_cents)
    .bind(sale.total_cents)
    .bind(sale.amount_paid_cents)
    .bind(sale.change_cents)
    .bind(&sale.customer_name)
    .bind(&sale.customer_email)
    .bind(&sale.customer_phone)
    .bind(&sale.notes)
    .bind(sale.created_at)
    .bind(sale.completed_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts a sale item inside an open transaction.
///
/// Product details (name, SKU, price) arrive frozen on the item so the
/// receipt survives later catalog edits.
pub async fn insert_item_tx(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, product_id, service_id, name_snapshot, sku_snapshot,
            quantity, unit_price_cents, discount_cents, tax_rate_bps,
            tax_amount_cents, line_total_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(&item.service_id)
    .bind(&item.name_snapshot)
    .bind(&item.sku_snapshot)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.discount_cents)
    .bind(item.tax_rate_bps)
    .bind(item.tax_amount_cents)
    .bind(item.line_total_cents)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Flips a pending sale to completed inside an open transaction.
pub async fn complete_sale_tx(
    conn: &mut SqliteConnection,
    sale_id: &str,
    completed_at: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE sales SET status = 'completed', completed_at = ?2 \
         WHERE id = ?1 AND status = 'pending'",
    )
    .bind(sale_id)
    .bind(completed_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Sale (pending)", sale_id));
    }

    Ok(())
}

/// Looks up a sale by id inside an open transaction (idempotency gate).
pub async fn fetch_sale_tx(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let sale = sqlx::query_as::<_, Sale>(&format!("{SELECT_SALE} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(sale)
}
