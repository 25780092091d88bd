//! # Product Repository
//!
//! Read and write access to the product catalog.
//!
//! ## Stock is never written here
//! `products.current_stock` is a cached aggregate owned by the stock ledger
//! (`repository::ledger`). This repository reads it and inserts/updates
//! catalog fields, but every counter change goes through a posted movement.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use bodega_core::Product;

const SELECT_PRODUCT: &str = r#"
    SELECT id, store_id, sku, barcode, name, price_cents, cost_cents,
           tax_rate_bps, track_stock, track_expiration_dates,
           current_stock, is_active, created_at, updated_at
    FROM products
"#;

/// Repository for product catalog operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!("{SELECT_PRODUCT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Lists active products for a store.
    pub async fn list_active(&self, store_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "{SELECT_PRODUCT} WHERE store_id = ?1 AND is_active = 1 ORDER BY name"
        ))
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    /// Inserts a product.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, store_id, sku, barcode, name, price_cents, cost_cents,
                tax_rate_bps, track_stock, track_expiration_dates,
                current_stock, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&product.id)
        .bind(&product.store_id)
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.tax_rate_bps)
        .bind(product.track_stock)
        .bind(product.track_expiration_dates)
        .bind(product.current_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deactivates a product (soft delete).
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    /// Returns the cached aggregate stock for a product.
    pub async fn current_stock(&self, id: &str) -> DbResult<i64> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT current_stock FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        stock.ok_or_else(|| DbError::not_found("Product", id))
    }
}

/// Fetches a product inside an open transaction.
///
/// Used by the sale coordinator so its validation reads and counter writes
/// observe one consistent snapshot.
pub async fn fetch_product_tx(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!("{SELECT_PRODUCT} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(product)
}
