//! # Sale Backend Port
//!
//! The reconciler replays queued sales against a [`SaleBackend`]. Terminals
//! embedding the whole engine use [`CoordinatorBackend`], which adapts the
//! in-process sale coordinator; a remote HTTP backend implements the same
//! trait on the other side of a network link.
//!
//! Submission outcomes are two-sided on purpose:
//! - `Rejected`: the backend processed the sale and refused it (business
//!   rule). Retrying the identical payload can never succeed.
//! - `Unavailable`: the backend couldn't be reached or fell over mid-way.
//!   The sale may or may not have committed; replay must go through the
//!   duplicate check before resubmitting.

use async_trait::async_trait;
use thiserror::Error;

use bodega_core::{SaleInput, SaleReceipt, SaleStatus};
use bodega_db::{Database, DbError};

/// Why a submission did not yield a receipt.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Business rejection; not retryable.
    #[error("sale rejected: {0}")]
    Rejected(String),

    /// Transient failure; retry later.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// The surface the reconciler replays against.
#[async_trait]
pub trait SaleBackend: Send + Sync {
    /// Submits a sale for atomic commit.
    async fn submit_sale(
        &self,
        store_id: &str,
        user_id: &str,
        input: &SaleInput,
    ) -> Result<SaleReceipt, SubmitError>;

    /// Looks up a sale by id, returning its receipt if it committed.
    /// The duplicate check replay runs before every resubmission.
    async fn find_committed(&self, sale_id: &str) -> Result<Option<SaleReceipt>, SubmitError>;

    /// Returns the authoritative stock figure for a product, if it exists.
    /// Used to reconcile the local cache after a successful replay.
    async fn product_stock(&self, product_id: &str) -> Result<Option<i64>, SubmitError>;
}

// =============================================================================
// In-process coordinator backend
// =============================================================================

/// Adapts the in-process [`bodega_db::SaleCoordinator`] to the backend port.
#[derive(Debug, Clone)]
pub struct CoordinatorBackend {
    db: Database,
}

impl CoordinatorBackend {
    /// Creates a backend over the given database.
    pub fn new(db: Database) -> Self {
        CoordinatorBackend { db }
    }
}

/// Business failures become rejections; everything else is transient.
fn map_db_error(err: DbError) -> SubmitError {
    if err.is_rejection() {
        SubmitError::Rejected(err.to_string())
    } else {
        SubmitError::Unavailable(err.to_string())
    }
}

#[async_trait]
impl SaleBackend for CoordinatorBackend {
    async fn submit_sale(
        &self,
        store_id: &str,
        user_id: &str,
        input: &SaleInput,
    ) -> Result<SaleReceipt, SubmitError> {
        self.db
            .coordinator()
            .commit_sale(store_id, user_id, input)
            .await
            .map_err(map_db_error)
    }

    async fn find_committed(&self, sale_id: &str) -> Result<Option<SaleReceipt>, SubmitError> {
        let Some(sale) = self.db.sales().get_by_id(sale_id).await.map_err(map_db_error)? else {
            return Ok(None);
        };
        if sale.status != SaleStatus::Completed {
            return Ok(None);
        }

        let items = self.db.sales().get_items(sale_id).await.map_err(map_db_error)?;
        let invoice_url = self
            .db
            .invoices()
            .get_by_sale(sale_id)
            .await
            .map_err(map_db_error)?
            .map(|inv| bodega_db::repository::invoice::invoice_url(&inv.access_token));

        Ok(Some(SaleReceipt {
            sale,
            items,
            invoice_url,
        }))
    }

    async fn product_stock(&self, product_id: &str) -> Result<Option<i64>, SubmitError> {
        match self.db.products().get_by_id(product_id).await {
            Ok(product) => Ok(product.map(|p| p.current_stock)),
            Err(e) => Err(map_db_error(e)),
        }
    }
}
