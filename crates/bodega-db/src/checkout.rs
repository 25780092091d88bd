//! # Sale Transaction Coordinator
//!
//! Turns a validated sale submission into a committed sale with all of its
//! inventory effects, atomically.
//!
//! ## The commit protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  commit_sale(store_id, user_id, input)                                  │
//! │                                                                         │
//! │   0. validate input (structural, before any I/O)                        │
//! │   ┌──────────────────── one sqlx transaction ─────────────────────┐    │
//! │   │ 1. idempotency gate: client_id already committed? → receipt   │    │
//! │   │ 2. resolve + validate every line (exists, active, coverable)  │    │
//! │   │ 3. price the sale (pure, bodega-core::pricing)                │    │
//! │   │ 4. INSERT sales (pending)                                     │    │
//! │   │ 5. INSERT sale_items (name/SKU snapshots)                     │    │
//! │   │ 6. deplete tracked lines through the ledger                   │    │
//! │   │      └─ FEFO batch allocation for expiration-tracked products │    │
//! │   │ 7. UPDATE sales → completed                                   │    │
//! │   └── COMMIT ─────────────────────────────────────────────────────┘    │
//! │   8. best-effort digital invoice (outside the transaction)             │
//! │                                                                         │
//! │  Any error in 1-7 rolls everything back: no sale row, no items, no     │
//! │  movements, no counter drift.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::batch::batch_snapshots_tx;
use crate::repository::invoice::invoice_url;
use crate::repository::ledger::{post_batch_movement_tx, post_movement_tx, NewStockMovement};
use crate::repository::product::fetch_product_tx;
use crate::repository::sale::{complete_sale_tx, fetch_sale_tx, insert_item_tx, insert_sale_tx};
use crate::repository::service::fetch_service_tx;
use bodega_core::{
    pricing, select_batches, validation, AllocationError, CoreError, LineTarget, MovementType,
    Product, Sale, SaleInput, SaleItem, SaleReceipt, SaleStatus, Service,
};

/// What a sale line resolved to during validation.
enum ResolvedLine {
    Product(Product),
    Service(Service),
}

/// Coordinates the atomic commit of sale transactions.
#[derive(Debug, Clone)]
pub struct SaleCoordinator {
    db: Database,
}

impl SaleCoordinator {
    /// Creates a coordinator over the given database.
    pub fn new(db: Database) -> Self {
        SaleCoordinator { db }
    }

    /// Commits a sale: validates, prices, persists and depletes in one
    /// transaction, then issues the invoice best-effort.
    ///
    /// Submitting the same `client_id` twice returns the first commit's
    /// receipt without a second sale or second depletion.
    pub async fn commit_sale(
        &self,
        store_id: &str,
        user_id: &str,
        input: &SaleInput,
    ) -> DbResult<SaleReceipt> {
        validation::validate_sale_input(input).map_err(CoreError::from)?;

        // The client-generated id is the idempotency key; walk-in
        // submissions without one get a fresh id.
        let sale_id = input
            .client_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut tx = self.db.pool().begin().await?;

        if let Some(existing) = fetch_sale_tx(&mut tx, &sale_id).await? {
            drop(tx);
            info!(sale_id = %sale_id, "Replay of committed sale, returning existing receipt");
            return self.receipt_for(existing).await;
        }

        // Resolve and validate every line before writing anything.
        let mut resolved = Vec::with_capacity(input.lines.len());
        for line in &input.lines {
            resolved.push(self.resolve_line(&mut tx, line).await?);
        }

        let totals = pricing::compute_totals(
            &input.lines,
            input.tax_cents,
            input.discount_cents,
            input.amount_paid_cents,
        )?;

        let now = Utc::now();
        let sale = Sale {
            id: sale_id.clone(),
            store_id: store_id.to_string(),
            user_id: user_id.to_string(),
            status: SaleStatus::Pending,
            payment_method: input.payment_method,
            subtotal_cents: totals.subtotal_cents,
            tax_cents: totals.tax_cents,
            discount_cents: totals.discount_cents,
            total_cents: totals.total_cents,
            amount_paid_cents: totals.amount_paid_cents,
            change_cents: totals.change_cents,
            customer_name: input.customer_name.clone(),
            customer_email: input.customer_email.clone(),
            customer_phone: input.customer_phone.clone(),
            notes: input.notes.clone(),
            created_at: now,
            completed_at: None,
        };
        insert_sale_tx(&mut tx, &sale).await?;

        for (line, target) in input.lines.iter().zip(&resolved) {
            let line_total = pricing::price_line(line)?;
            let (product_id, service_id, name, sku) = match target {
                ResolvedLine::Product(p) => {
                    (Some(p.id.clone()), None, p.name.clone(), p.sku.clone())
                }
                ResolvedLine::Service(s) => (None, Some(s.id.clone()), s.name.clone(), None),
            };

            insert_item_tx(
                &mut tx,
                &SaleItem {
                    id: Uuid::new_v4().to_string(),
                    sale_id: sale_id.clone(),
                    product_id,
                    service_id,
                    name_snapshot: name,
                    sku_snapshot: sku,
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price_cents,
                    discount_cents: line.discount_cents,
                    tax_rate_bps: line.tax_rate_bps,
                    tax_amount_cents: line.tax_amount_cents,
                    // Stored gross: subtotal − discount + line tax.
                    line_total_cents: line_total.cents() + line.tax_amount_cents,
                    created_at: now,
                },
            )
            .await?;

            if let ResolvedLine::Product(product) = target {
                if product.track_stock {
                    self.deplete_line(
                        &mut tx,
                        store_id,
                        user_id,
                        &sale_id,
                        product,
                        line.quantity,
                        input.allow_expired,
                    )
                    .await?;
                }
            }
        }

        complete_sale_tx(&mut tx, &sale_id, now).await?;
        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            total = totals.total_cents,
            lines = input.lines.len(),
            "Sale committed"
        );

        let sale = Sale {
            status: SaleStatus::Completed,
            completed_at: Some(now),
            ..sale
        };
        self.receipt_for(sale).await
    }

    /// Resolves a line to its catalog entry and rejects lines that cannot
    /// possibly commit (missing, inactive, uncoverable aggregate stock).
    async fn resolve_line(
        &self,
        conn: &mut SqliteConnection,
        line: &bodega_core::SaleLineInput,
    ) -> DbResult<ResolvedLine> {
        // validate_sale_input already guaranteed exactly one target
        let target = line
            .target()
            .ok_or_else(|| DbError::Internal("unvalidated sale line".to_string()))?;

        match target {
            LineTarget::Product(id) => {
                let product = fetch_product_tx(conn, &id)
                    .await?
                    .ok_or(CoreError::ProductNotFound(id.clone()))?;
                if !product.is_active {
                    return Err(CoreError::ProductInactive(product.name).into());
                }
                if !product.can_cover(line.quantity) {
                    return Err(CoreError::InsufficientStock {
                        name: product.name,
                        available: product.current_stock,
                        requested: line.quantity,
                    }
                    .into());
                }
                Ok(ResolvedLine::Product(product))
            }
            LineTarget::Service(id) => {
                let service = fetch_service_tx(conn, &id)
                    .await?
                    .ok_or(CoreError::ServiceNotFound(id.clone()))?;
                if !service.is_active {
                    return Err(CoreError::ServiceInactive(service.name).into());
                }
                Ok(ResolvedLine::Service(service))
            }
        }
    }

    /// Posts the depletion for one tracked product line: an aggregate sale
    /// movement, plus per-batch movements from the FEFO plan when the
    /// product holds expiration-dated lots.
    async fn deplete_line(
        &self,
        conn: &mut SqliteConnection,
        store_id: &str,
        user_id: &str,
        sale_id: &str,
        product: &Product,
        quantity: i64,
        allow_expired: bool,
    ) -> DbResult<()> {
        let movement_id = post_movement_tx(
            conn,
            &NewStockMovement {
                store_id: store_id.to_string(),
                product_id: product.id.clone(),
                movement_type: MovementType::Sale,
                quantity: -quantity,
                reason: None,
                sale_id: Some(sale_id.to_string()),
                user_id: Some(user_id.to_string()),
            },
        )
        .await
        .map_err(|e| match e {
            // Guard tripped: another transaction won the stock
            DbError::InsufficientStock { .. } => CoreError::InsufficientStock {
                name: product.name.clone(),
                available: product.current_stock,
                requested: quantity,
            }
            .into(),
            other => other,
        })?;

        if product.track_expiration_dates {
            let snapshots = batch_snapshots_tx(conn, &product.id).await?;
            let plan = select_batches(&snapshots, quantity, allow_expired, Utc::now())
                .map_err(|e| allocation_to_core(e, &product.name))?;

            for allocation in plan {
                post_batch_movement_tx(conn, &allocation.batch_id, &movement_id, -allocation.quantity)
                    .await?;
            }
        }

        Ok(())
    }

    /// Assembles the receipt for a committed sale, issuing the digital
    /// invoice best-effort: an invoice failure is logged, never propagated.
    async fn receipt_for(&self, sale: Sale) -> DbResult<SaleReceipt> {
        let items = self.db.sales().get_items(&sale.id).await?;

        let invoice_url = match self.db.invoices().issue_for_sale(&sale.id, &sale.store_id).await {
            Ok(invoice) => Some(invoice_url(&invoice.access_token)),
            Err(e) => {
                warn!(sale_id = %sale.id, error = %e, "Digital invoice issuance failed");
                None
            }
        };

        Ok(SaleReceipt {
            sale,
            items,
            invoice_url,
        })
    }
}

/// Maps an allocator shortfall to the domain error carrying the product name.
fn allocation_to_core(err: AllocationError, name: &str) -> DbError {
    match err {
        AllocationError::InsufficientStock {
            available,
            requested,
        } => CoreError::InsufficientStock {
            name: name.to_string(),
            available,
            requested,
        }
        .into(),
        AllocationError::InsufficientValidStock {
            available,
            requested,
            expired,
        } => CoreError::InsufficientValidStock {
            name: name.to_string(),
            available,
            requested,
            expired,
        }
        .into(),
    }
}

// =============================================================================
// Tests
// =============================================================================
