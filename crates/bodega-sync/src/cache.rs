//! # Optimistic Product Stock Cache
//!
//! Local read-through projection of product stock for terminals working
//! offline. Queuing a sale decrements the cached figure immediately so the
//! cashier sees stock fall; replay later **replaces** the figure with the
//! backend's authoritative number instead of applying a second decrement,
//! so the optimistic delta never stacks on top of the real one.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use bodega_core::SaleInput;

/// Shared cache of product stock figures.
#[derive(Debug, Clone, Default)]
pub struct ProductCache {
    stocks: Arc<RwLock<HashMap<String, i64>>>,
}

impl ProductCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds or refreshes a product's cached stock.
    pub async fn prime(&self, product_id: &str, stock: i64) {
        self.stocks.write().await.insert(product_id.to_string(), stock);
    }

    /// Returns the cached stock for a product, if known.
    pub async fn get(&self, product_id: &str) -> Option<i64> {
        self.stocks.read().await.get(product_id).copied()
    }

    /// Optimistically applies a queued sale: each known product line's
    /// cached figure drops by the line quantity. Unknown products are left
    /// alone rather than invented.
    pub async fn apply_sale(&self, input: &SaleInput) {
        let mut stocks = self.stocks.write().await;
        for line in &input.lines {
            if let Some(product_id) = &line.product_id {
                if let Some(stock) = stocks.get_mut(product_id) {
                    *stock -= line.quantity;
                    debug!(product_id, stock = *stock, "Optimistic stock decrement");
                }
            }
        }
    }

    /// Replaces a product's figure with the backend's authoritative value.
    pub async fn reconcile(&self, product_id: &str, authoritative: i64) {
        debug!(product_id, authoritative, "Reconciling cached stock");
        self.stocks
            .write()
            .await
            .insert(product_id.to_string(), authoritative);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bodega_core::{PaymentMethod, SaleLineInput};

    fn sale_of(product_id: &str, qty: i64) -> SaleInput {
        SaleInput {
            client_id: None,
            lines: vec![SaleLineInput {
                product_id: Some(product_id.to_string()),
                service_id: None,
                quantity: qty,
                unit_price_cents: 100,
                discount_cents: 0,
                tax_rate_bps: 0,
                tax_amount_cents: 0,
            }],
            payment_method: PaymentMethod::Cash,
            tax_cents: 0,
            discount_cents: 0,
            amount_paid_cents: None,
            customer_name: None,
            customer_email: None,
            customer_phone: None,
            notes: None,
            allow_expired: false,
        }
    }

    #[tokio::test]
    async fn test_optimistic_decrement() {
        let cache = ProductCache::new();
        cache.prime("p1", 10).await;

        cache.apply_sale(&sale_of("p1", 3)).await;
        assert_eq!(cache.get("p1").await, Some(7));

        cache.apply_sale(&sale_of("p1", 2)).await;
        assert_eq!(cache.get("p1").await, Some(5));
    }

    #[tokio::test]
    async fn test_reconcile_replaces_instead_of_stacking() {
        let cache = ProductCache::new();
        cache.prime("p1", 10).await;

        // Queued offline: optimistic figure drops to 7.
        cache.apply_sale(&sale_of("p1", 3)).await;
        assert_eq!(cache.get("p1").await, Some(7));

        // Replay succeeds; the backend says 7. Replacing lands on 7, not 4.
        cache.reconcile("p1", 7).await;
        assert_eq!(cache.get("p1").await, Some(7));
    }

    #[tokio::test]
    async fn test_unknown_product_untouched() {
        let cache = ProductCache::new();
        cache.apply_sale(&sale_of("ghost", 3)).await;
        assert_eq!(cache.get("ghost").await, None);
    }
}
