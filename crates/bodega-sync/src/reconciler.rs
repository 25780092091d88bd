//! # Offline Queue Reconciler
//!
//! Drains the durable offline queue against a [`SaleBackend`], exactly once
//! per sale.
//!
//! ## Replay Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Replay Flow                                       │
//! │                                                                         │
//! │  next_pending (oldest first, one at a time)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  mark syncing (attempts += 1)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  find_committed(op.id)? ──── already committed ──► remove + reconcile  │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  submit_sale(payload)                                                  │
//! │       ├── Ok          ──► remove + reconcile cache                     │
//! │       ├── Rejected    ──► mark failed (operator review), next entry    │
//! │       └── Unavailable ──► back to pending (or failed after             │
//! │                           MAX_REPLAY_ATTEMPTS), stop until next poll   │
//! │                                                                         │
//! │  The operation id IS the sale's client id, so a crash between          │
//! │  submit and remove is caught by the duplicate check next round.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use bodega_core::{QueueOperation, SaleInput};
use bodega_db::repository::queue::QueueRepository;

use crate::backend::{SaleBackend, SubmitError};
use crate::cache::ProductCache;
use crate::error::{SyncError, SyncResult};

// =============================================================================
// Constants
// =============================================================================

/// Transient failures tolerated before an entry is parked as failed.
const MAX_REPLAY_ATTEMPTS: i64 = 5;

// =============================================================================
// Replay outcome
// =============================================================================

/// What one `replay_pending` round accomplished.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayReport {
    /// Sales committed (or found already committed) and removed.
    pub replayed: usize,
    /// Entries parked as failed this round.
    pub failed: usize,
    /// Whether the round stopped early because the backend was unreachable.
    pub backend_unavailable: bool,
}

// =============================================================================
// Reconciler
// =============================================================================

/// Replays queued offline sales against the backend.
pub struct Reconciler<B: SaleBackend> {
    queue: QueueRepository,
    backend: B,
    cache: ProductCache,
    store_id: String,
    user_id: String,
    poll_interval: Duration,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for controlling a running reconciler.
#[derive(Clone)]
pub struct ReconcilerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl ReconcilerHandle {
    /// Triggers graceful shutdown. The reconciler finishes the operation in
    /// flight before stopping.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::Channel("Shutdown channel closed".into()))
    }
}

impl<B: SaleBackend> Reconciler<B> {
    /// Creates a reconciler and its control handle.
    pub fn new(
        queue: QueueRepository,
        backend: B,
        cache: ProductCache,
        store_id: impl Into<String>,
        user_id: impl Into<String>,
        poll_interval: Duration,
    ) -> (Self, ReconcilerHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let reconciler = Reconciler {
            queue,
            backend,
            cache,
            store_id: store_id.into(),
            user_id: user_id.into(),
            poll_interval,
            shutdown_rx,
        };

        (reconciler, ReconcilerHandle { shutdown_tx })
    }

    /// Returns the cache shared with this reconciler.
    pub fn cache(&self) -> ProductCache {
        self.cache.clone()
    }

    /// Queues a sale for later replay.
    ///
    /// The freshly minted operation id is stamped into the payload as
    /// `client_id`, making the eventual replay idempotent, and the local
    /// cache is decremented optimistically.
    pub async fn queue_sale(&self, mut input: SaleInput) -> SyncResult<QueueOperation> {
        let op_id = Uuid::new_v4().to_string();
        input.client_id = Some(op_id.clone());

        let payload = serde_json::to_string(&input)?;
        let op = self
            .queue
            .enqueue(&op_id, &self.store_id, &self.user_id, &payload)
            .await?;

        self.cache.apply_sale(&input).await;

        info!(op_id = %op.id, "Sale queued for offline replay");
        Ok(op)
    }

    /// Replays pending operations strictly oldest-first, one at a time.
    ///
    /// Stops early when the backend is unreachable; later entries wait for
    /// the next poll so ordering is preserved.
    pub async fn replay_pending(&self) -> SyncResult<ReplayReport> {
        let mut report = ReplayReport::default();

        while let Some(op) = self.queue.next_pending().await? {
            self.queue.mark_syncing(&op.id).await?;

            let input: SaleInput = match serde_json::from_str(&op.payload) {
                Ok(input) => input,
                Err(e) => {
                    error!(op_id = %op.id, error = %e, "Corrupt queue payload");
                    self.queue
                        .mark_failed(&op.id, &format!("corrupt payload: {e}"))
                        .await?;
                    report.failed += 1;
                    continue;
                }
            };

            match self.replay_one(&op, &input).await {
                Ok(()) => {
                    self.queue.remove(&op.id).await?;
                    self.reconcile_lines(&input).await;
                    report.replayed += 1;
                }
                Err(SubmitError::Rejected(reason)) => {
                    warn!(op_id = %op.id, %reason, "Sale rejected by backend, parking for review");
                    self.queue.mark_failed(&op.id, &reason).await?;
                    report.failed += 1;
                }
                Err(SubmitError::Unavailable(reason)) => {
                    // attempts was already bumped by mark_syncing
                    if op.attempts + 1 >= MAX_REPLAY_ATTEMPTS {
                        warn!(
                            op_id = %op.id,
                            attempts = op.attempts + 1,
                            "Replay attempts exhausted, parking as failed"
                        );
                        self.queue.mark_failed(&op.id, &reason).await?;
                        report.failed += 1;
                    } else {
                        debug!(op_id = %op.id, %reason, "Backend unavailable, returning to queue");
                        self.queue.return_to_pending(&op.id, &reason).await?;
                    }
                    report.backend_unavailable = true;
                    break;
                }
            }
        }

        Ok(report)
    }

    /// Replays a single operation: duplicate check first, then submit.
    async fn replay_one(&self, op: &QueueOperation, input: &SaleInput) -> Result<(), SubmitError> {
        if let Some(receipt) = self.backend.find_committed(&op.id).await? {
            info!(op_id = %op.id, sale_id = %receipt.sale.id, "Sale already committed, dropping duplicate");
            return Ok(());
        }

        let receipt = self
            .backend
            .submit_sale(&op.store_id, &op.user_id, input)
            .await?;
        info!(op_id = %op.id, sale_id = %receipt.sale.id, "Queued sale committed");
        Ok(())
    }

    /// Replaces cached figures for every product the sale touched with the
    /// backend's authoritative numbers.
    async fn reconcile_lines(&self, input: &SaleInput) {
        for line in &input.lines {
            let Some(product_id) = &line.product_id else {
                continue;
            };
            match self.backend.product_stock(product_id).await {
                Ok(Some(stock)) => self.cache.reconcile(product_id, stock).await,
                Ok(None) => {}
                Err(e) => warn!(product_id, error = %e, "Stock reconcile lookup failed"),
            }
        }
    }

    /// Runs the background replay loop.
    ///
    /// This should be spawned as a background task. Polls on an interval
    /// and shuts down between operations when the handle asks.
    pub async fn run(mut self) {
        info!("Reconciler starting");

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.replay_pending().await {
                        Ok(report) if report.replayed > 0 || report.failed > 0 => {
                            info!(
                                replayed = report.replayed,
                                failed = report.failed,
                                "Replay round finished"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "Replay round failed"),
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Reconciler shutting down");
                    break;
                }
            }
        }

        info!("Reconciler stopped");
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CoordinatorBackend;
    use async_trait::async_trait;
    use bodega_core::{
        MovementType, PaymentMethod, Product, SaleLineInput, SaleReceipt,
    };
    use bodega_db::repository::ledger::NewStockMovement;
    use bodega_db::{Database, DbConfig};
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    const STORE: &str = "store-1";
    const USER: &str = "user-1";

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(db: &Database, id: &str, stock: i64) {
        let now = Utc::now();
        db.products()
            .insert(&Product {
                id: id.to_string(),
                store_id: STORE.to_string(),
                sku: None,
                barcode: None,
                name: format!("Product {id}"),
                price_cents: 500,
                cost_cents: None,
                tax_rate_bps: 0,
                track_stock: true,
                track_expiration_dates: false,
                current_stock: 0,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        db.ledger()
            .post_movement(NewStockMovement {
                store_id: STORE.to_string(),
                product_id: id.to_string(),
                movement_type: MovementType::Purchase,
                quantity: stock,
                reason: None,
                sale_id: None,
                user_id: None,
            })
            .await
            .unwrap();
    }

    fn sale_of(product_id: &str, qty: i64) -> SaleInput {
        SaleInput {
            client_id: None,
            lines: vec![SaleLineInput {
                product_id: Some(product_id.to_string()),
                service_id: None,
                quantity: qty,
                unit_price_cents: 500,
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

    fn reconciler_over(db: &Database) -> Reconciler<CoordinatorBackend> {
        let (reconciler, _handle) = Reconciler::new(
            db.queue(),
            CoordinatorBackend::new(db.clone()),
            ProductCache::new(),
            STORE,
            USER,
            Duration::from_secs(5),
        );
        reconciler
    }

    #[tokio::test]
    async fn test_queue_then_replay_commits_in_order() {
        let db = test_db().await;
        seed_product(&db, "p1", 10).await;

        let reconciler = reconciler_over(&db);
        reconciler.cache().prime("p1", 10).await;

        reconciler.queue_sale(sale_of("p1", 3)).await.unwrap();
        reconciler.queue_sale(sale_of("p1", 2)).await.unwrap();

        // Optimistic cache moved, database untouched while offline.
        assert_eq!(reconciler.cache().get("p1").await, Some(5));
        assert_eq!(db.products().current_stock("p1").await.unwrap(), 10);
        assert_eq!(db.queue().count_pending().await.unwrap(), 2);

        let report = reconciler.replay_pending().await.unwrap();
        assert_eq!(report.replayed, 2);
        assert_eq!(report.failed, 0);

        assert_eq!(db.products().current_stock("p1").await.unwrap(), 5);
        assert_eq!(db.queue().count_pending().await.unwrap(), 0);
        assert_eq!(db.sales().list(STORE, None, 10).await.unwrap().len(), 2);
        // Cache reconciled to the authoritative figure, not double-decremented.
        assert_eq!(reconciler.cache().get("p1").await, Some(5));
    }

    #[tokio::test]
    async fn test_rejected_sale_parked_as_failed() {
        let db = test_db().await;
        seed_product(&db, "p1", 2).await;

        let reconciler = reconciler_over(&db);
        reconciler.queue_sale(sale_of("p1", 5)).await.unwrap();

        let report = reconciler.replay_pending().await.unwrap();
        assert_eq!(report.replayed, 0);
        assert_eq!(report.failed, 1);

        // Entry is kept for operator review, stock untouched.
        let failed = db
            .queue()
            .list_by_status(bodega_core::QueueStatus::Failed)
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].last_error.as_deref().unwrap().contains("Insufficient stock"));
        assert_eq!(db.products().current_stock("p1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rejection_does_not_block_later_entries() {
        let db = test_db().await;
        seed_product(&db, "p1", 4).await;

        let reconciler = reconciler_over(&db);
        reconciler.queue_sale(sale_of("p1", 10)).await.unwrap(); // will be rejected
        reconciler.queue_sale(sale_of("p1", 3)).await.unwrap(); // should still land

        let report = reconciler.replay_pending().await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.replayed, 1);
        assert_eq!(db.products().current_stock("p1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_crash_between_commit_and_remove_is_idempotent() {
        let db = test_db().await;
        seed_product(&db, "p1", 10).await;

        let reconciler = reconciler_over(&db);
        let op = reconciler.queue_sale(sale_of("p1", 3)).await.unwrap();

        // Simulate the previous run committing the sale and crashing before
        // it could remove the queue entry.
        let input: SaleInput = serde_json::from_str(&op.payload).unwrap();
        db.coordinator().commit_sale(STORE, USER, &input).await.unwrap();
        assert_eq!(db.products().current_stock("p1").await.unwrap(), 7);

        let report = reconciler.replay_pending().await.unwrap();
        assert_eq!(report.replayed, 1);

        // The duplicate check caught it: exactly one sale, one depletion.
        assert_eq!(db.products().current_stock("p1").await.unwrap(), 7);
        assert_eq!(db.sales().list(STORE, None, 10).await.unwrap().len(), 1);
        assert_eq!(db.queue().count_pending().await.unwrap(), 0);
    }

    // A backend that can be switched off to simulate connectivity loss.
    struct FlakyBackend {
        inner: CoordinatorBackend,
        down: Arc<AtomicBool>,
    }

    #[async_trait]
    impl SaleBackend for FlakyBackend {
        async fn submit_sale(
            &self,
            store_id: &str,
            user_id: &str,
            input: &SaleInput,
        ) -> Result<SaleReceipt, SubmitError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(SubmitError::Unavailable("link down".into()));
            }
            self.inner.submit_sale(store_id, user_id, input).await
        }

        async fn find_committed(
            &self,
            sale_id: &str,
        ) -> Result<Option<SaleReceipt>, SubmitError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(SubmitError::Unavailable("link down".into()));
            }
            self.inner.find_committed(sale_id).await
        }

        async fn product_stock(&self, product_id: &str) -> Result<Option<i64>, SubmitError> {
            self.inner.product_stock(product_id).await
        }
    }

    #[tokio::test]
    async fn test_unavailable_backend_stops_round_and_requeues() {
        let db = test_db().await;
        seed_product(&db, "p1", 10).await;

        let down = Arc::new(AtomicBool::new(true));
        let (reconciler, _handle) = Reconciler::new(
            db.queue(),
            FlakyBackend {
                inner: CoordinatorBackend::new(db.clone()),
                down: down.clone(),
            },
            ProductCache::new(),
            STORE,
            USER,
            Duration::from_secs(5),
        );

        reconciler.queue_sale(sale_of("p1", 3)).await.unwrap();
        reconciler.queue_sale(sale_of("p1", 2)).await.unwrap();

        let report = reconciler.replay_pending().await.unwrap();
        assert!(report.backend_unavailable);
        assert_eq!(report.replayed, 0);
        // Both entries still pending, ordering preserved.
        assert_eq!(db.queue().count_pending().await.unwrap(), 2);

        // Link restored: the next round drains everything.
        down.store(false, Ordering::SeqCst);
        let report = reconciler.replay_pending().await.unwrap();
        assert_eq!(report.replayed, 2);
        assert_eq!(db.products().current_stock("p1").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_attempts_exhausted_parks_entry() {
        let db = test_db().await;
        seed_product(&db, "p1", 10).await;

        let down = Arc::new(AtomicBool::new(true));
        let (reconciler, _handle) = Reconciler::new(
            db.queue(),
            FlakyBackend {
                inner: CoordinatorBackend::new(db.clone()),
                down,
            },
            ProductCache::new(),
            STORE,
            USER,
            Duration::from_secs(5),
        );

        reconciler.queue_sale(sale_of("p1", 3)).await.unwrap();

        for _ in 0..MAX_REPLAY_ATTEMPTS {
            reconciler.replay_pending().await.unwrap();
        }

        let failed = db
            .queue()
            .list_by_status(bodega_core::QueueStatus::Failed)
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].attempts, MAX_REPLAY_ATTEMPTS);
        assert_eq!(db.queue().count_pending().await.unwrap(), 0);
    }
}
