//! # bodega-sync: Offline Queue Reconciler
//!
//! Keeps sales flowing when the backend is unreachable and replays them
//! exactly once when it comes back.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         bodega-sync                                     │
//! │                                                                         │
//! │   Terminal (offline)                                                    │
//! │        │ queue_sale                                                     │
//! │        ▼                                                                │
//! │   queue_operations (durable, bodega-db)        ProductCache            │
//! │        │                                        (optimistic figures)    │
//! │        │ replay_pending (oldest first)               ▲                  │
//! │        ▼                                             │ reconcile        │
//! │   SaleBackend ───────────────────────────────────────┘                  │
//! │     ├── CoordinatorBackend (in-process)                                │
//! │     └── remote backends implement the same trait                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The queued operation id doubles as the sale's client id, so replay after
//! a crash is caught by the backend's idempotency gate instead of producing
//! a duplicate sale.

pub mod backend;
pub mod cache;
pub mod error;
pub mod reconciler;

pub use backend::{CoordinatorBackend, SaleBackend, SubmitError};
pub use cache::ProductCache;
pub use error::{SyncError, SyncResult};
pub use reconciler::{Reconciler, ReconcilerHandle, ReplayReport};
