//! # bodega-db: Database Layer for the Bodega Engine
//!
//! Owns all SQLite access: the connection pool, embedded migrations, the
//! repositories, the append-only stock ledger, and the sale transaction
//! coordinator.
//!
//! ## Module Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           bodega-db                                     │
//! │                                                                         │
//! │  pool        DbConfig, Database (WAL pool + repo accessors)            │
//! │  migrations  embedded sqlx migrations                                  │
//! │  checkout    SaleCoordinator (the ONLY place transactions open)        │
//! │  repository/                                                           │
//! │    ├── product    catalog reads/writes (stock is read-only here)       │
//! │    ├── service    service catalog                                      │
//! │    ├── batch      lots, receiving, adjustments, reconciliation         │
//! │    ├── ledger     movement postings + guarded counter deltas           │
//! │    ├── sale       sale reads + transactional writes                    │
//! │    ├── invoice    digital invoices (one per sale)                      │
//! │    └── queue      offline operation queue                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let db = Database::new(DbConfig::new("./bodega.db")).await?;
//! let receipt = db.coordinator().commit_sale(store_id, user_id, &input).await?;
//! ```

pub mod checkout;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use checkout::SaleCoordinator;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
