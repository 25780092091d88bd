//! # bodega-core: Pure Business Logic for the Bodega Engine
//!
//! This crate is the **heart** of the sale and inventory engine. It contains
//! all business rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bodega Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                apps/server (axum HTTP API)                      │   │
//! │  │         POST /api/stores/{id}/sales, GET .../sales              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          bodega-db (coordinator, ledger, repositories)          │   │
//! │  │          bodega-sync (offline queue reconciler)                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bodega-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   fefo    │  │  pricing  │  │   │
//! │  │   │  Product  │  │   Money   │  │ allocator │  │  totals   │  │   │
//! │  │   │   Sale    │  │  TaxCalc  │  │           │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, ProductBatch, Sale, StockMovement...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Sale total computation
//! - [`fefo`] - First-Expired-First-Out batch allocation
//! - [`error`] - Domain error types
//! - [`validation`] - Structural validation of submitted sales
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod fefo;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use bodega_core::Money` instead of
// `use bodega_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use fefo::{select_batches, AllocationError, BatchAllocation, BatchSnapshot};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single sale.
///
/// Prevents runaway submissions and keeps the commit transaction bounded.
pub const MAX_SALE_LINES: usize = 100;

/// Maximum quantity of a single item in a sale.
///
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum value for any single money field on the wire, in cents.
///
/// Anything above this ($10 billion) is a malformed submission. The bound
/// also keeps line and sale arithmetic inside the i64 range.
pub const MAX_MONEY_CENTS: i64 = 1_000_000_000_000;
