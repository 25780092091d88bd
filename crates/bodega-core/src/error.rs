//! # Error Types
//!
//! Domain-specific error types for bodega-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  bodega-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  bodega-core::fefo                                                     │
//! │  └── AllocationError  - Batch allocation shortfalls                    │
//! │                                                                         │
//! │  bodega-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Server API errors (in app)                                            │
//! │  └── ApiError         - What HTTP clients see (serialized)             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product name, quantities)
//! 3. Errors are enum variants with structured fields, never strings
//!    callers have to pattern-match on

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. Callers match on the
/// variant, never on the rendered message.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product ID doesn't exist or was soft-deleted.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Service ID doesn't exist or was soft-deleted.
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// Product exists but is deactivated and cannot be sold.
    #[error("Product is not active: {0}")]
    ProductInactive(String),

    /// Service exists but is deactivated and cannot be sold.
    #[error("Service is not active: {0}")]
    ServiceInactive(String),

    /// Aggregate stock cannot cover the requested quantity.
    ///
    /// ## When This Occurs
    /// - A tracked product has fewer units than the sale line asks for
    /// - Two concurrent sales raced and this one lost the guard check
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Non-expired stock cannot cover the request, but expired stock could.
    ///
    /// Distinct from [`CoreError::InsufficientStock`] so callers can offer
    /// the sell-expired confirmation flow instead of a flat rejection.
    #[error(
        "Insufficient valid (non-expired) stock for {name}: \
         available {available}, requested {requested}, expired on hand {expired}"
    )]
    InsufficientValidStock {
        name: String,
        available: i64,
        requested: i64,
        expired: i64,
    },

    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Sale is not in a state that allows the requested operation.
    #[error("Sale {sale_id} is {current_status}, cannot perform operation")]
    InvalidSaleStatus {
        sale_id: String,
        current_status: String,
    },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Payment amount is invalid (e.g. amount paid below the sale total).
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when a submitted sale doesn't meet structural requirements.
/// Used for early validation before any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A sale must contain at least one line.
    #[error("sale must contain at least one item")]
    EmptySale,

    /// Too many lines in one sale.
    #[error("sale cannot have more than {max} items")]
    TooManyLines { max: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
