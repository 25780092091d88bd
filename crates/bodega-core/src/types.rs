//! # Domain Types
//!
//! Core domain types for the sale and inventory engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalog                Ledger                   Transaction            │
//! │  ┌──────────────┐      ┌───────────────────┐    ┌──────────────┐       │
//! │  │   Product    │      │  StockMovement    │    │     Sale     │       │
//! │  │   Service    │      │  BatchStockMvmt   │    │   SaleItem   │       │
//! │  │ ProductBatch │      │  (append-only)    │    │ DigitalInv.  │       │
//! │  └──────────────┘      └───────────────────┘    └──────────────┘       │
//! │                                                                         │
//! │  Input (wire)                         Offline                           │
//! │  ┌──────────────────────┐            ┌────────────────┐                │
//! │  │ SaleInput            │            │ QueueOperation │                │
//! │  │ SaleLineInput        │            └────────────────┘                │
//! │  └──────────────────────┘                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Derived vs. authoritative stock
//! `Product.current_stock` and `ProductBatch.current_quantity` are cached
//! aggregates. The movement tables are the authoritative history; counters
//! are only ever updated by the ledger store with relative deltas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01% = 1/10000, so 825 bps = 8.25%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A physical product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Store this product belongs to.
    pub store_id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: Option<String>,

    /// Barcode (EAN-13, UPC-A, etc.).
    pub barcode: Option<String>,

    /// Display name shown to cashier and on receipts.
    pub name: String,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Cost in cents (for margin reporting).
    pub cost_cents: Option<i64>,

    /// Tax rate in basis points (825 = 8.25%).
    pub tax_rate_bps: i64,

    /// Whether inventory depletion applies to this product.
    pub track_stock: bool,

    /// Whether stock is held in expiration-dated batches (FEFO applies).
    pub track_expiration_dates: bool,

    /// Cached aggregate stock level. Authoritative history lives in
    /// `stock_movements`; this field only moves by ledger deltas.
    pub current_stock: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the tax rate.
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps as u32)
    }

    /// Checks whether aggregate stock can cover a quantity.
    /// Untracked products always pass.
    pub fn can_cover(&self, quantity: i64) -> bool {
        !self.track_stock || self.current_stock >= quantity
    }
}

// =============================================================================
// Product Batch
// =============================================================================

/// A received lot of a product, carrying its own quantity and expiration.
///
/// `current_quantity == initial_quantity + Σ batch_stock_movements.quantity`
/// holds at all times; the batch counter only moves through the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ProductBatch {
    pub id: String,
    pub product_id: String,

    /// Supplier lot / batch number, if known.
    pub batch_number: Option<String>,

    /// Units received when the batch was created. Never changes.
    pub initial_quantity: i64,

    /// Units remaining. Cached aggregate, moved only by batch movements.
    pub current_quantity: i64,

    /// When this lot expires. `None` means the lot never expires.
    pub expiration_date: Option<DateTime<Utc>>,

    /// Acquisition cost per unit in cents.
    pub cost_cents: Option<i64>,

    pub created_at: DateTime<Utc>,
}

impl ProductBatch {
    /// Whether the batch is expired as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expiration_date, Some(exp) if exp < now)
    }
}

// =============================================================================
// Service
// =============================================================================

/// A sellable service. Services never touch inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub store_id: String,
    pub name: String,
    pub price_cents: i64,
    pub tax_rate_bps: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Stock Movements (the ledger)
// =============================================================================

/// Why a stock movement happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    /// Stock received from a supplier (positive).
    Purchase,
    /// Depletion by a completed sale (negative).
    Sale,
    /// Manual correction, either sign.
    Adjustment,
    /// Customer return back into stock (positive).
    Return,
    /// Write-off of damaged or expired units (negative).
    Damage,
}

/// An immutable entry in the product stock ledger.
///
/// Rows are append-only: corrections are posted as new movements with the
/// opposite sign, never by editing history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: String,
    pub store_id: String,
    pub product_id: String,
    pub movement_type: MovementType,

    /// Signed quantity: positive adds stock, negative depletes.
    pub quantity: i64,

    /// Free-text reason for manual movements.
    pub reason: Option<String>,

    /// Originating sale, when `movement_type` is `Sale`.
    pub sale_id: Option<String>,

    /// Acting user, when known.
    pub user_id: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// A per-batch companion to a [`StockMovement`], recording which lot the
/// units came from or went into.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct BatchStockMovement {
    pub id: String,
    pub batch_id: String,
    pub stock_movement_id: String,

    /// Signed quantity against the batch counter.
    pub quantity: i64,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale Status / Payment Method
// =============================================================================

/// Lifecycle state of a sale.
///
/// A sale is only ever observed as `Completed` by readers: `Pending` exists
/// inside the commit transaction and is flipped before commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Pending,
    Completed,
    Cancelled,
}

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Qr,
}

// =============================================================================
// Sale & Sale Item
// =============================================================================

/// A sale transaction header.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub store_id: String,

    /// Cashier who committed the sale.
    pub user_id: String,

    pub status: SaleStatus,
    pub payment_method: PaymentMethod,

    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    pub change_cents: i64,

    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Sale {
    /// Returns the grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item in a sale.
///
/// Exactly one of `product_id` / `service_id` is set. Name and SKU are
/// snapshots frozen at the time of sale so later catalog edits don't
/// rewrite receipts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: Option<String>,
    pub service_id: Option<String>,

    /// Name at time of sale (frozen).
    pub name_snapshot: String,
    /// SKU at time of sale (frozen, products only).
    pub sku_snapshot: Option<String>,

    pub quantity: i64,
    pub unit_price_cents: i64,
    pub discount_cents: i64,
    pub tax_rate_bps: i64,
    pub tax_amount_cents: i64,

    /// quantity × unit price − line discount + line tax.
    pub line_total_cents: i64,

    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Digital Invoice
// =============================================================================

/// A shareable digital receipt for a completed sale. One per sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct DigitalInvoice {
    pub id: String,
    pub sale_id: String,
    pub store_id: String,

    /// Public token embedded in the shareable URL.
    pub access_token: String,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale Input (the wire contract)
// =============================================================================

/// What a line is selling. Derived from the optional id pair on
/// [`SaleLineInput`] after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineTarget {
    Product(String),
    Service(String),
}

/// One submitted line of a sale.
///
/// Exactly one of `product_id` / `service_id` must be present; validation
/// rejects lines with zero or both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineInput {
    pub product_id: Option<String>,
    pub service_id: Option<String>,

    pub quantity: i64,

    /// Unit price in cents as shown to the customer.
    #[serde(rename = "unitPrice")]
    pub unit_price_cents: i64,

    /// Line-level discount in cents.
    #[serde(rename = "discount", default)]
    pub discount_cents: i64,

    /// Tax rate applied to this line, in basis points.
    #[serde(rename = "taxRate", default)]
    pub tax_rate_bps: i64,

    /// Pre-computed tax amount for this line, in cents.
    #[serde(rename = "taxAmount", default)]
    pub tax_amount_cents: i64,
}

impl SaleLineInput {
    /// Resolves the target, if the line is well-formed.
    pub fn target(&self) -> Option<LineTarget> {
        match (&self.product_id, &self.service_id) {
            (Some(p), None) => Some(LineTarget::Product(p.clone())),
            (None, Some(s)) => Some(LineTarget::Service(s.clone())),
            _ => None,
        }
    }
}

/// A complete submitted sale, as received on the wire or replayed from the
/// offline queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleInput {
    /// Client-generated sale id, used as the idempotency key on replay.
    /// When absent the coordinator mints one.
    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(rename = "items")]
    pub lines: Vec<SaleLineInput>,

    pub payment_method: PaymentMethod,

    /// Sale-level tax in cents.
    #[serde(rename = "tax", default)]
    pub tax_cents: i64,

    /// Sale-level discount in cents.
    #[serde(rename = "discount", default)]
    pub discount_cents: i64,

    /// Cash tendered in cents. Defaults to the sale total.
    #[serde(rename = "amountPaid", default)]
    pub amount_paid_cents: Option<i64>,

    #[serde(default)]
    pub customer_name: Option<String>,

    #[serde(default)]
    pub customer_email: Option<String>,

    #[serde(default)]
    pub customer_phone: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,

    /// Operator confirmation to deplete expired batches when valid stock
    /// alone cannot cover the sale.
    #[serde(default)]
    pub allow_expired: bool,
}

// =============================================================================
// Sale Receipt
// =============================================================================

/// What the coordinator hands back after a successful commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceipt {
    pub sale: Sale,
    pub items: Vec<SaleItem>,

    /// Shareable invoice URL; `None` when post-commit issuance failed.
    pub invoice_url: Option<String>,
}

// =============================================================================
// Offline Queue
// =============================================================================

/// Lifecycle state of a queued offline operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    /// Waiting for replay.
    Pending,
    /// Currently being replayed.
    Syncing,
    /// Rejected or exhausted; kept for operator review.
    Failed,
}

/// A durably queued sale awaiting replay against the coordinator.
///
/// The operation id doubles as the sale's `client_id`, which is what makes
/// replay idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct QueueOperation {
    pub id: String,
    pub store_id: String,
    pub user_id: String,

    /// Serialized [`SaleInput`] JSON.
    pub payload: String,

    pub status: QueueStatus,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn line(product: Option<&str>, service: Option<&str>) -> SaleLineInput {
        SaleLineInput {
            product_id: product.map(String::from),
            service_id: service.map(String::from),
            quantity: 1,
            unit_price_cents: 100,
            discount_cents: 0,
            tax_rate_bps: 0,
            tax_amount_cents: 0,
        }
    }

    #[test]
    fn test_line_target_resolution() {
        assert_eq!(
            line(Some("p1"), None).target(),
            Some(LineTarget::Product("p1".to_string()))
        );
        assert_eq!(
            line(None, Some("s1")).target(),
            Some(LineTarget::Service("s1".to_string()))
        );
        assert_eq!(line(None, None).target(), None);
        assert_eq!(line(Some("p1"), Some("s1")).target(), None);
    }

    #[test]
    fn test_batch_expiry() {
        let now = Utc::now();
        let batch = ProductBatch {
            id: "b1".to_string(),
            product_id: "p1".to_string(),
            batch_number: None,
            initial_quantity: 10,
            current_quantity: 10,
            expiration_date: Some(now - Duration::days(1)),
            cost_cents: None,
            created_at: now - Duration::days(30),
        };
        assert!(batch.is_expired(now));

        let fresh = ProductBatch {
            expiration_date: Some(now + Duration::days(5)),
            ..batch.clone()
        };
        assert!(!fresh.is_expired(now));

        let undated = ProductBatch {
            expiration_date: None,
            ..batch
        };
        assert!(!undated.is_expired(now));
    }

    #[test]
    fn test_payment_method_wire_format() {
        let json = serde_json::to_string(&PaymentMethod::Qr).unwrap();
        assert_eq!(json, "\"QR\"");
        let back: PaymentMethod = serde_json::from_str("\"CASH\"").unwrap();
        assert_eq!(back, PaymentMethod::Cash);
    }

    #[test]
    fn test_sale_input_wire_names() {
        let json = r#"{
            "items": [{"productId": "p1", "quantity": 2, "unitPrice": 500}],
            "paymentMethod": "CASH",
            "tax": 80,
            "discount": 0,
            "amountPaid": 1100,
            "customerName": "Ana",
            "customerEmail": "ana@example.com",
            "customerPhone": "+1-555-0101"
        }"#;
        let input: SaleInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.lines.len(), 1);
        assert_eq!(input.lines[0].unit_price_cents, 500);
        assert_eq!(input.tax_cents, 80);
        assert_eq!(input.amount_paid_cents, Some(1100));
        assert_eq!(input.customer_name.as_deref(), Some("Ana"));
        assert_eq!(input.customer_email.as_deref(), Some("ana@example.com"));
        assert_eq!(input.customer_phone.as_deref(), Some("+1-555-0101"));
        assert!(!input.allow_expired);
        assert!(input.client_id.is_none());
    }
}
