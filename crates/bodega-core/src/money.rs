//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every price, discount, tax and total is an i64 count of the          │
//! │    smallest currency unit. The database, calculations and API all       │
//! │    speak cents; only the UI formats for display.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for change and refunds
/// - **Single field tuple struct**: Zero-cost abstraction over i64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Calculates tax on this amount, rounding half up.
    ///
    /// ## Implementation
    /// Integer math in i128 to prevent overflow on large amounts:
    /// `(amount_cents * bps + 5000) / 10000`
    ///
    /// ## Example
    /// ```rust
    /// use bodega_core::money::Money;
    /// use bodega_core::types::TaxRate;
    ///
    /// let price = Money::from_cents(1000); // $10.00
    /// let rate = TaxRate::from_bps(825);   // 8.25%
    /// assert_eq!(price.calculate_tax(rate).cents(), 83);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies money by a quantity (line total = unit price × qty).
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Overflow-checked line multiplication. `None` when the product leaves
    /// the i64 range.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Overflow-checked addition.
    #[inline]
    pub const fn checked_add(&self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Overflow-checked subtraction.
    #[inline]
    pub const fn checked_sub(&self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation for debugging and log output.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
    }

    #[test]
    fn test_tax_calculation_basic() {
        // $10.00 at 10% = $1.00
        let amount = Money::from_cents(1000);
        let tax = amount.calculate_tax(TaxRate::from_bps(1000));
        assert_eq!(tax.cents(), 100);
    }

    #[test]
    fn test_tax_calculation_with_rounding() {
        // $10.00 at 8.25% = $0.825 → $0.83
        let amount = Money::from_cents(1000);
        let tax = amount.calculate_tax(TaxRate::from_bps(825));
        assert_eq!(tax.cents(), 83);
    }

    #[test]
    fn test_multiply_quantity() {
        let unit_price = Money::from_cents(299);
        assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    }

    #[test]
    fn test_checked_multiply_catches_overflow() {
        let huge = Money::from_cents(i64::MAX / 2);
        assert_eq!(huge.checked_multiply_quantity(999), None);
        assert_eq!(
            Money::from_cents(299).checked_multiply_quantity(3),
            Some(Money::from_cents(897))
        );
    }

    #[test]
    fn test_checked_add_catches_overflow() {
        let huge = Money::from_cents(i64::MAX);
        assert_eq!(huge.checked_add(Money::from_cents(1)), None);
        assert_eq!(
            Money::from_cents(100).checked_add(Money::from_cents(50)),
            Some(Money::from_cents(150))
        );
    }

    #[test]
    fn test_negative_change() {
        let change = Money::from_cents(1000) - Money::from_cents(1250);
        assert!(change.is_negative());
        assert_eq!(change.cents(), -250);
    }
}
