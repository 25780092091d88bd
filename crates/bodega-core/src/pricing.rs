//! # Sale Pricing
//!
//! Pure pricing math for a submitted sale.
//!
//! ## The pricing pipeline
//! ```text
//! per line:  line_total = quantity × unit_price − line_discount
//! sale:      subtotal   = Σ line_total
//!            total      = subtotal + tax − discount
//!            change     = amount_paid − total   (amount_paid defaults to total)
//! ```
//!
//! All figures are integer cents. Tax and discounts arrive pre-computed on
//! the input (the submitting terminal owns rate lookup); this module only
//! has to combine them consistently and refuse impossible combinations.

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::SaleLineInput;

// =============================================================================
// Sale Totals
// =============================================================================

/// The fully-priced figures for a sale, ready to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleTotals {
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    pub change_cents: i64,
}

// =============================================================================
// Pricing Functions
// =============================================================================

/// Prices a single line: `quantity × unit_price − discount`.
///
/// Fails when the discount exceeds the line subtotal, or when the figures
/// leave the i64 range. All arithmetic is overflow-checked so a hostile
/// unit price is a rejection, never a panic or a silent wrap.
pub fn price_line(line: &SaleLineInput) -> CoreResult<Money> {
    let gross = Money::from_cents(line.unit_price_cents)
        .checked_multiply_quantity(line.quantity)
        .ok_or_else(|| out_of_range("line total"))?;
    let total = gross
        .checked_sub(Money::from_cents(line.discount_cents))
        .ok_or_else(|| out_of_range("line total"))?;
    if total.is_negative() {
        return Err(CoreError::Validation(ValidationError::MustNotBeNegative {
            field: "line total".to_string(),
        }));
    }
    Ok(total)
}

fn out_of_range(field: &str) -> CoreError {
    CoreError::Validation(ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: crate::MAX_MONEY_CENTS,
    })
}

/// Computes the sale totals from its lines and sale-level adjustments.
///
/// `amount_paid_cents` defaults to the total (exact tender). Paying less
/// than the total is rejected; paying more yields change.
pub fn compute_totals(
    lines: &[SaleLineInput],
    tax_cents: i64,
    discount_cents: i64,
    amount_paid_cents: Option<i64>,
) -> CoreResult<SaleTotals> {
    let mut subtotal = Money::zero();
    for line in lines {
        subtotal = subtotal
            .checked_add(price_line(line)?)
            .ok_or_else(|| out_of_range("subtotal"))?;
    }

    let total = subtotal
        .checked_add(Money::from_cents(tax_cents))
        .and_then(|t| t.checked_sub(Money::from_cents(discount_cents)))
        .ok_or_else(|| out_of_range("total"))?;
    if total.is_negative() {
        return Err(CoreError::Validation(ValidationError::MustNotBeNegative {
            field: "total".to_string(),
        }));
    }

    let paid = Money::from_cents(amount_paid_cents.unwrap_or(total.cents()));
    let change = paid - total;
    if change.is_negative() {
        return Err(CoreError::InvalidPaymentAmount {
            reason: format!("amount paid {paid} is below the sale total {total}"),
        });
    }

    Ok(SaleTotals {
        subtotal_cents: subtotal.cents(),
        tax_cents,
        discount_cents,
        total_cents: total.cents(),
        amount_paid_cents: paid.cents(),
        change_cents: change.cents(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: i64, unit_price: i64, discount: i64) -> SaleLineInput {
        SaleLineInput {
            product_id: Some("p1".to_string()),
            service_id: None,
            quantity: qty,
            unit_price_cents: unit_price,
            discount_cents: discount,
            tax_rate_bps: 0,
            tax_amount_cents: 0,
        }
    }

    #[test]
    fn test_price_line() {
        // 3 × $2.99 = $8.97
        assert_eq!(price_line(&line(3, 299, 0)).unwrap().cents(), 897);
        // with 97¢ line discount
        assert_eq!(price_line(&line(3, 299, 97)).unwrap().cents(), 800);
    }

    #[test]
    fn test_price_line_rejects_discount_exceeding_subtotal() {
        let err = price_line(&line(1, 100, 150)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_totals_exact_tender_default() {
        // 2 × $5.00 + 80¢ tax
        let totals = compute_totals(&[line(2, 500, 0)], 80, 0, None).unwrap();
        assert_eq!(totals.subtotal_cents, 1000);
        assert_eq!(totals.total_cents, 1080);
        assert_eq!(totals.amount_paid_cents, 1080);
        assert_eq!(totals.change_cents, 0);
    }

    #[test]
    fn test_totals_with_change() {
        let totals = compute_totals(&[line(1, 750, 0)], 0, 0, Some(1000)).unwrap();
        assert_eq!(totals.total_cents, 750);
        assert_eq!(totals.change_cents, 250);
    }

    #[test]
    fn test_totals_with_sale_discount() {
        // subtotal $20.00, $1.60 tax, $2.00 off
        let totals = compute_totals(&[line(4, 500, 0)], 160, 200, None).unwrap();
        assert_eq!(totals.total_cents, 1960);
    }

    #[test]
    fn test_underpayment_rejected() {
        let err = compute_totals(&[line(1, 1000, 0)], 0, 0, Some(900)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPaymentAmount { .. }));
    }

    #[test]
    fn test_multiple_lines_sum() {
        let totals =
            compute_totals(&[line(2, 299, 0), line(1, 1250, 50)], 0, 0, None).unwrap();
        // 598 + 1200 = 1798
        assert_eq!(totals.subtotal_cents, 1798);
        assert_eq!(totals.total_cents, 1798);
    }

    #[test]
    fn test_discount_exceeding_total_rejected() {
        let err = compute_totals(&[line(1, 500, 0)], 0, 600, None).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_huge_unit_price_rejected_not_panicking() {
        // quantity is within bounds but the product would overflow i64
        let err = price_line(&line(999, i64::MAX / 2, 0)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_subtotal_overflow_rejected() {
        let lines = [line(1, i64::MAX - 1, 0), line(1, i64::MAX - 1, 0)];
        let err = compute_totals(&lines, 0, 0, None).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
