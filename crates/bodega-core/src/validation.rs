//! # Sale Input Validation
//!
//! Structural validation of a submitted sale, run before any business logic
//! or database work. Catalog checks (product exists, is active, has stock)
//! belong to the transaction coordinator; this module only rejects inputs
//! that are malformed regardless of catalog state.

use uuid::Uuid;

use crate::error::ValidationError;
use crate::types::{SaleInput, SaleLineInput};
use crate::{MAX_ITEM_QUANTITY, MAX_MONEY_CENTS, MAX_SALE_LINES};

/// Validates a submitted sale end to end.
///
/// Returns the first violation found, field-by-field in wire order.
pub fn validate_sale_input(input: &SaleInput) -> Result<(), ValidationError> {
    if input.lines.is_empty() {
        return Err(ValidationError::EmptySale);
    }
    if input.lines.len() > MAX_SALE_LINES {
        return Err(ValidationError::TooManyLines {
            max: MAX_SALE_LINES,
        });
    }

    if let Some(client_id) = &input.client_id {
        if Uuid::parse_str(client_id).is_err() {
            return Err(ValidationError::InvalidFormat {
                field: "clientId".to_string(),
                reason: "not a valid UUID".to_string(),
            });
        }
    }

    for line in &input.lines {
        validate_line(line)?;
    }

    money_in_range("tax", input.tax_cents)?;
    money_in_range("discount", input.discount_cents)?;
    if let Some(paid) = input.amount_paid_cents {
        money_in_range("amountPaid", paid)?;
    }

    Ok(())
}

fn validate_line(line: &SaleLineInput) -> Result<(), ValidationError> {
    // Exactly one of productId / serviceId.
    if line.target().is_none() {
        return Err(ValidationError::InvalidFormat {
            field: "items".to_string(),
            reason: "each item needs exactly one of productId or serviceId".to_string(),
        });
    }

    if line.quantity < 1 || line.quantity > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    money_in_range("unitPrice", line.unit_price_cents)?;
    money_in_range("discount", line.discount_cents)?;
    non_negative("taxRate", line.tax_rate_bps)?;
    money_in_range("taxAmount", line.tax_amount_cents)?;
    Ok(())
}

fn non_negative(field: &str, value: i64) -> Result<(), ValidationError> {
    if value < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Money fields are non-negative and capped: an absurd figure is rejected
/// as malformed before it can reach pricing arithmetic.
fn money_in_range(field: &str, value: i64) -> Result<(), ValidationError> {
    non_negative(field, value)?;
    if value > MAX_MONEY_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_MONEY_CENTS,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentMethod;

    fn valid_line() -> SaleLineInput {
        SaleLineInput {
            product_id: Some("11111111-1111-1111-1111-111111111111".to_string()),
            service_id: None,
            quantity: 2,
            unit_price_cents: 500,
            discount_cents: 0,
            tax_rate_bps: 825,
            tax_amount_cents: 83,
        }
    }

    fn valid_input() -> SaleInput {
        SaleInput {
            client_id: None,
            lines: vec![valid_line()],
            payment_method: PaymentMethod::Cash,
            tax_cents: 83,
            discount_cents: 0,
            amount_paid_cents: None,
            customer_name: None,
            customer_email: None,
            customer_phone: None,
            notes: None,
            allow_expired: false,
        }
    }

    #[test]
    fn test_valid_input_passes() {
        assert!(validate_sale_input(&valid_input()).is_ok());
    }

    #[test]
    fn test_empty_sale_rejected() {
        let mut input = valid_input();
        input.lines.clear();
        assert!(matches!(
            validate_sale_input(&input),
            Err(ValidationError::EmptySale)
        ));
    }

    #[test]
    fn test_line_with_both_targets_rejected() {
        let mut input = valid_input();
        input.lines[0].service_id = Some("s1".to_string());
        assert!(matches!(
            validate_sale_input(&input),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut input = valid_input();
        input.lines[0].quantity = 0;
        assert!(matches!(
            validate_sale_input(&input),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_excessive_quantity_rejected() {
        let mut input = valid_input();
        input.lines[0].quantity = MAX_ITEM_QUANTITY + 1;
        assert!(validate_sale_input(&input).is_err());
    }

    #[test]
    fn test_negative_unit_price_rejected() {
        let mut input = valid_input();
        input.lines[0].unit_price_cents = -1;
        assert!(matches!(
            validate_sale_input(&input),
            Err(ValidationError::MustNotBeNegative { .. })
        ));
    }

    #[test]
    fn test_absurd_unit_price_rejected() {
        let mut input = valid_input();
        input.lines[0].unit_price_cents = i64::MAX / 2;
        assert!(matches!(
            validate_sale_input(&input),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_unit_price_at_cap_passes() {
        let mut input = valid_input();
        input.lines[0].unit_price_cents = MAX_MONEY_CENTS;
        assert!(validate_sale_input(&input).is_ok());
    }

    #[test]
    fn test_malformed_client_id_rejected() {
        let mut input = valid_input();
        input.client_id = Some("not-a-uuid".to_string());
        assert!(matches!(
            validate_sale_input(&input),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_well_formed_client_id_passes() {
        let mut input = valid_input();
        input.client_id = Some(Uuid::new_v4().to_string());
        assert!(validate_sale_input(&input).is_ok());
    }

    #[test]
    fn test_negative_amount_paid_rejected() {
        let mut input = valid_input();
        input.amount_paid_cents = Some(-100);
        assert!(validate_sale_input(&input).is_err());
    }
}
