//! # Validation Module
//!
//! Boundary validation for inbound requests. Requests are checked here,
//! as typed structs, before they reach the settlement engine — the engine
//! can assume shapes are sane and only enforces business invariants
//! (stock, balances) that need database state.

use crate::error::ValidationError;
use crate::sale::CreateSaleRequest;
use crate::types::CheckoutRequest;
use crate::{MAX_AMOUNT_CENTS, MAX_LINE_QUANTITY, MAX_SALE_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Request Validators
// =============================================================================

/// Validates a create-sale request.
///
/// ## Rules
/// - seller_id present
/// - at least one line, at most [`MAX_SALE_LINES`]
/// - per line: quantity in 1..=[`MAX_LINE_QUANTITY`], unit price and
///   discount in 0..=[`MAX_AMOUNT_CENTS`]
/// - sale-level discount in 0..=[`MAX_AMOUNT_CENTS`]
///
/// The amount cap keeps the totals arithmetic inside `i64`.
///
/// Stock and total checks need database state and live in the engine.
pub fn validate_create_sale(req: &CreateSaleRequest) -> ValidationResult<()> {
    require_non_empty("seller_id", &req.seller_id)?;

    require_amount_in_range("discount_cents", req.discount_cents)?;

    if req.lines.is_empty() {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }

    if req.lines.len() > MAX_SALE_LINES {
        return Err(ValidationError::TooMany {
            field: "lines".to_string(),
            max: MAX_SALE_LINES,
        });
    }

    for line in &req.lines {
        require_non_empty("lines.product_id", &line.product_id)?;

        if line.quantity < 1 || line.quantity > MAX_LINE_QUANTITY {
            return Err(ValidationError::OutOfRange {
                field: "lines.quantity".to_string(),
                min: 1,
                max: MAX_LINE_QUANTITY,
            });
        }

        require_amount_in_range("lines.unit_price_cents", line.unit_price_cents)?;
        require_amount_in_range("lines.discount_cents", line.discount_cents)?;
    }

    Ok(())
}

/// Validates a standalone checkout request.
pub fn validate_checkout(req: &CheckoutRequest) -> ValidationResult<()> {
    require_non_empty("customer_name", &req.customer_name)?;
    require_non_empty("phone", &req.phone)?;

    if req.customer_name.len() > 255 {
        return Err(ValidationError::TooLong {
            field: "customer_name".to_string(),
            max: 255,
        });
    }

    if req.phone.len() > 20 {
        return Err(ValidationError::TooLong {
            field: "phone".to_string(),
            max: 20,
        });
    }

    require_non_empty("email", &req.email)?;
    if !req.email.contains('@') {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "missing '@'".to_string(),
        });
    }

    if req.amount_cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount_cents".to_string(),
        });
    }
    require_amount_in_range("amount_cents", req.amount_cents)?;

    Ok(())
}

/// Money amounts must sit in `0..=MAX_AMOUNT_CENTS`.
fn require_amount_in_range(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    if cents > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }
    Ok(())
}

fn require_non_empty(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
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
    use crate::sale::SaleLineRequest;
    use crate::types::{PaymentMethod, SaleKind};

    fn sale_request() -> CreateSaleRequest {
        CreateSaleRequest {
            customer_id: None,
            seller_id: "seller-1".to_string(),
            kind: SaleKind::Cash,
            method: PaymentMethod::Cash,
            discount_cents: 0,
            notes: None,
            lines: vec![SaleLineRequest {
                product_id: "p1".to_string(),
                quantity: 2,
                unit_price_cents: 1000,
                discount_cents: 0,
            }],
        }
    }

    #[test]
    fn test_valid_sale_request() {
        assert!(validate_create_sale(&sale_request()).is_ok());
    }

    #[test]
    fn test_empty_lines_rejected() {
        let mut req = sale_request();
        req.lines.clear();
        assert!(matches!(
            validate_create_sale(&req),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut req = sale_request();
        req.lines[0].quantity = 0;
        assert!(matches!(
            validate_create_sale(&req),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_negative_discount_rejected() {
        let mut req = sale_request();
        req.discount_cents = -1;
        assert!(matches!(
            validate_create_sale(&req),
            Err(ValidationError::MustNotBeNegative { .. })
        ));
    }

    #[test]
    fn test_absurd_unit_price_rejected() {
        let mut req = sale_request();
        req.lines[0].unit_price_cents = MAX_AMOUNT_CENTS + 1;
        assert!(matches!(
            validate_create_sale(&req),
            Err(ValidationError::OutOfRange { .. })
        ));

        req.lines[0].unit_price_cents = MAX_AMOUNT_CENTS;
        assert!(validate_create_sale(&req).is_ok());
    }

    #[test]
    fn test_absurd_discount_rejected() {
        let mut req = sale_request();
        req.discount_cents = MAX_AMOUNT_CENTS + 1;
        assert!(matches!(
            validate_create_sale(&req),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_missing_seller_rejected() {
        let mut req = sale_request();
        req.seller_id = "  ".to_string();
        assert!(validate_create_sale(&req).is_err());
    }

    fn checkout_request() -> CheckoutRequest {
        CheckoutRequest {
            customer_name: "Maria Lopez".to_string(),
            email: "maria@example.com".to_string(),
            phone: "70000000".to_string(),
            amount_cents: 5000,
            order_detail: serde_json::json!([{"product": "Coca Cola 2L", "quantity": 1}]),
        }
    }

    #[test]
    fn test_valid_checkout_request() {
        assert!(validate_checkout(&checkout_request()).is_ok());
    }

    #[test]
    fn test_checkout_bad_email_rejected() {
        let mut req = checkout_request();
        req.email = "not-an-email".to_string();
        assert!(matches!(
            validate_checkout(&req),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_checkout_non_positive_amount_rejected() {
        let mut req = checkout_request();
        req.amount_cents = 0;
        assert!(matches!(
            validate_checkout(&req),
            Err(ValidationError::MustBePositive { .. })
        ));
    }
}
