//! # Validation Module
//!
//! Input checks run by the entity mutators and the ledger before anything
//! is written.
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_name, validate_quantity};
//!
//! validate_name("name", "Cola 600ml").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Customer, LineItem, Product, Transaction};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;

/// Largest amount accepted on any single money field (one trillion).
pub const MAX_AMOUNT: Money = Money::from_cents(100_000_000_000_000);

/// Largest quantity accepted on a line item.
pub const MAX_QUANTITY: i64 = 1_000_000;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
///
/// ```rust
/// use tally_core::validation::validate_name;
///
/// assert!(validate_name("name", "Ana").is_ok());
/// assert!(validate_name("name", "   ").is_err());
/// ```
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if qty > MAX_QUANTITY {
        return Err(ValidationError::TooLarge {
            field: "quantity".to_string(),
            max: MAX_QUANTITY,
        });
    }
    Ok(())
}

pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    validate_amount_bound(field, amount)
}

/// Rejects amounts beyond [`MAX_AMOUNT`] in either direction.
pub fn validate_amount_bound(field: &str, amount: Money) -> ValidationResult<()> {
    if amount > MAX_AMOUNT || amount < -MAX_AMOUNT {
        return Err(ValidationError::TooLarge {
            field: field.to_string(),
            max: MAX_AMOUNT.cents(),
        });
    }
    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_name("name", &product.name)?;
    validate_non_negative("price", product.price)?;
    validate_non_negative("cost", product.cost)
}

pub fn validate_customer(customer: &Customer) -> ValidationResult<()> {
    validate_name("name", &customer.name)?;
    validate_non_negative("creditLimit", customer.credit_limit)?;
    validate_non_negative("currentDebt", customer.current_debt)
}

pub fn validate_line_items(items: &[LineItem]) -> ValidationResult<()> {
    for item in items {
        if item.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "productId".to_string(),
            });
        }
        validate_quantity(item.quantity)?;
        validate_non_negative("unitPrice", item.unit_price)?;
        validate_non_negative("discount", item.discount)?;
    }
    Ok(())
}

/// Checks every amount a sale's totals are computed from.
pub fn validate_sale(tx: &Transaction) -> ValidationResult<()> {
    validate_line_items(&tx.items)?;
    validate_non_negative("subtotal", tx.subtotal)?;
    validate_non_negative("tax", tx.tax)?;
    validate_non_negative("shipping", tx.shipping)?;
    validate_non_negative("discount", tx.discount)?;
    validate_amount_bound("amountPaid", tx.amount_paid)?;
    validate_amount_bound("tendered", tx.tendered)?;
    for part in &tx.split_parts {
        validate_non_negative("splitParts.amount", part.amount)?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Cola").is_ok());
        assert!(matches!(
            validate_name("name", ""),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_name("name", &"x".repeat(201)),
            Err(ValidationError::TooLong { max: 200, .. })
        ));
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
    }

    #[test]
    fn test_validate_customer_rejects_negative_limit() {
        let customer = Customer::new("Ana", Money::from_cents(-1), Utc::now());
        assert!(matches!(
            validate_customer(&customer),
            Err(ValidationError::MustNotBeNegative { .. })
        ));
    }

    #[test]
    fn test_validate_customer_rejects_negative_debt() {
        let mut customer = Customer::new("Ana", Money::from_cents(100), Utc::now());
        customer.current_debt = Money::from_cents(-500);
        assert!(matches!(
            validate_customer(&customer),
            Err(ValidationError::MustNotBeNegative { field }) if field == "currentDebt"
        ));
    }

    #[test]
    fn test_validate_sale_bounds_amounts() {
        let mut tx = Transaction::from_items(
            vec![LineItem::new("1", 1, Money::from_cents(100))],
            Utc::now(),
        );
        assert!(validate_sale(&tx).is_ok());

        tx.tax = Money::from_cents(i64::MAX);
        assert!(matches!(
            validate_sale(&tx),
            Err(ValidationError::TooLarge { field, .. }) if field == "tax"
        ));

        tx.tax = Money::zero();
        tx.items[0].quantity = MAX_QUANTITY + 1;
        assert!(validate_sale(&tx).is_err());
    }

    #[test]
    fn test_validate_line_items() {
        let ok = vec![LineItem::new("1", 2, Money::from_cents(100))];
        assert!(validate_line_items(&ok).is_ok());

        let bad = vec![LineItem::new("", 2, Money::from_cents(100))];
        assert!(validate_line_items(&bad).is_err());
    }
}
