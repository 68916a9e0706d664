//! # Validation Module
//!
//! Input validation for cart, catalogue, checkout and review operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (Rust)                                            │
//! │  ├── quantities, ratings, prices, addresses                             │
//! │  └── runs before storage or payment is touched                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Database (SQLite)                                             │
//! │  ├── CHECK constraints (quantity ≥ 1, rating 1..=5)                     │
//! │  ├── UNIQUE (buyer, product, order) on reviews                          │
//! │  └── Foreign key constraints                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use revshop_core::validation::{validate_quantity, validate_rating};
//!
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_rating(6).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::NewProduct;
use crate::{MAX_RATING, MIN_RATING};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name (non-blank, at most 200 characters).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a shipping address and returns it trimmed.
pub fn validate_shipping_address(address: &str) -> ValidationResult<String> {
    let address = address.trim();

    if address.is_empty() {
        return Err(ValidationError::Required {
            field: "shipping_address".to_string(),
        });
    }

    if address.chars().count() > 500 {
        return Err(ValidationError::TooLong {
            field: "shipping_address".to_string(),
            max: 500,
        });
    }

    Ok(address.to_string())
}

/// Resolves the billing address: blank falls back to the shipping address.
///
/// ```rust
/// use revshop_core::validation::resolve_billing_address;
///
/// assert_eq!(resolve_billing_address(Some("  "), "12 Elm St"), "12 Elm St");
/// assert_eq!(resolve_billing_address(None, "12 Elm St"), "12 Elm St");
/// assert_eq!(resolve_billing_address(Some("PO Box 4"), "12 Elm St"), "PO Box 4");
/// ```
pub fn resolve_billing_address(billing: Option<&str>, shipping: &str) -> String {
    match billing.map(str::trim) {
        Some(b) if !b.is_empty() => b.to_string(),
        _ => shipping.to_string(),
    }
}

/// Minimal email shape check: one `@` with text on both sides and a dot in the domain.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.contains('@') && domain.contains('.') && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "expected name@domain.tld".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart or order quantity.
///
/// Must be positive. There is no upper bound: stock is the only limit, and
/// checkout accepts whatever the cart merge stored.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a review rating (1..=5).
pub fn validate_rating(rating: i64) -> ValidationResult<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ValidationError::OutOfRange {
            field: "rating".to_string(),
            min: MIN_RATING,
            max: MAX_RATING,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed.
///
/// ```rust
/// use revshop_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents("price", 1099).is_ok());
/// assert!(validate_price_cents("price", 0).is_ok());
/// assert!(validate_price_cents("price", -100).is_err());
/// ```
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates the price triple of a product.
///
/// A discount price, when present, must not exceed the list price.
pub fn validate_pricing(
    price_cents: i64,
    list_price_cents: i64,
    discount_price_cents: Option<i64>,
) -> ValidationResult<()> {
    validate_price_cents("price", price_cents)?;
    validate_price_cents("list_price", list_price_cents)?;

    if let Some(discount) = discount_price_cents {
        validate_price_cents("discount_price", discount)?;
        if discount > list_price_cents {
            return Err(ValidationError::OutOfRange {
                field: "discount_price".to_string(),
                min: 0,
                max: list_price_cents,
            });
        }
    }

    Ok(())
}

/// Validates a low-stock threshold. Zero disables the warning above empty.
pub fn validate_threshold(threshold: i64) -> ValidationResult<()> {
    if threshold < 0 {
        return Err(ValidationError::Negative {
            field: "threshold_quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates a new product listing before insert.
pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_product_name(&product.name)?;
    validate_pricing(
        product.price_cents,
        product.list_price_cents,
        product.discount_price_cents,
    )?;
    if product.stock_quantity < 0 {
        return Err(ValidationError::Negative {
            field: "stock_quantity".to_string(),
        });
    }
    validate_threshold(product.threshold_quantity)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Desk Lamp").is_ok());
        assert!(validate_product_name("   ").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(1_500).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
    }

    #[test]
    fn test_validate_rating() {
        for ok in 1..=5 {
            assert!(validate_rating(ok).is_ok());
        }
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn test_validate_shipping_address() {
        assert_eq!(validate_shipping_address("  1 Main St ").unwrap(), "1 Main St");
        assert!(validate_shipping_address("").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("buyer@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@b@c.com").is_err());
        assert!(validate_email("a@localhost").is_err());
    }

    #[test]
    fn test_validate_pricing() {
        assert!(validate_pricing(1000, 1200, Some(900)).is_ok());
        assert!(validate_pricing(1000, 1200, None).is_ok());
        assert!(validate_pricing(1000, 1200, Some(1500)).is_err());
        assert!(validate_pricing(-1, 1200, None).is_err());
    }

    #[test]
    fn test_validate_new_product() {
        let mut product = NewProduct::simple(1, "Mug", 500, 10);
        assert!(validate_new_product(&product).is_ok());

        product.stock_quantity = -1;
        assert!(validate_new_product(&product).is_err());
    }
}
