//! # Error Types
//!
//! Domain-specific error types for revshop-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  revshop-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                        │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  revshop-db errors (separate crate)                                     │
//! │  └── DbError          - Storage failures                                │
//! │                                                                         │
//! │  revshop-engine errors (separate crate)                                 │
//! │  └── EngineError      - Checkout / status / review outcomes             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → EngineError → caller     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations that can be detected without touching storage.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Requested quantity exceeds what is on hand.
    ///
    /// ## When This Occurs
    /// - Add-to-cart where `existing + qty > stock`
    /// - Strict stock policy pre-check at checkout
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: i64,
        available: i64,
        requested: i64,
    },

    /// A status change the lifecycle does not permit.
    ///
    /// ## When This Occurs
    /// - A seller tries to move an order back to PENDING
    #[error("Cannot move order to {to}")]
    InvalidTransition { to: OrderStatus },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised early, before any storage or payment call is made.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (email, enum text).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: 7,
            available: 1,
            requested: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product 7: available 1, requested 2"
        );

        let err = CoreError::InvalidTransition {
            to: OrderStatus::Pending,
        };
        assert_eq!(err.to_string(), "Cannot move order to PENDING");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "shipping_address".to_string(),
        };
        assert_eq!(err.to_string(), "shipping_address is required");

        let err = ValidationError::OutOfRange {
            field: "rating".to_string(),
            min: 1,
            max: 5,
        };
        assert_eq!(err.to_string(), "rating must be between 1 and 5");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
