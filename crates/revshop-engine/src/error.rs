//! # Engine Error Type
//!
//! Outcomes of checkout, status routing and review submission.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in RevShop                                │
//! │                                                                         │
//! │  ValidationError (core) ──────────────┐                                 │
//! │                                       ▼                                 │
//! │  sqlx::Error ──► DbError (db) ──► EngineError ──► caller                │
//! │                    │                  ▲                                 │
//! │                    │ InsufficientStock│ lifted to a top-level variant   │
//! │                    └──────────────────┘                                 │
//! │                                                                         │
//! │  PaymentError (gateway) ──► PaymentDeclined / PaymentUnavailable        │
//! │                                                                         │
//! │  Post-commit follow-up failures never become an EngineError; they are   │
//! │  logged and listed in the FollowUpReport.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

use revshop_core::{CoreError, OrderStatus, ValidationError};
use revshop_db::DbError;

use crate::payment::PaymentError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Checkout was asked to place an order with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// The gateway answered and said no. Nothing was written.
    #[error("Payment declined: {reason}")]
    PaymentDeclined { reason: String },

    /// The gateway could not be reached or failed mid-call.
    #[error("Payment unavailable: {0}")]
    PaymentUnavailable(String),

    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: i64,
        available: i64,
        requested: i64,
    },

    #[error("Order {0} not found")]
    OrderNotFound(i64),

    #[error("Order {order_id} does not belong to buyer {buyer_id}")]
    NotOrderOwner { order_id: i64, buyer_id: i64 },

    #[error("Seller {seller_id} has no lines in order {order_id}")]
    SellerNotInOrder { order_id: i64, seller_id: i64 },

    #[error("Product {product_id} is not part of order {order_id}")]
    ProductNotInOrder { order_id: i64, product_id: i64 },

    #[error("Cannot move order to {to}")]
    InvalidTransition { to: OrderStatus },

    /// Review attempted before the relevant status reached DELIVERED.
    #[error("Order {order_id} is {status}, not DELIVERED")]
    NotDelivered { order_id: i64, status: OrderStatus },

    #[error("Product {product_id} already reviewed by buyer {buyer_id} for order {order_id}")]
    AlreadyReviewed {
        buyer_id: i64,
        product_id: i64,
        order_id: i64,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage failure. During checkout this means the transaction was
    /// rolled back and the cart is intact.
    #[error("Persistence error: {0}")]
    Persistence(#[source] DbError),
}

/// Machine-readable error codes, as printed by the `revshop` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    EmptyCart,
    PaymentDeclined,
    PaymentUnavailable,
    InsufficientStock,
    NotFound,
    Forbidden,
    BusinessLogic,
    ValidationError,
    DatabaseError,
}

impl EngineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::EmptyCart => ErrorCode::EmptyCart,
            EngineError::PaymentDeclined { .. } => ErrorCode::PaymentDeclined,
            EngineError::PaymentUnavailable(_) => ErrorCode::PaymentUnavailable,
            EngineError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            EngineError::OrderNotFound(_) => ErrorCode::NotFound,
            EngineError::NotOrderOwner { .. } | EngineError::SellerNotInOrder { .. } => {
                ErrorCode::Forbidden
            }
            EngineError::ProductNotInOrder { .. }
            | EngineError::InvalidTransition { .. }
            | EngineError::NotDelivered { .. }
            | EngineError::AlreadyReviewed { .. } => ErrorCode::BusinessLogic,
            EngineError::Validation(_) => ErrorCode::ValidationError,
            EngineError::Persistence(DbError::NotFound { .. }) => ErrorCode::NotFound,
            EngineError::Persistence(_) => ErrorCode::DatabaseError,
        }
    }

    /// Payment failures: nothing was persisted and the cart is untouched.
    pub fn is_payment_failure(&self) -> bool {
        matches!(
            self,
            EngineError::PaymentDeclined { .. } | EngineError::PaymentUnavailable(_)
        )
    }
}

/// Lifts the storage errors callers branch on; the rest stay wrapped.
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::InsufficientStock {
                product_id,
                available,
                requested,
            } => EngineError::InsufficientStock {
                product_id,
                available,
                requested,
            },
            DbError::Validation(e) => EngineError::Validation(e),
            other => EngineError::Persistence(other),
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock {
                product_id,
                available,
                requested,
            } => EngineError::InsufficientStock {
                product_id,
                available,
                requested,
            },
            CoreError::InvalidTransition { to } => EngineError::InvalidTransition { to },
            CoreError::Validation(e) => EngineError::Validation(e),
        }
    }
}

impl From<PaymentError> for EngineError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Declined { reason } => EngineError::PaymentDeclined { reason },
            PaymentError::Unavailable(msg) => EngineError::PaymentUnavailable(msg),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_insufficient_stock_is_lifted() {
        let err: EngineError = DbError::InsufficientStock {
            product_id: 7,
            available: 0,
            requested: 1,
        }
        .into();
        assert!(matches!(
            err,
            EngineError::InsufficientStock { product_id: 7, available: 0, requested: 1 }
        ));
        assert_eq!(err.code(), ErrorCode::InsufficientStock);
    }

    #[test]
    fn test_other_db_errors_stay_wrapped() {
        let err: EngineError = DbError::ForeignKeyViolation {
            message: "FOREIGN KEY constraint failed".into(),
        }
        .into();
        assert!(matches!(err, EngineError::Persistence(DbError::ForeignKeyViolation { .. })));
        assert_eq!(err.code(), ErrorCode::DatabaseError);

        let err: EngineError = DbError::not_found("Order", 3).into();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_payment_errors() {
        let err: EngineError = PaymentError::Declined {
            reason: "card expired".into(),
        }
        .into();
        assert!(err.is_payment_failure());
        assert_eq!(err.to_string(), "Payment declined: card expired");
        assert!(!EngineError::EmptyCart.is_payment_failure());
    }

    #[test]
    fn test_core_transition_error() {
        let err: EngineError = CoreError::InvalidTransition {
            to: OrderStatus::Pending,
        }
        .into();
        assert!(matches!(err, EngineError::InvalidTransition { to: OrderStatus::Pending }));
    }
}
