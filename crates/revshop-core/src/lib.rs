//! # revshop-core: Pure Domain Logic for RevShop
//!
//! Domain types and rules for the order fulfillment and inventory engine,
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      RevShop Fulfillment Engine                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                  revshop-engine                                 │    │
//! │  │    CheckoutCoordinator, OrderStatusRouter, reviews, reports     │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │                  revshop-db (Database Layer)                    │    │
//! │  │     CartStore, InventoryLedger, OrderLedger, migrations         │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │               ★ revshop-core (THIS CRATE) ★                     │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                   │    │
//! │  │   │   types   │  │   money   │  │ validation│                   │    │
//! │  │   │  Product  │  │   Money   │  │   rules   │                   │    │
//! │  │   │  Order    │  │  (cents)  │  │  checks   │                   │    │
//! │  │   └───────────┘  └───────────┘  └───────────┘                   │    │
//! │  │                                                                 │    │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, CartLine, Order, OrderStatus, etc.)
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use revshop_core::{Money, OrderStatus};
//!
//! let total = Money::from_cents(1000).multiply_quantity(2) + Money::from_cents(500);
//! assert_eq!(total.to_string(), "$25.00");
//!
//! // One seller delivered, the other is still processing
//! let rolled = OrderStatus::roll_up([OrderStatus::Delivered, OrderStatus::Processing]);
//! assert_eq!(rolled, Some(OrderStatus::Processing));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Low-stock threshold given to products that do not set one.
pub const DEFAULT_THRESHOLD_QUANTITY: i64 = 5;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;
