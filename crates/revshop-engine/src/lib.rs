//! # revshop-engine: Checkout and Fulfillment for RevShop
//!
//! Orchestrates the cart store, inventory ledger and order ledger from
//! `revshop-db` behind two swappable seams: payment and notifications.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      revshop-engine (THIS CRATE)                        │
//! │                                                                         │
//! │  EngineConfig ──► Database::new(db_config) ──► Database (cloned)        │
//! │                                                    │                    │
//! │       ┌─────────────────┬─────────────────┬────────┴────────┐           │
//! │       ▼                 ▼                 ▼                 ▼           │
//! │  CheckoutCoordinator  OrderStatusRouter  ReviewDesk   SalesReporter     │
//! │   │           │         │                                               │
//! │   ▼           ▼         ▼                                               │
//! │  PaymentGateway   NotificationSink                                      │
//! │   ├ PaymentSimulator  ├ StoredNotificationSink                          │
//! │   └ test doubles      └ test doubles                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`checkout`] - pay, persist atomically, then best-effort follow-up
//! - [`status`] - seller status updates under a configurable scope
//! - [`review`] - review eligibility and submission
//! - [`report`] - seller sales report
//! - [`payment`] - `PaymentGateway` trait and simulator
//! - [`notification`] - `NotificationSink` trait and stored sink
//! - [`config`] - `EngineConfig` from env and TOML
//! - [`telemetry`] - tracing subscriber setup for binaries
//! - [`error`] - `EngineError`
//!
//! ## Usage
//!
//! ```rust,ignore
//! let config = EngineConfig::load()?;
//! let db = Database::new(config.db_config()).await?;
//! let checkout = CheckoutCoordinator::new(
//!     db.clone(),
//!     Arc::new(PaymentSimulator::from_settings(&config.payment)),
//!     Arc::new(StoredNotificationSink::new(db.clone())),
//! )
//! .with_stock_policy(config.stock_policy());
//!
//! let placed = checkout
//!     .checkout_cart(buyer_id, &CheckoutRequest::new("12 Elm St", PaymentMethod::CreditCard))
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod config;
pub mod error;
pub mod notification;
pub mod payment;
pub mod report;
pub mod review;
pub mod status;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{CheckoutCoordinator, CheckoutRequest, FollowUpReport, PlacedOrder, StockFailure};
pub use config::{ConfigError, EngineConfig, StatusScope, StockPolicy};
pub use error::{EngineError, EngineResult, ErrorCode};
pub use notification::{NotificationError, NotificationSink, StoredNotificationSink};
pub use payment::{PaymentError, PaymentGateway, PaymentReceipt, PaymentSimulator};
pub use report::{InventoryEntry, SalesReport, SalesReporter};
pub use review::ReviewDesk;
pub use status::OrderStatusRouter;
