//! # revshop-db: Database Layer for RevShop
//!
//! Storage for carts, inventory, orders, reviews and notifications on
//! SQLite via sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        RevShop Data Flow                                │
//! │                                                                         │
//! │  CheckoutCoordinator::checkout                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     revshop-db (THIS CRATE)                     │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │    │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │    │    │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │    │    │
//! │  │   │               │    │ CartRepo      │    │              │    │    │
//! │  │   │ SqlitePool    │◄───│ ProductRepo   │    │ 001_initial  │    │    │
//! │  │   │ begin()       │    │ OrderRepo ... │    │  _schema.sql │    │    │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘    │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL) or :memory: in tests                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use revshop_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./revshop.db")).await?;
//! db.carts().add_line(buyer_id, product_id, 2).await?;
//! let lines = db.carts().get_lines(buyer_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod demo;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::cart::CartRepository;
pub use repository::notification::NotificationRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
pub use repository::review::ReviewRepository;
pub use repository::user::UserRepository;
