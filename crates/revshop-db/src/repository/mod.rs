//! # Repository Module
//!
//! Database repository implementations for RevShop.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  CheckoutCoordinator / OrderStatusRouter                                │
//! │       │                                                                 │
//! │       │  db.carts().get_lines(buyer)                                    │
//! │       │  db.products().adjust_stock(product, -qty)                      │
//! │       ▼                                                                 │
//! │  XRepository { pool }                                                   │
//! │  ├── pool-backed methods     (&self, ...)                               │
//! │  └── transaction-scoped fns  (conn: &mut SqliteConnection, ...)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CartRepository`](cart::CartRepository) - the cart store
//! - [`ProductRepository`](product::ProductRepository) - the inventory ledger
//! - [`OrderRepository`](order::OrderRepository) - the order ledger
//! - [`ReviewRepository`](review::ReviewRepository) - product reviews
//! - [`NotificationRepository`](notification::NotificationRepository) - in-app notifications
//! - [`UserRepository`](user::UserRepository) - buyers and sellers

pub mod cart;
pub mod notification;
pub mod order;
pub mod product;
pub mod review;
pub mod user;
