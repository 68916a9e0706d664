//! # Domain Types
//!
//! Core domain types used throughout the RevShop engine.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │    Product      │   │    CartLine     │   │     Order       │        │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │        │
//! │  │  seller_id      │◄──│  product_id     │   │  buyer_id       │        │
//! │  │  price / disc.  │   │  quantity       │   │  total_cents    │        │
//! │  │  stock_quantity │   │  live snapshot  │   │  status         │        │
//! │  │  threshold      │   └─────────────────┘   │  lines ─────────┼──┐     │
//! │  └─────────────────┘                         └─────────────────┘  │     │
//! │                                                                   ▼     │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │ SellerOrderStat │   │     Review      │   │   OrderLine     │        │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │        │
//! │  │  (order,seller) │   │ (buyer,product, │   │  quantity       │        │
//! │  │  status         │   │  order) unique  │   │  frozen price   │        │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Stored entities use integer keys generated by SQLite. Money columns are
//! cents and are exposed through `Money` accessors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

// =============================================================================
// Users
// =============================================================================

/// Account role. A seller is a user with a [`SellerProfile`] attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Buyer,
    Seller,
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Registration input shared by buyers and sellers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address: Option<String>,
}

impl NewUser {
    pub fn new(email: impl Into<String>, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        NewUser {
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            address: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

/// Business details carried only by sellers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SellerProfile {
    pub user_id: i64,
    pub business_name: String,
    pub business_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A user together with its optional seller capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub user: User,
    pub seller_profile: Option<SellerProfile>,
}

impl Account {
    #[inline]
    pub fn is_seller(&self) -> bool {
        self.user.role == Role::Seller && self.seller_profile.is_some()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product listed by a seller.
///
/// Stock is owned by the inventory ledger and only ever moves by a signed
/// delta, so `stock_quantity` may be negative after racing checkouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub seller_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,

    /// Selling price in cents.
    pub price_cents: i64,

    /// MRP shown struck-through next to the price.
    pub list_price_cents: i64,

    /// When set, overrides `price_cents` as the price actually charged.
    pub discount_price_cents: Option<i64>,

    pub stock_quantity: i64,
    pub threshold_quantity: i64,

    /// Soft-delete flag.
    pub active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn list_price(&self) -> Money {
        Money::from_cents(self.list_price_cents)
    }

    /// The price charged at checkout: discount price if present, else price.
    #[inline]
    pub fn final_price(&self) -> Money {
        final_price(self.price_cents, self.discount_price_cents)
    }

    /// `stock_quantity <= threshold_quantity`.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.threshold_quantity
    }

    pub fn stock_level(&self) -> StockLevel {
        StockLevel::classify(self.stock_quantity, self.threshold_quantity)
    }
}

/// Refuses `requested` more units when `held + requested` exceeds `stock`.
///
/// `held` is what the caller already has claimed (an existing cart line).
///
/// ```rust
/// use revshop_core::{ensure_stock, CoreError};
///
/// assert!(ensure_stock(1, 5, 3, 2).is_ok());
/// assert!(matches!(
///     ensure_stock(1, 5, 3, 3),
///     Err(CoreError::InsufficientStock { available: 2, requested: 3, .. })
/// ));
/// ```
pub fn ensure_stock(product_id: i64, stock: i64, held: i64, requested: i64) -> CoreResult<()> {
    if held + requested > stock {
        return Err(CoreError::InsufficientStock {
            product_id,
            available: stock - held,
            requested,
        });
    }
    Ok(())
}

/// Shared final-price rule for products and cart snapshots.
#[inline]
pub fn final_price(price_cents: i64, discount_price_cents: Option<i64>) -> Money {
    Money::from_cents(discount_price_cents.unwrap_or(price_cents))
}

/// Input for listing a new product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub seller_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price_cents: i64,
    pub list_price_cents: i64,
    pub discount_price_cents: Option<i64>,
    pub stock_quantity: i64,
    pub threshold_quantity: i64,
}

impl NewProduct {
    /// A product priced at `price_cents` with no discount and the default threshold.
    pub fn simple(seller_id: i64, name: impl Into<String>, price_cents: i64, stock: i64) -> Self {
        NewProduct {
            seller_id,
            name: name.into(),
            description: None,
            category: None,
            price_cents,
            list_price_cents: price_cents,
            discount_price_cents: None,
            stock_quantity: stock,
            threshold_quantity: crate::DEFAULT_THRESHOLD_QUANTITY,
        }
    }
}

/// Derived stock classification used by inventory status views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockLevel {
    OutOfStock,
    LowStock,
    InStock,
}

impl StockLevel {
    pub fn classify(stock_quantity: i64, threshold_quantity: i64) -> Self {
        if stock_quantity <= 0 {
            StockLevel::OutOfStock
        } else if stock_quantity <= threshold_quantity {
            StockLevel::LowStock
        } else {
            StockLevel::InStock
        }
    }
}

impl fmt::Display for StockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StockLevel::OutOfStock => "OUT OF STOCK",
            StockLevel::LowStock => "LOW STOCK",
            StockLevel::InStock => "IN STOCK",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A pending cart selection joined with the product's live snapshot.
///
/// Price and stock here are read at query time and can drift from what the
/// buyer saw when adding the line. Checkout freezes `final_price()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CartLine {
    pub buyer_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub added_at: DateTime<Utc>,

    // live product snapshot
    pub seller_id: i64,
    pub product_name: String,
    pub price_cents: i64,
    pub discount_price_cents: Option<i64>,
    pub stock_quantity: i64,
}

impl CartLine {
    #[inline]
    pub fn final_price(&self) -> Money {
        final_price(self.price_cents, self.discount_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        self.final_price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Fulfillment status, stored uppercase.
///
/// ## Progress Order
/// ```text
/// PENDING ──► PROCESSING ──► SHIPPED ──► DELIVERED
///    │             │            │
///    └─────────────┴────────────┴──────► CANCELLED
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Position along the fulfillment path. `None` for CANCELLED.
    pub const fn progress(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Processing => Some(1),
            OrderStatus::Shipped => Some(2),
            OrderStatus::Delivered => Some(3),
            OrderStatus::Cancelled => None,
        }
    }

    /// Checks that a seller may move an order to `self`.
    ///
    /// Every status except PENDING is reachable from any other; nothing
    /// moves an order back to PENDING.
    pub fn ensure_seller_target(self) -> CoreResult<OrderStatus> {
        match self {
            OrderStatus::Pending => Err(CoreError::InvalidTransition { to: self }),
            other => Ok(other),
        }
    }

    /// Collapses per-seller statuses into the order-wide value.
    ///
    /// The least-advanced status among sellers that have not cancelled wins;
    /// when every seller cancelled the order is CANCELLED. Returns `None` for
    /// an empty input.
    ///
    /// ```rust
    /// use revshop_core::OrderStatus::*;
    /// use revshop_core::OrderStatus;
    ///
    /// assert_eq!(OrderStatus::roll_up([Delivered, Processing]), Some(Processing));
    /// assert_eq!(OrderStatus::roll_up([Cancelled, Shipped]), Some(Shipped));
    /// assert_eq!(OrderStatus::roll_up([Cancelled, Cancelled]), Some(Cancelled));
    /// ```
    pub fn roll_up<I>(statuses: I) -> Option<OrderStatus>
    where
        I: IntoIterator<Item = OrderStatus>,
    {
        let mut seen_any = false;
        let mut least: Option<OrderStatus> = None;

        for status in statuses {
            seen_any = true;
            let Some(rank) = status.progress() else {
                continue;
            };
            match least.and_then(|s| s.progress()) {
                Some(current) if current <= rank => {}
                _ => least = Some(status),
            }
        }

        match (seen_any, least) {
            (false, _) => None,
            (true, None) => Some(OrderStatus::Cancelled),
            (true, some) => some,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        OrderStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: OrderStatus::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Payment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Paypal,
    BankTransfer,
    CashOnDelivery,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::CreditCard,
        PaymentMethod::DebitCard,
        PaymentMethod::Paypal,
        PaymentMethod::BankTransfer,
        PaymentMethod::CashOnDelivery,
    ];

    pub const fn code(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }

    /// Label shown to buyers.
    pub const fn label(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "Credit Card",
            PaymentMethod::DebitCard => "Debit Card",
            PaymentMethod::Paypal => "PayPal",
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::CashOnDelivery => "Cash on Delivery",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    /// Accepts either the storage code (`credit_card`) or the label (`Credit Card`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        PaymentMethod::ALL
            .into_iter()
            .find(|m| m.code().eq_ignore_ascii_case(wanted) || m.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: PaymentMethod::ALL.iter().map(|m| m.code().to_string()).collect(),
            })
    }
}

// =============================================================================
// Order
// =============================================================================

/// A placed order. `lines` is filled in by the ledger after the row is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub buyer_id: i64,
    pub created_at: DateTime<Utc>,
    pub total_cents: i64,
    pub shipping_address: String,
    pub billing_address: String,

    /// Single status for the whole order, shared by every seller in it.
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,

    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub lines: Vec<OrderLine>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Σ quantity × frozen unit price over the loaded lines.
    pub fn lines_total(&self) -> Money {
        self.lines.iter().map(OrderLine::line_total).sum()
    }

    /// Lines belonging to one seller.
    pub fn lines_for_seller(&self, seller_id: i64) -> impl Iterator<Item = &OrderLine> {
        self.lines.iter().filter(move |l| l.seller_id == seller_id)
    }

    pub fn contains_product(&self, product_id: i64) -> bool {
        self.lines.iter().any(|l| l.product_id == product_id)
    }
}

/// One product in an order with the price frozen at checkout.
///
/// `seller_id` and `product_name` are read through the product at query
/// time and are not stored on the line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub frozen_unit_price_cents: i64,
    pub seller_id: i64,
    pub product_name: String,
}

impl OrderLine {
    #[inline]
    pub fn frozen_unit_price(&self) -> Money {
        Money::from_cents(self.frozen_unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        self.frozen_unit_price().multiply_quantity(self.quantity)
    }
}

/// A line about to be written inside the checkout transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub product_id: i64,
    pub quantity: i64,
    pub frozen_unit_price_cents: i64,
}

/// An order row about to be written inside the checkout transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub buyer_id: i64,
    pub total_cents: i64,
    pub shipping_address: String,
    pub billing_address: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
}

/// Fulfillment progress of one seller's share of an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SellerOrderStatus {
    pub order_id: i64,
    pub seller_id: i64,
    pub status: OrderStatus,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Reviews
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Review {
    pub id: i64,
    pub buyer_id: i64,
    pub product_id: i64,
    pub order_id: i64,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
    pub buyer_id: i64,
    pub product_id: i64,
    pub order_id: i64,
    pub rating: i64,
    pub comment: Option<String>,
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// Order placed.
    Order,
    /// Status changed by a seller.
    OrderUpdate,
    LowStock,
    General,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub kind: NotificationKind,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
