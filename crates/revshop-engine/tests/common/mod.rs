//! Shared fixtures for the engine integration tests.
//!
//! Every `shop()` is a fresh in-memory database with two sellers and two
//! buyers, a scripted payment gateway and a notification sink that records
//! what it was asked to send.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use revshop_core::{Money, NewProduct, NewUser, NotificationKind, PaymentMethod, Product};
use revshop_db::{Database, DbConfig};
use revshop_engine::{
    CheckoutCoordinator, CheckoutRequest, NotificationError, NotificationSink, OrderStatusRouter,
    PaymentError, PaymentGateway, PaymentReceipt, ReviewDesk, SalesReporter, StatusScope,
    StockPolicy,
};

// =============================================================================
// Payment
// =============================================================================

/// Approves or declines on demand and counts calls.
pub struct ScriptedGateway {
    approve: AtomicBool,
    calls: AtomicUsize,
    charged: Mutex<Vec<Money>>,
}

impl ScriptedGateway {
    pub fn approving() -> Self {
        ScriptedGateway {
            approve: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            charged: Mutex::new(Vec::new()),
        }
    }

    pub fn set_approve(&self, approve: bool) {
        self.approve.store(approve, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn charged(&self) -> Vec<Money> {
        self.charged.lock().await.clone()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn process(&self, amount: Money, method: PaymentMethod) -> Result<PaymentReceipt, PaymentError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.approve.load(Ordering::SeqCst) {
            return Err(PaymentError::Declined {
                reason: "scripted decline".to_string(),
            });
        }
        self.charged.lock().await.push(amount);
        Ok(PaymentReceipt::new(format!("TXN-TEST-{call}"), amount, method))
    }
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub user_id: i64,
    pub message: String,
    pub kind: NotificationKind,
}

/// Records every send. When failing, records nothing and errors.
pub struct RecordingSink {
    sent: Mutex<Vec<Sent>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        RecordingSink {
            sent: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<Sent> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self, user_id: i64) -> Vec<Sent> {
        self.sent()
            .await
            .into_iter()
            .filter(|s| s.user_id == user_id)
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, user_id: i64, message: &str, kind: NotificationKind) -> Result<(), NotificationError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::Delivery("sink offline".to_string()));
        }
        self.sent.lock().await.push(Sent {
            user_id,
            message: message.to_string(),
            kind,
        });
        Ok(())
    }
}

/// Closes the store on every send, so each read after it fails. Stands in
/// for the pool going away once a write has committed.
pub struct ClosingSink {
    db: Database,
}

impl ClosingSink {
    pub fn new(db: Database) -> Self {
        ClosingSink { db }
    }
}

#[async_trait]
impl NotificationSink for ClosingSink {
    async fn send(&self, _user_id: i64, _message: &str, _kind: NotificationKind) -> Result<(), NotificationError> {
        self.db.close().await;
        Ok(())
    }
}

// =============================================================================
// Shop Fixture
// =============================================================================

pub struct Shop {
    pub db: Database,
    pub gateway: Arc<ScriptedGateway>,
    pub sink: Arc<RecordingSink>,
    pub seller_a: i64,
    pub seller_b: i64,
    pub buyer_1: i64,
    pub buyer_2: i64,
}

pub async fn shop() -> Shop {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let users = db.users();

    let seller_a = users
        .create_seller(&NewUser::new("a@shops.example", "Ada", "Seller"), "Ada's Goods", None)
        .await
        .unwrap()
        .user
        .id;
    let seller_b = users
        .create_seller(&NewUser::new("b@shops.example", "Bo", "Seller"), "Bo's Bits", None)
        .await
        .unwrap()
        .user
        .id;
    let buyer_1 = users
        .create_buyer(&NewUser::new("one@buyers.example", "Buyer", "One").with_address("1 First St"))
        .await
        .unwrap()
        .id;
    let buyer_2 = users
        .create_buyer(&NewUser::new("two@buyers.example", "Buyer", "Two").with_address("2 Second St"))
        .await
        .unwrap()
        .id;

    Shop {
        db,
        gateway: Arc::new(ScriptedGateway::approving()),
        sink: Arc::new(RecordingSink::new()),
        seller_a,
        seller_b,
        buyer_1,
        buyer_2,
    }
}

impl Shop {
    pub async fn product(&self, seller_id: i64, name: &str, price_cents: i64, stock: i64) -> Product {
        self.db
            .products()
            .create(&NewProduct::simple(seller_id, name, price_cents, stock))
            .await
            .unwrap()
    }

    pub async fn add(&self, buyer_id: i64, product_id: i64, qty: i64) {
        self.db.carts().add_line(buyer_id, product_id, qty).await.unwrap();
    }

    pub fn checkout(&self) -> CheckoutCoordinator {
        CheckoutCoordinator::new(self.db.clone(), self.gateway.clone(), self.sink.clone())
    }

    /// Checkout whose buyer notification shuts the store down.
    pub fn checkout_then_outage(&self) -> CheckoutCoordinator {
        CheckoutCoordinator::new(
            self.db.clone(),
            self.gateway.clone(),
            Arc::new(ClosingSink::new(self.db.clone())),
        )
    }

    pub fn strict_checkout(&self) -> CheckoutCoordinator {
        self.checkout().with_stock_policy(StockPolicy::Strict)
    }

    pub fn router(&self, scope: StatusScope) -> OrderStatusRouter {
        OrderStatusRouter::new(self.db.clone(), self.sink.clone(), scope)
    }

    /// Router whose buyer notification shuts the store down.
    pub fn router_then_outage(&self, scope: StatusScope) -> OrderStatusRouter {
        OrderStatusRouter::new(
            self.db.clone(),
            Arc::new(ClosingSink::new(self.db.clone())),
            scope,
        )
    }

    pub fn reviews(&self, scope: StatusScope) -> ReviewDesk {
        ReviewDesk::new(self.db.clone(), scope)
    }

    pub fn reporter(&self) -> SalesReporter {
        SalesReporter::new(self.db.clone())
    }

    /// Buyer 1 orders P1 (10.00, from seller A) and P2 (5.00, from seller B).
    /// Returns (order_id, p1, p2).
    pub async fn two_seller_order(&self) -> (i64, Product, Product) {
        let p1 = self.product(self.seller_a, "Lamp", 1000, 5).await;
        let p2 = self.product(self.seller_b, "Cable", 500, 1).await;
        self.add(self.buyer_1, p1.id, 2).await;
        self.add(self.buyer_1, p2.id, 1).await;

        let placed = self
            .checkout()
            .checkout_cart(self.buyer_1, &request())
            .await
            .unwrap();
        (placed.order.id, p1, p2)
    }
}

pub fn request() -> CheckoutRequest {
    CheckoutRequest::new("1 First St", PaymentMethod::CreditCard)
}
