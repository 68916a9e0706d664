//! # Checkout Coordinator
//!
//! Turns a buyer's cart lines into a paid order.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         checkout(buyer, lines)                          │
//! │                                                                         │
//! │  1. total = Σ qty × final_price      (empty → EmptyCart, no effects)    │
//! │     [strict] stock pre-check         (short → InsufficientStock)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. gateway.process(total, method)   (failure → nothing written)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. ┌───────────── one transaction ─────────────┐                       │
//! │     │ INSERT orders        (PENDING, COMPLETED) │  any error:           │
//! │     │ INSERT order_lines   (frozen unit price)  │  ROLLBACK, cart kept  │
//! │     │ INSERT order_seller_status              │                       │
//! │     │ [strict] guarded stock decrement         │                       │
//! │     └───────────────── COMMIT ──────────────────┘                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  4. best effort, logged, never raised:                                  │
//! │     [unchecked] stock -= qty  →  clear cart  →  notify buyer            │
//! │     → low-stock alerts to sellers                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  5. PlacedOrder { order, receipt, follow_up }                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! In the default unchecked mode nothing re-checks stock, so two buyers
//! racing for the last unit both succeed and the stock goes negative.

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use revshop_core::validation::{resolve_billing_address, validate_quantity, validate_shipping_address};
use revshop_core::{
    ensure_stock, CartLine, Money, NewOrder, NewOrderLine, NotificationKind, Order, PaymentMethod,
    PaymentStatus,
};
use revshop_db::{Database, DbError, DbResult, OrderRepository, ProductRepository};

use crate::config::StockPolicy;
use crate::error::{EngineError, EngineResult};
use crate::notification::NotificationSink;
use crate::payment::{PaymentGateway, PaymentReceipt};

// =============================================================================
// Request / Result Types
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: String,

    /// Blank or missing falls back to the shipping address.
    #[serde(default)]
    pub billing_address: Option<String>,

    pub payment_method: PaymentMethod,
}

impl CheckoutRequest {
    pub fn new(shipping_address: impl Into<String>, payment_method: PaymentMethod) -> Self {
        CheckoutRequest {
            shipping_address: shipping_address.into(),
            billing_address: None,
            payment_method,
        }
    }

    pub fn with_billing(mut self, billing_address: impl Into<String>) -> Self {
        self.billing_address = Some(billing_address.into());
        self
    }
}

/// A post-commit stock decrement that did not happen.
#[derive(Debug, Clone, Serialize)]
pub struct StockFailure {
    pub product_id: i64,
    pub quantity: i64,
    pub reason: String,
}

/// What happened after the order committed.
///
/// The order stands whatever this says. Failed steps are not retried.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FollowUpReport {
    pub stock_failures: Vec<StockFailure>,
    pub cart_cleared: bool,
    pub buyer_notified: bool,
    /// Products whose seller was told they are at or under threshold.
    pub low_stock_alerts: Vec<i64>,
}

impl FollowUpReport {
    /// Every buyer-facing follow-up step succeeded.
    pub fn is_complete(&self) -> bool {
        self.stock_failures.is_empty() && self.cart_cleared && self.buyer_notified
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub receipt: PaymentReceipt,
    pub follow_up: FollowUpReport,
}

// =============================================================================
// Coordinator
// =============================================================================

#[derive(Clone)]
pub struct CheckoutCoordinator {
    db: Database,
    payments: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn NotificationSink>,
    stock_policy: StockPolicy,
}

impl CheckoutCoordinator {
    pub fn new(
        db: Database,
        payments: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        CheckoutCoordinator {
            db,
            payments,
            notifier,
            stock_policy: StockPolicy::default(),
        }
    }

    pub fn with_stock_policy(mut self, stock_policy: StockPolicy) -> Self {
        self.stock_policy = stock_policy;
        self
    }

    pub fn stock_policy(&self) -> StockPolicy {
        self.stock_policy
    }

    /// Checks out whatever is in the buyer's cart right now.
    pub async fn checkout_cart(&self, buyer_id: i64, request: &CheckoutRequest) -> EngineResult<PlacedOrder> {
        let lines = self.db.carts().get_lines(buyer_id).await?;
        self.checkout(buyer_id, &lines, request).await
    }

    /// Places an order for `lines`.
    ///
    /// ## Returns
    /// * `Ok(PlacedOrder)` - order committed; see `follow_up` for side effects
    /// * `Err(EmptyCart | Validation)` - rejected before payment
    /// * `Err(PaymentDeclined | PaymentUnavailable)` - nothing written
    /// * `Err(InsufficientStock)` - strict mode only
    /// * `Err(Persistence)` - transaction rolled back, cart intact
    #[instrument(skip(self, lines, request), fields(lines = lines.len()))]
    pub async fn checkout(
        &self,
        buyer_id: i64,
        lines: &[CartLine],
        request: &CheckoutRequest,
    ) -> EngineResult<PlacedOrder> {
        if lines.is_empty() {
            warn!("Checkout refused: cart is empty");
            return Err(EngineError::EmptyCart);
        }

        let shipping_address = validate_shipping_address(&request.shipping_address)?;
        let billing_address =
            resolve_billing_address(request.billing_address.as_deref(), &shipping_address);
        for line in lines {
            validate_quantity(line.quantity)?;
        }

        // Price snapshot: the total and the frozen prices come from the same read
        let total: Money = lines.iter().map(CartLine::line_total).sum();
        let order_lines: Vec<NewOrderLine> = lines
            .iter()
            .map(|line| NewOrderLine {
                product_id: line.product_id,
                quantity: line.quantity,
                frozen_unit_price_cents: line.final_price().cents(),
            })
            .collect();

        if self.stock_policy.is_strict() {
            self.precheck_stock(&order_lines).await?;
        }

        let receipt = self
            .payments
            .process(total, request.payment_method)
            .await
            .map_err(|e| {
                warn!(total = %total, error = %e, "Payment failed, nothing persisted");
                EngineError::from(e)
            })?;

        let new_order = NewOrder {
            buyer_id,
            total_cents: total.cents(),
            shipping_address,
            billing_address,
            payment_method: request.payment_method,
            payment_status: PaymentStatus::Completed,
        };
        let order = self.persist(&new_order, &order_lines, &receipt).await?;

        info!(
            order_id = order.id,
            total = %total,
            transaction_id = %receipt.transaction_id,
            "Order placed"
        );

        // Committed: nothing below may turn this into an error
        let follow_up = self.follow_up(order.id, buyer_id, &order_lines).await;

        Ok(PlacedOrder {
            order,
            receipt,
            follow_up,
        })
    }

    // =========================================================================
    // Steps
    // =========================================================================

    /// Strict mode: refuse before charging when current stock is short.
    async fn precheck_stock(&self, lines: &[NewOrderLine]) -> EngineResult<()> {
        let mut wanted: BTreeMap<i64, i64> = BTreeMap::new();
        for line in lines {
            *wanted.entry(line.product_id).or_insert(0) += line.quantity;
        }

        let products = self.db.products();
        for (product_id, requested) in wanted {
            let stock = products.stock_of(product_id).await?;
            ensure_stock(product_id, stock, 0, requested).map_err(|e| {
                warn!(product_id, stock, requested, "Checkout refused: insufficient stock");
                EngineError::from(e)
            })?;
        }
        Ok(())
    }

    /// Step 3. Commits the order or rolls back everything it wrote. The
    /// returned order is read inside the transaction.
    async fn persist(
        &self,
        order: &NewOrder,
        lines: &[NewOrderLine],
        receipt: &PaymentReceipt,
    ) -> EngineResult<Order> {
        let mut tx = self.db.begin().await?;

        match Self::write_order(&mut *tx, order, lines, self.stock_policy).await {
            Ok(placed) => {
                tx.commit().await.map_err(|e| {
                    error!(
                        transaction_id = %receipt.transaction_id,
                        error = %e,
                        "Checkout commit failed after payment was taken"
                    );
                    DbError::TransactionFailed(e.to_string())
                })?;
                Ok(placed)
            }
            Err(e) => {
                error!(
                    buyer_id = order.buyer_id,
                    transaction_id = %receipt.transaction_id,
                    error = %e,
                    "Checkout rolled back after payment was taken"
                );
                if let Err(rollback) = tx.rollback().await {
                    error!(error = %rollback, "Rollback failed");
                }
                Err(e.into())
            }
        }
    }

    async fn write_order(
        conn: &mut SqliteConnection,
        order: &NewOrder,
        lines: &[NewOrderLine],
        stock_policy: StockPolicy,
    ) -> DbResult<Order> {
        let order_id = OrderRepository::insert_order(&mut *conn, order).await?;
        OrderRepository::insert_lines(&mut *conn, order_id, lines).await?;
        OrderRepository::insert_seller_rows(&mut *conn, order_id).await?;

        if stock_policy.is_strict() {
            for line in lines {
                ProductRepository::adjust_stock_guarded_in(&mut *conn, line.product_id, -line.quantity)
                    .await?;
            }
        }

        OrderRepository::load_in(&mut *conn, order_id).await
    }

    /// Step 4. Each failure is logged and recorded, then the next step runs.
    async fn follow_up(&self, order_id: i64, buyer_id: i64, lines: &[NewOrderLine]) -> FollowUpReport {
        let mut report = FollowUpReport::default();

        if !self.stock_policy.is_strict() {
            let products = self.db.products();
            for line in lines {
                if let Err(e) = products.adjust_stock(line.product_id, -line.quantity).await {
                    warn!(
                        order_id,
                        product_id = line.product_id,
                        error = %e,
                        "Stock decrement failed after commit"
                    );
                    report.stock_failures.push(StockFailure {
                        product_id: line.product_id,
                        quantity: line.quantity,
                        reason: e.to_string(),
                    });
                }
            }
        }

        match self.db.carts().clear(buyer_id).await {
            Ok(removed) => {
                debug!(order_id, removed, "Cart cleared");
                report.cart_cleared = true;
            }
            Err(e) => warn!(order_id, buyer_id, error = %e, "Cart clear failed after commit"),
        }

        let message = format!("Order #{order_id} placed successfully!");
        match self.notifier.send(buyer_id, &message, NotificationKind::Order).await {
            Ok(()) => report.buyer_notified = true,
            Err(e) => warn!(order_id, buyer_id, error = %e, "Buyer notification failed"),
        }

        report.low_stock_alerts = self.alert_low_stock(order_id, lines).await;
        report
    }

    async fn alert_low_stock(&self, order_id: i64, lines: &[NewOrderLine]) -> Vec<i64> {
        let product_ids: BTreeSet<i64> = lines.iter().map(|l| l.product_id).collect();
        let products = self.db.products();
        let mut alerted = Vec::new();

        for product_id in product_ids {
            let product = match products.get_by_id(product_id).await {
                Ok(Some(product)) if product.is_low_stock() => product,
                Ok(_) => continue,
                Err(e) => {
                    warn!(order_id, product_id, error = %e, "Low-stock check failed");
                    continue;
                }
            };

            let message = format!(
                "Low stock alert: {} has {} left (threshold {})",
                product.name, product.stock_quantity, product.threshold_quantity
            );
            match self
                .notifier
                .send(product.seller_id, &message, NotificationKind::LowStock)
                .await
            {
                Ok(()) => alerted.push(product_id),
                Err(e) => warn!(product_id, seller_id = product.seller_id, error = %e, "Low-stock alert failed"),
            }
        }

        alerted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::StoredNotificationSink;
    use crate::payment::PaymentSimulator;
    use revshop_core::{NewProduct, NewUser};
    use revshop_db::DbConfig;

    async fn coordinator() -> (Database, CheckoutCoordinator) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let coordinator = CheckoutCoordinator::new(
            db.clone(),
            Arc::new(PaymentSimulator::always_approve()),
            Arc::new(StoredNotificationSink::new(db.clone())),
        );
        (db, coordinator)
    }

    #[tokio::test]
    async fn test_empty_cart_is_refused() {
        let (db, coordinator) = coordinator().await;
        let request = CheckoutRequest::new("1 Main St", PaymentMethod::CreditCard);

        let err = coordinator.checkout(1, &[], &request).await.unwrap_err();
        assert!(matches!(err, EngineError::EmptyCart));
        assert!(db.orders().list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_shipping_address_is_refused() {
        let (db, coordinator) = coordinator().await;
        let seller = db
            .users()
            .create_seller(&NewUser::new("s@example.com", "S", "One"), "Shop", None)
            .await
            .unwrap();
        let buyer = db
            .users()
            .create_buyer(&NewUser::new("b@example.com", "B", "One"))
            .await
            .unwrap();
        let product = db
            .products()
            .create(&NewProduct::simple(seller.user.id, "Mug", 800, 3))
            .await
            .unwrap();
        db.carts().add_line(buyer.id, product.id, 1).await.unwrap();

        let request = CheckoutRequest::new("   ", PaymentMethod::Paypal);
        let err = coordinator.checkout_cart(buyer.id, &request).await.unwrap_err();

        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(db.carts().line_count(buyer.id).await.unwrap(), 1);
        assert_eq!(db.products().stock_of(product.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_billing_falls_back_to_shipping() {
        let (db, coordinator) = coordinator().await;
        let seller = db
            .users()
            .create_seller(&NewUser::new("s@example.com", "S", "One"), "Shop", None)
            .await
            .unwrap();
        let buyer = db
            .users()
            .create_buyer(&NewUser::new("b@example.com", "B", "One"))
            .await
            .unwrap();
        let product = db
            .products()
            .create(&NewProduct::simple(seller.user.id, "Mug", 800, 3))
            .await
            .unwrap();
        db.carts().add_line(buyer.id, product.id, 1).await.unwrap();

        let request =
            CheckoutRequest::new(" 1 Main St ", PaymentMethod::CashOnDelivery).with_billing("");
        let placed = coordinator.checkout_cart(buyer.id, &request).await.unwrap();

        assert_eq!(placed.order.shipping_address, "1 Main St");
        assert_eq!(placed.order.billing_address, "1 Main St");
        assert_eq!(placed.order.payment_method, PaymentMethod::CashOnDelivery);
        assert!(placed.follow_up.is_complete());
    }

    #[test]
    fn test_follow_up_report_completeness() {
        let mut report = FollowUpReport {
            cart_cleared: true,
            buyer_notified: true,
            ..Default::default()
        };
        assert!(report.is_complete());

        report.stock_failures.push(StockFailure {
            product_id: 1,
            quantity: 2,
            reason: "Product not found: 1".into(),
        });
        assert!(!report.is_complete());
    }
}
