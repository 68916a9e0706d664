//! # Order Status Router
//!
//! Applies a seller's fulfillment update according to the configured
//! [`StatusScope`].
//!
//! ```text
//! update_for_seller(order, seller, status)
//!      │
//!      ├─ status == PENDING ─────────────────► InvalidTransition
//!      ├─ order missing ─────────────────────► OrderNotFound
//!      ├─ seller owns no line ───────────────► SellerNotInOrder
//!      │
//!      ├─ ORDER_WIDE: orders.status = status        (every seller moves)
//!      │              seller row = status
//!      │
//!      └─ PER_SELLER: seller row = status
//!                     orders.status = roll_up(all seller rows)
//!      │
//!      │  (both branches write in one transaction, then commit)
//!      ▼
//! notify buyer (ORDER_UPDATE), failure only logged
//! ```

use std::sync::Arc;
use sqlx::SqliteConnection;
use tracing::{error, info, instrument, warn};

use revshop_core::{NotificationKind, Order, OrderStatus};
use revshop_db::{Database, DbError, DbResult, OrderRepository};

use crate::config::StatusScope;
use crate::error::{EngineError, EngineResult};
use crate::notification::NotificationSink;

#[derive(Clone)]
pub struct OrderStatusRouter {
    db: Database,
    notifier: Arc<dyn NotificationSink>,
    scope: StatusScope,
}

impl OrderStatusRouter {
    pub fn new(db: Database, notifier: Arc<dyn NotificationSink>, scope: StatusScope) -> Self {
        OrderStatusRouter { db, notifier, scope }
    }

    pub fn scope(&self) -> StatusScope {
        self.scope
    }

    /// Moves the seller's share of an order to `status` and returns the
    /// order as stored afterwards.
    #[instrument(skip(self), fields(scope = %self.scope))]
    pub async fn update_for_seller(
        &self,
        order_id: i64,
        seller_id: i64,
        status: OrderStatus,
    ) -> EngineResult<Order> {
        let status = status.ensure_seller_target().map_err(|e| {
            warn!(error = %e, "Status update refused");
            EngineError::from(e)
        })?;

        let orders = self.db.orders();
        let order = orders
            .get_by_id(order_id)
            .await?
            .ok_or(EngineError::OrderNotFound(order_id))?;

        if !orders.seller_has_lines(order_id, seller_id).await? {
            warn!("Status update refused: seller has no lines in order");
            return Err(EngineError::SellerNotInOrder { order_id, seller_id });
        }

        let mut tx = self.db.begin().await?;
        let updated = match Self::apply(&mut *tx, self.scope, &order, seller_id, status).await {
            Ok(updated) => updated,
            Err(e) => {
                warn!(error = %e, "Status update rolled back");
                if let Err(rollback) = tx.rollback().await {
                    error!(error = %rollback, "Rollback failed");
                }
                return Err(e.into());
            }
        };
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(%status, order_status = %updated.status, "Seller status applied");

        let message = format!("Order #{order_id} status updated to {status} by seller");
        if let Err(e) = self
            .notifier
            .send(order.buyer_id, &message, NotificationKind::OrderUpdate)
            .await
        {
            warn!(buyer_id = order.buyer_id, error = %e, "Status notification failed");
        }

        Ok(updated)
    }

    /// Every status write of one update, on one transaction. Returns the
    /// order as it will be committed.
    async fn apply(
        conn: &mut SqliteConnection,
        scope: StatusScope,
        order: &Order,
        seller_id: i64,
        status: OrderStatus,
    ) -> DbResult<Order> {
        let order_id = order.id;
        match scope {
            StatusScope::OrderWide => {
                OrderRepository::update_status_for_seller_in(&mut *conn, order_id, seller_id, status)
                    .await?;
                OrderRepository::set_seller_status_in(&mut *conn, order_id, seller_id, status).await?;
            }
            StatusScope::PerSeller => {
                OrderRepository::set_seller_status_in(&mut *conn, order_id, seller_id, status).await?;
                let rows = OrderRepository::seller_statuses_in(&mut *conn, order_id).await?;
                if let Some(rolled_up) = OrderStatus::roll_up(rows.iter().map(|r| r.status)) {
                    if rolled_up != order.status {
                        OrderRepository::update_status_in(&mut *conn, order_id, rolled_up).await?;
                    }
                }
            }
        }
        OrderRepository::load_in(&mut *conn, order_id).await
    }

    /// Cancels the seller's share. With `restore_stock`, puts each of the
    /// seller's line quantities back after the status change (best effort).
    pub async fn cancel_for_seller(
        &self,
        order_id: i64,
        seller_id: i64,
        restore_stock: bool,
    ) -> EngineResult<Order> {
        let order = self
            .update_for_seller(order_id, seller_id, OrderStatus::Cancelled)
            .await?;

        if restore_stock {
            let products = self.db.products();
            for line in order.lines_for_seller(seller_id) {
                if let Err(e) = products.adjust_stock(line.product_id, line.quantity).await {
                    warn!(
                        order_id,
                        product_id = line.product_id,
                        quantity = line.quantity,
                        error = %e,
                        "Stock restore failed after cancellation"
                    );
                }
            }
        }

        Ok(order)
    }

    /// The status that governs `product_id` within an order: the whole-order
    /// field in order-wide scope, the product seller's row in per-seller scope.
    pub async fn effective_status(&self, order: &Order, product_id: i64) -> EngineResult<OrderStatus> {
        effective_status(&self.db, self.scope, order, product_id).await
    }
}

pub(crate) async fn effective_status(
    db: &Database,
    scope: StatusScope,
    order: &Order,
    product_id: i64,
) -> EngineResult<OrderStatus> {
    match scope {
        StatusScope::OrderWide => Ok(order.status),
        StatusScope::PerSeller => {
            let seller_id = match order.lines.iter().find(|l| l.product_id == product_id) {
                Some(line) => line.seller_id,
                None => {
                    return Err(EngineError::ProductNotInOrder {
                        order_id: order.id,
                        product_id,
                    })
                }
            };
            let row = db.orders().seller_status(order.id, seller_id).await?;
            Ok(row.unwrap_or(order.status))
        }
    }
}
