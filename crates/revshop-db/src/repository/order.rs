//! # Order Repository (Order Ledger)
//!
//! Orders, their lines with frozen prices, and per-seller fulfillment rows.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CHECKOUT (one transaction, driven by the engine)                    │
//! │     └── insert_order()          → orders row, status PENDING            │
//! │     └── insert_lines()          → order_lines, frozen_unit_price_cents  │
//! │     └── insert_seller_rows()    → order_seller_status, one per seller   │
//! │     └── commit                                                          │
//! │                                                                         │
//! │  2. FULFILLMENT                                                         │
//! │     └── update_status()              → whole-order field                │
//! │     └── update_status_for_seller()   → same field, seller-checked       │
//! │     └── set_seller_status()          → that seller's row only           │
//! │                                                                         │
//! │  Orders and lines are never deleted.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Shared Status Field
//! `orders.status` is one value for the whole order. A seller marking their
//! share DELIVERED through `update_status_for_seller` marks every other
//! seller's share DELIVERED too. `order_seller_status` carries the real
//! per-seller progress alongside it.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use revshop_core::{
    Money, NewOrder, NewOrderLine, Order, OrderLine, OrderStatus, PaymentStatus,
    SellerOrderStatus,
};

const ORDER_COLUMNS: &str = r#"
    o.id, o.buyer_id, o.created_at, o.total_cents,
    o.shipping_address, o.billing_address,
    o.status, o.payment_method, o.payment_status
"#;

const LINE_SELECT: &str = r#"
    SELECT
        ol.id,
        ol.order_id,
        ol.product_id,
        ol.quantity,
        ol.frozen_unit_price_cents,
        p.seller_id,
        p.name AS product_name
    FROM order_lines ol
    INNER JOIN products p ON p.id = ol.product_id
"#;

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    // =========================================================================
    // Transaction-scoped writes (checkout step)
    // =========================================================================

    /// Inserts the order row with status PENDING and returns its generated id.
    pub async fn insert_order(conn: &mut SqliteConnection, order: &NewOrder) -> DbResult<i64> {
        debug!(buyer_id = order.buyer_id, total_cents = order.total_cents, "Inserting order");

        let result = sqlx::query(
            r#"
            INSERT INTO orders (
                buyer_id, created_at, total_cents,
                shipping_address, billing_address,
                status, payment_method, payment_status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(order.buyer_id)
        .bind(Utc::now())
        .bind(order.total_cents)
        .bind(&order.shipping_address)
        .bind(&order.billing_address)
        .bind(OrderStatus::Pending)
        .bind(order.payment_method)
        .bind(order.payment_status)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Writes one line per entry. Stops at the first failure so the caller
    /// can roll the whole transaction back.
    pub async fn insert_lines(
        conn: &mut SqliteConnection,
        order_id: i64,
        lines: &[NewOrderLine],
    ) -> DbResult<()> {
        debug!(order_id, count = lines.len(), "Inserting order lines");

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, product_id, quantity, frozen_unit_price_cents)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.frozen_unit_price_cents)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Creates a PENDING fulfillment row for every distinct seller in the order.
    pub async fn insert_seller_rows(conn: &mut SqliteConnection, order_id: i64) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO order_seller_status (order_id, seller_id, status, updated_at)
            SELECT DISTINCT ?1, p.seller_id, ?2, ?3
            FROM order_lines ol
            INNER JOIN products p ON p.id = ol.product_id
            WHERE ol.order_id = ?1
            "#,
        )
        .bind(order_id)
        .bind(OrderStatus::Pending)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        debug!(order_id, sellers = result.rows_affected(), "Inserted seller status rows");
        Ok(result.rows_affected())
    }

    /// Reads the order and its lines back on the transaction's connection,
    /// so the caller holds the stored row before it commits.
    pub async fn load_in(conn: &mut SqliteConnection, order_id: i64) -> DbResult<Order> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = ?1");
        let mut order = sqlx::query_as::<_, Order>(&sql)
            .bind(order_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))?;

        let sql = format!("{LINE_SELECT} WHERE ol.order_id = ?1 ORDER BY ol.id");
        order.lines = sqlx::query_as::<_, OrderLine>(&sql)
            .bind(order_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(order)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets an order with all of its lines.
    pub async fn get_by_id(&self, order_id: i64) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = ?1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        match order {
            Some(order) => Ok(Some(self.hydrate(order).await?)),
            None => Ok(None),
        }
    }

    pub async fn require(&self, order_id: i64) -> DbResult<Order> {
        self.get_by_id(order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))
    }

    /// A buyer's orders, newest first, each with all lines.
    pub async fn get_by_buyer(&self, buyer_id: i64) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders o WHERE o.buyer_id = ?1 ORDER BY o.created_at DESC, o.id DESC"
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(buyer_id)
            .fetch_all(&self.pool)
            .await?;
        self.hydrate_all(orders).await
    }

    /// Every order containing at least one of the seller's products, newest
    /// first.
    ///
    /// Each order carries **all** of its lines, other sellers' included.
    /// Use [`lines_for_seller`](Self::lines_for_seller) for a scoped view.
    pub async fn get_by_seller(&self, seller_id: i64) -> DbResult<Vec<Order>> {
        let sql = format!(
            r#"
            SELECT DISTINCT {ORDER_COLUMNS}
            FROM orders o
            INNER JOIN order_lines ol ON ol.order_id = o.id
            INNER JOIN products p ON p.id = ol.product_id
            WHERE p.seller_id = ?1
            ORDER BY o.created_at DESC, o.id DESC
            "#
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(seller_id)
            .fetch_all(&self.pool)
            .await?;
        self.hydrate_all(orders).await
    }

    /// All orders, newest first.
    pub async fn list_all(&self) -> DbResult<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders o ORDER BY o.created_at DESC, o.id DESC");
        let orders = sqlx::query_as::<_, Order>(&sql)
            .fetch_all(&self.pool)
            .await?;
        self.hydrate_all(orders).await
    }

    pub async fn lines(&self, order_id: i64) -> DbResult<Vec<OrderLine>> {
        let sql = format!("{LINE_SELECT} WHERE ol.order_id = ?1 ORDER BY ol.id");
        let lines = sqlx::query_as::<_, OrderLine>(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(lines)
    }

    /// Only the seller's own lines of an order.
    pub async fn lines_for_seller(&self, order_id: i64, seller_id: i64) -> DbResult<Vec<OrderLine>> {
        let sql = format!("{LINE_SELECT} WHERE ol.order_id = ?1 AND p.seller_id = ?2 ORDER BY ol.id");
        let lines = sqlx::query_as::<_, OrderLine>(&sql)
            .bind(order_id)
            .bind(seller_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(lines)
    }

    pub async fn seller_has_lines(&self, order_id: i64, seller_id: i64) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM order_lines ol
            INNER JOIN products p ON p.id = ol.product_id
            WHERE ol.order_id = ?1 AND p.seller_id = ?2
            "#,
        )
        .bind(order_id)
        .bind(seller_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Overwrites the whole-order status.
    pub async fn update_status(&self, order_id: i64, status: OrderStatus) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::update_status_in(&mut *conn, order_id, status).await
    }

    pub async fn update_status_in(
        conn: &mut SqliteConnection,
        order_id: i64,
        status: OrderStatus,
    ) -> DbResult<()> {
        debug!(order_id, %status, "Updating order status");

        let result = sqlx::query("UPDATE orders SET status = ?2 WHERE id = ?1")
            .bind(order_id)
            .bind(status)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id));
        }
        Ok(())
    }

    /// Checks that the seller owns a line in the order, then overwrites the
    /// **whole-order** status.
    ///
    /// Other sellers' shares move with it. Callers that need real per-seller
    /// progress use [`set_seller_status`](Self::set_seller_status).
    pub async fn update_status_for_seller(
        &self,
        order_id: i64,
        seller_id: i64,
        status: OrderStatus,
    ) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::update_status_for_seller_in(&mut *conn, order_id, seller_id, status).await
    }

    /// Transaction-scoped form of
    /// [`update_status_for_seller`](Self::update_status_for_seller).
    pub async fn update_status_for_seller_in(
        conn: &mut SqliteConnection,
        order_id: i64,
        seller_id: i64,
        status: OrderStatus,
    ) -> DbResult<()> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM order_lines ol
            INNER JOIN products p ON p.id = ol.product_id
            WHERE ol.order_id = ?1 AND p.seller_id = ?2
            "#,
        )
        .bind(order_id)
        .bind(seller_id)
        .fetch_one(&mut *conn)
        .await?;

        if count == 0 {
            return Err(DbError::NotFound {
                entity: "Seller lines in order".to_string(),
                id: format!("order {order_id}, seller {seller_id}"),
            });
        }
        Self::update_status_in(conn, order_id, status).await
    }

    pub async fn update_payment_status(&self, order_id: i64, status: PaymentStatus) -> DbResult<()> {
        debug!(order_id, %status, "Updating payment status");

        let result = sqlx::query("UPDATE orders SET payment_status = ?2 WHERE id = ?1")
            .bind(order_id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id));
        }
        Ok(())
    }

    /// Per-seller fulfillment rows of an order, by seller id.
    pub async fn seller_statuses(&self, order_id: i64) -> DbResult<Vec<SellerOrderStatus>> {
        let mut conn = self.pool.acquire().await?;
        Self::seller_statuses_in(&mut *conn, order_id).await
    }

    pub async fn seller_statuses_in(
        conn: &mut SqliteConnection,
        order_id: i64,
    ) -> DbResult<Vec<SellerOrderStatus>> {
        let rows = sqlx::query_as::<_, SellerOrderStatus>(
            r#"
            SELECT order_id, seller_id, status, updated_at
            FROM order_seller_status
            WHERE order_id = ?1
            ORDER BY seller_id
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    pub async fn seller_status(&self, order_id: i64, seller_id: i64) -> DbResult<Option<OrderStatus>> {
        let status: Option<OrderStatus> = sqlx::query_scalar(
            "SELECT status FROM order_seller_status WHERE order_id = ?1 AND seller_id = ?2",
        )
        .bind(order_id)
        .bind(seller_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(status)
    }

    /// Writes one seller's row, creating it for orders placed before the
    /// row existed.
    pub async fn set_seller_status(
        &self,
        order_id: i64,
        seller_id: i64,
        status: OrderStatus,
    ) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::set_seller_status_in(&mut *conn, order_id, seller_id, status).await
    }

    pub async fn set_seller_status_in(
        conn: &mut SqliteConnection,
        order_id: i64,
        seller_id: i64,
        status: OrderStatus,
    ) -> DbResult<()> {
        debug!(order_id, seller_id, %status, "Setting seller status");

        sqlx::query(
            r#"
            INSERT INTO order_seller_status (order_id, seller_id, status, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (order_id, seller_id)
            DO UPDATE SET status = excluded.status, updated_at = excluded.updated_at
            "#,
        )
        .bind(order_id)
        .bind(seller_id)
        .bind(status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Σ qty × frozen price over the seller's lines in paid orders, whatever
    /// their delivery status.
    pub async fn total_sales_for_seller(&self, seller_id: i64) -> DbResult<Money> {
        let cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(ol.quantity * ol.frozen_unit_price_cents), 0)
            FROM order_lines ol
            INNER JOIN products p ON p.id = ol.product_id
            INNER JOIN orders o ON o.id = ol.order_id
            WHERE p.seller_id = ?1 AND o.payment_status = ?2
            "#,
        )
        .bind(seller_id)
        .bind(PaymentStatus::Completed)
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_cents(cents))
    }

    /// Like `total_sales_for_seller` but only counts DELIVERED orders.
    pub async fn delivered_sales_for_seller(&self, seller_id: i64) -> DbResult<Money> {
        let cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(ol.quantity * ol.frozen_unit_price_cents), 0)
            FROM order_lines ol
            INNER JOIN products p ON p.id = ol.product_id
            INNER JOIN orders o ON o.id = ol.order_id
            WHERE p.seller_id = ?1 AND o.payment_status = ?2 AND o.status = ?3
            "#,
        )
        .bind(seller_id)
        .bind(PaymentStatus::Completed)
        .bind(OrderStatus::Delivered)
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_cents(cents))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn hydrate(&self, mut order: Order) -> DbResult<Order> {
        order.lines = self.lines(order.id).await?;
        Ok(order)
    }

    async fn hydrate_all(&self, orders: Vec<Order>) -> DbResult<Vec<Order>> {
        let mut hydrated = Vec::with_capacity(orders.len());
        for order in orders {
            hydrated.push(self.hydrate(order).await?);
        }
        Ok(hydrated)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use revshop_core::{NewProduct, NewUser, PaymentMethod};

    struct Fixture {
        db: Database,
        buyer: i64,
        seller_a: i64,
        seller_b: i64,
        lamp: i64,
        mug: i64,
    }

    async fn setup() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let users = db.users();
        let seller_a = users
            .create_seller(&NewUser::new("a@example.com", "A", "Seller"), "A Co", None)
            .await
            .unwrap()
            .user
            .id;
        let seller_b = users
            .create_seller(&NewUser::new("b@example.com", "B", "Seller"), "B Co", None)
            .await
            .unwrap()
            .user
            .id;
        let buyer = users
            .create_buyer(&NewUser::new("buyer@example.com", "Bea", "Buyer"))
            .await
            .unwrap()
            .id;
        let lamp = db
            .products()
            .create(&NewProduct::simple(seller_a, "Lamp", 1000, 5))
            .await
            .unwrap()
            .id;
        let mug = db
            .products()
            .create(&NewProduct::simple(seller_b, "Mug", 500, 5))
            .await
            .unwrap()
            .id;
        Fixture { db, buyer, seller_a, seller_b, lamp, mug }
    }

    async fn place(f: &Fixture, lines: &[NewOrderLine]) -> DbResult<i64> {
        let total: i64 = lines.iter().map(|l| l.quantity * l.frozen_unit_price_cents).sum();
        let mut tx = f.db.begin().await?;
        let order_id = OrderRepository::insert_order(
            &mut *tx,
            &NewOrder {
                buyer_id: f.buyer,
                total_cents: total,
                shipping_address: "1 Main St".to_string(),
                billing_address: "1 Main St".to_string(),
                payment_method: PaymentMethod::CreditCard,
                payment_status: PaymentStatus::Completed,
            },
        )
        .await?;
        OrderRepository::insert_lines(&mut *tx, order_id, lines).await?;
        OrderRepository::insert_seller_rows(&mut *tx, order_id).await?;
        tx.commit().await.map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(order_id)
    }

    fn line(product_id: i64, quantity: i64, price: i64) -> NewOrderLine {
        NewOrderLine { product_id, quantity, frozen_unit_price_cents: price }
    }

    #[tokio::test]
    async fn test_order_round_trip_with_lines() {
        let f = setup().await;
        let id = place(&f, &[line(f.lamp, 2, 1000), line(f.mug, 1, 500)]).await.unwrap();

        let order = f.db.orders().require(id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Completed);
        assert_eq!(order.total().cents(), 2500);
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.lines_total(), order.total());
        assert_eq!(order.lines[0].seller_id, f.seller_a);
        assert_eq!(order.lines[1].product_name, "Mug");
    }

    #[tokio::test]
    async fn test_seller_rows_created_per_distinct_seller() {
        let f = setup().await;
        let id = place(&f, &[line(f.lamp, 1, 1000), line(f.lamp, 1, 1000), line(f.mug, 1, 500)])
            .await
            .unwrap();

        let rows = f.db.orders().seller_statuses(id).await.unwrap();
        let sellers: Vec<i64> = rows.iter().map(|r| r.seller_id).collect();
        assert_eq!(sellers, vec![f.seller_a, f.seller_b]);
        assert!(rows.iter().all(|r| r.status == OrderStatus::Pending));
    }

    #[tokio::test]
    async fn test_get_by_seller_returns_all_lines() {
        let f = setup().await;
        let id = place(&f, &[line(f.lamp, 1, 1000), line(f.mug, 1, 500)]).await.unwrap();

        let orders = f.db.orders().get_by_seller(f.seller_a).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].lines.len(), 2);

        let scoped = f.db.orders().lines_for_seller(id, f.seller_a).await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].product_id, f.lamp);
    }

    #[tokio::test]
    async fn test_listings_are_newest_first() {
        let f = setup().await;
        let first = place(&f, &[line(f.lamp, 1, 1000)]).await.unwrap();
        let second = place(&f, &[line(f.mug, 1, 500)]).await.unwrap();

        let ids: Vec<i64> = f.db.orders().get_by_buyer(f.buyer).await.unwrap().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![second, first]);

        let ids: Vec<i64> = f.db.orders().list_all().await.unwrap().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[tokio::test]
    async fn test_update_status_for_seller_overwrites_whole_order() {
        let f = setup().await;
        let id = place(&f, &[line(f.lamp, 1, 1000), line(f.mug, 1, 500)]).await.unwrap();
        let orders = f.db.orders();

        orders
            .update_status_for_seller(id, f.seller_a, OrderStatus::Delivered)
            .await
            .unwrap();

        assert_eq!(orders.require(id).await.unwrap().status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_update_status_for_seller_requires_a_line() {
        let f = setup().await;
        let id = place(&f, &[line(f.lamp, 1, 1000)]).await.unwrap();

        let err = f
            .db
            .orders()
            .update_status_for_seller(id, f.seller_b, OrderStatus::Shipped)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(f.db.orders().require(id).await.unwrap().status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_failed_line_insert_rolls_back_order() {
        let f = setup().await;

        let err = place(&f, &[line(f.lamp, 1, 1000), line(9_999, 1, 100)]).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));

        assert!(f.db.orders().list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_seller_status_upserts() {
        let f = setup().await;
        let id = place(&f, &[line(f.lamp, 1, 1000)]).await.unwrap();
        let orders = f.db.orders();

        orders.set_seller_status(id, f.seller_a, OrderStatus::Shipped).await.unwrap();
        assert_eq!(
            orders.seller_status(id, f.seller_a).await.unwrap(),
            Some(OrderStatus::Shipped)
        );
        assert_eq!(orders.seller_status(id, f.seller_b).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sales_totals() {
        let f = setup().await;
        let delivered = place(&f, &[line(f.lamp, 2, 1000), line(f.mug, 1, 500)]).await.unwrap();
        let _pending = place(&f, &[line(f.lamp, 1, 1000)]).await.unwrap();
        let unpaid = place(&f, &[line(f.lamp, 3, 1000)]).await.unwrap();

        let orders = f.db.orders();
        orders.update_status(delivered, OrderStatus::Delivered).await.unwrap();
        orders.update_payment_status(unpaid, PaymentStatus::Failed).await.unwrap();

        assert_eq!(orders.total_sales_for_seller(f.seller_a).await.unwrap().cents(), 3000);
        assert_eq!(orders.delivered_sales_for_seller(f.seller_a).await.unwrap().cents(), 2000);
        assert_eq!(orders.total_sales_for_seller(f.seller_b).await.unwrap().cents(), 500);
    }
}
