//! # Cart Repository (Cart Store)
//!
//! A buyer's pending selections, one line per (buyer, product).
//!
//! ## Add-To-Cart Merge
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two tabs add the same product at once                                  │
//! │                                                                         │
//! │  ❌ read qty=1 ─► write 1+1        read qty=1 ─► write 1+1   → 2        │
//! │                                                                         │
//! │  ✅ INSERT ... ON CONFLICT (buyer_id, product_id)                       │
//! │     DO UPDATE SET quantity = quantity + excluded.quantity    → 3        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stock check done here is advisory. Nothing reserves stock, so the
//! value can be stale by checkout time.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use revshop_core::validation::validate_quantity;
use revshop_core::{ensure_stock, CartLine, Money};

#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Adds `qty` of a product, merging with an existing line.
    ///
    /// ## Rules
    /// - `qty` must be at least 1
    /// - the product must exist and be active
    /// - `existing + qty` must not exceed current stock
    ///
    /// ## Returns
    /// * `Err(DbError::InsufficientStock)` - not enough on hand right now
    /// * `Err(DbError::NotFound)` - unknown or deactivated product
    pub async fn add_line(&self, buyer_id: i64, product_id: i64, qty: i64) -> DbResult<()> {
        validate_quantity(qty)?;
        debug!(buyer_id, product_id, qty, "Adding cart line");

        let product: Option<(i64, bool)> =
            sqlx::query_as("SELECT stock_quantity, active FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?;

        let stock = match product {
            Some((stock, true)) => stock,
            _ => return Err(DbError::not_found("Product", product_id)),
        };

        let existing = self.quantity_of(buyer_id, product_id).await?.unwrap_or(0);
        ensure_stock(product_id, stock, existing, qty)?;

        sqlx::query(
            r#"
            INSERT INTO cart_lines (buyer_id, product_id, quantity, added_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (buyer_id, product_id)
            DO UPDATE SET quantity = quantity + excluded.quantity
            "#,
        )
        .bind(buyer_id)
        .bind(product_id)
        .bind(qty)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Overwrites a line's quantity; `qty <= 0` removes the line.
    ///
    /// No stock re-check.
    pub async fn set_quantity(&self, buyer_id: i64, product_id: i64, qty: i64) -> DbResult<()> {
        if qty <= 0 {
            return self.remove_line(buyer_id, product_id).await;
        }
        validate_quantity(qty)?;
        debug!(buyer_id, product_id, qty, "Setting cart quantity");

        let result = sqlx::query(
            "UPDATE cart_lines SET quantity = ?3 WHERE buyer_id = ?1 AND product_id = ?2",
        )
        .bind(buyer_id)
        .bind(product_id)
        .bind(qty)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart line", product_id));
        }
        Ok(())
    }

    pub async fn remove_line(&self, buyer_id: i64, product_id: i64) -> DbResult<()> {
        debug!(buyer_id, product_id, "Removing cart line");

        sqlx::query("DELETE FROM cart_lines WHERE buyer_id = ?1 AND product_id = ?2")
            .bind(buyer_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Lines with the live product snapshot, most recently added first.
    ///
    /// Lines for deactivated products are left out.
    pub async fn get_lines(&self, buyer_id: i64) -> DbResult<Vec<CartLine>> {
        let lines = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT
                c.buyer_id,
                c.product_id,
                c.quantity,
                c.added_at,
                p.seller_id,
                p.name AS product_name,
                p.price_cents,
                p.discount_price_cents,
                p.stock_quantity
            FROM cart_lines c
            INNER JOIN products p ON p.id = c.product_id
            WHERE c.buyer_id = ?1 AND p.active = 1
            ORDER BY c.added_at DESC, c.rowid DESC
            "#,
        )
        .bind(buyer_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(buyer_id, count = lines.len(), "Loaded cart");
        Ok(lines)
    }

    /// Deletes every line for the buyer. Returns the number removed.
    pub async fn clear(&self, buyer_id: i64) -> DbResult<u64> {
        debug!(buyer_id, "Clearing cart");

        let result = sqlx::query("DELETE FROM cart_lines WHERE buyer_id = ?1")
            .bind(buyer_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Σ qty × live final price. Can differ from the checkout total if
    /// prices move in between.
    pub async fn total(&self, buyer_id: i64) -> DbResult<Money> {
        let lines = self.get_lines(buyer_id).await?;
        Ok(lines.iter().map(CartLine::line_total).sum())
    }

    /// Number of stored lines, including ones hidden by inactive products.
    pub async fn line_count(&self, buyer_id: i64) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_lines WHERE buyer_id = ?1")
            .bind(buyer_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn quantity_of(&self, buyer_id: i64, product_id: i64) -> DbResult<Option<i64>> {
        let qty: Option<i64> = sqlx::query_scalar(
            "SELECT quantity FROM cart_lines WHERE buyer_id = ?1 AND product_id = ?2",
        )
        .bind(buyer_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(qty)
    }
}
