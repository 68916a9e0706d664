//! # Product Repository (Inventory Ledger)
//!
//! Authoritative stock counts, prices and low-stock thresholds.
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ Absolute update (lost updates under concurrent checkout)            │
//! │     UPDATE products SET stock_quantity = 7 WHERE id = ?                 │
//! │                                                                         │
//! │  ✅ adjust_stock: signed delta, one statement, no floor                 │
//! │     UPDATE products SET stock_quantity = stock_quantity + ?             │
//! │                                                                         │
//! │  ✅ adjust_stock_guarded: same delta, refused if result < 0             │
//! │     UPDATE ... WHERE id = ? AND stock_quantity + ? >= 0                 │
//! │                                                                         │
//! │  Two checkouts racing for the last unit:                                │
//! │     adjust_stock          → both succeed, stock = -1                    │
//! │     adjust_stock_guarded  → second one gets InsufficientStock           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use revshop_core::validation::{validate_new_product, validate_pricing, validate_threshold};
use revshop_core::{NewProduct, Product, StockLevel};

const PRODUCT_COLUMNS: &str = r#"
    id, seller_id, name, description, category,
    price_cents, list_price_cents, discount_price_cents,
    stock_quantity, threshold_quantity, active,
    created_at, updated_at
"#;

/// Repository for products and their stock.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Catalogue
    // =========================================================================

    /// Lists a new product for a seller.
    pub async fn create(&self, product: &NewProduct) -> DbResult<Product> {
        validate_new_product(product)?;
        debug!(seller_id = product.seller_id, name = %product.name, "Creating product");

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO products (
                seller_id, name, description, category,
                price_cents, list_price_cents, discount_price_cents,
                stock_quantity, threshold_quantity, active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10, ?10)
            "#,
        )
        .bind(product.seller_id)
        .bind(product.name.trim())
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price_cents)
        .bind(product.list_price_cents)
        .bind(product.discount_price_cents)
        .bind(product.stock_quantity)
        .bind(product.threshold_quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.require(result.last_insert_rowid()).await
    }

    /// Gets a product by ID, active or not.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Like `get_by_id` but a missing product is an error.
    pub async fn require(&self, id: i64) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// All of a seller's products, including deactivated ones, by name.
    pub async fn list_by_seller(&self, seller_id: i64) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE seller_id = ?1 ORDER BY name, id"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(seller_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Active products across all sellers, by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE active = 1 ORDER BY name, id LIMIT ?1"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Replaces the price triple. Existing order lines keep their frozen price.
    pub async fn update_pricing(
        &self,
        id: i64,
        price_cents: i64,
        list_price_cents: i64,
        discount_price_cents: Option<i64>,
    ) -> DbResult<()> {
        validate_pricing(price_cents, list_price_cents, discount_price_cents)?;
        debug!(id, price_cents, ?discount_price_cents, "Updating pricing");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET price_cents = ?2, list_price_cents = ?3, discount_price_cents = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(price_cents)
        .bind(list_price_cents)
        .bind(discount_price_cents)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    pub async fn set_threshold(&self, id: i64, threshold_quantity: i64) -> DbResult<()> {
        validate_threshold(threshold_quantity)?;
        debug!(id, threshold_quantity, "Setting low-stock threshold");

        let result = sqlx::query(
            "UPDATE products SET threshold_quantity = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(threshold_quantity)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    /// Soft-deletes a product.
    ///
    /// Order lines keep referencing it; carts stop showing it.
    pub async fn deactivate(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deactivating product");

        let result = sqlx::query("UPDATE products SET active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    // =========================================================================
    // Stock
    // =========================================================================

    /// `stock_quantity += delta` as one unconditional statement.
    ///
    /// Never clamps at zero. Negative `delta` for sales, positive for
    /// restocks and cancellations.
    pub async fn adjust_stock(&self, id: i64, delta: i64) -> DbResult<()> {
        debug!(id, delta, "Adjusting stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    /// Applies `delta` only if the resulting stock stays at or above zero.
    pub async fn adjust_stock_guarded(&self, id: i64, delta: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::adjust_stock_guarded_in(&mut *conn, id, delta).await
    }

    /// Transaction-scoped form of [`adjust_stock_guarded`](Self::adjust_stock_guarded).
    ///
    /// A refusal leaves the row untouched and reports the stock seen.
    pub async fn adjust_stock_guarded_in(
        conn: &mut SqliteConnection,
        id: i64,
        delta: i64,
    ) -> DbResult<()> {
        debug!(id, delta, "Adjusting stock (guarded)");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + ?2, updated_at = ?3
            WHERE id = ?1 AND stock_quantity + ?2 >= 0
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let available: Option<i64> =
            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        match available {
            None => Err(DbError::not_found("Product", id)),
            Some(available) => {
                warn!(id, available, delta, "Guarded stock change refused");
                Err(DbError::InsufficientStock {
                    product_id: id,
                    available,
                    requested: -delta,
                })
            }
        }
    }

    /// Current stock for a product.
    pub async fn stock_of(&self, id: i64) -> DbResult<i64> {
        let stock: Option<i64> =
            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        stock.ok_or_else(|| DbError::not_found("Product", id))
    }

    /// `stock_quantity <= threshold_quantity`.
    pub async fn is_low_stock(&self, id: i64) -> DbResult<bool> {
        Ok(self.require(id).await?.is_low_stock())
    }

    /// Active products of a seller at or under their threshold, lowest stock first.
    pub async fn low_stock_for_seller(&self, seller_id: i64) -> DbResult<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE seller_id = ?1 AND active = 1 AND stock_quantity <= threshold_quantity
            ORDER BY stock_quantity, id
            "#
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(seller_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Every active product of a seller paired with its stock classification.
    pub async fn inventory_status(&self, seller_id: i64) -> DbResult<Vec<(Product, StockLevel)>> {
        let products = self.list_by_seller(seller_id).await?;
        Ok(products
            .into_iter()
            .filter(|p| p.active)
            .map(|p| {
                let level = p.stock_level();
                (p, level)
            })
            .collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use revshop_core::NewUser;

    async fn setup() -> (Database, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let seller = db
            .users()
            .create_seller(&NewUser::new("s@example.com", "S", "One"), "S Goods", None)
            .await
            .unwrap();
        (db, seller.user.id)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (db, seller) = setup().await;
        let products = db.products();

        let created = products
            .create(&NewProduct::simple(seller, "Lamp", 1000, 5))
            .await
            .unwrap();

        let fetched = products.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Lamp");
        assert_eq!(fetched.final_price().cents(), 1000);
        assert_eq!(fetched.threshold_quantity, 5);
        assert!(fetched.active);
    }

    #[tokio::test]
    async fn test_adjust_stock_goes_negative() {
        let (db, seller) = setup().await;
        let products = db.products();
        let p = products
            .create(&NewProduct::simple(seller, "Last One", 500, 1))
            .await
            .unwrap();

        products.adjust_stock(p.id, -1).await.unwrap();
        products.adjust_stock(p.id, -1).await.unwrap();

        assert_eq!(products.stock_of(p.id).await.unwrap(), -1);
    }

    #[tokio::test]
    async fn test_adjust_stock_unknown_product() {
        let (db, _) = setup().await;
        let err = db.products().adjust_stock(999, -1).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_guarded_adjust_refuses_below_zero() {
        let (db, seller) = setup().await;
        let products = db.products();
        let p = products
            .create(&NewProduct::simple(seller, "Scarce", 500, 1))
            .await
            .unwrap();

        products.adjust_stock_guarded(p.id, -1).await.unwrap();
        let err = products.adjust_stock_guarded(p.id, -1).await.unwrap_err();

        assert!(matches!(
            err,
            DbError::InsufficientStock { available: 0, requested: 1, .. }
        ));
        assert_eq!(products.stock_of(p.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_low_stock_and_inventory_status() {
        let (db, seller) = setup().await;
        let products = db.products();

        let plenty = products
            .create(&NewProduct::simple(seller, "A Plenty", 100, 50))
            .await
            .unwrap();
        let low = products
            .create(&NewProduct::simple(seller, "B Low", 100, 5))
            .await
            .unwrap();
        let gone = products
            .create(&NewProduct::simple(seller, "C Gone", 100, 0))
            .await
            .unwrap();

        assert!(!products.is_low_stock(plenty.id).await.unwrap());
        assert!(products.is_low_stock(low.id).await.unwrap());

        let low_ids: Vec<i64> = products
            .low_stock_for_seller(seller)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(low_ids, vec![gone.id, low.id]);

        let status = products.inventory_status(seller).await.unwrap();
        let levels: Vec<StockLevel> = status.iter().map(|(_, level)| *level).collect();
        assert_eq!(
            levels,
            vec![StockLevel::InStock, StockLevel::LowStock, StockLevel::OutOfStock]
        );
    }

    #[tokio::test]
    async fn test_pricing_threshold_and_deactivate() {
        let (db, seller) = setup().await;
        let products = db.products();
        let p = products
            .create(&NewProduct::simple(seller, "Kettle", 2000, 10))
            .await
            .unwrap();

        products.update_pricing(p.id, 2000, 2500, Some(1800)).await.unwrap();
        products.set_threshold(p.id, 12).await.unwrap();

        let updated = products.require(p.id).await.unwrap();
        assert_eq!(updated.final_price().cents(), 1800);
        assert!(updated.is_low_stock());

        products.deactivate(p.id).await.unwrap();
        assert!(!products.require(p.id).await.unwrap().active);
        assert!(products.inventory_status(seller).await.unwrap().is_empty());
    }
}
