//! # Review Repository
//!
//! Storage for product reviews. Eligibility (order ownership, delivery)
//! is decided by the engine; this layer only enforces one review per
//! (buyer, product, order) through the UNIQUE index.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use revshop_core::validation::validate_rating;
use revshop_core::{NewReview, Review};

const REVIEW_COLUMNS: &str = "id, buyer_id, product_id, order_id, rating, comment, created_at";

#[derive(Debug, Clone)]
pub struct ReviewRepository {
    pool: SqlitePool,
}

impl ReviewRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReviewRepository { pool }
    }

    /// Inserts a review.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - the triple was already reviewed
    pub async fn create(&self, review: &NewReview) -> DbResult<Review> {
        validate_rating(review.rating)?;
        debug!(
            buyer_id = review.buyer_id,
            product_id = review.product_id,
            order_id = review.order_id,
            rating = review.rating,
            "Creating review"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO reviews (buyer_id, product_id, order_id, rating, comment, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(review.buyer_id)
        .bind(review.product_id)
        .bind(review.order_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate(
                "review",
                format!(
                    "buyer {} / product {} / order {}",
                    review.buyer_id, review.product_id, review.order_id
                ),
            ),
            other => other,
        })?;

        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = ?1");
        let created = sqlx::query_as::<_, Review>(&sql)
            .bind(result.last_insert_rowid())
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    /// Whether a review exists for exactly this (buyer, product, order).
    pub async fn has_reviewed(&self, buyer_id: i64, product_id: i64, order_id: i64) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reviews WHERE buyer_id = ?1 AND product_id = ?2 AND order_id = ?3",
        )
        .bind(buyer_id)
        .bind(product_id)
        .bind(order_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Reviews of a product, newest first.
    pub async fn for_product(&self, product_id: i64) -> DbResult<Vec<Review>> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE product_id = ?1 ORDER BY created_at DESC, id DESC"
        );
        let reviews = sqlx::query_as::<_, Review>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(reviews)
    }

    /// Reviews written by a buyer, newest first.
    pub async fn by_buyer(&self, buyer_id: i64) -> DbResult<Vec<Review>> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE buyer_id = ?1 ORDER BY created_at DESC, id DESC"
        );
        let reviews = sqlx::query_as::<_, Review>(&sql)
            .bind(buyer_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(reviews)
    }

    /// Mean rating, or `None` when the product has no reviews.
    pub async fn average_rating(&self, product_id: i64) -> DbResult<Option<f64>> {
        let avg: Option<f64> =
            sqlx::query_scalar("SELECT AVG(CAST(rating AS REAL)) FROM reviews WHERE product_id = ?1")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(avg)
    }
}
