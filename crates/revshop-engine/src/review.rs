//! # Review Desk
//!
//! Decides whether a buyer may review a product they ordered.
//!
//! ## Eligibility
//! ```text
//! (buyer, product, order, rating)
//!      │
//!      ├─ rating outside 1..=5 ──────────────► Validation
//!      ├─ order missing ─────────────────────► OrderNotFound
//!      ├─ order.buyer_id != buyer ───────────► NotOrderOwner
//!      ├─ product not among the lines ───────► ProductNotInOrder
//!      ├─ governing status != DELIVERED ─────► NotDelivered
//!      └─ triple already reviewed ───────────► AlreadyReviewed
//! ```
//!
//! The governing status is the whole-order field in order-wide scope, so a
//! single seller marking DELIVERED opens reviews for every product in the
//! order. Per-seller scope uses the reviewed product's seller row instead.

use tracing::{info, warn};

use revshop_core::validation::validate_rating;
use revshop_core::{NewReview, OrderStatus, Review};
use revshop_db::{Database, DbError};

use crate::config::StatusScope;
use crate::error::{EngineError, EngineResult};
use crate::status::effective_status;

#[derive(Debug, Clone)]
pub struct ReviewDesk {
    db: Database,
    scope: StatusScope,
}

impl ReviewDesk {
    pub fn new(db: Database, scope: StatusScope) -> Self {
        ReviewDesk { db, scope }
    }

    /// Runs every eligibility rule except the rating.
    pub async fn check_eligibility(&self, buyer_id: i64, product_id: i64, order_id: i64) -> EngineResult<()> {
        let order = self
            .db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or(EngineError::OrderNotFound(order_id))?;

        if order.buyer_id != buyer_id {
            return Err(EngineError::NotOrderOwner { order_id, buyer_id });
        }

        if !order.contains_product(product_id) {
            return Err(EngineError::ProductNotInOrder { order_id, product_id });
        }

        let status = effective_status(&self.db, self.scope, &order, product_id).await?;
        if status != OrderStatus::Delivered {
            return Err(EngineError::NotDelivered { order_id, status });
        }

        if self.db.reviews().has_reviewed(buyer_id, product_id, order_id).await? {
            return Err(EngineError::AlreadyReviewed {
                buyer_id,
                product_id,
                order_id,
            });
        }

        Ok(())
    }

    pub async fn submit(&self, review: &NewReview) -> EngineResult<Review> {
        validate_rating(review.rating)?;

        if let Err(e) = self
            .check_eligibility(review.buyer_id, review.product_id, review.order_id)
            .await
        {
            warn!(
                buyer_id = review.buyer_id,
                product_id = review.product_id,
                order_id = review.order_id,
                error = %e,
                "Review refused"
            );
            return Err(e);
        }

        let created = self.db.reviews().create(review).await.map_err(|e| match e {
            // Lost a race with an identical submission
            DbError::UniqueViolation { .. } => EngineError::AlreadyReviewed {
                buyer_id: review.buyer_id,
                product_id: review.product_id,
                order_id: review.order_id,
            },
            other => other.into(),
        })?;

        info!(
            review_id = created.id,
            product_id = created.product_id,
            rating = created.rating,
            "Review submitted"
        );
        Ok(created)
    }

    pub async fn has_reviewed(&self, buyer_id: i64, product_id: i64, order_id: i64) -> EngineResult<bool> {
        Ok(self.db.reviews().has_reviewed(buyer_id, product_id, order_id).await?)
    }

    pub async fn reviews_for_product(&self, product_id: i64) -> EngineResult<Vec<Review>> {
        Ok(self.db.reviews().for_product(product_id).await?)
    }

    pub async fn reviews_by_buyer(&self, buyer_id: i64) -> EngineResult<Vec<Review>> {
        Ok(self.db.reviews().by_buyer(buyer_id).await?)
    }

    /// `None` until the product has a review.
    pub async fn average_rating(&self, product_id: i64) -> EngineResult<Option<f64>> {
        Ok(self.db.reviews().average_rating(product_id).await?)
    }
}
