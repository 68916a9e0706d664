//! # Seller Sales Report
//!
//! Summarises a seller's orders and stock.
//!
//! Only the seller's own lines count toward items and revenue, although
//! `get_by_seller` hands back every line of each order. "Completed" means
//! DELIVERED and paid; the broader `total_sales` figure counts every paid
//! order whatever its delivery status.

use serde::Serialize;
use tracing::debug;

use revshop_core::{Money, OrderStatus, PaymentStatus, StockLevel};
use revshop_db::Database;

use crate::error::EngineResult;

#[derive(Debug, Clone, Serialize)]
pub struct InventoryEntry {
    pub product_id: i64,
    pub name: String,
    pub stock_quantity: i64,
    pub threshold_quantity: i64,
    pub level: StockLevel,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesReport {
    pub seller_id: i64,
    pub completed_orders: usize,
    pub pending_orders: usize,
    pub items_sold: i64,
    /// Seller's lines in completed orders, at frozen prices.
    pub revenue: Money,
    /// `revenue / completed_orders`, absent with no completed orders.
    pub average_order_value: Option<Money>,
    /// Seller's lines in every paid order.
    pub total_sales: Money,
    pub inventory: Vec<InventoryEntry>,
    pub low_stock_count: usize,
    pub out_of_stock_count: usize,
}

#[derive(Debug, Clone)]
pub struct SalesReporter {
    db: Database,
}

impl SalesReporter {
    pub fn new(db: Database) -> Self {
        SalesReporter { db }
    }

    pub async fn sales_report(&self, seller_id: i64) -> EngineResult<SalesReport> {
        let orders = self.db.orders().get_by_seller(seller_id).await?;

        let mut completed_orders = 0;
        let mut pending_orders = 0;
        let mut items_sold = 0;

        for order in &orders {
            if order.status == OrderStatus::Pending {
                pending_orders += 1;
            }

            let completed = order.status == OrderStatus::Delivered
                && order.payment_status == PaymentStatus::Completed;
            if !completed {
                continue;
            }

            completed_orders += 1;
            items_sold += order
                .lines_for_seller(seller_id)
                .map(|line| line.quantity)
                .sum::<i64>();
        }

        let revenue = self.db.orders().delivered_sales_for_seller(seller_id).await?;
        let average_order_value = revenue.checked_div(completed_orders as i64);
        let total_sales = self.db.orders().total_sales_for_seller(seller_id).await?;

        let inventory: Vec<InventoryEntry> = self
            .db
            .products()
            .inventory_status(seller_id)
            .await?
            .into_iter()
            .map(|(product, level)| InventoryEntry {
                product_id: product.id,
                name: product.name,
                stock_quantity: product.stock_quantity,
                threshold_quantity: product.threshold_quantity,
                level,
            })
            .collect();

        let low_stock_count = inventory
            .iter()
            .filter(|e| e.level == StockLevel::LowStock)
            .count();
        let out_of_stock_count = inventory
            .iter()
            .filter(|e| e.level == StockLevel::OutOfStock)
            .count();

        debug!(seller_id, completed_orders, pending_orders, revenue = %revenue, "Sales report built");

        Ok(SalesReport {
            seller_id,
            completed_orders,
            pending_orders,
            items_sold,
            revenue,
            average_order_value,
            total_sales,
            inventory,
            low_stock_count,
            out_of_stock_count,
        })
    }
}
