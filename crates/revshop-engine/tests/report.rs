//! Seller sales report.

mod common;

use common::{request, shop};
use revshop_core::{Money, OrderStatus, StockLevel};
use revshop_engine::StatusScope;

#[tokio::test]
async fn test_sales_report_counts_only_own_delivered_lines() {
    let shop = shop().await;
    let (delivered_id, p1, _) = shop.two_seller_order().await;
    shop.router(StatusScope::OrderWide)
        .update_for_seller(delivered_id, shop.seller_a, OrderStatus::Delivered)
        .await
        .unwrap();

    // Second order for seller A stays PENDING
    shop.add(shop.buyer_2, p1.id, 1).await;
    shop.checkout()
        .checkout_cart(shop.buyer_2, &request())
        .await
        .unwrap();

    let sold_out = shop.product(shop.seller_a, "Sold Out", 400, 0).await;
    let healthy = shop.product(shop.seller_a, "Healthy", 400, 30).await;

    let report = shop.reporter().sales_report(shop.seller_a).await.unwrap();

    assert_eq!(report.completed_orders, 1);
    assert_eq!(report.pending_orders, 1);
    // Seller B's 5.00 cable in the delivered order is not counted
    assert_eq!(report.items_sold, 2);
    assert_eq!(report.revenue, Money::from_cents(2000));
    assert_eq!(
        shop.db.orders().delivered_sales_for_seller(shop.seller_a).await.unwrap(),
        report.revenue
    );
    assert_eq!(report.average_order_value, Some(Money::from_cents(2000)));
    assert_eq!(report.total_sales, Money::from_cents(3000));

    assert_eq!(report.inventory.len(), 3);
    let level_of = |id: i64| report.inventory.iter().find(|e| e.product_id == id).unwrap().level;
    assert_eq!(level_of(p1.id), StockLevel::LowStock);
    assert_eq!(level_of(sold_out.id), StockLevel::OutOfStock);
    assert_eq!(level_of(healthy.id), StockLevel::InStock);
    assert_eq!(report.low_stock_count, 1);
    assert_eq!(report.out_of_stock_count, 1);
}

#[tokio::test]
async fn test_empty_report_has_no_average() {
    let shop = shop().await;

    let report = shop.reporter().sales_report(shop.seller_b).await.unwrap();

    assert_eq!(report.completed_orders, 0);
    assert_eq!(report.revenue, Money::zero());
    assert_eq!(report.average_order_value, None);
    assert!(report.inventory.is_empty());
}
