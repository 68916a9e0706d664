//! Seller status updates under both status scopes.

mod common;

use common::shop;
use revshop_core::{NotificationKind, OrderStatus};
use revshop_engine::{EngineError, StatusScope};

#[tokio::test]
async fn test_order_wide_update_moves_every_seller() {
    let shop = shop().await;
    let (order_id, _, _) = shop.two_seller_order().await;
    let router = shop.router(StatusScope::OrderWide);

    let order = router
        .update_for_seller(order_id, shop.seller_a, OrderStatus::Delivered)
        .await
        .unwrap();

    // Seller B never shipped, yet the whole order reads DELIVERED
    assert_eq!(order.status, OrderStatus::Delivered);
    let stored = shop.db.orders().require(order_id).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Delivered);

    let orders = shop.db.orders();
    assert_eq!(
        orders.seller_status(order_id, shop.seller_a).await.unwrap(),
        Some(OrderStatus::Delivered)
    );
    assert_eq!(
        orders.seller_status(order_id, shop.seller_b).await.unwrap(),
        Some(OrderStatus::Pending)
    );
}

#[tokio::test]
async fn test_per_seller_update_rolls_up() {
    let shop = shop().await;
    let (order_id, _, _) = shop.two_seller_order().await;
    let router = shop.router(StatusScope::PerSeller);

    let order = router
        .update_for_seller(order_id, shop.seller_a, OrderStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);

    let order = router
        .update_for_seller(order_id, shop.seller_b, OrderStatus::Shipped)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Shipped);

    let order = router
        .update_for_seller(order_id, shop.seller_b, OrderStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
}

#[tokio::test]
async fn test_per_seller_cancellations_roll_up() {
    let shop = shop().await;
    let (order_id, _, _) = shop.two_seller_order().await;
    let router = shop.router(StatusScope::PerSeller);

    let order = router
        .update_for_seller(order_id, shop.seller_a, OrderStatus::Cancelled)
        .await
        .unwrap();
    // The remaining seller still governs the order
    assert_eq!(order.status, OrderStatus::Pending);

    let order = router
        .update_for_seller(order_id, shop.seller_b, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn test_pending_is_not_a_valid_target() {
    let shop = shop().await;
    let (order_id, _, _) = shop.two_seller_order().await;

    let err = shop
        .router(StatusScope::OrderWide)
        .update_for_seller(order_id, shop.seller_a, OrderStatus::Pending)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { to: OrderStatus::Pending }));
}

#[tokio::test]
async fn test_foreign_seller_and_missing_order_are_refused() {
    let shop = shop().await;
    let p = shop.product(shop.seller_a, "Lamp", 1000, 5).await;
    shop.add(shop.buyer_1, p.id, 1).await;
    let placed = shop
        .checkout()
        .checkout_cart(shop.buyer_1, &common::request())
        .await
        .unwrap();
    let router = shop.router(StatusScope::OrderWide);

    let err = router
        .update_for_seller(placed.order.id, shop.seller_b, OrderStatus::Shipped)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SellerNotInOrder { .. }));
    assert_eq!(
        shop.db.orders().require(placed.order.id).await.unwrap().status,
        OrderStatus::Pending
    );

    let err = router
        .update_for_seller(4242, shop.seller_a, OrderStatus::Shipped)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::OrderNotFound(4242)));
}

#[tokio::test]
async fn test_buyer_is_notified_of_updates() {
    let shop = shop().await;
    let (order_id, _, _) = shop.two_seller_order().await;

    shop.router(StatusScope::OrderWide)
        .update_for_seller(order_id, shop.seller_b, OrderStatus::Shipped)
        .await
        .unwrap();

    let updates: Vec<_> = shop
        .sink
        .sent_to(shop.buyer_1)
        .await
        .into_iter()
        .filter(|s| s.kind == NotificationKind::OrderUpdate)
        .collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(
        updates[0].message,
        format!("Order #{order_id} status updated to SHIPPED by seller")
    );
}

#[tokio::test]
async fn test_notification_failure_keeps_status_change() {
    let shop = shop().await;
    let (order_id, _, _) = shop.two_seller_order().await;
    shop.sink.set_failing(true);

    let order = shop
        .router(StatusScope::OrderWide)
        .update_for_seller(order_id, shop.seller_a, OrderStatus::Processing)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Processing);
}

#[tokio::test]
async fn test_cancel_with_stock_restore() {
    let shop = shop().await;
    let (order_id, p1, p2) = shop.two_seller_order().await;
    assert_eq!(shop.db.products().stock_of(p1.id).await.unwrap(), 3);

    let order = shop
        .router(StatusScope::PerSeller)
        .cancel_for_seller(order_id, shop.seller_a, true)
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(
        shop.db.orders().seller_status(order_id, shop.seller_a).await.unwrap(),
        Some(OrderStatus::Cancelled)
    );
    // Only seller A's lines go back on the shelf
    assert_eq!(shop.db.products().stock_of(p1.id).await.unwrap(), 5);
    assert_eq!(shop.db.products().stock_of(p2.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_cancel_without_restore_leaves_stock() {
    let shop = shop().await;
    let (order_id, p1, _) = shop.two_seller_order().await;

    let order = shop
        .router(StatusScope::OrderWide)
        .cancel_for_seller(order_id, shop.seller_a, false)
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(shop.db.products().stock_of(p1.id).await.unwrap(), 3);
}

#[tokio::test]
async fn test_store_outage_after_status_commit_returns_updated_order() {
    let shop = shop().await;
    let (order_id, _, _) = shop.two_seller_order().await;

    let order = shop
        .router_then_outage(StatusScope::PerSeller)
        .update_for_seller(order_id, shop.seller_a, OrderStatus::Cancelled)
        .await
        .unwrap();

    assert_eq!(order.id, order_id);
    // Seller B still pending, so the roll-up stays PENDING
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.lines.len(), 2);
}
