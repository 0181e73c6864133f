//! Order status transitions end to end: the happy path with its audit
//! trail and shipment side effects, and the guard rejections that must
//! leave the order untouched.

mod common;

use common::{seed_buyer, seed_product, seed_stock, setup, TestContext};
use ledger_core::{Actor, Buyer, CoreError, Order, OrderStatus, ShipmentStatus};
use ledger_engine::{EngineError, NewOrder, NewOrderLine, PaymentOutcome};

async fn place_order(ctx: &TestContext, buyer: &Buyer, product_id: &str, quantity: i64) -> Order {
    ctx.engine
        .place_order(NewOrder {
            buyer_id: buyer.id.clone(),
            location_id: "loc-1".to_string(),
            items: vec![NewOrderLine {
                product_id: product_id.to_string(),
                quantity,
            }],
            shipping_fee: 5_000,
            discount: 0,
            tax: 0,
            address: Some("Jl. Melati 5".to_string()),
        })
        .await
        .unwrap()
}

/// Places an order and walks it to `paid` through the gateway.
async fn paid_order(ctx: &TestContext, buyer: &Buyer, product_id: &str) -> Order {
    let order = place_order(ctx, buyer, product_id, 2).await;
    ctx.engine
        .create_payment_intent(&order.id, &Actor::buyer(&buyer.id))
        .await
        .unwrap();
    ctx.engine
        .apply_payment_result(&order.id, PaymentOutcome::Success, None)
        .await
        .unwrap();
    ctx.engine.db().orders().get_by_id(&order.id).await.unwrap().unwrap()
}

#[tokio::test]
async fn test_placed_order_is_pending_with_shipment_record() {
    let ctx = setup().await;
    let db = ctx.engine.db();
    let buyer = seed_buyer(db, 7).await;
    let product = seed_product(db, "SKU-1", 10_000).await;
    seed_stock(db, &product.id, 10).await;

    let order = place_order(&ctx, &buyer, &product.id, 3).await;

    assert_eq!(order.status, OrderStatus::PendingPayment);
    assert_eq!(order.subtotal, 30_000);
    assert_eq!(order.total, 35_000);

    let shipment = db.orders().get_shipment(&order.id).await.unwrap().unwrap();
    assert_eq!(shipment.status, ShipmentStatus::Pending);
    assert!(shipment.shipped_at.is_none());

    // Checkout reserves nothing; availability is re-checked at payment.
    assert_eq!(db.stock().level("loc-1", &product.id).await.unwrap(), 10);
}

#[tokio::test]
async fn test_discount_cannot_exceed_the_order_value() {
    let ctx = setup().await;
    let db = ctx.engine.db();
    let buyer = seed_buyer(db, 7).await;
    let product = seed_product(db, "SKU-1", 10_000).await;
    seed_stock(db, &product.id, 10).await;

    let err = ctx
        .engine
        .place_order(NewOrder {
            buyer_id: buyer.id.clone(),
            location_id: "loc-1".to_string(),
            items: vec![NewOrderLine {
                product_id: product.id.clone(),
                quantity: 1,
            }],
            shipping_fee: 2_000,
            discount: 50_000,
            tax: 0,
            address: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Domain(CoreError::Validation(_))
    ));
}

#[tokio::test]
async fn test_admin_cannot_assert_payment_failure() {
    let ctx = setup().await;
    let db = ctx.engine.db();
    let buyer = seed_buyer(db, 7).await;
    let product = seed_product(db, "SKU-1", 10_000).await;
    seed_stock(db, &product.id, 10).await;
    let order = place_order(&ctx, &buyer, &product.id, 1).await;

    let err = ctx
        .engine
        .transition(&order.id, OrderStatus::Failed, &Actor::admin("ops-1"), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Domain(CoreError::ForbiddenTransition { .. })
    ));

    let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::PendingPayment);
    assert!(db.orders().history(&order.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_full_lifecycle_with_audit_trail() {
    let ctx = setup().await;
    let db = ctx.engine.db();
    let buyer = seed_buyer(db, 7).await;
    let product = seed_product(db, "SKU-1", 10_000).await;
    seed_stock(db, &product.id, 10).await;

    let order = paid_order(&ctx, &buyer, &product.id).await;
    assert_eq!(order.status, OrderStatus::Paid);

    let admin = Actor::admin("ops-1");
    for target in [
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Completed,
    ] {
        ctx.engine
            .transition(&order.id, target, &admin, None)
            .await
            .unwrap();
    }

    let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Completed);

    let history = db.orders().history(&order.id).await.unwrap();
    let steps: Vec<(OrderStatus, OrderStatus)> = history
        .iter()
        .map(|h| (h.from_status, h.to_status))
        .collect();
    assert_eq!(
        steps,
        vec![
            (OrderStatus::PendingPayment, OrderStatus::Paid),
            (OrderStatus::Paid, OrderStatus::Processing),
            (OrderStatus::Processing, OrderStatus::Shipped),
            (OrderStatus::Shipped, OrderStatus::Delivered),
            (OrderStatus::Delivered, OrderStatus::Completed),
        ]
    );
    assert_eq!(history[0].actor, "reconciliation");
    assert_eq!(history[1].actor, "admin:ops-1");

    let shipment = db.orders().get_shipment(&order.id).await.unwrap().unwrap();
    assert_eq!(shipment.status, ShipmentStatus::Delivered);
    assert!(shipment.shipped_at.is_some());
    assert!(shipment.delivered_at.is_some());

    assert_eq!(ctx.notifier.call_count(), 1);
}

#[tokio::test]
async fn test_notifier_failure_does_not_roll_back_shipped() {
    let ctx = setup().await;
    let db = ctx.engine.db();
    let buyer = seed_buyer(db, 7).await;
    let product = seed_product(db, "SKU-1", 10_000).await;
    seed_stock(db, &product.id, 10).await;

    let order = paid_order(&ctx, &buyer, &product.id).await;
    let admin = Actor::admin("ops-1");
    ctx.engine
        .transition(&order.id, OrderStatus::Processing, &admin, None)
        .await
        .unwrap();

    ctx.notifier
        .fail
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let shipped = ctx
        .engine
        .transition(&order.id, OrderStatus::Shipped, &admin, None)
        .await
        .unwrap();

    assert_eq!(shipped.status, OrderStatus::Shipped);
    assert_eq!(ctx.notifier.call_count(), 1);

    let shipment = db.orders().get_shipment(&order.id).await.unwrap().unwrap();
    assert_eq!(shipment.status, ShipmentStatus::InTransit);
}

#[tokio::test]
async fn test_invalid_edge_is_rejected() {
    let ctx = setup().await;
    let db = ctx.engine.db();
    let buyer = seed_buyer(db, 7).await;
    let product = seed_product(db, "SKU-1", 10_000).await;
    seed_stock(db, &product.id, 10).await;

    let order = paid_order(&ctx, &buyer, &product.id).await;

    let err = ctx
        .engine
        .transition(&order.id, OrderStatus::Delivered, &Actor::admin("ops-1"), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Domain(CoreError::InvalidState { .. })
    ));
    let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Paid);
}

#[tokio::test]
async fn test_pending_order_can_be_cancelled() {
    let ctx = setup().await;
    let db = ctx.engine.db();
    let buyer = seed_buyer(db, 7).await;
    let product = seed_product(db, "SKU-1", 10_000).await;
    seed_stock(db, &product.id, 10).await;
    let order = place_order(&ctx, &buyer, &product.id, 1).await;

    let cancelled = ctx
        .engine
        .transition(
            &order.id,
            OrderStatus::Cancelled,
            &Actor::buyer(&buyer.id),
            Some("changed my mind".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let history = db.orders().history(&order.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].note.as_deref(), Some("changed my mind"));

    // Terminal: nothing moves a cancelled order.
    let err = ctx
        .engine
        .transition(&order.id, OrderStatus::Processing, &Actor::admin("ops-1"), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Domain(CoreError::InvalidState { .. })
    ));
}
