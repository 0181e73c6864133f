//! Integration tests for the stock reservation primitives: atomic
//! check-and-decrement, all-or-nothing multi-line reservation, and the
//! append-only movement audit trail.

use chrono::Utc;
use ledger_core::{Product, StockDirection};
use ledger_db::repository::{generate_id, stock};
use ledger_db::{Database, DbConfig, DbError, ReserveOutcome, StockDemand};

async fn setup() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

async fn seed_location(db: &Database, id: &str) {
    db.products().insert_location(id, "Gudang Utama").await.unwrap();
}

async fn seed_product(db: &Database, sku: &str, sell_price: i64) -> String {
    let now = Utc::now();
    let product = Product {
        id: generate_id(),
        sku: sku.to_string(),
        name: format!("Product {sku}"),
        sell_price,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.products().insert(&product).await.unwrap();
    product.id
}

async fn seed_stock(db: &Database, location_id: &str, product_id: &str, qty: i64) {
    let mut tx = db.begin().await.unwrap();
    stock::receive(&mut tx, location_id, product_id, qty, "seed", "tester")
        .await
        .unwrap();
    tx.commit().await.unwrap();
}

fn demand(product_id: &str, quantity: i64) -> StockDemand {
    StockDemand {
        product_id: product_id.to_string(),
        quantity,
    }
}

#[tokio::test]
async fn test_reserve_decrements_and_writes_movements() {
    let db = setup().await;
    seed_location(&db, "loc-1").await;
    let product = seed_product(&db, "SKU-1", 5_000).await;
    seed_stock(&db, "loc-1", &product, 10).await;

    let mut tx = db.begin().await.unwrap();
    let outcome = stock::reserve(&mut tx, "loc-1", &[demand(&product, 4)], "sale", "sale-1", "kasir")
        .await
        .unwrap();
    assert!(outcome.is_reserved());
    tx.commit().await.unwrap();

    assert_eq!(db.stock().level("loc-1", &product).await.unwrap(), 6);

    let movements = db.stock().movements_for("sale", "sale-1").await.unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].direction, StockDirection::Out);
    assert_eq!(movements[0].quantity, 4);
    assert_eq!(movements[0].source_location_id.as_deref(), Some("loc-1"));
    assert_eq!(movements[0].actor, "kasir");
}

#[tokio::test]
async fn test_reserve_insufficient_reports_availability() {
    let db = setup().await;
    seed_location(&db, "loc-1").await;
    let product = seed_product(&db, "SKU-1", 5_000).await;
    seed_stock(&db, "loc-1", &product, 2).await;

    let mut tx = db.begin().await.unwrap();
    let outcome = stock::reserve(&mut tx, "loc-1", &[demand(&product, 3)], "sale", "sale-1", "kasir")
        .await
        .unwrap();

    match outcome {
        ReserveOutcome::Insufficient {
            product_id,
            available,
            requested,
        } => {
            assert_eq!(product_id, product);
            assert_eq!(available, 2);
            assert_eq!(requested, 3);
        }
        ReserveOutcome::Reserved => panic!("reservation should have failed"),
    }
}

#[tokio::test]
async fn test_reserve_missing_stock_row_reports_zero() {
    let db = setup().await;
    seed_location(&db, "loc-1").await;
    let product = seed_product(&db, "SKU-1", 5_000).await;
    // No stock row at all.

    let mut tx = db.begin().await.unwrap();
    let outcome = stock::reserve(&mut tx, "loc-1", &[demand(&product, 1)], "sale", "sale-1", "kasir")
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        ReserveOutcome::Insufficient { available: 0, .. }
    ));
}

#[tokio::test]
async fn test_failed_multi_line_reservation_leaves_no_trace() {
    let db = setup().await;
    seed_location(&db, "loc-1").await;
    let plenty = seed_product(&db, "SKU-A", 5_000).await;
    let scarce = seed_product(&db, "SKU-B", 7_000).await;
    seed_stock(&db, "loc-1", &plenty, 10).await;
    seed_stock(&db, "loc-1", &scarce, 1).await;

    {
        let mut tx = db.begin().await.unwrap();
        let outcome = stock::reserve(
            &mut tx,
            "loc-1",
            &[demand(&plenty, 5), demand(&scarce, 2)],
            "sale",
            "sale-1",
            "kasir",
        )
        .await
        .unwrap();
        assert!(!outcome.is_reserved());
        // Dropped without commit, as the engine does on failure.
    }

    // The first line's decrement must have rolled back with the
    // transaction.
    assert_eq!(db.stock().level("loc-1", &plenty).await.unwrap(), 10);
    assert_eq!(db.stock().level("loc-1", &scarce).await.unwrap(), 1);
    assert!(db
        .stock()
        .movements_for("sale", "sale-1")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_reservations_cannot_oversell() {
    let db = setup().await;
    seed_location(&db, "loc-1").await;
    let product = seed_product(&db, "SKU-1", 5_000).await;
    seed_stock(&db, "loc-1", &product, 5).await;

    let mut tx = db.begin().await.unwrap();
    assert!(
        stock::reserve(&mut tx, "loc-1", &[demand(&product, 3)], "sale", "sale-1", "kasir")
            .await
            .unwrap()
            .is_reserved()
    );
    tx.commit().await.unwrap();

    let mut tx = db.begin().await.unwrap();
    let outcome = stock::reserve(&mut tx, "loc-1", &[demand(&product, 3)], "sale", "sale-2", "kasir")
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        ReserveOutcome::Insufficient {
            available: 2,
            requested: 3,
            ..
        }
    ));
    drop(tx);

    assert_eq!(db.stock().level("loc-1", &product).await.unwrap(), 2);
    assert_eq!(db.stock().total_out(&product).await.unwrap(), 3);
}

#[tokio::test]
async fn test_check_constraint_backs_up_the_guard() {
    let db = setup().await;
    seed_location(&db, "loc-1").await;
    let product = seed_product(&db, "SKU-1", 5_000).await;
    seed_stock(&db, "loc-1", &product, 1).await;

    // An unconditional decrement bypassing the reservation primitive
    // must be stopped by the schema itself.
    let err = sqlx::query("UPDATE stock SET quantity = quantity - 5 WHERE product_id = ?1")
        .bind(&product)
        .execute(db.pool())
        .await
        .unwrap_err();

    assert!(matches!(DbError::from(err), DbError::CheckViolation { .. }));
    assert_eq!(db.stock().level("loc-1", &product).await.unwrap(), 1);
}

#[tokio::test]
async fn test_transfer_moves_quantity_between_locations() {
    let db = setup().await;
    seed_location(&db, "loc-1").await;
    seed_location(&db, "loc-2").await;
    let product = seed_product(&db, "SKU-1", 5_000).await;
    seed_stock(&db, "loc-1", &product, 8).await;

    let mut tx = db.begin().await.unwrap();
    let outcome = stock::transfer(&mut tx, &product, 3, "loc-1", "loc-2", "tf-1", "gudang")
        .await
        .unwrap();
    assert!(outcome.is_reserved());
    tx.commit().await.unwrap();

    assert_eq!(db.stock().level("loc-1", &product).await.unwrap(), 5);
    assert_eq!(db.stock().level("loc-2", &product).await.unwrap(), 3);

    let movements = db.stock().movements_for("transfer", "tf-1").await.unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].direction, StockDirection::Transfer);
}

#[tokio::test]
async fn test_receive_accumulates_quantity() {
    let db = setup().await;
    seed_location(&db, "loc-1").await;
    let product = seed_product(&db, "SKU-1", 5_000).await;

    seed_stock(&db, "loc-1", &product, 4).await;
    seed_stock(&db, "loc-1", &product, 6).await;

    assert_eq!(db.stock().level("loc-1", &product).await.unwrap(), 10);
}
