//! # Stock Repository: the Stock Reservation Unit
//!
//! Atomic check-and-decrement of on-hand quantity per
//! (location, product), with an append-only movement row per mutation.
//!
//! ## Reservation Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  reserve(conn, location, demands, reference)                        │
//! │                                                                     │
//! │  for each (product, qty):                                           │
//! │      UPDATE stock SET quantity = quantity - qty                     │
//! │       WHERE location_id = ? AND product_id = ? AND quantity >= qty  │
//! │            │                                                        │
//! │            ├── 0 rows → under-stocked (or missing row):             │
//! │            │            report available vs requested, caller       │
//! │            │            drops the transaction → nothing committed   │
//! │            │                                                        │
//! │            └── 1 row  → append 'out' movement referencing the       │
//! │                         causing sale/order                          │
//! │                                                                     │
//! │  The conditional UPDATE is the compare-and-swap; SQLite serializes  │
//! │  writers, so two racing reservations cannot both pass the guard.    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Movement rows are the only audit trail; a quantity change without a
//! movement row must be impossible, which is why every mutation here is
//! a transaction primitive.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::generate_id;
use ledger_core::{StockDirection, StockLevel, StockMovement};

/// One line of a reservation request.
#[derive(Debug, Clone)]
pub struct StockDemand {
    pub product_id: String,
    pub quantity: i64,
}

/// Result of a reservation attempt. `Insufficient` names the first
/// under-stocked product; the caller must abort its transaction.
#[derive(Debug, Clone)]
pub enum ReserveOutcome {
    Reserved,
    Insufficient {
        product_id: String,
        available: i64,
        requested: i64,
    },
}

impl ReserveOutcome {
    #[inline]
    pub fn is_reserved(&self) -> bool {
        matches!(self, ReserveOutcome::Reserved)
    }
}

// =============================================================================
// Transaction Primitives
// =============================================================================

/// Current available quantity, zero when no stock row exists.
pub async fn available(
    conn: &mut SqliteConnection,
    location_id: &str,
    product_id: &str,
) -> DbResult<i64> {
    let qty: Option<i64> = sqlx::query_scalar(
        "SELECT quantity FROM stock WHERE location_id = ?1 AND product_id = ?2",
    )
    .bind(location_id)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(qty.unwrap_or(0))
}

/// Reserves stock for every demand or none of them.
///
/// Decrements are conditional on sufficient quantity; the first line
/// that fails stops the loop and reports availability. Partial
/// decrements roll back with the caller's transaction.
pub async fn reserve(
    conn: &mut SqliteConnection,
    location_id: &str,
    demands: &[StockDemand],
    reference_type: &str,
    reference_id: &str,
    actor: &str,
) -> DbResult<ReserveOutcome> {
    for demand in demands {
        let result = sqlx::query(
            r#"
            UPDATE stock
            SET quantity = quantity - ?1
            WHERE location_id = ?2 AND product_id = ?3 AND quantity >= ?1
            "#,
        )
        .bind(demand.quantity)
        .bind(location_id)
        .bind(&demand.product_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            let avail = available(conn, location_id, &demand.product_id).await?;
            debug!(
                product_id = %demand.product_id,
                available = avail,
                requested = demand.quantity,
                "Stock reservation failed"
            );
            return Ok(ReserveOutcome::Insufficient {
                product_id: demand.product_id.clone(),
                available: avail,
                requested: demand.quantity,
            });
        }

        let movement = StockMovement {
            id: generate_id(),
            direction: StockDirection::Out,
            product_id: demand.product_id.clone(),
            quantity: demand.quantity,
            source_location_id: Some(location_id.to_string()),
            dest_location_id: None,
            reference_type: reference_type.to_string(),
            reference_id: reference_id.to_string(),
            actor: actor.to_string(),
            created_at: Utc::now(),
        };
        record_movement(conn, &movement).await?;
    }

    Ok(ReserveOutcome::Reserved)
}

/// Receives stock into a location (restock / goods-in), creating the
/// stock row if needed, with an 'in' movement.
pub async fn receive(
    conn: &mut SqliteConnection,
    location_id: &str,
    product_id: &str,
    quantity: i64,
    reference_id: &str,
    actor: &str,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock (location_id, product_id, quantity)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(location_id, product_id)
        DO UPDATE SET quantity = quantity + excluded.quantity
        "#,
    )
    .bind(location_id)
    .bind(product_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    let movement = StockMovement {
        id: generate_id(),
        direction: StockDirection::In,
        product_id: product_id.to_string(),
        quantity,
        source_location_id: None,
        dest_location_id: Some(location_id.to_string()),
        reference_type: "restock".to_string(),
        reference_id: reference_id.to_string(),
        actor: actor.to_string(),
        created_at: Utc::now(),
    };
    record_movement(conn, &movement).await
}

/// Moves stock between locations: conditional decrement at the source,
/// upsert-increment at the destination, one 'transfer' movement row.
pub async fn transfer(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
    source_location_id: &str,
    dest_location_id: &str,
    reference_id: &str,
    actor: &str,
) -> DbResult<ReserveOutcome> {
    let result = sqlx::query(
        r#"
        UPDATE stock
        SET quantity = quantity - ?1
        WHERE location_id = ?2 AND product_id = ?3 AND quantity >= ?1
        "#,
    )
    .bind(quantity)
    .bind(source_location_id)
    .bind(product_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let avail = available(conn, source_location_id, product_id).await?;
        return Ok(ReserveOutcome::Insufficient {
            product_id: product_id.to_string(),
            available: avail,
            requested: quantity,
        });
    }

    sqlx::query(
        r#"
        INSERT INTO stock (location_id, product_id, quantity)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(location_id, product_id)
        DO UPDATE SET quantity = quantity + excluded.quantity
        "#,
    )
    .bind(dest_location_id)
    .bind(product_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    let movement = StockMovement {
        id: generate_id(),
        direction: StockDirection::Transfer,
        product_id: product_id.to_string(),
        quantity,
        source_location_id: Some(source_location_id.to_string()),
        dest_location_id: Some(dest_location_id.to_string()),
        reference_type: "transfer".to_string(),
        reference_id: reference_id.to_string(),
        actor: actor.to_string(),
        created_at: Utc::now(),
    };
    record_movement(conn, &movement).await?;

    Ok(ReserveOutcome::Reserved)
}

/// Appends a movement row. Movements are immutable once written; there
/// is deliberately no update or delete primitive.
pub async fn record_movement(
    conn: &mut SqliteConnection,
    movement: &StockMovement,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, direction, product_id, quantity,
            source_location_id, dest_location_id,
            reference_type, reference_id, actor, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&movement.id)
    .bind(movement.direction)
    .bind(&movement.product_id)
    .bind(movement.quantity)
    .bind(&movement.source_location_id)
    .bind(&movement.dest_location_id)
    .bind(&movement.reference_type)
    .bind(&movement.reference_id)
    .bind(&movement.actor)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Pool-Level Reads
// =============================================================================

/// Repository for stock reads and test seeding.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Current on-hand quantity (zero when no row exists).
    pub async fn level(&self, location_id: &str, product_id: &str) -> DbResult<i64> {
        let qty: Option<i64> = sqlx::query_scalar(
            "SELECT quantity FROM stock WHERE location_id = ?1 AND product_id = ?2",
        )
        .bind(location_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(qty.unwrap_or(0))
    }

    /// All stock rows at a location.
    pub async fn levels_at(&self, location_id: &str) -> DbResult<Vec<StockLevel>> {
        let levels = sqlx::query_as::<_, StockLevel>(
            "SELECT location_id, product_id, quantity FROM stock WHERE location_id = ?1 ORDER BY product_id",
        )
        .bind(location_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(levels)
    }

    /// Movement rows caused by one sale/order/transfer, oldest first.
    pub async fn movements_for(
        &self,
        reference_type: &str,
        reference_id: &str,
    ) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, direction, product_id, quantity,
                   source_location_id, dest_location_id,
                   reference_type, reference_id, actor, created_at
            FROM stock_movements
            WHERE reference_type = ?1 AND reference_id = ?2
            ORDER BY created_at
            "#,
        )
        .bind(reference_type)
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Sum of all 'out' movement quantities for a product. Equals the
    /// total successfully decremented since the audit trail is the only
    /// mutation path.
    pub async fn total_out(&self, product_id: &str) -> DbResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(quantity) FROM stock_movements WHERE product_id = ?1 AND direction = 'out'",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0))
    }
}
