//! # Order Repository
//!
//! Online order rows, their items, the 1:1 shipment record, and the
//! status history audit trail.
//!
//! Status is only written by [`set_status`], and the engine pairs every
//! call with [`append_history`] inside the same transaction, so the
//! history reconstructs the order's full lifecycle.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use ledger_core::invoice;
use ledger_core::{Order, OrderItem, OrderStatus, Shipment};

const ORDER_COLUMNS: &str = "id, order_number, buyer_id, location_id, subtotal, shipping_fee, \
                             discount, tax, total, status, address, created_at, updated_at";

const SHIPMENT_COLUMNS: &str =
    "id, order_id, courier, tracking_number, status, shipped_at, delivered_at";

/// One accepted status transition (who/why), for later reconstruction
/// of the order's history.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StatusChange {
    pub id: String,
    pub order_id: String,
    pub from_status: OrderStatus,
    pub to_status: OrderStatus,
    pub actor: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Transaction Primitives
// =============================================================================

/// Next order sequence number for the given day (same in-transaction
/// counting scheme as invoice numbers).
pub async fn next_order_seq(conn: &mut SqliteConnection, date: NaiveDate) -> DbResult<i64> {
    let pattern = invoice::order_day_pattern(date);

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE order_number LIKE ?1")
            .bind(pattern)
            .fetch_one(&mut *conn)
            .await?;

    Ok(count + 1)
}

/// Fetches an order inside the write transaction. Racing transitions
/// serialize on the transaction, so the loser re-validates against the
/// winner's status.
pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(order)
}

/// Inserts an order row.
pub async fn insert(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    debug!(id = %order.id, order_number = %order.order_number, "Inserting order");

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, order_number, buyer_id, location_id,
            subtotal, shipping_fee, discount, tax, total,
            status, address, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&order.id)
    .bind(&order.order_number)
    .bind(&order.buyer_id)
    .bind(&order.location_id)
    .bind(order.subtotal)
    .bind(order.shipping_fee)
    .bind(order.discount)
    .bind(order.tax)
    .bind(order.total)
    .bind(order.status)
    .bind(&order.address)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts an order line item (frozen product snapshot).
pub async fn insert_item(conn: &mut SqliteConnection, item: &OrderItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_items (
            id, order_id, product_id, name_snapshot, quantity, unit_price, line_total
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&item.id)
    .bind(&item.order_id)
    .bind(&item.product_id)
    .bind(&item.name_snapshot)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.line_total)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts the order's shipment record.
pub async fn insert_shipment(conn: &mut SqliteConnection, shipment: &Shipment) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO shipments (
            id, order_id, courier, tracking_number, status, shipped_at, delivered_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&shipment.id)
    .bind(&shipment.order_id)
    .bind(&shipment.courier)
    .bind(&shipment.tracking_number)
    .bind(shipment.status)
    .bind(shipment.shipped_at)
    .bind(shipment.delivered_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Writes the order's new status. The caller has already validated the
/// transition; this is pure persistence.
pub async fn set_status(
    conn: &mut SqliteConnection,
    order_id: &str,
    status: OrderStatus,
) -> DbResult<()> {
    let now = Utc::now();

    let result = sqlx::query("UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(order_id)
        .bind(status)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Order", order_id));
    }

    Ok(())
}

/// Appends a status-history row for an accepted transition.
pub async fn append_history(
    conn: &mut SqliteConnection,
    change: &StatusChange,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_status_history (
            id, order_id, from_status, to_status, actor, note, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&change.id)
    .bind(&change.order_id)
    .bind(change.from_status)
    .bind(change.to_status)
    .bind(&change.actor)
    .bind(&change.note)
    .bind(change.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Marks the shipment in transit with a shipped timestamp.
pub async fn mark_shipment_in_transit(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> DbResult<()> {
    let now = Utc::now();

    let result = sqlx::query(
        "UPDATE shipments SET status = 'in_transit', shipped_at = ?2 WHERE order_id = ?1",
    )
    .bind(order_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Shipment for order", order_id));
    }

    Ok(())
}

/// Marks the shipment delivered with a delivered timestamp.
pub async fn mark_shipment_delivered(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> DbResult<()> {
    let now = Utc::now();

    let result = sqlx::query(
        "UPDATE shipments SET status = 'delivered', delivered_at = ?2 WHERE order_id = ?1",
    )
    .bind(order_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Shipment for order", order_id));
    }

    Ok(())
}

// =============================================================================
// Pool-Level Reads
// =============================================================================

/// Repository for order reads.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// All line items of an order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, name_snapshot, quantity, unit_price, line_total
            FROM order_items
            WHERE order_id = ?1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// The order's shipment record.
    pub async fn get_shipment(&self, order_id: &str) -> DbResult<Option<Shipment>> {
        let shipment = sqlx::query_as::<_, Shipment>(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE order_id = ?1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shipment)
    }

    /// Accepted transitions for an order, oldest first.
    pub async fn history(&self, order_id: &str) -> DbResult<Vec<StatusChange>> {
        let changes = sqlx::query_as::<_, StatusChange>(
            r#"
            SELECT id, order_id, from_status, to_status, actor, note, created_at
            FROM order_status_history
            WHERE order_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(changes)
    }
}
