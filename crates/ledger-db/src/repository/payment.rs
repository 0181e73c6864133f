//! # Payment Repository
//!
//! Gateway payment attempts, one live row per order.
//!
//! ## Idempotency
//! `payments.order_id` is UNIQUE. [`upsert_intent`] inserts the new
//! attempt with `ON CONFLICT(order_id) DO UPDATE ... WHERE the stored
//! row is dead (failed/expired)`. When the stored row is live (pending
//! or success), zero rows are affected and the caller returns the
//! stored handle instead of creating a second charge. Two racing
//! intents for the same order therefore converge on one row no matter
//! how they interleave.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use ledger_core::{Payment, PaymentStatus};

const COLUMNS: &str = "id, order_id, status, external_handle, redirect_url, gateway_payload, \
                       amount, expires_at, paid_at, created_at, updated_at";

// =============================================================================
// Transaction Primitives
// =============================================================================

/// Fetches the order's payment row inside a transaction.
pub async fn get_by_order(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> DbResult<Option<Payment>> {
    let payment = sqlx::query_as::<_, Payment>(&format!(
        "SELECT {COLUMNS} FROM payments WHERE order_id = ?1"
    ))
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(payment)
}

/// Writes a payment attempt, replacing a dead (failed/expired) one.
///
/// Returns `true` when this attempt's row was written, `false` when a
/// live row already holds the slot and the caller should reuse it.
pub async fn upsert_intent(conn: &mut SqliteConnection, payment: &Payment) -> DbResult<bool> {
    debug!(order_id = %payment.order_id, "Writing payment intent");

    let result = sqlx::query(
        r#"
        INSERT INTO payments (
            id, order_id, status, external_handle, redirect_url,
            gateway_payload, amount, expires_at, paid_at, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(order_id) DO UPDATE SET
            id = excluded.id,
            status = excluded.status,
            external_handle = excluded.external_handle,
            redirect_url = excluded.redirect_url,
            gateway_payload = excluded.gateway_payload,
            amount = excluded.amount,
            expires_at = excluded.expires_at,
            paid_at = NULL,
            updated_at = excluded.updated_at
        WHERE payments.status IN ('failed', 'expired')
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.order_id)
    .bind(payment.status)
    .bind(&payment.external_handle)
    .bind(&payment.redirect_url)
    .bind(&payment.gateway_payload)
    .bind(payment.amount)
    .bind(payment.expires_at)
    .bind(payment.paid_at)
    .bind(payment.created_at)
    .bind(payment.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Records a terminal gateway result on the order's payment row.
pub async fn mark_result(
    conn: &mut SqliteConnection,
    order_id: &str,
    status: PaymentStatus,
    gateway_payload: Option<&str>,
) -> DbResult<()> {
    let now = Utc::now();
    let paid_at = if status == PaymentStatus::Success {
        Some(now)
    } else {
        None
    };

    let result = sqlx::query(
        r#"
        UPDATE payments
        SET status = ?2,
            gateway_payload = COALESCE(?3, gateway_payload),
            paid_at = ?4,
            updated_at = ?5
        WHERE order_id = ?1
        "#,
    )
    .bind(order_id)
    .bind(status)
    .bind(gateway_payload)
    .bind(paid_at)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Payment for order", order_id));
    }

    Ok(())
}

// =============================================================================
// Pool-Level Reads
// =============================================================================

/// Repository for payment reads.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// The order's payment row, if any.
    pub async fn get_by_order(&self, order_id: &str) -> DbResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {COLUMNS} FROM payments WHERE order_id = ?1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }
}
