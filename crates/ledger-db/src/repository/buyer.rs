//! # Buyer Repository
//!
//! Warung (buyer) rows, including the running `current_debt` balance.
//!
//! `current_debt` is the single source of truth for what a buyer owes.
//! It is adjusted only by [`adjust_debt`], inside the same transaction
//! that creates or settles a receivable, so the two can never drift.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use ledger_core::Buyer;

const COLUMNS: &str = "id, name, credit_term_days, current_debt, is_blocked, blocked_reason, \
                       created_at, updated_at";

// =============================================================================
// Transaction Primitives
// =============================================================================

/// Fetches a buyer inside a transaction.
pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Buyer>> {
    let buyer = sqlx::query_as::<_, Buyer>(&format!(
        "SELECT {COLUMNS} FROM buyers WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(buyer)
}

/// Adjusts the buyer's running debt by `delta` (positive when a
/// receivable is opened, negative when one is settled).
pub async fn adjust_debt(conn: &mut SqliteConnection, buyer_id: &str, delta: i64) -> DbResult<()> {
    debug!(buyer_id = %buyer_id, delta = delta, "Adjusting buyer debt");

    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE buyers
        SET current_debt = current_debt + ?2, updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(buyer_id)
    .bind(delta)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Buyer", buyer_id));
    }

    Ok(())
}

// =============================================================================
// Pool-Level Access
// =============================================================================

/// Repository for buyer rows.
#[derive(Debug, Clone)]
pub struct BuyerRepository {
    pool: SqlitePool,
}

impl BuyerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BuyerRepository { pool }
    }

    /// Gets a buyer by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Buyer>> {
        let buyer = sqlx::query_as::<_, Buyer>(&format!(
            "SELECT {COLUMNS} FROM buyers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(buyer)
    }

    /// Inserts a new buyer.
    pub async fn insert(&self, buyer: &Buyer) -> DbResult<()> {
        debug!(id = %buyer.id, name = %buyer.name, "Inserting buyer");

        sqlx::query(
            r#"
            INSERT INTO buyers (
                id, name, credit_term_days, current_debt,
                is_blocked, blocked_reason, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&buyer.id)
        .bind(&buyer.name)
        .bind(buyer.credit_term_days)
        .bind(buyer.current_debt)
        .bind(buyer.is_blocked)
        .bind(&buyer.blocked_reason)
        .bind(buyer.created_at)
        .bind(buyer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Blocks a buyer from creating new sales.
    pub async fn block(&self, id: &str, reason: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE buyers
            SET is_blocked = 1, blocked_reason = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(reason)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Buyer", id));
        }

        Ok(())
    }

    /// Lifts a block.
    pub async fn unblock(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE buyers
            SET is_blocked = 0, blocked_reason = NULL, updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Buyer", id));
        }

        Ok(())
    }
}
