//! # Receivable Repository
//!
//! Open credit positions (utang) per buyer, one per credit sale or
//! pay-later order.
//!
//! Settlement math lives on `ledger_core::Receivable`; this module only
//! persists the recomputed row. Both creation and settlement run inside
//! the same transaction as the matching `buyers.current_debt`
//! adjustment.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use ledger_core::{Receivable, ReferenceType};

const COLUMNS: &str = "id, buyer_id, reference_type, reference_id, amount, paid_amount, \
                       balance, due_date, status, created_at, updated_at";

// =============================================================================
// Transaction Primitives
// =============================================================================

/// Inserts a new receivable.
pub async fn insert(conn: &mut SqliteConnection, receivable: &Receivable) -> DbResult<()> {
    debug!(
        buyer_id = %receivable.buyer_id,
        amount = receivable.amount,
        "Opening receivable"
    );

    sqlx::query(
        r#"
        INSERT INTO receivables (
            id, buyer_id, reference_type, reference_id, amount, paid_amount,
            balance, due_date, status, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&receivable.id)
    .bind(&receivable.buyer_id)
    .bind(receivable.reference_type)
    .bind(&receivable.reference_id)
    .bind(receivable.amount)
    .bind(receivable.paid_amount)
    .bind(receivable.balance)
    .bind(receivable.due_date)
    .bind(receivable.status)
    .bind(receivable.created_at)
    .bind(receivable.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Fetches the receivable opened for one sale or order, inside a
/// transaction.
pub async fn get_by_reference(
    conn: &mut SqliteConnection,
    reference_type: ReferenceType,
    reference_id: &str,
) -> DbResult<Option<Receivable>> {
    let receivable = sqlx::query_as::<_, Receivable>(&format!(
        "SELECT {COLUMNS} FROM receivables WHERE reference_type = ?1 AND reference_id = ?2"
    ))
    .bind(reference_type)
    .bind(reference_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(receivable)
}

/// Persists a settlement recomputed by `Receivable::apply_payment`.
pub async fn update_settlement(
    conn: &mut SqliteConnection,
    receivable: &Receivable,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE receivables
        SET paid_amount = ?2, balance = ?3, status = ?4, updated_at = ?5
        WHERE id = ?1
        "#,
    )
    .bind(&receivable.id)
    .bind(receivable.paid_amount)
    .bind(receivable.balance)
    .bind(receivable.status)
    .bind(receivable.updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Receivable", &receivable.id));
    }

    Ok(())
}

// =============================================================================
// Pool-Level Reads
// =============================================================================

/// Repository for receivable reads.
#[derive(Debug, Clone)]
pub struct ReceivableRepository {
    pool: SqlitePool,
}

impl ReceivableRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReceivableRepository { pool }
    }

    /// The receivable opened for one sale or order, if any.
    pub async fn get_by_reference(
        &self,
        reference_type: ReferenceType,
        reference_id: &str,
    ) -> DbResult<Option<Receivable>> {
        let receivable = sqlx::query_as::<_, Receivable>(&format!(
            "SELECT {COLUMNS} FROM receivables WHERE reference_type = ?1 AND reference_id = ?2"
        ))
        .bind(reference_type)
        .bind(reference_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(receivable)
    }

    /// Unpaid and partially paid receivables for one buyer, oldest due
    /// date first.
    pub async fn list_open_for_buyer(&self, buyer_id: &str) -> DbResult<Vec<Receivable>> {
        let receivables = sqlx::query_as::<_, Receivable>(&format!(
            "SELECT {COLUMNS} FROM receivables \
             WHERE buyer_id = ?1 AND status IN ('unpaid', 'partial') \
             ORDER BY due_date"
        ))
        .bind(buyer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(receivables)
    }
}
