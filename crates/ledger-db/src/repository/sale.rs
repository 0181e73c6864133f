//! # Sale Repository
//!
//! POS/credit sale rows and their line items. Sales are created once,
//! by the engine's sale transaction, and never deleted; voiding is a
//! status change.
//!
//! ## Invoice Numbering
//! `INV-YYYYMMDD-NNNN`, a zero-padded sequence scoped to the calendar
//! day. [`next_invoice_seq`] counts the day's rows inside the creating
//! transaction, so concurrent sales serialize on the write transaction
//! and collisions are impossible (the UNIQUE constraint backs this up).

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use ledger_core::invoice;
use ledger_core::{Sale, SaleItem};

const SALE_COLUMNS: &str = "id, invoice_number, buyer_id, location_id, payment_method, \
                            total_amount, paid_amount, status, created_at";

// =============================================================================
// Transaction Primitives
// =============================================================================

/// Next invoice sequence number for the given day, derived from the
/// count of existing rows inside the same transaction.
pub async fn next_invoice_seq(conn: &mut SqliteConnection, date: NaiveDate) -> DbResult<i64> {
    let pattern = invoice::invoice_day_pattern(date);

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE invoice_number LIKE ?1")
            .bind(pattern)
            .fetch_one(&mut *conn)
            .await?;

    Ok(count + 1)
}

/// Inserts a sale row.
pub async fn insert(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, invoice_number = %sale.invoice_number, "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, invoice_number, buyer_id, location_id, payment_method,
            total_amount, paid_amount, status, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.invoice_number)
    .bind(&sale.buyer_id)
    .bind(&sale.location_id)
    .bind(sale.payment_method)
    .bind(sale.total_amount)
    .bind(sale.paid_amount)
    .bind(sale.status)
    .bind(sale.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts a sale line item. Product name and price are frozen
/// snapshots; catalog changes never rewrite history.
pub async fn insert_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, product_id, name_snapshot, quantity, unit_price, line_total
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(&item.name_snapshot)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.line_total)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Pool-Level Reads
// =============================================================================

/// Repository for sale reads.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets a sale by invoice number.
    pub async fn get_by_invoice_number(&self, invoice_number: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE invoice_number = ?1"
        ))
        .bind(invoice_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// All line items of a sale.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, name_snapshot, quantity, unit_price, line_total
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Count of sales for one buyer (diagnostics).
    pub async fn count_for_buyer(&self, buyer_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE buyer_id = ?1")
            .bind(buyer_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
