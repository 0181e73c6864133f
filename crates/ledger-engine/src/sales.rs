//! # Sale Creation
//!
//! `create_sale` turns a POS/credit sale request into one atomic unit
//! of work: stock reservation, sale + item rows, and (for credit) the
//! receivable and buyer debt accrual. Any failure aborts the whole
//! transaction; a sale either exists with its stock decremented and
//! its receivable opened, or leaves no trace at all.

use chrono::{Duration, Utc};
use tracing::info;

use crate::error::EngineResult;
use crate::Engine;
use ledger_core::{
    invoice, validation, CoreError, Money, PaymentMethod, Receivable, ReceivableStatus,
    ReferenceType, Sale, SaleItem, SaleStatus,
};
use ledger_db::repository::{buyer, generate_id, product, receivable, sale, stock};
use ledger_db::{DbError, ReserveOutcome, StockDemand};

/// One requested sale line. `unit_price` overrides the product's
/// current sell price when present (negotiated wholesale pricing).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NewSaleLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Option<i64>,
}

/// A sale creation request.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NewSale {
    pub buyer_id: String,
    pub location_id: String,
    pub items: Vec<NewSaleLine>,
    pub payment_method: PaymentMethod,
    /// Defaults to zero for credit sales, the full total otherwise.
    pub paid_amount: Option<i64>,
    /// Audit label for stock movements.
    pub created_by: String,
}

impl Engine {
    /// Creates a sale.
    ///
    /// Preconditions are checked inside the write transaction: the
    /// buyer must exist and not be blocked, every product must exist
    /// and be active, and stock must cover every line. Pricing and
    /// product names are frozen into the item rows.
    ///
    /// If the sale leaves a balance (`total - paid > 0`) a receivable
    /// is opened with the buyer's credit terms, and the buyer's
    /// running debt grows by the balance in the same transaction.
    pub async fn create_sale(&self, request: NewSale) -> EngineResult<Sale> {
        validation::validate_line_count(request.items.len())?;
        for line in &request.items {
            validation::validate_quantity(line.quantity)?;
            if let Some(price) = line.unit_price {
                validation::validate_amount(price)?;
            }
        }
        if let Some(paid) = request.paid_amount {
            validation::validate_amount(paid)?;
        }

        let mut tx = self.db().begin().await?;

        let buyer_row = buyer::get(&mut tx, &request.buyer_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Buyer", &request.buyer_id))?;

        if buyer_row.is_blocked {
            return Err(CoreError::BuyerBlocked {
                buyer_id: buyer_row.id,
                reason: buyer_row
                    .blocked_reason
                    .unwrap_or_else(|| "blocked".to_string()),
            }
            .into());
        }

        let now = Utc::now();
        let sale_id = generate_id();

        // Price and snapshot every line before touching stock.
        let mut items = Vec::with_capacity(request.items.len());
        let mut demands = Vec::with_capacity(request.items.len());
        let mut total = Money::zero();

        for line in &request.items {
            let product_row = product::get_active(&mut tx, &line.product_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Product", &line.product_id))?;

            let unit_price = line.unit_price.unwrap_or(product_row.sell_price);
            let line_total = Money::new(unit_price).multiply_quantity(line.quantity);
            total += line_total;

            items.push(SaleItem {
                id: generate_id(),
                sale_id: sale_id.clone(),
                product_id: product_row.id.clone(),
                name_snapshot: product_row.name,
                quantity: line.quantity,
                unit_price,
                line_total: line_total.amount(),
            });
            demands.push(StockDemand {
                product_id: product_row.id,
                quantity: line.quantity,
            });
        }

        let paid = match request.paid_amount {
            Some(paid) => Money::new(paid),
            None if request.payment_method.is_credit() => Money::zero(),
            None => total,
        };
        if paid.amount() > total.amount() {
            return Err(CoreError::InvalidPayment {
                paid: paid.amount(),
                total: total.amount(),
            }
            .into());
        }

        let outcome = stock::reserve(
            &mut tx,
            &request.location_id,
            &demands,
            "sale",
            &sale_id,
            &request.created_by,
        )
        .await?;
        if let ReserveOutcome::Insufficient {
            product_id,
            available,
            requested,
        } = outcome
        {
            // Dropping the transaction rolls back any earlier decrements.
            return Err(CoreError::InsufficientStock {
                product_id,
                available,
                requested,
            }
            .into());
        }

        let seq = sale::next_invoice_seq(&mut tx, now.date_naive()).await?;
        let sale_row = Sale {
            id: sale_id.clone(),
            invoice_number: invoice::format_invoice_number(now.date_naive(), seq),
            buyer_id: buyer_row.id.clone(),
            location_id: request.location_id.clone(),
            payment_method: request.payment_method,
            total_amount: total.amount(),
            paid_amount: paid.amount(),
            status: SaleStatus::Completed,
            created_at: now,
        };
        sale::insert(&mut tx, &sale_row).await?;
        for item in &items {
            sale::insert_item(&mut tx, item).await?;
        }

        let balance = sale_row.balance();
        if balance.is_positive() {
            let receivable_row = Receivable {
                id: generate_id(),
                buyer_id: buyer_row.id.clone(),
                reference_type: ReferenceType::Sale,
                reference_id: sale_id.clone(),
                amount: total.amount(),
                paid_amount: paid.amount(),
                balance: balance.amount(),
                due_date: now + Duration::days(buyer_row.credit_term_days),
                status: ReceivableStatus::derive(total.amount(), paid.amount()),
                created_at: now,
                updated_at: now,
            };
            receivable::insert(&mut tx, &receivable_row).await?;
            buyer::adjust_debt(&mut tx, &buyer_row.id, balance.amount()).await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            sale_id = %sale_row.id,
            invoice_number = %sale_row.invoice_number,
            buyer_id = %sale_row.buyer_id,
            total = sale_row.total_amount,
            paid = sale_row.paid_amount,
            "Sale created"
        );

        Ok(sale_row)
    }
}
