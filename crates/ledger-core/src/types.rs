//! # Domain Types
//!
//! Core domain types for the warung ledger.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Buyer (warung) ──┬── Sale ── SaleItem          POS / credit path   │
//! │                   │     └── Receivable ◄── current_debt accrual     │
//! │                   └── Order ── OrderItem        online path         │
//! │                         ├── Payment (1:1, gateway-driven)           │
//! │                         └── Shipment                                │
//! │  Stock (location × product) ── StockMovement (append-only audit)    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business number where humans need one (invoice_number, order_number)
//!
//! Monetary fields are i64 minor units; wrap with [`Money`] accessors
//! when doing arithmetic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;

// =============================================================================
// Buyer (Warung)
// =============================================================================

/// A credit-term customer (small shop) who can accumulate a debt balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Buyer {
    pub id: String,
    pub name: String,
    /// Credit terms in days; receivable due dates are created_at + this.
    pub credit_term_days: i64,
    /// Running sum of all open receivable balances for this buyer.
    /// Mutated only in the same transaction that creates or settles a
    /// receivable, never re-derived by read paths.
    pub current_debt: i64,
    /// Blocked buyers cannot create new sales.
    pub is_blocked: bool,
    pub blocked_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Buyer {
    #[inline]
    pub fn current_debt(&self) -> Money {
        Money::new(self.current_debt)
    }
}

// =============================================================================
// Product and Stock
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    /// Stock Keeping Unit - business identifier.
    pub sku: String,
    pub name: String,
    /// Current sell price in minor units; used when a sale line carries
    /// no explicit price.
    pub sell_price: i64,
    /// Whether product is active (soft delete).
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn sell_price(&self) -> Money {
        Money::new(self.sell_price)
    }
}

/// On-hand quantity per (location, product). Never negative; mutated
/// only through the stock reservation primitives, inside a transaction
/// that also appends a [`StockMovement`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockLevel {
    pub location_id: String,
    pub product_id: String,
    pub quantity: i64,
}

/// Direction of a stock mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum StockDirection {
    In,
    Out,
    Transfer,
}

/// An immutable audit record of a single stock quantity change.
///
/// One row per mutation, append-only. `reference_type`/`reference_id`
/// point at the causing sale, order or transfer for traceability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: String,
    pub direction: StockDirection,
    pub product_id: String,
    pub quantity: i64,
    pub source_location_id: Option<String>,
    pub dest_location_id: Option<String>,
    pub reference_type: String,
    pub reference_id: String,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale (point-of-sale / credit)
// =============================================================================

/// How a sale or payment was tendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Qris,
    /// Credit sale against the buyer's terms; defaults to zero paid.
    Credit,
}

impl PaymentMethod {
    /// Credit sales default to nothing paid up front; tendered methods
    /// default to paid in full.
    #[inline]
    pub const fn is_credit(&self) -> bool {
        matches!(self, PaymentMethod::Credit)
    }
}

/// The status of a sale. Cancellation is a status value, never row
/// removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Completed,
    Voided,
}

/// A point-of-sale or credit sale to a warung.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub invoice_number: String,
    pub buyer_id: String,
    pub location_id: String,
    pub payment_method: PaymentMethod,
    pub total_amount: i64,
    /// Invariant: `paid_amount <= total_amount`.
    pub paid_amount: i64,
    pub status: SaleStatus,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Outstanding balance; feeds the receivable when positive.
    #[inline]
    pub fn balance(&self) -> Money {
        Money::new(self.total_amount - self.paid_amount)
    }
}

/// A line item in a sale. Uses the snapshot pattern to freeze the
/// product name and price at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub name_snapshot: String,
    pub quantity: i64,
    /// Unit price in minor units at time of sale (frozen).
    pub unit_price: i64,
    /// unit_price × quantity.
    pub line_total: i64,
}

// =============================================================================
// Order (online)
// =============================================================================

/// The status of an online order.
///
/// Transition rules live in [`crate::status`]; `Paid` and `Failed` are
/// reachable only through the reconciliation entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingPayment,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
    Failed,
    Refunded,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Failed => "failed",
            OrderStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An online order. `total` is derived and fixed once the order is
/// created; only `status` and `updated_at` change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub buyer_id: String,
    /// Fulfillment location for the stock pre-check at payment time.
    pub location_id: String,
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub discount: i64,
    pub tax: i64,
    pub total: i64,
    pub status: OrderStatus,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::new(self.total)
    }
}

/// A line item in an order. Immutable after order creation; price
/// history is preserved even if the catalog price changes later.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub line_total: i64,
}

/// Delivery state of an order's shipment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Pending,
    InTransit,
    Delivered,
}

/// The shipment record attached 1:1 to an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Shipment {
    pub id: String,
    pub order_id: String,
    pub courier: Option<String>,
    pub tracking_number: Option<String>,
    pub status: ShipmentStatus,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Payment (gateway intent)
// =============================================================================

/// Status of the order's payment record. Transitions are
/// one-directional: Pending → Success or Pending → Failed/Expired,
/// never reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Expired,
}

impl PaymentStatus {
    /// Terminal statuses are never mutated again; reapplying a webhook
    /// to one is a no-op.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The engine's record of an attempt to collect payment through the
/// external gateway. At most one row per order (UNIQUE order_id);
/// created lazily on the first payment attempt and updated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub status: PaymentStatus,
    /// Opaque transaction handle issued by the gateway.
    pub external_handle: Option<String>,
    pub redirect_url: Option<String>,
    /// Raw gateway response, stored as JSON text.
    pub gateway_payload: Option<String>,
    pub amount: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Receivable
// =============================================================================

/// What a receivable was opened against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum ReferenceType {
    Sale,
    Order,
}

/// Settlement state of a receivable. Overdue is derived from the due
/// date at read time, not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum ReceivableStatus {
    Unpaid,
    Partial,
    Paid,
}

impl ReceivableStatus {
    /// Derives settlement status from amounts.
    pub const fn derive(amount: i64, paid_amount: i64) -> Self {
        if paid_amount <= 0 {
            ReceivableStatus::Unpaid
        } else if paid_amount >= amount {
            ReceivableStatus::Paid
        } else {
            ReceivableStatus::Partial
        }
    }
}

/// An open balance owed by a buyer for a specific sale or order,
/// tracked to partial or full settlement.
///
/// Invariant: `balance == amount - paid_amount` after every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Receivable {
    pub id: String,
    pub buyer_id: String,
    pub reference_type: ReferenceType,
    pub reference_id: String,
    pub amount: i64,
    pub paid_amount: i64,
    pub balance: i64,
    pub due_date: DateTime<Utc>,
    pub status: ReceivableStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Receivable {
    /// Applies a payment and recomputes balance and status.
    ///
    /// Returns the amount actually applied (capped at the open balance,
    /// so the same cap is what gets deducted from the buyer's debt).
    pub fn apply_payment(&mut self, paid: Money) -> Money {
        let open = Money::new(self.balance);
        let applied = if paid.amount() > open.amount() {
            open
        } else {
            paid
        };

        self.paid_amount += applied.amount();
        self.balance = self.amount - self.paid_amount;
        self.status = ReceivableStatus::derive(self.amount, self.paid_amount);
        applied
    }

    /// Whether the receivable is past its due date and still open.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != ReceivableStatus::Paid && now > self.due_date
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn receivable(amount: i64) -> Receivable {
        let now = Utc::now();
        Receivable {
            id: "r1".to_string(),
            buyer_id: "b1".to_string(),
            reference_type: ReferenceType::Sale,
            reference_id: "s1".to_string(),
            amount,
            paid_amount: 0,
            balance: amount,
            due_date: now + Duration::days(7),
            status: ReceivableStatus::Unpaid,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_receivable_identity_after_every_mutation() {
        let mut r = receivable(100_000);

        let applied = r.apply_payment(Money::new(40_000));
        assert_eq!(applied.amount(), 40_000);
        assert_eq!(r.balance, r.amount - r.paid_amount);
        assert_eq!(r.status, ReceivableStatus::Partial);

        let applied = r.apply_payment(Money::new(60_000));
        assert_eq!(applied.amount(), 60_000);
        assert_eq!(r.balance, 0);
        assert_eq!(r.status, ReceivableStatus::Paid);
    }

    #[test]
    fn test_receivable_overpayment_caps_at_balance() {
        let mut r = receivable(50_000);
        let applied = r.apply_payment(Money::new(80_000));
        assert_eq!(applied.amount(), 50_000);
        assert_eq!(r.paid_amount, 50_000);
        assert_eq!(r.balance, 0);
        assert_eq!(r.status, ReceivableStatus::Paid);
    }

    #[test]
    fn test_receivable_status_derivation() {
        assert_eq!(ReceivableStatus::derive(100, 0), ReceivableStatus::Unpaid);
        assert_eq!(ReceivableStatus::derive(100, 50), ReceivableStatus::Partial);
        assert_eq!(ReceivableStatus::derive(100, 100), ReceivableStatus::Paid);
    }

    #[test]
    fn test_receivable_overdue_is_derived() {
        let mut r = receivable(10_000);
        let now = Utc::now();
        assert!(!r.is_overdue(now));
        assert!(r.is_overdue(now + Duration::days(8)));

        r.apply_payment(Money::new(10_000));
        // Settled receivables are never overdue
        assert!(!r.is_overdue(now + Duration::days(8)));
    }

    #[test]
    fn test_sale_balance() {
        let sale = Sale {
            id: "s1".to_string(),
            invoice_number: "INV-20260825-0001".to_string(),
            buyer_id: "b1".to_string(),
            location_id: "l1".to_string(),
            payment_method: PaymentMethod::Credit,
            total_amount: 100_000,
            paid_amount: 40_000,
            status: SaleStatus::Completed,
            created_at: Utc::now(),
        };
        assert_eq!(sale.balance().amount(), 60_000);
    }

    #[test]
    fn test_payment_status_terminality() {
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(PaymentStatus::Success.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(PaymentStatus::Expired.is_terminal());
    }

    #[test]
    fn test_payment_method_credit_default() {
        assert!(PaymentMethod::Credit.is_credit());
        assert!(!PaymentMethod::Cash.is_credit());
        assert!(!PaymentMethod::Qris.is_credit());
    }
}
