//! # Payment Intents and Reconciliation
//!
//! `create_payment_intent` is the buyer-facing side: it asks the
//! gateway for a transaction and records it, with duplicate
//! suppression per order. `apply_payment_result` is the gateway-facing
//! side: the only code path that may mark an order `paid` or `failed`.
//!
//! ## Duplicate Suppression
//! The advisory read catches the common case (a pending intent already
//! exists → return its handle, no gateway call). The race two
//! concurrent intents can still hit is closed by the store:
//! `payments.order_id` is UNIQUE and the write is an upsert that only
//! replaces dead (failed/expired) rows, so the loser detects the live
//! row and returns it as a duplicate.

use chrono::Utc;
use tracing::{info, warn};

use crate::error::EngineResult;
use crate::Engine;
use ledger_core::{
    Actor, ActorRole, CoreError, Money, OrderStatus, Payment, PaymentStatus, ReferenceType,
};
use ledger_db::repository::{buyer, generate_id, order, payment, receivable};
use ledger_db::{DbError, StatusChange};

/// A terminal gateway verdict, as relayed by the webhook surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    Success,
    Failed,
    Expired,
}

impl PaymentOutcome {
    fn payment_status(&self) -> PaymentStatus {
        match self {
            PaymentOutcome::Success => PaymentStatus::Success,
            PaymentOutcome::Failed => PaymentStatus::Failed,
            PaymentOutcome::Expired => PaymentStatus::Expired,
        }
    }
}

/// What the buyer surface gets back from an intent request.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PaymentIntent {
    pub external_handle: String,
    pub redirect_url: Option<String>,
    /// True when an existing live intent was returned instead of a new
    /// gateway transaction.
    pub duplicate: bool,
}

impl Engine {
    /// Creates (or returns the existing) payment intent for an order.
    ///
    /// Ordering of checks: ownership, already-paid, order status,
    /// stock pre-check, then the gateway call. The pre-check is
    /// advisory; it keeps buyers from paying for stock that is
    /// already gone, while the authoritative check remains the
    /// reservation at fulfillment.
    pub async fn create_payment_intent(
        &self,
        order_id: &str,
        requesting_user: &Actor,
    ) -> EngineResult<PaymentIntent> {
        let order_row = self
            .db()
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", order_id))?;

        if requesting_user.role == ActorRole::Buyer && requesting_user.id != order_row.buyer_id {
            return Err(CoreError::Forbidden {
                user_id: requesting_user.id.clone(),
                order_id: order_row.id,
            }
            .into());
        }

        let existing = self.db().payments().get_by_order(order_id).await?;

        if matches!(
            existing.as_ref().map(|p| p.status),
            Some(PaymentStatus::Success)
        ) {
            return Err(CoreError::AlreadyPaid {
                order_id: order_row.id,
            }
            .into());
        }

        // The state precondition outranks duplicate suppression: an
        // order that left pending_payment (cancelled, failed) must not
        // hand out its stale gateway handle.
        if order_row.status != OrderStatus::PendingPayment {
            return Err(CoreError::InvalidState {
                current: order_row.status.to_string(),
                operation: "create payment intent".to_string(),
            }
            .into());
        }

        // Dead attempts (failed/expired) fall through and are replaced.
        if let Some(existing) = existing {
            if existing.status == PaymentStatus::Pending {
                info!(order_id = %order_id, "Returning existing pending intent");
                return Ok(PaymentIntent {
                    external_handle: existing.external_handle.unwrap_or_default(),
                    redirect_url: existing.redirect_url,
                    duplicate: true,
                });
            }
        }

        let items = self.db().orders().get_items(order_id).await?;
        let stock = self.db().stock();
        for item in &items {
            let available = stock.level(&order_row.location_id, &item.product_id).await?;
            if available < item.quantity {
                return Err(CoreError::StockIssue {
                    product_id: item.product_id.clone(),
                    available,
                    requested: item.quantity,
                }
                .into());
            }
        }

        // Gateway call runs outside any transaction; a transport error
        // here leaves no payment row behind.
        let gateway_tx = self.gateway().create_transaction(&order_row).await?;

        let now = Utc::now();
        let payment_row = Payment {
            id: generate_id(),
            order_id: order_row.id.clone(),
            status: PaymentStatus::Pending,
            external_handle: Some(gateway_tx.external_handle.clone()),
            redirect_url: gateway_tx.redirect_url.clone(),
            gateway_payload: gateway_tx.payload.as_ref().map(|v| v.to_string()),
            amount: order_row.total,
            expires_at: Some(now + self.config().payment_expiry),
            paid_at: None,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db().begin().await?;
        let written = payment::upsert_intent(&mut tx, &payment_row).await?;

        if !written {
            // A concurrent intent holds the slot; hand back its row.
            let stored = payment::get_by_order(&mut tx, order_id)
                .await?
                .ok_or_else(|| DbError::not_found("Payment for order", order_id))?;
            if stored.status == PaymentStatus::Success {
                return Err(CoreError::AlreadyPaid {
                    order_id: order_row.id,
                }
                .into());
            }
            warn!(order_id = %order_id, "Lost intent race; returning stored handle");
            return Ok(PaymentIntent {
                external_handle: stored.external_handle.unwrap_or_default(),
                redirect_url: stored.redirect_url,
                duplicate: true,
            });
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_id = %order_id,
            handle = %gateway_tx.external_handle,
            amount = payment_row.amount,
            "Payment intent created"
        );

        Ok(PaymentIntent {
            external_handle: gateway_tx.external_handle,
            redirect_url: gateway_tx.redirect_url,
            duplicate: false,
        })
    }

    /// Applies a terminal gateway verdict to an order.
    ///
    /// This is the reconciliation entry point, the only caller
    /// allowed to move an order to `paid` or `failed`. Idempotent:
    /// a verdict arriving for an already-terminal payment is logged
    /// and dropped, so replayed or conflicting webhooks change
    /// nothing.
    pub async fn apply_payment_result(
        &self,
        order_id: &str,
        outcome: PaymentOutcome,
        gateway_payload: Option<serde_json::Value>,
    ) -> EngineResult<()> {
        let mut tx = self.db().begin().await?;

        let payment_row = payment::get_by_order(&mut tx, order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Payment for order", order_id))?;

        if payment_row.status.is_terminal() {
            warn!(
                order_id = %order_id,
                stored = %payment_row.status,
                incoming = ?outcome,
                "Payment already terminal; ignoring gateway result"
            );
            return Ok(());
        }

        let status = outcome.payment_status();
        let payload = gateway_payload.as_ref().map(|v| v.to_string());
        payment::mark_result(&mut tx, order_id, status, payload.as_deref()).await?;

        let order_row = order::get(&mut tx, order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", order_id))?;

        let recon = Actor::reconciliation();
        let target = match outcome {
            PaymentOutcome::Success => OrderStatus::Paid,
            PaymentOutcome::Failed | PaymentOutcome::Expired => OrderStatus::Failed,
        };
        ledger_core::validate_transition(order_row.status, target, &recon)?;

        order::set_status(&mut tx, order_id, target).await?;
        order::append_history(
            &mut tx,
            &StatusChange {
                id: generate_id(),
                order_id: order_id.to_string(),
                from_status: order_row.status,
                to_status: target,
                actor: recon.label(),
                note: Some(format!("gateway result: {status}")),
                created_at: Utc::now(),
            },
        )
        .await?;

        // Successful payment settles the order's receivable, if one was
        // opened, and releases the matching slice of buyer debt.
        if outcome == PaymentOutcome::Success {
            if let Some(mut receivable_row) =
                receivable::get_by_reference(&mut tx, ReferenceType::Order, order_id).await?
            {
                let applied = receivable_row.apply_payment(Money::new(payment_row.amount));
                receivable_row.updated_at = Utc::now();
                receivable::update_settlement(&mut tx, &receivable_row).await?;
                if applied.is_positive() {
                    buyer::adjust_debt(&mut tx, &receivable_row.buyer_id, -applied.amount())
                        .await?;
                }
            }
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_id = %order_id,
            result = %status,
            order_status = %target,
            "Gateway payment result applied"
        );

        Ok(())
    }
}
