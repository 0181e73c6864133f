//! # Order Checkout and Status Transitions
//!
//! `place_order` persists a checkout as a `pending_payment` order with
//! frozen line snapshots and an empty shipment record. No stock moves
//! at checkout; availability is re-checked at payment time.
//!
//! `transition` is the single gate for status changes. It validates
//! against the state machine (including the payment/failure authority
//! guards), writes the new status, appends the history row, and applies
//! shipment side effects, all in one transaction. The shipped
//! notification runs after commit and is best-effort.

use chrono::Utc;
use tracing::{info, warn};

use crate::error::EngineResult;
use crate::Engine;
use ledger_core::{
    invoice, validate_transition, validation, Actor, CoreError, Money, Order, OrderItem,
    OrderStatus, Shipment, ShipmentStatus,
};
use ledger_db::repository::{buyer, generate_id, order, product};
use ledger_db::{DbError, StatusChange};

/// One requested order line. Orders always use the product's current
/// sell price; negotiated pricing is a POS concern.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NewOrderLine {
    pub product_id: String,
    pub quantity: i64,
}

/// An order checkout request.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NewOrder {
    pub buyer_id: String,
    /// Fulfillment location; payment-time stock checks run against it.
    pub location_id: String,
    pub items: Vec<NewOrderLine>,
    pub shipping_fee: i64,
    pub discount: i64,
    pub tax: i64,
    pub address: Option<String>,
}

impl Engine {
    /// Persists a checkout as a `pending_payment` order.
    pub async fn place_order(&self, request: NewOrder) -> EngineResult<Order> {
        validation::validate_line_count(request.items.len())?;
        for line in &request.items {
            validation::validate_quantity(line.quantity)?;
        }
        validation::validate_amount(request.shipping_fee)?;
        validation::validate_amount(request.discount)?;
        validation::validate_amount(request.tax)?;

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
        let order_id = generate_id();

        let mut items = Vec::with_capacity(request.items.len());
        let mut subtotal = Money::zero();
        for line in &request.items {
            let product_row = product::get_active(&mut tx, &line.product_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Product", &line.product_id))?;

            let line_total = product_row.sell_price().multiply_quantity(line.quantity);
            subtotal += line_total;

            items.push(OrderItem {
                id: generate_id(),
                order_id: order_id.clone(),
                product_id: product_row.id,
                name_snapshot: product_row.name,
                quantity: line.quantity,
                unit_price: product_row.sell_price,
                line_total: line_total.amount(),
            });
        }

        // A discount can never push the total below zero.
        let gross = subtotal.amount() + request.shipping_fee + request.tax;
        if request.discount > gross {
            return Err(ledger_core::ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: gross,
            }
            .into());
        }

        let total = gross - request.discount;
        let seq = order::next_order_seq(&mut tx, now.date_naive()).await?;

        let order_row = Order {
            id: order_id.clone(),
            order_number: invoice::format_order_number(now.date_naive(), seq),
            buyer_id: buyer_row.id,
            location_id: request.location_id,
            subtotal: subtotal.amount(),
            shipping_fee: request.shipping_fee,
            discount: request.discount,
            tax: request.tax,
            total,
            status: OrderStatus::PendingPayment,
            address: request.address,
            created_at: now,
            updated_at: now,
        };
        order::insert(&mut tx, &order_row).await?;
        for item in &items {
            order::insert_item(&mut tx, item).await?;
        }

        order::insert_shipment(
            &mut tx,
            &Shipment {
                id: generate_id(),
                order_id: order_id.clone(),
                courier: None,
                tracking_number: None,
                status: ShipmentStatus::Pending,
                shipped_at: None,
                delivered_at: None,
            },
        )
        .await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_id = %order_row.id,
            order_number = %order_row.order_number,
            total = order_row.total,
            "Order placed"
        );

        Ok(order_row)
    }

    /// Applies a status transition to an order.
    ///
    /// Validation runs against the order's status as read inside the
    /// write transaction, so racing transitions serialize and the loser
    /// is judged against the winner's result. On rejection nothing is
    /// written.
    pub async fn transition(
        &self,
        order_id: &str,
        target: OrderStatus,
        actor: &Actor,
        note: Option<String>,
    ) -> EngineResult<Order> {
        let mut tx = self.db().begin().await?;

        let order_row = order::get(&mut tx, order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", order_id))?;

        validate_transition(order_row.status, target, actor)?;

        order::set_status(&mut tx, order_id, target).await?;
        order::append_history(
            &mut tx,
            &StatusChange {
                id: generate_id(),
                order_id: order_id.to_string(),
                from_status: order_row.status,
                to_status: target,
                actor: actor.label(),
                note,
                created_at: Utc::now(),
            },
        )
        .await?;

        match target {
            OrderStatus::Shipped => order::mark_shipment_in_transit(&mut tx, order_id).await?,
            OrderStatus::Delivered => order::mark_shipment_delivered(&mut tx, order_id).await?,
            _ => {}
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_id = %order_id,
            from = %order_row.status,
            to = %target,
            actor = %actor,
            "Order transitioned"
        );

        let updated = self
            .db()
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", order_id))?;

        if target == OrderStatus::Shipped {
            self.send_shipped_notification(&updated).await;
        }

        Ok(updated)
    }

    /// Best-effort shipped notification; runs after the transition has
    /// committed and never raises.
    async fn send_shipped_notification(&self, order_row: &Order) {
        match self.db().orders().get_shipment(&order_row.id).await {
            Ok(Some(shipment)) => {
                if let Err(err) = self.notifier().notify_shipped(order_row, &shipment).await {
                    warn!(
                        order_id = %order_row.id,
                        error = %err,
                        "Shipped notification failed"
                    );
                }
            }
            Ok(None) => {
                warn!(order_id = %order_row.id, "No shipment record to notify about");
            }
            Err(err) => {
                warn!(
                    order_id = %order_row.id,
                    error = %err,
                    "Could not load shipment for notification"
                );
            }
        }
    }
}
