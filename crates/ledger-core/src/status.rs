//! # Order Status State Machine
//!
//! Pure transition validation for [`OrderStatus`]. The engine calls
//! [`validate_transition`] inside the order-update transaction; this
//! module never touches the database.
//!
//! ## State Diagram
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  pending_payment ──► paid ──► processing ──► shipped ──► delivered  │
//! │        │   │          │            │                        │  │    │
//! │        │   │(recon    │            └──► refunded ◄──────────┘  │    │
//! │        │   │ only)    └──► refunded                 completed ◄┘    │
//! │        │   └──► failed (reconciliation only)                        │
//! │        └──► cancelled                                               │
//! │                                                                     │
//! │  Terminal: completed, cancelled, failed, refunded                   │
//! │  Nothing ever returns to pending_payment.                           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authority Guards
//! - **Payment authority**: `paid` is a fact asserted by the payment
//!   gateway; only the reconciliation entry point may apply it.
//! - **Failure authority**: same rule for `failed`: failure, like
//!   success, is not a human decision.
//! - **No financial regression**: a paid order can never become
//!   unpaid again; `pending_payment` is never a valid target.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::types::OrderStatus;

// =============================================================================
// Actor
// =============================================================================

/// Who is requesting a transition. Supplied by the session resolver
/// for human callers; the reconciliation entry point constructs its
/// own actor internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Admin,
    Buyer,
    Reconciliation,
}

/// An authenticated actor with an audit label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub role: ActorRole,
    /// User id for humans, a fixed marker for the reconciliation path.
    pub id: String,
}

impl Actor {
    pub fn admin(id: impl Into<String>) -> Self {
        Actor {
            role: ActorRole::Admin,
            id: id.into(),
        }
    }

    pub fn buyer(id: impl Into<String>) -> Self {
        Actor {
            role: ActorRole::Buyer,
            id: id.into(),
        }
    }

    /// The gateway-driven reconciliation actor. Only the reconciliation
    /// entry point should construct this.
    pub fn reconciliation() -> Self {
        Actor {
            role: ActorRole::Reconciliation,
            id: "gateway".to_string(),
        }
    }

    /// Audit label written to the order status history.
    pub fn label(&self) -> String {
        match self.role {
            ActorRole::Admin => format!("admin:{}", self.id),
            ActorRole::Buyer => format!("buyer:{}", self.id),
            ActorRole::Reconciliation => "reconciliation".to_string(),
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// =============================================================================
// Transition Table
// =============================================================================

impl OrderStatus {
    /// Statuses with no outgoing edges.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed
                | OrderStatus::Cancelled
                | OrderStatus::Failed
                | OrderStatus::Refunded
        )
    }

    /// The targets reachable from this status, ignoring authority
    /// guards. `pending_payment` never appears as a target.
    pub const fn allowed_targets(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::PendingPayment => &[
                OrderStatus::Paid,
                OrderStatus::Failed,
                OrderStatus::Cancelled,
            ],
            OrderStatus::Paid => &[OrderStatus::Processing, OrderStatus::Refunded],
            OrderStatus::Processing => &[OrderStatus::Shipped, OrderStatus::Refunded],
            OrderStatus::Shipped => &[OrderStatus::Delivered],
            OrderStatus::Delivered => &[OrderStatus::Completed, OrderStatus::Refunded],
            OrderStatus::Completed
            | OrderStatus::Cancelled
            | OrderStatus::Failed
            | OrderStatus::Refunded => &[],
        }
    }

    fn can_reach(&self, target: OrderStatus) -> bool {
        self.allowed_targets().contains(&target)
    }
}

/// Validates a requested transition against the table and the
/// authority guards. Pure; the caller applies the transition only on
/// `Ok`.
///
/// Check order matters: authority violations are reported as
/// `ForbiddenTransition` even when the edge itself would also be
/// invalid, so an admin asking for `paid` from a shipped order is told
/// about the authority problem, not the edge.
pub fn validate_transition(
    current: OrderStatus,
    target: OrderStatus,
    actor: &Actor,
) -> CoreResult<()> {
    // Payment and failure authority: gateway-asserted facts only.
    if matches!(target, OrderStatus::Paid | OrderStatus::Failed)
        && actor.role != ActorRole::Reconciliation
    {
        return Err(CoreError::ForbiddenTransition {
            from: current.to_string(),
            to: target.to_string(),
            actor: actor.label(),
        });
    }

    // No financial regression: nothing returns to pending_payment.
    if target == OrderStatus::PendingPayment {
        return Err(CoreError::ForbiddenTransition {
            from: current.to_string(),
            to: target.to_string(),
            actor: actor.label(),
        });
    }

    if !current.can_reach(target) {
        return Err(CoreError::InvalidState {
            current: current.to_string(),
            operation: format!("transition to {target}"),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
