//! # ledger-engine: Consistency Engine Entry Points
//!
//! The only write path into the ledger store. Four mutating
//! operations, each one database transaction:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  create_sale ──────────── POS/credit sale: reserve stock, write     │
//! │                           sale + items, open receivable, add debt   │
//! │  transition ───────────── order status change: validate against     │
//! │                           the state machine, append history,        │
//! │                           shipment side effects                     │
//! │  create_payment_intent ── gateway transaction for an unpaid order,  │
//! │                           duplicate-suppressed per order            │
//! │  apply_payment_result ─── reconciliation: gateway facts become      │
//! │                           order status + receivable settlement      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! External collaborators enter through traits: [`gateway::PaymentGateway`]
//! for the payment provider and [`notify::ShipmentNotifier`] for
//! outbound shipped notifications. Both are injected at construction;
//! there is no global state.

use std::sync::Arc;

use chrono::Duration;

use ledger_db::Database;

pub mod error;
pub mod gateway;
pub mod notify;
pub mod orders;
pub mod payments;
pub mod sales;

pub use error::{EngineError, EngineResult};
pub use gateway::{GatewayError, GatewayTransaction, PaymentGateway};
pub use notify::{NotifyError, NullNotifier, ShipmentNotifier};
pub use orders::{NewOrder, NewOrderLine};
pub use payments::{PaymentIntent, PaymentOutcome};
pub use sales::{NewSale, NewSaleLine};

// =============================================================================
// Configuration
// =============================================================================

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a gateway payment intent stays valid. Written to the
    /// payment row as `expires_at`; actual expiry is asserted through
    /// `apply_payment_result`.
    pub payment_expiry: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            payment_expiry: Duration::hours(24),
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// The consistency engine. Cheap to clone; holds the database pool and
/// the injected collaborators.
#[derive(Clone)]
pub struct Engine {
    db: Database,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn ShipmentNotifier>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(
        db: Database,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn ShipmentNotifier>,
        config: EngineConfig,
    ) -> Self {
        Engine {
            db,
            gateway,
            notifier,
            config,
        }
    }

    /// The underlying database handle, for read paths outside the
    /// engine's write transactions.
    pub fn db(&self) -> &Database {
        &self.db
    }

    pub(crate) fn gateway(&self) -> &dyn PaymentGateway {
        self.gateway.as_ref()
    }

    pub(crate) fn notifier(&self) -> &dyn ShipmentNotifier {
        self.notifier.as_ref()
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        &self.config
    }
}
