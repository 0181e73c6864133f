//! # Payment Gateway Seam
//!
//! The engine never talks HTTP to the payment provider; it calls this
//! trait. Webhook verification, signatures and transport are the
//! implementor's problem. The engine stores whatever payload the
//! gateway hands back, verbatim, as JSON text.

use async_trait::async_trait;
use thiserror::Error;

use ledger_core::Order;

/// Transport or provider failure while creating a gateway transaction.
///
/// The engine surfaces this as a retry-safe error: no payment row is
/// written when the gateway call fails.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct GatewayError(pub String);

/// What the gateway returns for a newly created transaction.
#[derive(Debug, Clone)]
pub struct GatewayTransaction {
    /// Opaque handle identifying the transaction at the provider.
    pub external_handle: String,
    /// Where to send the buyer to complete payment, if the provider
    /// uses a redirect flow.
    pub redirect_url: Option<String>,
    /// Raw provider response, stored on the payment row for audit.
    pub payload: Option<serde_json::Value>,
}

/// External payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a payment transaction for the order's total.
    async fn create_transaction(&self, order: &Order) -> Result<GatewayTransaction, GatewayError>;
}
