//! # Shipment Notification Seam
//!
//! Best-effort only. The engine calls [`ShipmentNotifier::notify_shipped`]
//! after the shipped transition has committed; a failure here is logged
//! and never propagated, so delivery problems cannot undo ledger state.

use async_trait::async_trait;
use thiserror::Error;

use ledger_core::{Order, Shipment};

/// Failure to deliver a shipment notification.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct NotifyError(pub String);

/// Outbound notification channel for shipment events.
#[async_trait]
pub trait ShipmentNotifier: Send + Sync {
    /// Tells the buyer their order has shipped.
    async fn notify_shipped(&self, order: &Order, shipment: &Shipment) -> Result<(), NotifyError>;
}

/// A notifier that drops every notification. Useful where no outbound
/// channel is configured.
#[derive(Debug, Default)]
pub struct NullNotifier;

#[async_trait]
impl ShipmentNotifier for NullNotifier {
    async fn notify_shipped(
        &self,
        _order: &Order,
        _shipment: &Shipment,
    ) -> Result<(), NotifyError> {
        Ok(())
    }
}
