//! Listing invalidation over a `tokio::sync::broadcast` channel.

use clubcal_core::service::ListingInvalidator;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Publishes the id of every organization whose event listing changed.
#[derive(Clone)]
pub struct BroadcastInvalidator {
  tx: broadcast::Sender<Uuid>,
}

impl BroadcastInvalidator {
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity);
    Self { tx }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<Uuid> { self.tx.subscribe() }
}

impl ListingInvalidator for BroadcastInvalidator {
  fn invalidate(&self, organization_id: Uuid) {
    if self.tx.send(organization_id).is_err() {
      tracing::trace!(%organization_id, "no invalidation subscribers");
    }
  }
}
