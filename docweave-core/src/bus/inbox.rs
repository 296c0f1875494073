//! Bus Inbox
//!
//! Peers that change outside a broadcast (user input, an engine pass driven
//! by the host, a settle hook) queue their batch here instead of calling into
//! the bus. Every outermost broadcast empties the inbox once it has settled.
//! Batches queued while the bus is idle wait for the host to call
//! [`SignalBus::drain_inbox`](super::SignalBus::drain_inbox), which runs each
//! envelope as its own turn.

use tokio::sync::mpsc;
use tracing::debug;

use super::signal::{Batch, PeerId};
use super::wire::Envelope;

/// Cloneable handle for queueing broadcasts on a bus.
#[derive(Debug, Clone)]
pub struct BroadcastSender {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl BroadcastSender {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self { tx }
    }

    /// Queue a broadcast. Returns `false` if the bus is gone.
    pub fn send(&self, origin: impl Into<PeerId>, batch: Batch) -> bool {
        let envelope = Envelope::new(origin, batch);
        match self.tx.send(envelope) {
            Ok(()) => true,
            Err(rejected) => {
                debug!(origin = %rejected.0.origin, "inbox closed, batch dropped");
                false
            }
        }
    }

    /// Whether the owning bus has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
