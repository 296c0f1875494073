//! Broadcast Turn
//!
//! A turn is one logical propagation pass, started by an outermost
//! [`SignalBus::broadcast`](super::SignalBus::broadcast). It carries the
//! broadcasting stack explicitly: peers that react to a delivery broadcast
//! their derived changes through the turn they were handed, which nests the
//! new broadcast inside the current one.
//!
//! Only the outermost entry point settles. Nested broadcasts made through a
//! turn route and commit but never run the settle pass, so a chain of any
//! length settles exactly once.

use futures_util::future::BoxFuture;
use smallvec::SmallVec;

use super::signal::{Batch, PeerId};
use super::signal_bus::{BroadcastOutcome, SignalBus};

/// The broadcasting stack for one turn.
pub struct BroadcastTurn<'a> {
    bus: &'a SignalBus,
    stack: SmallVec<[PeerId; 4]>,
}

impl<'a> BroadcastTurn<'a> {
    pub(crate) fn new(bus: &'a SignalBus) -> Self {
        Self {
            bus,
            stack: SmallVec::new(),
        }
    }

    /// The bus this turn runs on.
    pub fn bus(&self) -> &'a SignalBus {
        self.bus
    }

    /// Number of broadcasts currently in flight in this turn.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Origins of the in-flight broadcasts, outermost first.
    pub fn origins(&self) -> &[PeerId] {
        &self.stack
    }

    /// Whether `origin` already has a broadcast in flight in this turn.
    pub fn is_broadcasting(&self, origin: &PeerId) -> bool {
        self.stack.contains(origin)
    }

    /// Broadcast a derived change, nested inside the current turn.
    pub fn broadcast(&mut self, origin: impl Into<PeerId>, batch: Batch) -> BoxFuture<'_, BroadcastOutcome> {
        let origin = origin.into();
        Box::pin(async move {
            let bus = self.bus;
            bus.route(self, origin, batch).await
        })
    }

    pub(crate) fn push(&mut self, origin: PeerId) {
        self.stack.push(origin);
    }

    pub(crate) fn pop(&mut self) {
        self.stack.pop();
    }
}
