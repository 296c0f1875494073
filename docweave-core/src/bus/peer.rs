//! Peer Contract
//!
//! A peer is one hydrated component instance: a slider, a table, a chart, a
//! data loader, an engine adapter. The bus knows nothing about how a peer
//! renders; it only calls the hooks below.
//!
//! # Capabilities
//!
//! Every hook except [`Peer::destroy`] is optional. A peer advertises which
//! hooks it implements through [`Peer::capabilities`]. The bus reads the flags
//! once at registration and never calls a hook the peer did not advertise.

use async_trait::async_trait;
use bitflags::bitflags;
use serde_json::Value;

use super::signal::{Batch, InitialSignal, PeerId, SharedSignal};
use super::turn::BroadcastTurn;
use crate::error::PeerError;

bitflags! {
    /// Optional hooks a peer implements.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PeerCapabilities: u8 {
        /// [`Peer::receive_batch`]
        const RECEIVE = 1 << 0;
        /// [`Peer::begin_listening`]
        const LISTEN = 1 << 1;
        /// [`Peer::broadcast_complete`]
        const SETTLE = 1 << 2;
        /// [`Peer::current_signal_value`]
        const CURRENT_VALUE = 1 << 3;
    }
}

/// The contract every hydrated component implements.
#[async_trait]
pub trait Peer: Send + Sync {
    /// Stable identifier for this instance.
    fn id(&self) -> &PeerId;

    /// Every signal this peer publishes or consumes, with the priority of
    /// its initial value.
    fn initial_signals(&self) -> Vec<InitialSignal>;

    /// The optional hooks this peer implements.
    fn capabilities(&self) -> PeerCapabilities {
        PeerCapabilities::empty()
    }

    /// Apply a batch of changes.
    ///
    /// `from` is the originating peer, or `None` for the initial
    /// distribution. The batch only holds entries this peer declared. Any
    /// change this peer derives must be sent as a new broadcast through
    /// `turn`, never by calling back into the bus directly.
    async fn receive_batch(
        &self,
        _batch: Batch,
        _from: Option<&PeerId>,
        _turn: &mut BroadcastTurn<'_>,
    ) -> Result<(), PeerError> {
        Ok(())
    }

    /// Called once after the initial distribution with the signals this
    /// peer shares with at least one other peer.
    async fn begin_listening(&self, _shared: &[SharedSignal]) -> Result<(), PeerError> {
        Ok(())
    }

    /// Settle hook, called once per fully unwound broadcast.
    async fn broadcast_complete(&self) -> Result<(), PeerError> {
        Ok(())
    }

    /// This peer's own view of a signal.
    fn current_signal_value(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Release timers, listeners and connections. Must be idempotent.
    fn destroy(&self);
}
