//! Signal Propagation
//!
//! This module implements the runtime core: peers, the signal registry and
//! the broadcast engine that keeps every peer's view of a shared signal
//! consistent.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A signal is a named value, scalar or tabular, shared by every peer that
//! declares it. Within one render a name denotes exactly one value.
//!
//! ## Peers
//!
//! A peer is one hydrated component. It declares its signals up front with a
//! priority for its initial value, then receives batches and reports its own
//! changes as broadcasts.
//!
//! ## Turns
//!
//! A broadcast and every broadcast nested inside it form one turn. The turn
//! carries the broadcasting stack; the outermost call settles once when the
//! whole chain has unwound.
//!
//! # Execution Model
//!
//! Delivery is cooperative and sequential. Peer hooks may suspend, and the
//! bus awaits each one before moving to the next peer or phase. The registry
//! is written only by the bus.

mod config;
mod inbox;
mod peer;
mod registry;
mod signal;
mod signal_bus;
mod turn;
mod wire;

pub use config::BusConfig;
pub use inbox::BroadcastSender;
pub use peer::{Peer, PeerCapabilities};
pub use registry::{SignalDependency, SignalRegistry};
pub use signal::{Batch, InitialSignal, PeerId, Priority, SharedSignal, SignalValue};
pub use signal_bus::{BroadcastOutcome, BusState, FailureHandler, SignalBus};
pub use turn::BroadcastTurn;
pub use wire::Envelope;
