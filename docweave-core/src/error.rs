//! Error Types
//!
//! Structured errors for compilation, signal propagation, engine adapters and
//! hydration. Peer failures are recoverable and are reported through
//! [`PeerFailure`] rather than aborting a broadcast.

use std::fmt;

use thiserror::Error;

/// A dependency cycle (or an unresolvable reference inside the known set).
///
/// `names` lists every definition that could not be placed in order, in
/// registration order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("dependency cycle among: {}", names.join(", "))]
pub struct CycleError {
    pub names: Vec<String>,
}

/// Errors raised while ordering and assembling variable definitions.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Cycle(#[from] CycleError),

    /// Two variables share a name.
    #[error("variable `{0}` is defined more than once")]
    DuplicateVariable(String),

    #[error("variable name must not be empty")]
    EmptyName,
}

/// Misuse of the signal bus lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// `begin_listening` was called on a bus that already left the
    /// registration phase.
    #[error("bus has already begun listening")]
    AlreadyListening,

    /// A peer was registered after listening began.
    #[error("bus no longer accepts peers (peer `{0}`)")]
    NotAcceptingPeers(String),

    #[error("peer `{0}` is already registered")]
    DuplicatePeer(String),
}

/// Errors from a declarative engine runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("failed to parse spec: {0}")]
    Parse(String),

    #[error("engine run failed: {0}")]
    Run(String),

    #[error("unknown signal `{0}`")]
    UnknownSignal(String),

    #[error("unknown data node `{0}`")]
    UnknownData(String),
}

/// Failure raised by a peer hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerError {
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Errors from the hydration layer.
#[derive(Debug, Error)]
pub enum HydrateError {
    #[error("plugin `{plugin}` failed to hydrate: {message}")]
    Plugin { plugin: String, message: String },

    #[error("unknown plugin `{0}` in order declaration")]
    UnknownPlugin(String),

    #[error(transparent)]
    Order(#[from] CycleError),

    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Encoding errors at the host boundary.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("msgpack encode: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("msgpack decode: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// The peer hook in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerPhase {
    Receive,
    Listen,
    Settle,
}

impl fmt::Display for PeerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            PeerPhase::Receive => "receive",
            PeerPhase::Listen => "listen",
            PeerPhase::Settle => "settle",
        };
        f.write_str(phase)
    }
}

/// A peer-level failure, tagged with the peer and the phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerFailure {
    pub peer_id: String,
    pub phase: PeerPhase,
    pub error: PeerError,
}

impl fmt::Display for PeerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer `{}` failed during {}: {}", self.peer_id, self.phase, self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_error_lists_names() {
        let err = CycleError {
            names: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "dependency cycle among: a, b");
    }

    #[test]
    fn peer_failure_display_includes_phase() {
        let failure = PeerFailure {
            peer_id: "chart".to_string(),
            phase: PeerPhase::Settle,
            error: PeerError::Failed("boom".to_string()),
        };
        assert_eq!(failure.to_string(), "peer `chart` failed during settle: boom");
    }
}
