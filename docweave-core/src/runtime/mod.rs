//! Declarative Runtime Adapter
//!
//! Scalar and tabular calculations run inside a third-party declarative
//! engine. This module defines the narrow contract the core needs from such
//! an engine and the [`DeclarativePeer`] that puts an engine instance on the
//! signal bus.
//!
//! # Flow
//!
//! 1. The compiled [`Spec`](crate::compile::Spec) is parsed into an
//!    [`EngineRuntime`].
//! 2. Incoming batches become signal writes and data changesets.
//! 3. The settle hook runs the engine once for the whole turn.
//! 4. Listeners on shared signals collect engine output, which is flushed to
//!    the bus inbox as one batch.

mod engine;
mod peer;

pub use engine::{AfterRun, Changeset, DataListener, DeclarativeEngine, EngineRuntime, SignalListener};
pub use peer::DeclarativePeer;
