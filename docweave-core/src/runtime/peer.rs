//! Declarative Runtime Peer
//!
//! Wraps one engine instance as a [`Peer`]. Incoming batches are written into
//! the engine without running it; the engine runs once per turn in the settle
//! hook. Values the engine produces for shared signals are buffered by its
//! listeners and flushed as a single batch to the bus inbox.
//!
//! The adapter keeps a mirror of what the bus is known to hold for each of
//! its signals. Engine output equal to the mirror is an echo and is dropped.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, trace};

use super::engine::{Changeset, DeclarativeEngine, EngineRuntime};
use crate::bus::{
    Batch, BroadcastSender, BroadcastTurn, InitialSignal, Peer, PeerCapabilities, PeerId,
    Priority, SharedSignal, SignalValue,
};
use crate::compile::Spec;
use crate::error::{EngineError, PeerError};

/// Outgoing state shared with engine listeners.
#[derive(Default)]
struct Outgoing {
    pending: Mutex<Batch>,
    /// Last value the bus is known to hold, per signal.
    known: Mutex<HashMap<String, Value>>,
}

impl Outgoing {
    fn record(&self, name: &str, value: SignalValue) {
        if self.known.lock().get(name) == Some(&value.value) {
            trace!(signal = name, "engine echo dropped");
            return;
        }
        self.pending.lock().insert(name, value);
    }

    fn observe(&self, name: &str, value: &Value) {
        self.known.lock().insert(name.to_string(), value.clone());
    }

    /// Send everything pending to the inbox. Returns whether anything was
    /// sent.
    fn flush(&self, outbox: &BroadcastSender, origin: &PeerId) -> bool {
        let batch = self.pending.lock().take();
        if batch.is_empty() {
            return false;
        }
        {
            let mut known = self.known.lock();
            for (name, value) in batch.iter() {
                known.insert(name.to_string(), value.value.clone());
            }
        }
        debug!(peer = %origin, signals = batch.len(), "engine flush");
        outbox.send(origin.clone(), batch)
    }
}

/// A peer backed by a declarative engine instance.
pub struct DeclarativePeer {
    id: PeerId,
    signals: Vec<InitialSignal>,
    declared: HashSet<String>,
    runtime: Mutex<Box<dyn EngineRuntime>>,
    out: Arc<Outgoing>,
    outbox: BroadcastSender,
    /// Set by incoming writes; cleared when the engine runs.
    dirty: AtomicBool,
    destroyed: AtomicBool,
}

impl DeclarativePeer {
    /// Parse `spec` and wrap the resulting runtime.
    ///
    /// Every spec signal becomes an initial signal at default priority, so
    /// explicit widget values win arbitration.
    pub fn new(
        id: impl Into<PeerId>,
        engine: &dyn DeclarativeEngine,
        spec: &Spec,
        outbox: BroadcastSender,
    ) -> Result<Self, EngineError> {
        let runtime = engine.parse(spec)?;

        let signals: Vec<InitialSignal> = spec
            .signals
            .iter()
            .map(|signal| {
                if signal.is_data {
                    let rows = spec
                        .data_node(&signal.name)
                        .and_then(|node| node.values.clone())
                        .unwrap_or_default();
                    InitialSignal::data(signal.name.clone(), rows, Priority::DEFAULT)
                } else {
                    InitialSignal::scalar(
                        signal.name.clone(),
                        signal.value.clone().unwrap_or(Value::Null),
                        Priority::DEFAULT,
                    )
                }
            })
            .collect();
        let declared = signals.iter().map(|s| s.name.clone()).collect();

        Ok(Self {
            id: id.into(),
            signals,
            declared,
            runtime: Mutex::new(runtime),
            out: Arc::new(Outgoing::default()),
            outbox,
            dirty: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
        })
    }

    /// Drive the engine from outside the bus, e.g. for a chart interaction.
    ///
    /// `f` runs against the engine, then the engine runs one pass. Whatever
    /// the listeners collected is flushed to the inbox at the end of that
    /// pass.
    pub fn interact<F>(&self, f: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut dyn EngineRuntime) -> Result<(), EngineError>,
    {
        let mut runtime = self.runtime.lock();
        f(&mut **runtime)?;

        let out = Arc::clone(&self.out);
        let outbox = self.outbox.clone();
        let origin = self.id.clone();
        runtime.run_after(Box::new(move || {
            out.flush(&outbox, &origin);
        }));
        runtime.run()
    }

    /// Read-only access to the wrapped engine.
    pub fn inspect<R>(&self, f: impl FnOnce(&dyn EngineRuntime) -> R) -> R {
        let runtime = self.runtime.lock();
        f(&**runtime)
    }

    fn apply(&self, runtime: &mut dyn EngineRuntime, name: &str, value: SignalValue) -> Result<(), EngineError> {
        self.out.observe(name, &value.value);
        if value.is_data {
            let rows = match value.value {
                Value::Array(rows) => rows,
                Value::Null => Vec::new(),
                other => vec![other],
            };
            runtime.change(name, Changeset::replace(rows))
        } else {
            runtime.set_signal(name, value.value)
        }
    }
}

#[async_trait]
impl Peer for DeclarativePeer {
    fn id(&self) -> &PeerId {
        &self.id
    }

    fn initial_signals(&self) -> Vec<InitialSignal> {
        self.signals.clone()
    }

    fn capabilities(&self) -> PeerCapabilities {
        PeerCapabilities::all()
    }

    async fn receive_batch(
        &self,
        batch: Batch,
        from: Option<&PeerId>,
        _turn: &mut BroadcastTurn<'_>,
    ) -> Result<(), PeerError> {
        let mut runtime = self.runtime.lock();
        let mut applied = 0;
        for (name, value) in batch {
            if !self.declared.contains(&name) {
                continue;
            }
            self.apply(&mut **runtime, &name, value)?;
            applied += 1;
        }
        if applied > 0 {
            self.dirty.store(true, Ordering::SeqCst);
        }
        trace!(peer = %self.id, from = ?from, applied, "batch written to engine");
        Ok(())
    }

    async fn begin_listening(&self, shared: &[SharedSignal]) -> Result<(), PeerError> {
        {
            let mut runtime = self.runtime.lock();
            for signal in shared {
                if !self.declared.contains(&signal.name) {
                    continue;
                }
                let out = Arc::clone(&self.out);
                if signal.is_data {
                    runtime.add_data_listener(
                        &signal.name,
                        Box::new(move |name, rows| out.record(name, SignalValue::data(rows.to_vec()))),
                    )?;
                    let rows = runtime.data(&signal.name)?;
                    self.out.record(&signal.name, SignalValue::data(rows));
                } else {
                    runtime.add_signal_listener(
                        &signal.name,
                        Box::new(move |name, value| out.record(name, SignalValue::scalar(value.clone()))),
                    )?;
                    let value = runtime.signal(&signal.name)?;
                    self.out.record(&signal.name, SignalValue::scalar(value));
                }
            }
        }
        self.out.flush(&self.outbox, &self.id);
        Ok(())
    }

    async fn broadcast_complete(&self) -> Result<(), PeerError> {
        if self.dirty.swap(false, Ordering::SeqCst) {
            self.runtime.lock().run()?;
        }
        self.out.flush(&self.outbox, &self.id);
        Ok(())
    }

    fn current_signal_value(&self, name: &str) -> Option<Value> {
        let is_data = self.signals.iter().find(|s| s.name == name)?.is_data;
        let runtime = self.runtime.lock();
        if is_data {
            runtime.data(name).ok().map(Value::Array)
        } else {
            runtime.signal(name).ok()
        }
    }

    fn destroy(&self) {
        if !self.destroyed.swap(true, Ordering::SeqCst) {
            self.runtime.lock().finalize();
            debug!(peer = %self.id, "engine finalized");
        }
    }
}
