//! Shared test peers and a scripted declarative engine.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use docweave_core::bus::{
    Batch, BroadcastOutcome, BroadcastTurn, InitialSignal, Peer, PeerCapabilities, PeerId,
    Priority, SharedSignal,
};
use docweave_core::compile::Spec;
use docweave_core::error::PeerError;
use docweave_core::runtime::{
    AfterRun, Changeset, DataListener, DeclarativeEngine, EngineRuntime, SignalListener,
};
use docweave_core::EngineError;

type Reaction = Box<dyn Fn(&Batch) -> Option<(PeerId, Batch)> + Send + Sync>;

/// A peer that records every hook call.
pub struct RecordingPeer {
    id: PeerId,
    signals: Vec<InitialSignal>,
    capabilities: PeerCapabilities,
    reaction: Option<Reaction>,
    fail_receive: bool,
    pub received: Mutex<Vec<(Option<PeerId>, Batch)>>,
    pub listened: Mutex<Vec<Vec<SharedSignal>>>,
    pub nested: Mutex<Vec<BroadcastOutcome>>,
    pub settled: AtomicUsize,
    pub destroyed: AtomicUsize,
}

impl RecordingPeer {
    pub fn new(id: &str) -> Self {
        Self {
            id: PeerId::from(id),
            signals: Vec::new(),
            capabilities: PeerCapabilities::RECEIVE | PeerCapabilities::LISTEN | PeerCapabilities::SETTLE,
            reaction: None,
            fail_receive: false,
            received: Mutex::new(Vec::new()),
            listened: Mutex::new(Vec::new()),
            nested: Mutex::new(Vec::new()),
            settled: AtomicUsize::new(0),
            destroyed: AtomicUsize::new(0),
        }
    }

    pub fn scalar(mut self, name: &str, value: Value, priority: i32) -> Self {
        self.signals
            .push(InitialSignal::scalar(name, value, Priority(priority)));
        self
    }

    pub fn data(mut self, name: &str, rows: Vec<Value>, priority: i32) -> Self {
        self.signals.push(InitialSignal::data(name, rows, Priority(priority)));
        self
    }

    pub fn capabilities(mut self, capabilities: PeerCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Broadcast `(origin, batch)` through the turn whenever a batch arrives.
    pub fn reacting<F>(mut self, reaction: F) -> Self
    where
        F: Fn(&Batch) -> Option<(PeerId, Batch)> + Send + Sync + 'static,
    {
        self.reaction = Some(Box::new(reaction));
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_receive = true;
        self
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn receive_count(&self) -> usize {
        self.received.lock().len()
    }

    pub fn last_received(&self) -> Option<(Option<PeerId>, Batch)> {
        self.received.lock().last().cloned()
    }

    pub fn settle_count(&self) -> usize {
        self.settled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Peer for RecordingPeer {
    fn id(&self) -> &PeerId {
        &self.id
    }

    fn initial_signals(&self) -> Vec<InitialSignal> {
        self.signals.clone()
    }

    fn capabilities(&self) -> PeerCapabilities {
        self.capabilities
    }

    async fn receive_batch(
        &self,
        batch: Batch,
        from: Option<&PeerId>,
        turn: &mut BroadcastTurn<'_>,
    ) -> Result<(), PeerError> {
        self.received.lock().push((from.cloned(), batch.clone()));
        if self.fail_receive {
            return Err(PeerError::Failed(format!("{} cannot apply batch", self.id)));
        }
        if let Some(reaction) = &self.reaction {
            if let Some((origin, derived)) = reaction(&batch) {
                let outcome = turn.broadcast(origin, derived).await;
                self.nested.lock().push(outcome);
            }
        }
        Ok(())
    }

    async fn begin_listening(&self, shared: &[SharedSignal]) -> Result<(), PeerError> {
        self.listened.lock().push(shared.to_vec());
        Ok(())
    }

    async fn broadcast_complete(&self) -> Result<(), PeerError> {
        self.settled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn current_signal_value(&self, name: &str) -> Option<Value> {
        self.signals
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.value.clone())
    }

    fn destroy(&self) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

type Formula = Arc<dyn Fn(&HashMap<String, Value>) -> Value + Send + Sync>;

/// A declarative engine whose calculations are Rust closures keyed by
/// signal name.
#[derive(Default, Clone)]
pub struct ScriptedEngine {
    formulas: Vec<(String, Formula)>,
    pub runs: Arc<AtomicUsize>,
    pub finalized: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn formula<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&HashMap<String, Value>) -> Value + Send + Sync + 'static,
    {
        self.formulas.push((name.to_string(), Arc::new(f)));
        self
    }
}

impl DeclarativeEngine for ScriptedEngine {
    fn parse(&self, spec: &Spec) -> Result<Box<dyn EngineRuntime>, EngineError> {
        let signals = spec
            .signals
            .iter()
            .filter(|s| !s.is_data)
            .map(|s| (s.name.clone(), s.value.clone().unwrap_or(Value::Null)))
            .collect();
        let data = spec
            .data
            .iter()
            .map(|d| (d.name.clone(), d.values.clone().unwrap_or_default()))
            .collect();
        Ok(Box::new(ScriptedRuntime {
            signals,
            data,
            formulas: self.formulas.clone(),
            signal_listeners: HashMap::new(),
            data_listeners: HashMap::new(),
            after: Vec::new(),
            changed_signals: Vec::new(),
            changed_data: Vec::new(),
            runs: Arc::clone(&self.runs),
            finalized: Arc::clone(&self.finalized),
        }))
    }
}

pub struct ScriptedRuntime {
    signals: HashMap<String, Value>,
    data: HashMap<String, Vec<Value>>,
    formulas: Vec<(String, Formula)>,
    signal_listeners: HashMap<String, Vec<SignalListener>>,
    data_listeners: HashMap<String, Vec<DataListener>>,
    after: Vec<AfterRun>,
    changed_signals: Vec<String>,
    changed_data: Vec<String>,
    runs: Arc<AtomicUsize>,
    finalized: Arc<AtomicUsize>,
}

impl EngineRuntime for ScriptedRuntime {
    fn run(&mut self) -> Result<(), EngineError> {
        self.runs.fetch_add(1, Ordering::SeqCst);

        for (name, formula) in &self.formulas {
            let next = formula(&self.signals);
            if self.signals.get(name) != Some(&next) {
                self.signals.insert(name.clone(), next);
                self.changed_signals.push(name.clone());
            }
        }

        for name in std::mem::take(&mut self.changed_signals) {
            if let (Some(listeners), Some(value)) = (self.signal_listeners.get(&name), self.signals.get(&name)) {
                for listener in listeners {
                    listener(&name, value);
                }
            }
        }
        for name in std::mem::take(&mut self.changed_data) {
            if let (Some(listeners), Some(rows)) = (self.data_listeners.get(&name), self.data.get(&name)) {
                for listener in listeners {
                    listener(&name, rows);
                }
            }
        }
        for callback in std::mem::take(&mut self.after) {
            callback();
        }
        Ok(())
    }

    fn signal(&self, name: &str) -> Result<Value, EngineError> {
        self.signals
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownSignal(name.to_string()))
    }

    fn set_signal(&mut self, name: &str, value: Value) -> Result<(), EngineError> {
        if !self.signals.contains_key(name) {
            return Err(EngineError::UnknownSignal(name.to_string()));
        }
        if self.signals.get(name) != Some(&value) {
            self.signals.insert(name.to_string(), value);
            self.changed_signals.push(name.to_string());
        }
        Ok(())
    }

    fn data(&self, name: &str) -> Result<Vec<Value>, EngineError> {
        self.data
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownData(name.to_string()))
    }

    fn change(&mut self, name: &str, changes: Changeset) -> Result<(), EngineError> {
        let rows = self
            .data
            .get_mut(name)
            .ok_or_else(|| EngineError::UnknownData(name.to_string()))?;
        if changes.remove_all {
            rows.clear();
        }
        rows.extend(changes.insert);
        self.changed_data.push(name.to_string());
        Ok(())
    }

    fn add_signal_listener(&mut self, name: &str, listener: SignalListener) -> Result<(), EngineError> {
        self.signal_listeners
            .entry(name.to_string())
            .or_default()
            .push(listener);
        Ok(())
    }

    fn add_data_listener(&mut self, name: &str, listener: DataListener) -> Result<(), EngineError> {
        self.data_listeners
            .entry(name.to_string())
            .or_default()
            .push(listener);
        Ok(())
    }

    fn run_after(&mut self, callback: AfterRun) {
        self.after.push(callback);
    }

    fn finalize(&mut self) {
        self.signal_listeners.clear();
        self.data_listeners.clear();
        self.finalized.fetch_add(1, Ordering::SeqCst);
    }
}
