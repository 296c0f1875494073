//! Signal Dependency Registry
//!
//! Maps each signal name to the peers that declared it, the authoritative
//! value, and which peer won the initial-value arbitration.
//!
//! The registry is only written by the bus: during registration and at the
//! commit step of a broadcast.

use indexmap::IndexMap;
use serde_json::Value;
use smallvec::SmallVec;

use super::signal::{Batch, InitialSignal, PeerId, Priority, SignalValue};

/// Registry entry for one signal name.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalDependency {
    /// Peers sharing this signal, in registration order.
    deps: SmallVec<[PeerId; 4]>,

    /// Priority of the winning initial value.
    priority: Priority,

    /// Peer whose initial value won.
    initial_priority_id: PeerId,

    value: Value,
    is_data: bool,
}

impl SignalDependency {
    fn new(peer: &PeerId, signal: &InitialSignal) -> Self {
        let mut deps = SmallVec::new();
        deps.push(peer.clone());
        Self {
            deps,
            priority: signal.priority,
            initial_priority_id: peer.clone(),
            value: signal.value.clone(),
            is_data: signal.is_data,
        }
    }

    /// Merge another peer's declaration. A strictly higher priority takes
    /// over the value; ties keep the first registered owner.
    fn merge(&mut self, peer: &PeerId, signal: &InitialSignal) {
        if !self.deps.contains(peer) {
            self.deps.push(peer.clone());
        }
        if signal.priority > self.priority {
            self.priority = signal.priority;
            self.initial_priority_id = peer.clone();
            self.value = signal.value.clone();
            self.is_data = signal.is_data;
        }
    }

    pub fn deps(&self) -> &[PeerId] {
        &self.deps
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn initial_priority_id(&self) -> &PeerId {
        &self.initial_priority_id
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn is_data(&self) -> bool {
        self.is_data
    }

    /// Whether more than one peer shares this signal.
    pub fn is_shared(&self) -> bool {
        self.deps.len() > 1
    }

    pub fn to_signal_value(&self) -> SignalValue {
        SignalValue {
            value: self.value.clone(),
            is_data: self.is_data,
        }
    }
}

/// All signal entries of one document instance, in first-declared order.
#[derive(Debug, Clone, Default)]
pub struct SignalRegistry {
    entries: IndexMap<String, SignalDependency>,
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one peer's initial signal.
    pub fn declare(&mut self, peer: &PeerId, signal: &InitialSignal) {
        match self.entries.get_mut(&signal.name) {
            Some(entry) => entry.merge(peer, signal),
            None => {
                self.entries
                    .insert(signal.name.clone(), SignalDependency::new(peer, signal));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&SignalDependency> {
        self.entries.get(name)
    }

    /// Whether `incoming` differs from the committed value of `name`.
    /// Unknown names always differ.
    pub fn differs(&self, name: &str, incoming: &SignalValue) -> bool {
        self.entries
            .get(name)
            .map_or(true, |entry| entry.value != incoming.value)
    }

    /// Overwrite committed values with a batch. Names nobody declared are
    /// ignored.
    pub fn commit(&mut self, batch: &Batch) {
        for (name, incoming) in batch.iter() {
            if let Some(entry) = self.entries.get_mut(name) {
                entry.value = incoming.value.clone();
                entry.is_data = incoming.is_data;
            }
        }
    }

    /// Every committed value, as one batch.
    pub fn snapshot(&self) -> Batch {
        self.entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.to_signal_value()))
            .collect()
    }

    /// Entries shared by more than one peer.
    pub fn shared(&self) -> impl Iterator<Item = (&str, &SignalDependency)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_shared())
            .map(|(name, entry)| (name.as_str(), entry))
    }

    /// Drop every dependency list so no stale route can fire.
    pub fn clear_deps(&mut self) {
        for entry in self.entries.values_mut() {
            entry.deps.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
