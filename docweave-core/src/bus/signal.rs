//! Signal Values and Batches
//!
//! A signal is a named value shared by every peer that declares it. Values
//! travel between peers in [`Batch`]es: ordered sets of changes from a single
//! origin.
//!
//! # Wire Shape
//!
//! Batches serialize to a plain JSON object so they can cross a host
//! boundary unchanged:
//!
//! ```text
//! { "n": { "value": 42, "isData": false } }
//! ```

use std::borrow::Borrow;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a peer, unique within one render.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&PeerId> for PeerId {
    fn from(id: &PeerId) -> Self {
        id.clone()
    }
}

impl Borrow<str> for PeerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Priority of a peer's initial value. Higher wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(pub i32);

impl Priority {
    /// A static default, such as a variable's declared value.
    pub const DEFAULT: Priority = Priority(0);

    /// A value the user set explicitly, such as a widget's bound value.
    pub const EXPLICIT: Priority = Priority(1);
}

/// A signal's value and whether it is a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalValue {
    pub value: Value,
    pub is_data: bool,
}

impl SignalValue {
    pub fn scalar(value: Value) -> Self {
        Self {
            value,
            is_data: false,
        }
    }

    pub fn data(rows: Vec<Value>) -> Self {
        Self {
            value: Value::Array(rows),
            is_data: true,
        }
    }
}

/// One atomic set of signal changes from a single origin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Batch(IndexMap<String, SignalValue>);

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, name: impl Into<String>, value: SignalValue) {
        self.0.insert(name.into(), value);
    }

    /// Builder form of [`insert`](Self::insert) for a scalar.
    pub fn with_scalar(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, SignalValue::scalar(value));
        self
    }

    /// Builder form of [`insert`](Self::insert) for a table.
    pub fn with_data(mut self, name: impl Into<String>, rows: Vec<Value>) -> Self {
        self.insert(name, SignalValue::data(rows));
        self
    }

    pub fn get(&self, name: &str) -> Option<&SignalValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SignalValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Remove and return every entry, leaving the batch empty.
    pub fn take(&mut self) -> Batch {
        std::mem::take(self)
    }
}

impl IntoIterator for Batch {
    type Item = (String, SignalValue);
    type IntoIter = indexmap::map::IntoIter<String, SignalValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(String, SignalValue)> for Batch {
    fn from_iter<I: IntoIterator<Item = (String, SignalValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A signal a peer publishes or consumes at start-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialSignal {
    pub name: String,
    pub value: Value,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub is_data: bool,
}

impl InitialSignal {
    pub fn scalar(name: impl Into<String>, value: Value, priority: Priority) -> Self {
        Self {
            name: name.into(),
            value,
            priority,
            is_data: false,
        }
    }

    pub fn data(name: impl Into<String>, rows: Vec<Value>, priority: Priority) -> Self {
        Self {
            name: name.into(),
            value: Value::Array(rows),
            priority,
            is_data: true,
        }
    }
}

/// A signal a peer shares with at least one other peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedSignal {
    pub name: String,
    pub is_data: bool,
}
