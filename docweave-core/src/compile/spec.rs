//! Declarative Spec
//!
//! The assembled document "brain": signals and data nodes in an order the
//! declarative engine can execute top to bottom.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A signal in the assembled spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSpec {
    pub name: String,

    /// Initial value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Recompute rule, handed to the engine verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<String>,

    /// Set for bridge signals that expose a data node's rows.
    #[serde(skip)]
    pub is_data: bool,
}

impl SignalSpec {
    /// A bridge signal whose value is the current contents of `data_name`.
    pub fn bridge(data_name: &str) -> Self {
        Self {
            name: data_name.to_string(),
            value: None,
            update: Some(format!("data('{data_name}')")),
            is_data: true,
        }
    }
}

/// A data node in the assembled spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSpec {
    pub name: String,

    /// Inline rows. Placeholders start empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transform: Vec<Value>,
}

impl DataSpec {
    /// An empty data node to be filled at runtime.
    pub fn placeholder(name: &str) -> Self {
        Self {
            name: name.to_string(),
            values: Some(Vec::new()),
            source: Vec::new(),
            transform: Vec::new(),
        }
    }
}

/// The complete assembled spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spec {
    #[serde(default)]
    pub signals: Vec<SignalSpec>,

    #[serde(default)]
    pub data: Vec<DataSpec>,
}

impl Spec {
    pub fn signal(&self, name: &str) -> Option<&SignalSpec> {
        self.signals.iter().find(|s| s.name == name)
    }

    pub fn data_node(&self, name: &str) -> Option<&DataSpec> {
        self.data.iter().find(|d| d.name == name)
    }

    /// Engine-ready JSON.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
