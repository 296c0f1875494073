//! Declarative Engine Boundary
//!
//! The expression/dataflow engine that evaluates calculations and draws
//! charts is a third-party collaborator. These traits are the narrow surface
//! the adapter uses; an embedding supplies the implementation.

use serde_json::Value;

use crate::compile::Spec;
use crate::error::EngineError;

/// Called with the signal name and its new value.
pub type SignalListener = Box<dyn Fn(&str, &Value) + Send + Sync>;

/// Called with the data node name and its current rows.
pub type DataListener = Box<dyn Fn(&str, &[Value]) + Send + Sync>;

/// Deferred to the end of the current execution pass.
pub type AfterRun = Box<dyn FnOnce() + Send>;

/// Insertions and removals applied to a data node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    /// Drop every existing row before inserting.
    pub remove_all: bool,
    pub insert: Vec<Value>,
}

impl Changeset {
    /// Replace every row with `rows`.
    pub fn replace(rows: Vec<Value>) -> Self {
        Self {
            remove_all: true,
            insert: rows,
        }
    }

    /// Append `rows`.
    pub fn insert(rows: Vec<Value>) -> Self {
        Self {
            remove_all: false,
            insert: rows,
        }
    }
}

/// Parses assembled specs into runnable instances.
pub trait DeclarativeEngine: Send + Sync {
    fn parse(&self, spec: &Spec) -> Result<Box<dyn EngineRuntime>, EngineError>;
}

/// One running engine instance.
pub trait EngineRuntime: Send {
    /// Evaluate everything pending. Listeners fire during the pass and
    /// `run_after` callbacks fire at its end.
    fn run(&mut self) -> Result<(), EngineError>;

    fn signal(&self, name: &str) -> Result<Value, EngineError>;

    fn set_signal(&mut self, name: &str, value: Value) -> Result<(), EngineError>;

    fn data(&self, name: &str) -> Result<Vec<Value>, EngineError>;

    fn change(&mut self, name: &str, changes: Changeset) -> Result<(), EngineError>;

    fn add_signal_listener(&mut self, name: &str, listener: SignalListener) -> Result<(), EngineError>;

    fn add_data_listener(&mut self, name: &str, listener: DataListener) -> Result<(), EngineError>;

    /// Defer `callback` to the end of the current (or next) pass.
    fn run_after(&mut self, callback: AfterRun);

    /// Release listeners and timers.
    fn finalize(&mut self) {}
}
