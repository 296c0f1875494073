//! Plugin Order
//!
//! Hydration plugins sometimes need to run before one another (a loader
//! before the tables it feeds, tables before the charts that read their
//! selection). Plugins declare those constraints up front and the order is
//! resolved once into a fixed sequence.

use crate::error::{CycleError, HydrateError};
use crate::graph::DependencyGraph;

/// A partial order over plugin names.
#[derive(Debug, Clone, Default)]
pub struct PluginOrder {
    graph: DependencyGraph,
}

impl PluginOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a plugin. Unconstrained plugins keep declaration order.
    pub fn declare(&mut self, name: &str) -> &mut Self {
        self.graph.add_node(name);
        self
    }

    /// Require `first` to hydrate before `then`.
    pub fn before(&mut self, first: &str, then: &str) -> Result<&mut Self, HydrateError> {
        let first = self.lookup(first)?;
        let then = self.lookup(then)?;
        self.graph.add_edge(first, then);
        Ok(self)
    }

    /// Require `then` to hydrate after `first`.
    pub fn after(&mut self, then: &str, first: &str) -> Result<&mut Self, HydrateError> {
        self.before(first, then)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.graph.index_of(name).is_some()
    }

    /// Resolve into a total order.
    pub fn resolve(&self) -> Result<Vec<String>, CycleError> {
        match self.graph.topological_order() {
            Ok(order) => Ok(order
                .into_iter()
                .map(|index| self.graph.name(index).to_string())
                .collect()),
            Err(unsorted) => Err(CycleError {
                names: unsorted
                    .into_iter()
                    .map(|index| self.graph.name(index).to_string())
                    .collect(),
            }),
        }
    }

    fn lookup(&self, name: &str) -> Result<crate::graph::NodeIndex, HydrateError> {
        self.graph
            .index_of(name)
            .ok_or_else(|| HydrateError::UnknownPlugin(name.to_string()))
    }
}
