//! Graph Nodes
//!
//! This module defines the nodes stored in the dependency graph arena.

use smallvec::SmallVec;

/// Stable index of a node inside a [`DependencyGraph`](super::DependencyGraph).
///
/// Indices are assigned in registration order and never reused, so comparing
/// two indices also compares registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the raw index value.
    pub fn raw(&self) -> usize {
        self.0
    }
}

/// Edge list type. Most definitions reference only a handful of names.
pub type Edges = SmallVec<[NodeIndex; 4]>;

/// A named node in the dependency graph.
#[derive(Debug, Clone)]
pub struct GraphNode {
    /// The name this node was registered under.
    name: String,

    /// Nodes that this node depends on (parents in the DAG).
    dependencies: Edges,

    /// Nodes that depend on this node (children in the DAG).
    dependents: Edges,
}

impl GraphNode {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Edges::new(),
            dependents: Edges::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nodes this node reads from, in edge insertion order.
    pub fn dependencies(&self) -> &[NodeIndex] {
        &self.dependencies
    }

    /// Nodes that read from this node, in edge insertion order.
    pub fn dependents(&self) -> &[NodeIndex] {
        &self.dependents
    }

    /// Record a dependency. Returns `false` if it was already present.
    pub(crate) fn add_dependency(&mut self, index: NodeIndex) -> bool {
        if self.dependencies.contains(&index) {
            return false;
        }
        self.dependencies.push(index);
        true
    }

    pub(crate) fn add_dependent(&mut self, index: NodeIndex) {
        if !self.dependents.contains(&index) {
            self.dependents.push(index);
        }
    }
}
