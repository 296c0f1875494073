//! Dependency Graph and Topological Sort
//!
//! Nodes live in an arena indexed by [`NodeIndex`]. The name to index map only
//! exists at the boundary; the sort itself works on plain indices.
//!
//! # Algorithm
//!
//! Kahn's algorithm with a FIFO queue:
//!
//! 1. Compute the in-degree of every node.
//! 2. Seed the queue with zero in-degree nodes, in registration order.
//! 3. Pop a node, append it to the output and decrement its dependents. Any
//!    dependent that reaches zero joins the back of the queue.
//!
//! If the output is shorter than the node count, the remaining nodes sit on
//! (or behind) a cycle and are returned as the error value.

use std::collections::VecDeque;

use indexmap::IndexMap;

use super::node::{GraphNode, NodeIndex};

/// An arena-backed directed graph of named nodes.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// All nodes, indexed by `NodeIndex`.
    nodes: Vec<GraphNode>,

    /// Boundary lookup from name to index.
    names: IndexMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, or return the existing index for `name`.
    pub fn add_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&index) = self.names.get(name) {
            return index;
        }
        let index = NodeIndex::new(self.nodes.len());
        self.nodes.push(GraphNode::new(name));
        self.names.insert(name.to_string(), index);
        index
    }

    /// Look up the index registered for `name`.
    pub fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.names.get(name).copied()
    }

    pub fn node(&self, index: NodeIndex) -> &GraphNode {
        &self.nodes[index.raw()]
    }

    pub fn name(&self, index: NodeIndex) -> &str {
        self.nodes[index.raw()].name()
    }

    /// Add a dependency edge: `dependent` depends on `dependency`.
    ///
    /// Duplicate edges are ignored so in-degrees count distinct sources.
    pub fn add_edge(&mut self, dependency: NodeIndex, dependent: NodeIndex) {
        if self.nodes[dependent.raw()].add_dependency(dependency) {
            self.nodes[dependency.raw()].add_dependent(dependent);
        }
    }

    /// Get the total number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Order every node so that dependencies come before dependents.
    ///
    /// On failure, returns the nodes that could not be placed, in
    /// registration order.
    pub fn topological_order(&self) -> Result<Vec<NodeIndex>, Vec<NodeIndex>> {
        let mut in_degree: Vec<usize> = self
            .nodes
            .iter()
            .map(|node| node.dependencies().len())
            .collect();

        let mut queue: VecDeque<NodeIndex> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(index, _)| NodeIndex::new(index))
            .collect();

        let mut result = Vec::with_capacity(self.nodes.len());

        while let Some(index) = queue.pop_front() {
            result.push(index);

            for &dependent in self.nodes[index.raw()].dependents() {
                let degree = &mut in_degree[dependent.raw()];
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if result.len() == self.nodes.len() {
            return Ok(result);
        }

        let unsorted = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree > 0)
            .map(|(index, _)| NodeIndex::new(index))
            .collect();
        Err(unsorted)
    }
}
