//! Dependency Graph
//!
//! This module implements the arena graph used wherever named definitions
//! must be placed in dependency order: calculated variables at compile time
//! and hydration plugins at startup.
//!
//! # Overview
//!
//! The graph is a directed graph where:
//!
//! - Nodes are named definitions, stored in an arena and addressed by
//!   [`NodeIndex`]
//! - Edges represent dependencies: if A depends on B, there is an edge from B to A
//!
//! Names are resolved to indices once, at the boundary. The sort operates on
//! indices only, and ties are broken by registration order so the result is
//! deterministic for a given input.

mod node;
mod sort;

pub use node::{GraphNode, NodeIndex};
pub use sort::DependencyGraph;
