//! Variable Ordering
//!
//! Places variable definitions in dependency order so every calculation only
//! references names emitted before it.

use indexmap::IndexSet;
use tracing::debug;

use super::expr::scan_identifiers;
use super::variable::{Calculation, VariableDef};
use crate::error::{CompileError, CycleError};
use crate::graph::DependencyGraph;

/// The names a variable reads from.
///
/// Tabular calculations list their sources explicitly; scalar calculations
/// read the free identifiers of their expression. Plain and loader-backed
/// variables have no sources.
pub fn source_names(variable: &VariableDef) -> Vec<String> {
    match &variable.calculation {
        Some(Calculation::Tabular { sources, .. }) => sources
            .iter()
            .cloned()
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect(),
        Some(Calculation::Scalar { expression }) => scan_identifiers(expression),
        None => Vec::new(),
    }
}

/// Order `variables` so that every variable follows the variables it
/// references.
///
/// References to names outside `variables` (static data sources, widget
/// signals) are treated as already satisfied. Ties are broken by input
/// order.
pub fn order(variables: Vec<VariableDef>) -> Result<Vec<VariableDef>, CompileError> {
    let mut graph = DependencyGraph::new();

    for variable in &variables {
        if variable.name.is_empty() {
            return Err(CompileError::EmptyName);
        }
        if graph.index_of(&variable.name).is_some() {
            return Err(CompileError::DuplicateVariable(variable.name.clone()));
        }
        graph.add_node(&variable.name);
    }

    for variable in &variables {
        let Some(dependent) = graph.index_of(&variable.name) else {
            continue;
        };
        for source in source_names(variable) {
            match graph.index_of(&source) {
                Some(dependency) => graph.add_edge(dependency, dependent),
                None => debug!(variable = %variable.name, source = %source, "external reference"),
            }
        }
    }

    match graph.topological_order() {
        Ok(sorted) => {
            let mut slots: Vec<Option<VariableDef>> = variables.into_iter().map(Some).collect();
            // Node indices match input positions because nodes were added in input order.
            Ok(sorted
                .into_iter()
                .filter_map(|index| slots[index.raw()].take())
                .collect())
        }
        Err(unsorted) => Err(CycleError {
            names: unsorted
                .into_iter()
                .map(|index| graph.name(index).to_string())
                .collect(),
        }
        .into()),
    }
}
