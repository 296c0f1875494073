//! Spec Assembly
//!
//! Turns ordered variables plus loader and table stubs into a [`Spec`].
//!
//! Emission order:
//!
//! 1. External data loaders, so calculations can read them.
//! 2. Tables bound to names no loader or variable defines (pasted or
//!    editable tables). Calculations may read these too.
//! 3. Variables, in the order produced by [`order`](super::order).
//!
//! A name is emitted at most once per namespace (signals, data). Later
//! duplicates are skipped.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::spec::{DataSpec, SignalSpec, Spec};
use super::variable::{Calculation, LoaderKind, VariableDef};

/// An external data loader declared by the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataLoaderStub {
    pub name: String,
    #[serde(flatten)]
    pub kind: LoaderKind,
}

/// A tabular element (table, grid) bound to a named data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabularWidgetStub {
    pub data_source_name: String,
}

#[derive(Default)]
struct SpecBuilder {
    signals: IndexMap<String, SignalSpec>,
    data: IndexMap<String, DataSpec>,
}

impl SpecBuilder {
    fn push_signal(&mut self, signal: SignalSpec) {
        if self.signals.contains_key(&signal.name) {
            debug!(signal = %signal.name, "duplicate signal skipped");
            return;
        }
        self.signals.insert(signal.name.clone(), signal);
    }

    fn push_data(&mut self, data: DataSpec) -> bool {
        if self.data.contains_key(&data.name) {
            debug!(data = %data.name, "duplicate data node skipped");
            return false;
        }
        self.data.insert(data.name.clone(), data);
        true
    }

    /// Emit a data node and its bridge signal.
    fn push_bridged(&mut self, data: DataSpec) {
        let name = data.name.clone();
        if self.push_data(data) {
            self.push_signal(SignalSpec::bridge(&name));
        }
    }

    fn finish(self) -> Spec {
        Spec {
            signals: self.signals.into_values().collect(),
            data: self.data.into_values().collect(),
        }
    }
}

fn loader_node(name: &str, kind: &LoaderKind) -> DataSpec {
    match kind {
        LoaderKind::Static { values } => DataSpec {
            values: Some(values.clone()),
            ..DataSpec::placeholder(name)
        },
        LoaderKind::Dynamic => DataSpec::placeholder(name),
    }
}

/// Assemble a declarative spec from already-ordered variables.
pub fn assemble(
    ordered: &[VariableDef],
    loaders: &[DataLoaderStub],
    tables: &[TabularWidgetStub],
) -> Spec {
    let mut builder = SpecBuilder::default();

    for loader in loaders {
        builder.push_bridged(loader_node(&loader.name, &loader.kind));
    }

    let defined: IndexSet<&str> = loaders
        .iter()
        .map(|loader| loader.name.as_str())
        .chain(ordered.iter().map(|variable| variable.name.as_str()))
        .collect();
    for table in tables {
        if !defined.contains(table.data_source_name.as_str()) {
            builder.push_bridged(DataSpec::placeholder(&table.data_source_name));
        }
    }

    for variable in ordered {
        if let Some(kind) = &variable.loader {
            builder.push_bridged(loader_node(&variable.name, kind));
            continue;
        }

        match &variable.calculation {
            Some(Calculation::Tabular { sources, transforms }) => {
                builder.push_bridged(DataSpec {
                    name: variable.name.clone(),
                    values: None,
                    source: sources.clone(),
                    transform: transforms.clone(),
                });
            }
            Some(Calculation::Scalar { expression }) => builder.push_signal(SignalSpec {
                name: variable.name.clone(),
                value: variable.value.clone(),
                update: Some(expression.clone()),
                is_data: false,
            }),
            None => builder.push_signal(SignalSpec {
                name: variable.name.clone(),
                value: variable.value.clone(),
                update: None,
                is_data: false,
            }),
        }
    }

    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::order;
    use serde_json::json;

    #[test]
    fn scalar_expression_is_passed_verbatim() {
        let vars = vec![VariableDef::scalar("total", "price *  qty").with_value(json!(0))];
        let spec = assemble(&vars, &[], &[]);

        let signal = spec.signal("total").unwrap();
        assert_eq!(signal.update.as_deref(), Some("price *  qty"));
        assert_eq!(signal.value, Some(json!(0)));
        assert!(spec.data.is_empty());
    }

    #[test]
    fn tabular_calculation_emits_node_and_bridge() {
        let transforms = vec![json!({"type": "filter", "expr": "datum.v > 1"})];
        let vars = vec![VariableDef::tabular("big", ["raw"], transforms.clone())];
        let loaders = vec![DataLoaderStub {
            name: "raw".to_string(),
            kind: LoaderKind::Static {
                values: vec![json!({"v": 1}), json!({"v": 2})],
            },
        }];
        let spec = assemble(&vars, &loaders, &[]);

        let names: Vec<_> = spec.data.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["raw", "big"]);
        assert_eq!(spec.data_node("raw").unwrap().values.as_ref().unwrap().len(), 2);

        let big = spec.data_node("big").unwrap();
        assert_eq!(big.source, vec!["raw"]);
        assert_eq!(big.transform, transforms);
        assert!(spec.signal("big").unwrap().is_data);
    }

    #[test]
    fn tables_only_add_missing_nodes() {
        let vars = vec![VariableDef::loaded("orders", LoaderKind::Dynamic)];
        let tables = vec![
            TabularWidgetStub {
                data_source_name: "orders".to_string(),
            },
            TabularWidgetStub {
                data_source_name: "pasted".to_string(),
            },
        ];
        let spec = assemble(&vars, &[], &tables);

        let names: Vec<_> = spec.data.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["pasted", "orders"]);
        assert_eq!(spec.signals.len(), 2);
    }

    #[test]
    fn follows_dependency_order() {
        let ordered = order(vec![
            VariableDef::scalar("label", "format(total, ',')"),
            VariableDef::scalar("total", "sum"),
            VariableDef::tabular("rows", ["raw"], vec![]),
        ])
        .unwrap();
        let spec = assemble(&ordered, &[], &[]);

        let names: Vec<_> = spec.signals.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["total", "rows", "label"]);
    }

    #[test]
    fn table_named_like_a_scalar_adds_nothing() {
        let vars = vec![VariableDef::constant("n", json!(1))];
        let tables = vec![TabularWidgetStub {
            data_source_name: "n".to_string(),
        }];
        let spec = assemble(&vars, &[], &tables);

        assert!(spec.data.is_empty());
        assert!(!spec.signal("n").unwrap().is_data);
    }
}
