//! Variable Definitions
//!
//! A document declares named variables. Each is either a plain value, a
//! loader-backed table, or a calculation over other names.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a loader-backed table gets its rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LoaderKind {
    /// Rows are embedded in the document.
    Static {
        #[serde(default)]
        values: Vec<Value>,
    },
    /// Rows arrive at runtime (fetched, pasted, uploaded).
    Dynamic,
}

/// A calculation attached to a variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Calculation {
    /// An expression evaluated by the declarative engine. Its sources are the
    /// free identifiers in the expression text.
    Scalar { expression: String },

    /// A transform pipeline over named tables. Its sources are listed
    /// explicitly.
    Tabular {
        sources: Vec<String>,
        #[serde(default)]
        transforms: Vec<Value>,
    },
}

/// A named variable declared by the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDef {
    pub name: String,

    /// Declared initial value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation: Option<Calculation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loader: Option<LoaderKind>,
}

impl VariableDef {
    /// A plain variable holding `value`.
    pub fn constant(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value: Some(value),
            calculation: None,
            loader: None,
        }
    }

    /// A variable computed from `expression`.
    pub fn scalar(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            calculation: Some(Calculation::Scalar {
                expression: expression.into(),
            }),
            loader: None,
        }
    }

    /// A table computed from `sources` through `transforms`.
    pub fn tabular<S: Into<String>>(
        name: impl Into<String>,
        sources: impl IntoIterator<Item = S>,
        transforms: Vec<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            value: None,
            calculation: Some(Calculation::Tabular {
                sources: sources.into_iter().map(Into::into).collect(),
                transforms,
            }),
            loader: None,
        }
    }

    /// A table filled by a loader.
    pub fn loaded(name: impl Into<String>, loader: LoaderKind) -> Self {
        Self {
            name: name.into(),
            value: None,
            calculation: None,
            loader: Some(loader),
        }
    }

    /// Set the declared initial value.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Whether this variable produces a table rather than a scalar.
    pub fn is_tabular(&self) -> bool {
        self.loader.is_some() || matches!(self.calculation, Some(Calculation::Tabular { .. }))
    }
}
