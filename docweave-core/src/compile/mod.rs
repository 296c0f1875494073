//! Document Compilation
//!
//! Compile-time half of the system. Variable definitions are ordered by
//! their references and assembled into a declarative [`Spec`] that an
//! expression engine can execute.
//!
//! ```rust,ignore
//! use docweave_core::compile::{assemble, order, VariableDef};
//!
//! let ordered = order(vec![
//!     VariableDef::scalar("doubled", "n * 2"),
//!     VariableDef::constant("n", json!(10)),
//! ])?;
//! let spec = assemble(&ordered, &[], &[]);
//! ```

mod assemble;
mod expr;
mod order;
mod spec;
mod variable;

pub use assemble::{assemble, DataLoaderStub, TabularWidgetStub};
pub use expr::{scan_identifiers, BUILTIN_CONSTANTS, BUILTIN_FUNCTIONS};
pub use order::{order, source_names};
pub use spec::{DataSpec, SignalSpec, Spec};
pub use variable::{Calculation, LoaderKind, VariableDef};
