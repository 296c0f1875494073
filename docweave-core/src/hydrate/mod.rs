//! Hydration
//!
//! Bridges the parsed document and the signal bus. Each element family is
//! handled by a [`Hydrator`] plugin that produces peers; plugins run in an
//! order resolved once from declared constraints.

mod order;
mod render;

pub use order::PluginOrder;
pub use render::{DocumentElement, HydrationContext, Hydrator, RenderCycle};
