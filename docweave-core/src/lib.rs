//! Docweave Core
//!
//! This crate provides the signal propagation core for Docweave interactive
//! documents: pages mixing prose, data loaders, tables, widgets and charts
//! that stay consistent as the reader interacts with any of them.
//!
//! It implements:
//!
//! - Compile-time ordering of calculated variables, with cycle detection
//! - Assembly of a declarative spec for an external expression engine
//! - The peer contract every hydrated component implements
//! - The signal bus that routes changes between peers
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: Arena dependency graph and deterministic topological sort
//! - `compile`: Variable ordering and spec assembly
//! - `bus`: Peers, signal registry and broadcast engine
//! - `runtime`: Adapter that puts a declarative engine on the bus
//! - `hydrate`: Plugin ordering and the per-render lifecycle
//!
//! # Example
//!
//! ```rust,ignore
//! use docweave_core::bus::{Batch, BusConfig, SignalBus};
//!
//! let bus = SignalBus::new(BusConfig::default());
//! bus.register_peer(slider)?;
//! bus.register_peer(label)?;
//! bus.begin_listening().await?;
//!
//! // The label receives {n: 42}; the slider hears nothing back.
//! bus.broadcast("slider", Batch::new().with_scalar("n", json!(42))).await;
//! ```

pub mod bus;
pub mod compile;
pub mod error;
pub mod graph;
pub mod hydrate;
pub mod runtime;

pub use error::{BusError, CompileError, CycleError, EngineError, HydrateError, PeerError, PeerFailure};
