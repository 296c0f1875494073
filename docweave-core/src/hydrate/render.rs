//! Render Cycle
//!
//! One render hydrates every document element into peers, wires them on a
//! fresh bus and starts listening. A reset deactivates the bus and destroys
//! the peers before the next render builds everything again.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error};

use super::order::PluginOrder;
use crate::bus::{BroadcastSender, BusConfig, Peer, SignalBus};
use crate::error::{HydrateError, PeerFailure};

/// An element of the parsed document, as handed over by the markup parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentElement {
    pub id: String,
    pub kind: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// What a plugin gets to build its peers.
pub struct HydrationContext<'a> {
    pub elements: &'a [DocumentElement],

    /// Queue for broadcasts made outside a turn.
    pub outbox: BroadcastSender,

    /// The bus the peers will be registered on.
    pub bus: Weak<SignalBus>,
}

impl HydrationContext<'_> {
    /// Elements of one kind, in document order.
    pub fn elements_of<'e>(&'e self, kind: &'e str) -> impl Iterator<Item = &'e DocumentElement> + 'e {
        self.elements.iter().filter(move |element| element.kind == kind)
    }
}

/// Turns document elements of some family into peers.
pub trait Hydrator: Send + Sync {
    /// Name used in [`PluginOrder`] declarations.
    fn name(&self) -> &str;

    fn hydrate(&self, ctx: &HydrationContext<'_>) -> Result<Vec<Arc<dyn Peer>>, HydrateError>;
}

/// Owns the bus and peers of the current render.
pub struct RenderCycle {
    config: BusConfig,
    plugins: Vec<Arc<dyn Hydrator>>,
    bus: Option<Arc<SignalBus>>,
    peers: Vec<Arc<dyn Peer>>,
    failures: Arc<Mutex<Vec<PeerFailure>>>,
    hydrate_errors: Vec<HydrateError>,
}

impl RenderCycle {
    /// Arrange `plugins` by the resolved `order`.
    ///
    /// Every plugin must be declared in `order`. Declared names without a
    /// plugin are ignored.
    pub fn new(
        config: BusConfig,
        plugins: Vec<Arc<dyn Hydrator>>,
        order: &PluginOrder,
    ) -> Result<Self, HydrateError> {
        if let Some(missing) = plugins.iter().find(|plugin| !order.contains(plugin.name())) {
            return Err(HydrateError::UnknownPlugin(missing.name().to_string()));
        }

        let mut remaining = plugins;
        let mut arranged = Vec::with_capacity(remaining.len());
        for name in order.resolve()? {
            while let Some(position) = remaining.iter().position(|plugin| plugin.name() == name) {
                arranged.push(remaining.remove(position));
            }
        }

        Ok(Self {
            config,
            plugins: arranged,
            bus: None,
            peers: Vec::new(),
            failures: Arc::new(Mutex::new(Vec::new())),
            hydrate_errors: Vec::new(),
        })
    }

    /// Plugin names in hydration order.
    pub fn plugin_order(&self) -> Vec<&str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }

    /// Reset any previous render, then hydrate `elements` onto a fresh bus.
    ///
    /// A plugin that fails to hydrate is logged and skipped; the rest of the
    /// document still renders.
    pub async fn render(&mut self, elements: &[DocumentElement]) -> Result<Arc<SignalBus>, HydrateError> {
        self.reset();

        let failures = Arc::clone(&self.failures);
        let bus = Arc::new(
            SignalBus::new(self.config.clone())
                .with_failure_handler(move |failure| failures.lock().push(failure.clone())),
        );

        let ctx = HydrationContext {
            elements,
            outbox: bus.sender(),
            bus: Arc::downgrade(&bus),
        };

        for plugin in &self.plugins {
            match plugin.hydrate(&ctx) {
                Ok(peers) => {
                    debug!(plugin = plugin.name(), peers = peers.len(), "hydrated");
                    for peer in peers {
                        if let Err(err) = bus.register_peer(Arc::clone(&peer)) {
                            error!(plugin = plugin.name(), peer = %peer.id(), error = %err, "peer rejected");
                            peer.destroy();
                            self.hydrate_errors.push(err.into());
                            continue;
                        }
                        self.peers.push(peer);
                    }
                }
                Err(err) => {
                    error!(plugin = plugin.name(), error = %err, "hydration failed");
                    self.hydrate_errors.push(err);
                }
            }
        }

        bus.begin_listening().await?;
        debug!(peers = self.peers.len(), "render listening");

        self.bus = Some(Arc::clone(&bus));
        Ok(bus)
    }

    /// Deactivate the current bus and destroy every peer.
    pub fn reset(&mut self) {
        if let Some(bus) = self.bus.take() {
            bus.deactivate();
        }
        for peer in self.peers.drain(..) {
            peer.destroy();
        }
        self.failures.lock().clear();
        self.hydrate_errors.clear();
    }

    pub fn bus(&self) -> Option<&Arc<SignalBus>> {
        self.bus.as_ref()
    }

    pub fn peers(&self) -> &[Arc<dyn Peer>] {
        &self.peers
    }

    /// Peer failures reported during the current render.
    pub fn failures(&self) -> Vec<PeerFailure> {
        self.failures.lock().clone()
    }

    /// Plugins that failed during the current render.
    pub fn hydrate_errors(&self) -> &[HydrateError] {
        &self.hydrate_errors
    }
}

impl Drop for RenderCycle {
    fn drop(&mut self) {
        self.reset();
    }
}
