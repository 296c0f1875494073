//! Signal Bus
//!
//! The bus connects independently written peers through named signals. It
//! computes peer-to-peer routing once, delivers the initial state, and then
//! moves minimal batches between peers as they change.
//!
//! # Lifecycle
//!
//! ```text
//! Registering --begin_listening--> Distributing --> Active --deactivate--> Inactive
//! ```
//!
//! A bus is built fresh for every render. `begin_listening` is valid exactly
//! once, and peers can only be registered before it.
//!
//! # Broadcast
//!
//! 1. Ignore the call unless the bus is active.
//! 2. Push the origin on the turn's broadcasting stack.
//! 3. For each dependent of the origin, in registration order, deliver the
//!    entries it declared whose value differs from the committed one, and
//!    await the delivery before moving on.
//! 4. Pop the origin and commit the whole batch.
//! 5. If this was the outermost call, run the settle pass on every peer.
//! 6. Run whatever peers queued on the inbox while settling, each as its own
//!    turn, until the inbox is empty.
//!
//! Committing after delivery means every "changed?" comparison in step 3 sees
//! pre-broadcast state.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use smallvec::SmallVec;
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

use super::config::BusConfig;
use super::inbox::BroadcastSender;
use super::peer::{Peer, PeerCapabilities};
use super::registry::SignalRegistry;
use super::signal::{Batch, PeerId, SharedSignal, SignalValue};
use super::turn::BroadcastTurn;
use super::wire::Envelope;
use crate::error::{BusError, PeerError, PeerFailure, PeerPhase};

/// Receives peer failures so the hydration layer can surface them.
pub type FailureHandler = Arc<dyn Fn(&PeerFailure) + Send + Sync>;

type Dependents = SmallVec<[PeerId; 4]>;

/// Where the bus is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusState {
    /// Accepting peers.
    Registering,

    /// Delivering the initial batch and computing routes.
    Distributing,

    /// Routing broadcasts.
    Active,

    /// Deactivated. Broadcasts are ignored.
    Inactive,
}

impl BusState {
    pub fn is_active(&self) -> bool {
        matches!(self, BusState::Active)
    }
}

/// What a broadcast did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// The bus was not active; nothing happened.
    Inactive,

    /// The origin has no dependents. The batch was still committed.
    Unrouted,

    /// The batch was routed; `deliveries` peers received a non-empty
    /// sub-batch.
    Routed { deliveries: usize },
}

struct PeerEntry {
    peer: Arc<dyn Peer>,
    capabilities: PeerCapabilities,
    /// Names from the peer's initial signals.
    interests: HashSet<String>,
}

type PeerSnapshot = Vec<(PeerId, Arc<dyn Peer>, PeerCapabilities)>;

/// The broadcast engine for one document render.
pub struct SignalBus {
    config: BusConfig,
    state: RwLock<BusState>,

    /// Registered peers, in registration order.
    peers: RwLock<IndexMap<PeerId, PeerEntry>>,

    registry: RwLock<SignalRegistry>,

    /// Peers to notify when the key peer changes a shared signal.
    routing: RwLock<HashMap<PeerId, Dependents>>,

    /// Shared signals per peer, handed to `begin_listening`.
    shared: RwLock<HashMap<PeerId, Vec<SharedSignal>>>,

    failure_handler: Option<FailureHandler>,

    inbox_tx: mpsc::UnboundedSender<Envelope>,
    inbox_rx: Mutex<mpsc::UnboundedReceiver<Envelope>>,
}

impl SignalBus {
    pub fn new(config: BusConfig) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            config,
            state: RwLock::new(BusState::Registering),
            peers: RwLock::new(IndexMap::new()),
            registry: RwLock::new(SignalRegistry::new()),
            routing: RwLock::new(HashMap::new()),
            shared: RwLock::new(HashMap::new()),
            failure_handler: None,
            inbox_tx,
            inbox_rx: Mutex::new(inbox_rx),
        }
    }

    /// Install the handler that receives peer failures.
    pub fn with_failure_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&PeerFailure) + Send + Sync + 'static,
    {
        self.failure_handler = Some(Arc::new(handler));
        self
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn state(&self) -> BusState {
        *self.state.read()
    }

    /// Register a peer and merge its initial signals into the registry.
    pub fn register_peer(&self, peer: Arc<dyn Peer>) -> Result<(), BusError> {
        let id = peer.id().clone();
        if self.state() != BusState::Registering {
            return Err(BusError::NotAcceptingPeers(id.to_string()));
        }

        let mut peers = self.peers.write();
        if peers.contains_key(&id) {
            return Err(BusError::DuplicatePeer(id.to_string()));
        }

        let signals = peer.initial_signals();
        {
            let mut registry = self.registry.write();
            for signal in &signals {
                registry.declare(&id, signal);
            }
        }

        let capabilities = peer.capabilities();
        debug!(peer = %id, signals = signals.len(), ?capabilities, "peer registered");

        peers.insert(
            id,
            PeerEntry {
                peer,
                capabilities,
                interests: signals.into_iter().map(|s| s.name).collect(),
            },
        );
        Ok(())
    }

    /// Deliver the initial state, compute routing and start listening.
    pub async fn begin_listening(&self) -> Result<(), BusError> {
        {
            let mut state = self.state.write();
            if *state != BusState::Registering {
                return Err(BusError::AlreadyListening);
            }
            *state = BusState::Distributing;
        }

        let peers = self.peer_snapshot();
        let initial = self.registry.read().snapshot();
        debug!(peers = peers.len(), signals = initial.len(), "initial distribution");

        let mut turn = BroadcastTurn::new(self);
        for (id, peer, capabilities) in &peers {
            if !capabilities.contains(PeerCapabilities::RECEIVE) {
                continue;
            }
            if let Err(err) = peer.receive_batch(initial.clone(), None, &mut turn).await {
                self.report(id, PeerPhase::Receive, err);
            }
        }
        self.settle(&peers).await;

        let (routing, shared) = self.compute_routing();
        debug!(routed_peers = routing.len(), listening_peers = shared.len(), "routing computed");
        *self.routing.write() = routing;
        *self.shared.write() = shared;

        for (id, peer, capabilities) in &peers {
            let signals = self.shared.read().get(id).cloned();
            let Some(signals) = signals else {
                continue;
            };
            if !capabilities.contains(PeerCapabilities::LISTEN) {
                continue;
            }
            if let Err(err) = peer.begin_listening(&signals).await {
                self.report(id, PeerPhase::Listen, err);
            }
        }

        *self.state.write() = BusState::Active;

        let startup = self.drain_inbox().await;
        debug!(startup_broadcasts = startup, "bus listening");
        Ok(())
    }

    /// Route `batch` from `origin` as an outermost broadcast, then settle.
    ///
    /// Batches peers queued on the inbox while settling (an engine reporting
    /// derived values) are broadcast before this returns, so shared signals
    /// are consistent once the call completes.
    pub async fn broadcast(&self, origin: impl Into<PeerId>, batch: Batch) -> BroadcastOutcome {
        let outcome = self.outermost(origin.into(), batch).await;
        if outcome != BroadcastOutcome::Inactive {
            self.drain_inbox().await;
        }
        outcome
    }

    /// One turn: route, commit and settle. Never touches the inbox.
    async fn outermost(&self, origin: PeerId, batch: Batch) -> BroadcastOutcome {
        let mut turn = BroadcastTurn::new(self);
        let outcome = self.route(&mut turn, origin, batch).await;

        let settle = match outcome {
            BroadcastOutcome::Inactive => false,
            BroadcastOutcome::Unrouted => self.config.settle_unrouted,
            BroadcastOutcome::Routed { .. } => true,
        };
        if settle {
            let peers = self.peer_snapshot();
            self.settle(&peers).await;
        }
        outcome
    }

    /// Route and commit one batch within `turn`. Never settles.
    pub(crate) async fn route(
        &self,
        turn: &mut BroadcastTurn<'_>,
        origin: PeerId,
        batch: Batch,
    ) -> BroadcastOutcome {
        if !self.state().is_active() {
            warn!(origin = %origin, signals = batch.len(), "broadcast on inactive bus ignored");
            return BroadcastOutcome::Inactive;
        }

        if turn.is_broadcasting(&origin) {
            warn!(origin = %origin, depth = turn.depth(), "peer re-entered its own broadcast");
        } else if turn.depth() > 0 {
            debug!(origin = %origin, depth = turn.depth(), "nested broadcast");
        }

        turn.push(origin.clone());
        if turn.depth() > self.config.chain_warning_depth {
            warn!(
                origin = %origin,
                depth = turn.depth(),
                limit = self.config.chain_warning_depth,
                "broadcast chain is unusually deep"
            );
        }

        let dependents: Dependents = self.routing.read().get(&origin).cloned().unwrap_or_default();
        let mut deliveries = 0;

        for target in &dependents {
            let delivery = {
                let peers = self.peers.read();
                peers.get(target).map(|entry| {
                    let registry = self.registry.read();
                    let sub_batch: Batch = batch
                        .iter()
                        .filter(|(name, value)| {
                            entry.interests.contains(*name) && registry.differs(name, value)
                        })
                        .map(|(name, value)| (name.to_string(), value.clone()))
                        .collect();
                    (entry.peer.clone(), entry.capabilities, sub_batch)
                })
            };

            let Some((peer, capabilities, sub_batch)) = delivery else {
                warn!(origin = %origin, peer = %target, "routing miss, peer no longer registered");
                continue;
            };
            if !capabilities.contains(PeerCapabilities::RECEIVE) || sub_batch.is_empty() {
                trace!(origin = %origin, peer = %target, "nothing to deliver");
                continue;
            }

            trace!(origin = %origin, peer = %target, signals = sub_batch.len(), "delivering");
            if let Err(err) = peer.receive_batch(sub_batch, Some(&origin), turn).await {
                self.report(target, PeerPhase::Receive, err);
            }
            deliveries += 1;
        }

        turn.pop();
        self.registry.write().commit(&batch);

        if dependents.is_empty() {
            BroadcastOutcome::Unrouted
        } else {
            BroadcastOutcome::Routed { deliveries }
        }
    }

    /// Stop routing. Peers are left alive; destroying them is the caller's
    /// job.
    pub fn deactivate(&self) {
        self.registry.write().clear_deps();
        self.routing.write().clear();
        self.shared.write().clear();
        *self.state.write() = BusState::Inactive;
        debug!("bus deactivated");
    }

    /// Forget a peer. Routes that still name it become routing misses.
    pub fn retire_peer(&self, id: &str) -> Option<Arc<dyn Peer>> {
        self.peers.write().shift_remove(id).map(|entry| entry.peer)
    }

    /// Handle for queueing broadcasts from outside a turn.
    pub fn sender(&self) -> BroadcastSender {
        BroadcastSender::new(self.inbox_tx.clone())
    }

    /// Run every queued envelope as its own turn, including envelopes queued
    /// by those turns. Returns how many were processed.
    pub async fn drain_inbox(&self) -> usize {
        let mut processed = 0;
        loop {
            let next = self.inbox_rx.lock().try_recv().ok();
            let Some(envelope) = next else {
                break;
            };
            self.outermost(envelope.origin, envelope.batch).await;
            processed += 1;
            if processed == self.config.chain_warning_depth + 1 {
                warn!(
                    processed,
                    limit = self.config.chain_warning_depth,
                    "inbox keeps refilling, peers may be echoing each other"
                );
            }
        }
        processed
    }

    /// The committed value of a signal.
    pub fn signal_value(&self, name: &str) -> Option<SignalValue> {
        self.registry.read().get(name).map(|entry| entry.to_signal_value())
    }

    /// Every committed value.
    pub fn signal_snapshot(&self) -> Batch {
        self.registry.read().snapshot()
    }

    /// Ask a peer for its own view of a signal.
    pub fn peer_signal_value(&self, peer: &str, name: &str) -> Option<Value> {
        let peer = {
            let peers = self.peers.read();
            let entry = peers.get(peer)?;
            if !entry.capabilities.contains(PeerCapabilities::CURRENT_VALUE) {
                return None;
            }
            entry.peer.clone()
        };
        peer.current_signal_value(name)
    }

    /// Signals `peer` shares with other peers. Empty until routing is
    /// computed.
    pub fn shared_signals(&self, peer: &str) -> Vec<SharedSignal> {
        self.shared.read().get(peer).cloned().unwrap_or_default()
    }

    /// Peers notified when `peer` broadcasts, in delivery order.
    pub fn dependents(&self, peer: &str) -> Vec<PeerId> {
        self.routing
            .read()
            .get(peer)
            .map(|deps| deps.to_vec())
            .unwrap_or_default()
    }

    /// Registered peer ids, in registration order.
    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.peers.read().keys().cloned().collect()
    }

    fn peer_snapshot(&self) -> PeerSnapshot {
        self.peers
            .read()
            .iter()
            .map(|(id, entry)| (id.clone(), entry.peer.clone(), entry.capabilities))
            .collect()
    }

    /// For every signal shared by more than one peer, each owner must notify
    /// every other owner. Dependents are ordered by registration.
    fn compute_routing(&self) -> (HashMap<PeerId, Dependents>, HashMap<PeerId, Vec<SharedSignal>>) {
        let peers = self.peers.read();
        let registry = self.registry.read();

        let mut routing: HashMap<PeerId, Dependents> = HashMap::new();
        let mut shared: HashMap<PeerId, Vec<SharedSignal>> = HashMap::new();

        for (name, entry) in registry.shared() {
            for owner in entry.deps() {
                shared.entry(owner.clone()).or_default().push(SharedSignal {
                    name: name.to_string(),
                    is_data: entry.is_data(),
                });

                let dependents = routing.entry(owner.clone()).or_default();
                for other in entry.deps() {
                    if other != owner && !dependents.contains(other) {
                        dependents.push(other.clone());
                    }
                }
            }
        }

        for dependents in routing.values_mut() {
            dependents.sort_by_key(|id| peers.get_index_of(id).unwrap_or(usize::MAX));
        }

        (routing, shared)
    }

    async fn settle(&self, peers: &PeerSnapshot) {
        for (id, peer, capabilities) in peers {
            if !capabilities.contains(PeerCapabilities::SETTLE) {
                continue;
            }
            if let Err(err) = peer.broadcast_complete().await {
                self.report(id, PeerPhase::Settle, err);
            }
        }
    }

    fn report(&self, peer_id: &PeerId, phase: PeerPhase, err: PeerError) {
        error!(peer = %peer_id, phase = %phase, error = %err, "peer hook failed");
        if let Some(handler) = &self.failure_handler {
            handler(&PeerFailure {
                peer_id: peer_id.to_string(),
                phase,
                error: err,
            });
        }
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalBus")
            .field("state", &self.state())
            .field("peers", &self.peer_ids())
            .field("signals", &self.registry.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{InitialSignal, Priority};
    use async_trait::async_trait;
    use serde_json::json;

    struct StaticPeer {
        id: PeerId,
        signals: Vec<InitialSignal>,
        capabilities: PeerCapabilities,
    }

    impl StaticPeer {
        fn new(id: &str, signals: &[(&str, i32)]) -> Arc<Self> {
            Arc::new(Self {
                id: PeerId::from(id),
                signals: signals
                    .iter()
                    .map(|(name, priority)| InitialSignal::scalar(*name, json!(id), Priority(*priority)))
                    .collect(),
                capabilities: PeerCapabilities::all(),
            })
        }
    }

    #[async_trait]
    impl Peer for StaticPeer {
        fn id(&self) -> &PeerId {
            &self.id
        }

        fn initial_signals(&self) -> Vec<InitialSignal> {
            self.signals.clone()
        }

        fn capabilities(&self) -> PeerCapabilities {
            self.capabilities
        }

        fn current_signal_value(&self, name: &str) -> Option<Value> {
            self.signals.iter().find(|s| s.name == name).map(|s| s.value.clone())
        }

        fn destroy(&self) {}
    }

    #[tokio::test]
    async fn lifecycle_is_enforced() {
        let bus = SignalBus::default();
        bus.register_peer(StaticPeer::new("a", &[("x", 0)])).unwrap();
        assert_eq!(
            bus.register_peer(StaticPeer::new("a", &[("y", 0)])),
            Err(BusError::DuplicatePeer("a".to_string()))
        );
        assert_eq!(bus.state(), BusState::Registering);

        bus.begin_listening().await.unwrap();
        assert_eq!(bus.state(), BusState::Active);
        assert_eq!(bus.begin_listening().await, Err(BusError::AlreadyListening));
        assert_eq!(
            bus.register_peer(StaticPeer::new("late", &[("x", 0)])),
            Err(BusError::NotAcceptingPeers("late".to_string()))
        );
    }

    #[tokio::test]
    async fn routing_covers_only_shared_signals() {
        let bus = SignalBus::default();
        bus.register_peer(StaticPeer::new("a", &[("x", 0), ("solo", 0)])).unwrap();
        bus.register_peer(StaticPeer::new("b", &[("x", 0), ("y", 0)])).unwrap();
        bus.register_peer(StaticPeer::new("c", &[("y", 0)])).unwrap();
        bus.begin_listening().await.unwrap();

        assert_eq!(bus.dependents("a"), vec![PeerId::from("b")]);
        assert_eq!(bus.dependents("b"), vec![PeerId::from("a"), PeerId::from("c")]);
        assert_eq!(bus.dependents("c"), vec![PeerId::from("b")]);
        assert_eq!(
            bus.shared_signals("a"),
            vec![SharedSignal {
                name: "x".to_string(),
                is_data: false
            }]
        );
    }

    #[tokio::test]
    async fn unrouted_broadcast_still_commits() {
        let bus = SignalBus::default();
        bus.register_peer(StaticPeer::new("a", &[("solo", 0)])).unwrap();
        bus.begin_listening().await.unwrap();

        let outcome = bus.broadcast("a", Batch::new().with_scalar("solo", json!(3))).await;
        assert_eq!(outcome, BroadcastOutcome::Unrouted);
        assert_eq!(bus.signal_value("solo"), Some(SignalValue::scalar(json!(3))));
    }

    #[tokio::test]
    async fn snapshot_reflects_arbitration() {
        let bus = SignalBus::default();
        bus.register_peer(StaticPeer::new("low", &[("x", 0)])).unwrap();
        bus.register_peer(StaticPeer::new("high", &[("x", 1)])).unwrap();
        bus.register_peer(StaticPeer::new("tie", &[("x", 1)])).unwrap();

        assert_eq!(
            bus.signal_snapshot(),
            Batch::new().with_scalar("x", json!("high"))
        );
        assert_eq!(bus.peer_signal_value("low", "x"), Some(json!("low")));
        assert_eq!(bus.peer_signal_value("missing", "x"), None);
    }

    #[test]
    fn current_value_needs_capability() {
        let bus = SignalBus::default();
        bus.register_peer(Arc::new(StaticPeer {
            id: PeerId::from("mute"),
            signals: vec![InitialSignal::scalar("x", json!(1), Priority::DEFAULT)],
            capabilities: PeerCapabilities::RECEIVE,
        }))
        .unwrap();
        assert_eq!(bus.peer_signal_value("mute", "x"), None);
    }
}
