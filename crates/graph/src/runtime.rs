//! Node runtime - drives node lifecycles from the configuration tree
//!
//! A recursive observer on the `nodes` sequence translates config edits into
//! events on an unbounded queue; a driver task applies them. Observer
//! callbacks never suspend - they only enqueue.
//!
//! Slot identity is the node's config subtree handle, so inserts, removals,
//! replacements and reorders all reduce to one reconcile pass against the
//! current sequence.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use thalamus_observable::{Action, Key, ObservableCollection, Value};
use thalamus_protocol::{AnalogFrame, ModalitySet, StimDeclaration, TextFrame};

use crate::error::GraphError;
use crate::node::{Node, NodeContext, NodeHost, NodeOutputs};
use crate::registry::Registry;
use crate::Result;

/// Lifecycle state of one node slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Constructing,
    Stopped,
    Running,
    /// Construction failed; retried after the next config edit
    Error,
    Destroying,
}

/// One entry of the `nodes` sequence bound to a runtime object
pub struct NodeSlot {
    name: RwLock<String>,
    type_tag: RwLock<String>,
    modalities: RwLock<ModalitySet>,
    state: RwLock<NodeState>,
    last_error: RwLock<Option<String>>,
    node: tokio::sync::Mutex<Option<Box<dyn Node>>>,
    outputs: Arc<NodeOutputs>,
    config: ObservableCollection,
    /// Most recently armed stim declaration; taken by trigger
    armed: Mutex<Option<StimDeclaration>>,
}

impl NodeSlot {
    /// Current node name
    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    /// Node type tag
    pub fn type_tag(&self) -> String {
        self.type_tag.read().clone()
    }

    /// Declared modalities; empty for null slots
    pub fn modalities(&self) -> ModalitySet {
        *self.modalities.read()
    }

    /// Lifecycle state
    pub fn state(&self) -> NodeState {
        *self.state.read()
    }

    /// Construction error, if the slot is in the Error state
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// The slot's output channels
    pub fn outputs(&self) -> Arc<NodeOutputs> {
        Arc::clone(&self.outputs)
    }

    /// The slot's config subtree
    pub fn config(&self) -> &ObservableCollection {
        &self.config
    }
}

enum RuntimeEvent {
    /// The `nodes` sequence itself changed; re-reconcile slots
    Reconcile,
    /// An edit arrived under one node's subtree
    Edited {
        node_config: ObservableCollection,
        path: Vec<Key>,
        action: Action,
        value: Value,
    },
    Shutdown,
}

struct RuntimeInner {
    registry: Registry,
    nodes_config: ObservableCollection,
    slots: RwLock<Vec<Arc<NodeSlot>>>,
    events: mpsc::UnboundedSender<RuntimeEvent>,
    log_sink: RwLock<Option<Arc<dyn Fn(TextFrame) + Send + Sync>>>,
    started_at: Instant,
    alive: Arc<std::sync::atomic::AtomicBool>,
}

/// The live pipeline: all node slots plus the machinery that keeps them in
/// sync with the configuration document
#[derive(Clone)]
pub struct NodeRuntime {
    inner: Arc<RuntimeInner>,
}

impl NodeRuntime {
    /// Build the runtime over a configuration root and start the driver
    ///
    /// The root must hold a `nodes` sequence; nodes already present are
    /// constructed immediately.
    pub fn new(config: &ObservableCollection, registry: Registry) -> Result<NodeRuntime> {
        let nodes_config = match config.get("nodes") {
            Some(Value::Collection(c)) if c.is_seq() => c,
            _ => {
                return Err(GraphError::ConfigInvalid(
                    "document has no 'nodes' sequence".into(),
                ))
            }
        };

        let (events, receiver) = mpsc::unbounded_channel();
        let inner = Arc::new(RuntimeInner {
            registry,
            nodes_config: nodes_config.clone(),
            slots: RwLock::new(Vec::new()),
            events,
            log_sink: RwLock::new(None),
            started_at: Instant::now(),
            alive: Arc::new(std::sync::atomic::AtomicBool::new(true)),
        });
        let runtime = NodeRuntime { inner };

        runtime.install_observer(&nodes_config);
        let _ = runtime.inner.events.send(RuntimeEvent::Reconcile);

        let driver = runtime.clone();
        tokio::spawn(async move { driver.run(receiver).await });

        Ok(runtime)
    }

    fn install_observer(&self, nodes_config: &ObservableCollection) {
        let events = self.inner.events.clone();
        let nodes = nodes_config.clone();
        let alive = Arc::clone(&self.inner.alive);
        nodes_config.add_recursive_observer_while(
            move |origin, action, key, value| {
                // Observers must not suspend: translate to an event and return.
                if origin.ptr_eq(&nodes) {
                    let _ = events.send(RuntimeEvent::Reconcile);
                    return;
                }
                // Walk up to the child of the nodes sequence and collect the
                // relative path down to the edited key.
                let mut path = vec![key.clone()];
                let mut current = origin.clone();
                loop {
                    let Some(parent) = current.parent() else {
                        return;
                    };
                    if parent.ptr_eq(&nodes) {
                        break;
                    }
                    if let Some(step) = current.key_in_parent() {
                        path.insert(0, step);
                    }
                    current = parent;
                }
                let _ = events.send(RuntimeEvent::Edited {
                    node_config: current,
                    path,
                    action,
                    value: value.clone(),
                });
            },
            move || alive.load(std::sync::atomic::Ordering::Acquire),
            true,
        );
    }

    async fn run(self, mut receiver: mpsc::UnboundedReceiver<RuntimeEvent>) {
        while let Some(event) = receiver.recv().await {
            match event {
                RuntimeEvent::Reconcile => self.reconcile().await,
                RuntimeEvent::Edited {
                    node_config,
                    path,
                    action,
                    value,
                } => self.apply_edit(node_config, path, action, value).await,
                RuntimeEvent::Shutdown => break,
            }
        }
        self.teardown().await;
    }

    async fn reconcile(&self) {
        let current: Vec<ObservableCollection> = self
            .inner
            .nodes_config
            .entries()
            .into_iter()
            .filter_map(|(_, value)| match value {
                Value::Collection(c) if c.is_map() => Some(c),
                _ => None,
            })
            .collect();

        // Destroy slots whose config entry is gone
        let removed: Vec<Arc<NodeSlot>> = {
            let mut slots = self.inner.slots.write();
            let (kept, removed) = std::mem::take(&mut *slots)
                .into_iter()
                .partition(|slot| current.iter().any(|c| c.ptr_eq(&slot.config)));
            *slots = kept;
            removed
        };
        for slot in removed {
            self.destroy_slot(slot).await;
        }

        // Create slots for new entries
        let missing: Vec<ObservableCollection> = {
            let slots = self.inner.slots.read();
            current
                .into_iter()
                .filter(|c| !slots.iter().any(|slot| slot.config.ptr_eq(c)))
                .collect()
        };
        for config in missing {
            self.create_slot(config).await;
        }
    }

    async fn create_slot(&self, config: ObservableCollection) {
        let name = config.get_str("name").unwrap_or_default();
        let type_tag = config.get_str("type").unwrap_or_default();

        let slot = Arc::new(NodeSlot {
            name: RwLock::new(name.clone()),
            type_tag: RwLock::new(type_tag.clone()),
            modalities: RwLock::new(ModalitySet::EMPTY),
            state: RwLock::new(NodeState::Constructing),
            last_error: RwLock::new(None),
            node: tokio::sync::Mutex::new(None),
            outputs: Arc::new(NodeOutputs::new()),
            config,
            armed: Mutex::new(None),
        });
        self.inner.slots.write().push(Arc::clone(&slot));

        self.construct(&slot).await;

        if slot.config.get_bool("Running").unwrap_or(false) {
            self.start_slot(&slot).await;
        }
    }

    async fn construct(&self, slot: &Arc<NodeSlot>) {
        *slot.state.write() = NodeState::Constructing;
        let type_tag = slot.type_tag();
        let name = slot.name();

        let Some(entry) = self.inner.registry.get(&type_tag) else {
            // Unknown type: a null slot that emits nothing but is preserved
            *slot.modalities.write() = ModalitySet::EMPTY;
            *slot.state.write() = NodeState::Stopped;
            warn!(node = %name, node_type = %type_tag, "unknown node type, preserving as null slot");
            return;
        };

        let context = NodeContext {
            name: name.clone(),
            config: slot.config.clone(),
            outputs: slot.outputs(),
            host: Arc::new(self.clone()),
        };
        match (entry.constructor)(context) {
            Ok(node) => {
                *slot.node.lock().await = Some(node);
                *slot.modalities.write() = entry.modalities;
                *slot.last_error.write() = None;
                *slot.state.write() = NodeState::Stopped;
                info!(node = %name, node_type = %type_tag, "node constructed");
            }
            Err(e) => {
                *slot.last_error.write() = Some(e.to_string());
                *slot.state.write() = NodeState::Error;
                self.log(TextFrame::new(
                    format!("node '{name}' failed to construct: {e}"),
                    self.now_ns(),
                ));
                error!(node = %name, error = %e, "node construction failed");
            }
        }
    }

    async fn start_slot(&self, slot: &Arc<NodeSlot>) {
        if slot.state() != NodeState::Stopped {
            return;
        }
        let mut guard = slot.node.lock().await;
        let Some(node) = guard.as_mut() else {
            return;
        };
        match node.start().await {
            Ok(()) => {
                *slot.state.write() = NodeState::Running;
                debug!(node = %slot.name(), "node running");
            }
            Err(e) => {
                *slot.last_error.write() = Some(e.to_string());
                *slot.state.write() = NodeState::Error;
                error!(node = %slot.name(), error = %e, "node failed to start");
            }
        }
    }

    async fn stop_slot(&self, slot: &Arc<NodeSlot>) {
        if slot.state() != NodeState::Running {
            return;
        }
        let mut guard = slot.node.lock().await;
        let Some(node) = guard.as_mut() else {
            return;
        };
        if let Err(e) = node.stop().await {
            warn!(node = %slot.name(), error = %e, "node stop reported an error");
        }
        *slot.state.write() = NodeState::Stopped;
        debug!(node = %slot.name(), "node stopped");
    }

    async fn destroy_slot(&self, slot: Arc<NodeSlot>) {
        *slot.state.write() = NodeState::Destroying;
        self.stop_slot_for_destroy(&slot).await;
        slot.outputs.close_all();
        info!(node = %slot.name(), "node destroyed");
    }

    async fn stop_slot_for_destroy(&self, slot: &Arc<NodeSlot>) {
        let mut guard = slot.node.lock().await;
        if let Some(node) = guard.as_mut() {
            if let Err(e) = node.stop().await {
                warn!(node = %slot.name(), error = %e, "node stop during destroy failed");
            }
        }
        *guard = None;
    }

    async fn apply_edit(
        &self,
        node_config: ObservableCollection,
        path: Vec<Key>,
        action: Action,
        value: Value,
    ) {
        let Some(slot) = self.slot_by_config(&node_config) else {
            return;
        };

        match path.first().and_then(Key::as_field) {
            Some("Running") if path.len() == 1 => {
                if action == Action::Set {
                    if value.as_bool().unwrap_or(false) {
                        if slot.state() == NodeState::Error {
                            // Config changed; retry construction before start
                            self.construct(&slot).await;
                        }
                        self.start_slot(&slot).await;
                    } else {
                        self.stop_slot(&slot).await;
                    }
                }
                return;
            }
            Some("name") if path.len() == 1 => {
                if let Some(name) = value.as_str() {
                    *slot.name.write() = name.to_string();
                    debug!(node = %name, "node renamed");
                }
                // Renames rebind downstream subscriptions on their next
                // resolution pass; nothing to do here.
                return;
            }
            Some("type") if path.len() == 1 => {
                let was_running = slot.state() == NodeState::Running;
                self.stop_slot(&slot).await;
                *slot.node.lock().await = None;
                if let Some(tag) = value.as_str() {
                    *slot.type_tag.write() = tag.to_string();
                }
                self.construct(&slot).await;
                if was_running || slot.config.get_bool("Running").unwrap_or(false) {
                    self.start_slot(&slot).await;
                }
                return;
            }
            _ => {}
        }

        if slot.state() == NodeState::Error {
            // Any edit under the subtree retries a failed construction
            self.construct(&slot).await;
            if slot.config.get_bool("Running").unwrap_or(false) {
                self.start_slot(&slot).await;
            }
            return;
        }

        let mut guard = slot.node.lock().await;
        if let Some(node) = guard.as_mut() {
            if let Err(e) = node.reconfigure(&path, &value).await {
                warn!(node = %slot.name(), error = %e, "reconfigure failed");
            }
        }
    }

    fn slot_by_config(&self, config: &ObservableCollection) -> Option<Arc<NodeSlot>> {
        self.inner
            .slots
            .read()
            .iter()
            .find(|slot| slot.config.ptr_eq(config))
            .cloned()
    }

    /// Find a slot by current node name
    pub fn slot(&self, name: &str) -> Option<Arc<NodeSlot>> {
        self.inner
            .slots
            .read()
            .iter()
            .find(|slot| slot.name.read().as_str() == name)
            .cloned()
    }

    /// All current slots
    pub fn slots(&self) -> Vec<Arc<NodeSlot>> {
        self.inner.slots.read().clone()
    }

    /// Human label for a node type; empty when not compiled in
    pub fn type_label(&self, type_tag: &str) -> String {
        self.inner
            .registry
            .type_name(type_tag)
            .unwrap_or_default()
            .to_string()
    }

    /// Install the sink that receives node log records
    pub fn set_log_sink(&self, sink: Arc<dyn Fn(TextFrame) + Send + Sync>) {
        *self.inner.log_sink.write() = Some(sink);
    }

    // ========================================================================
    // Frame-level operations used by the RPC surface
    // ========================================================================

    /// Publish a client-supplied frame on the named node's analog output,
    /// as if the node had produced it
    pub async fn inject_analog(&self, name: &str, frame: AnalogFrame) -> Result<()> {
        let slot = self
            .slot(name)
            .ok_or_else(|| GraphError::UnknownNode(name.to_string()))?;
        slot.outputs.publish_analog(frame).await;
        Ok(())
    }

    /// Store a stim declaration on the named node; supersedes any prior one
    pub fn arm_stim(&self, name: &str, declaration: StimDeclaration) -> Result<()> {
        let slot = self
            .slot(name)
            .ok_or_else(|| GraphError::UnknownNode(name.to_string()))?;
        *slot.armed.lock() = Some(declaration);
        Ok(())
    }

    /// Play the most recently armed declaration exactly once
    ///
    /// Returns false when nothing is armed; a second trigger without a
    /// re-arm does nothing.
    pub async fn trigger_stim(&self, name: &str) -> Result<bool> {
        let slot = self
            .slot(name)
            .ok_or_else(|| GraphError::UnknownNode(name.to_string()))?;
        let declaration = slot.armed.lock().take();
        match declaration {
            Some(declaration) => {
                slot.outputs.stim.publish(Arc::new(declaration)).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Route a free-form JSON request to the named node
    pub async fn node_request(
        &self,
        name: &str,
        request: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let slot = self
            .slot(name)
            .ok_or_else(|| GraphError::UnknownNode(name.to_string()))?;
        if slot.state() == NodeState::Error {
            let message = slot.last_error().unwrap_or_default();
            return Ok(serde_json::json!({ "last_error": message }));
        }
        let mut guard = slot.node.lock().await;
        match guard.as_mut() {
            Some(node) => node.process(request).await,
            None => Ok(serde_json::Value::Null),
        }
    }

    /// Stop every node, end every stream, and halt the driver
    pub async fn shutdown(&self) {
        self.inner
            .alive
            .store(false, std::sync::atomic::Ordering::Release);
        let _ = self.inner.events.send(RuntimeEvent::Shutdown);
    }

    async fn teardown(&self) {
        let slots = std::mem::take(&mut *self.inner.slots.write());
        for slot in slots {
            self.destroy_slot(slot).await;
        }
        info!("node runtime stopped");
    }

    fn log(&self, frame: TextFrame) {
        let sink = self.inner.log_sink.read().clone();
        if let Some(sink) = sink {
            sink(frame);
        }
    }
}

impl NodeHost for NodeRuntime {
    fn outputs(&self, name: &str) -> Option<Arc<NodeOutputs>> {
        self.slot(name).map(|slot| slot.outputs())
    }

    fn modalities(&self, name: &str) -> Option<ModalitySet> {
        self.slot(name).map(|slot| slot.modalities())
    }

    fn log(&self, text: TextFrame) {
        NodeRuntime::log(self, text);
    }

    fn now_ns(&self) -> u64 {
        self.inner.started_at.elapsed().as_nanos() as u64
    }
}
