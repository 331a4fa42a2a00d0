#![forbid(unsafe_code)]

//! Live-node binding: one graph node mirrored into a [`Store<Fields>`].
//!
//! # Data flow
//!
//! ```text
//!   graph node ──on(payload)──▶ listener ──merge──▶ Store<Fields> ──▶ snapshot
//!        ▲                                                             │
//!        └──────────────── put(payload) ◀── SetState ◀── component ◀───┘
//! ```
//!
//! # Policies
//!
//! - **Inbound merge**: every key present in an inbound payload is written
//!   into the store in a single update; absent keys are left untouched.
//!   Last write wins per field. Concurrent writes from other peers are
//!   resolved by the graph engine before they reach this layer.
//! - **Outbound write**: [`SetState::set`] forwards the payload to the node
//!   and nothing else. The store changes only when the node's listener
//!   delivers the write back, so the view always matches what the graph
//!   has echoed.
//! - **Initial state**: the store starts empty. Seeding it locally could
//!   overwrite data already in the graph; initial values arrive through the
//!   first listener invocation(s).
//! - **Re-binding**: moving to another node id releases the old listener and
//!   registers a new one. With `reset_on_rebind` (the default) the store is
//!   cleared first so fields of the old node never appear under the new id.
//!
//! # Failure Modes
//!
//! - No client in the context: [`NodeBinding::bind`] returns
//!   [`NodeStateError::MissingClient`](nodestate_core::NodeStateError::MissingClient)
//!   before any subscription is made.
//! - Network or sync failures inside the graph engine are invisible here.
//!   There is no timeout, retry, or acknowledgement.

use std::fmt;
use std::rc::Rc;

use nodestate_core::{Fields, NodeStateConfig, Payload, Result};
use nodestate_graph::{GraphClient, GraphContext, Listener, ListenerGuard, NodeRef};
use nodestate_runtime::{Snapshot, Store, Subscription, Updater};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Keeps one graph node's fields in a reactive store.
///
/// Dropping the binding deregisters its listener.
pub struct NodeBinding {
    node_id: String,
    client: Rc<dyn GraphClient>,
    node: Rc<dyn NodeRef>,
    store: Store<Fields>,
    listener: Option<ListenerGuard>,
    config: NodeStateConfig,
}

impl NodeBinding {
    /// Bind `node_id` using the client carried by `context`.
    ///
    /// # Errors
    ///
    /// [`MissingClient`](nodestate_core::NodeStateError::MissingClient) when
    /// `context` holds no client.
    pub fn bind(
        context: &GraphContext,
        node_id: impl Into<String>,
        config: &NodeStateConfig,
    ) -> Result<Self> {
        let node_id = node_id.into();
        let client = context.client().inspect_err(|_| {
            tracing::warn!(message = "binding.missing_client", node = %node_id);
        })?;
        let node = client.get(&node_id);
        let store = Store::new(Fields::new());
        let mut binding = Self {
            node_id,
            client,
            node,
            store,
            listener: None,
            config: config.clone(),
        };
        binding.listen();
        tracing::debug!(message = "binding.bind", node = %binding.node_id);
        Ok(binding)
    }

    /// Bind `node_id` through the ambient [`GraphContext::current`] with
    /// default configuration.
    ///
    /// # Errors
    ///
    /// [`MissingClient`](nodestate_core::NodeStateError::MissingClient) outside
    /// any provider.
    pub fn bind_current(node_id: impl Into<String>) -> Result<Self> {
        Self::bind(&GraphContext::current(), node_id, &NodeStateConfig::default())
    }

    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Current snapshot of the node's fields.
    #[must_use]
    pub fn state(&self) -> Snapshot<Fields> {
        self.store.snapshot()
    }

    /// Snapshot plus a write handle, mirroring a `(state, set_state)` pair.
    #[must_use]
    pub fn pair(&self) -> (Snapshot<Fields>, SetState) {
        (self.state(), self.setter())
    }

    /// Decode the current fields into a typed record.
    ///
    /// # Errors
    ///
    /// [`Decode`](nodestate_core::NodeStateError::Decode) when the fields do
    /// not fit `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        self.store.snapshot().decode()
    }

    /// The underlying store, for subscriptions and watches.
    #[must_use]
    pub fn store(&self) -> &Store<Fields> {
        &self.store
    }

    /// Re-render trigger fired after each inbound merge.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&Snapshot<Fields>) + 'static) -> Subscription {
        self.store.subscribe(callback)
    }

    /// Forward `payload` to the node. The store is not touched.
    pub fn update_state(&self, payload: Payload) {
        self.setter().set(payload);
    }

    /// Forward a partial record to the node. `None` fields are skipped.
    ///
    /// # Errors
    ///
    /// Conversion errors from [`Payload::from_serializable`].
    pub fn update_with<T: Serialize + ?Sized>(&self, patch: &T) -> Result<()> {
        self.setter().set_with(patch)
    }

    /// Write handle bound to the current node.
    ///
    /// The handle keeps addressing this node after a [`rebind`](Self::rebind);
    /// take a fresh one afterwards.
    #[must_use]
    pub fn setter(&self) -> SetState {
        SetState {
            node: Rc::clone(&self.node),
            trace_payloads: self.config.trace_payloads,
        }
    }

    /// Whether a listener is currently registered.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    /// Move the binding to another node id.
    ///
    /// Same id is a no-op. Otherwise the old listener is released, the store
    /// is cleared when `reset_on_rebind` is set, and a listener is registered
    /// on the new node.
    pub fn rebind(&mut self, node_id: impl Into<String>) {
        let node_id = node_id.into();
        if node_id == self.node_id {
            return;
        }
        tracing::debug!(
            message = "binding.rebind",
            from = %self.node_id,
            to = %node_id,
            reset = self.config.reset_on_rebind
        );
        self.listener = None;
        if self.config.reset_on_rebind {
            self.store.update(Fields::clear);
        }
        self.node = self.client.get(&node_id);
        self.node_id = node_id;
        self.listen();
    }

    /// Release the listener now instead of at drop. The store keeps its last
    /// state but no longer follows the node.
    pub fn release(&mut self) {
        if self.listener.take().is_some() {
            tracing::debug!(message = "binding.release", node = %self.node_id);
        }
    }

    fn listen(&mut self) {
        let listener = merge_listener(&self.node_id, self.store.updater(), self.config.trace_payloads);
        self.listener = Some(ListenerGuard::register(Rc::clone(&self.node), listener));
    }
}

impl fmt::Debug for NodeBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeBinding")
            .field("node_id", &self.node_id)
            .field("listening", &self.listener.is_some())
            .field("fields", &self.store.snapshot().len())
            .finish()
    }
}

fn merge_listener(node_id: &str, updater: Updater<Fields>, trace_payloads: bool) -> Listener {
    let node_id = node_id.to_owned();
    Rc::new(move |payload: &Payload| {
        if payload.is_empty() {
            return;
        }
        if trace_payloads {
            tracing::trace!(message = "binding.merge", node = %node_id, payload = %payload.to_json());
        } else {
            tracing::trace!(message = "binding.merge", node = %node_id, fields = payload.len());
        }
        updater.update(|fields| {
            fields.merge(payload);
        });
    })
}

/// Outbound write handle for a bound node.
#[derive(Clone)]
pub struct SetState {
    node: Rc<dyn NodeRef>,
    trace_payloads: bool,
}

impl SetState {
    /// Fire-and-forget write of `payload` to the node.
    pub fn set(&self, payload: Payload) {
        if self.trace_payloads {
            tracing::trace!(message = "binding.put", node = self.node.id(), payload = %payload.to_json());
        } else {
            tracing::trace!(message = "binding.put", node = self.node.id(), fields = payload.len());
        }
        self.node.put(payload);
    }

    /// Write a partial record. `None` fields are skipped.
    ///
    /// # Errors
    ///
    /// Conversion errors from [`Payload::from_serializable`].
    pub fn set_with<T: Serialize + ?Sized>(&self, patch: &T) -> Result<()> {
        let payload = Payload::from_serializable(patch)?;
        self.set(payload);
        Ok(())
    }

    /// Node id this handle writes to.
    #[must_use]
    pub fn node_id(&self) -> &str {
        self.node.id()
    }
}

impl fmt::Debug for SetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetState")
            .field("node", &self.node.id())
            .finish()
    }
}

impl From<&NodeBinding> for SetState {
    fn from(binding: &NodeBinding) -> Self {
        binding.setter()
    }
}
