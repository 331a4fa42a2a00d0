#![forbid(unsafe_code)]

//! Single-process graph client.
//!
//! [`MemoryGraph`] keeps every node's committed fields in memory and delivers
//! payloads to listeners on the owning thread. It exists to exercise
//! bindings without a real graph engine: there is no transport, persistence,
//! or conflict resolution beyond last-write-wins per field.
//!
//! # Delivery modes
//!
//! | [`Delivery`]  | `put` commits | `put` notifies listeners            |
//! |---------------|---------------|-------------------------------------|
//! | `Immediate`   | yes           | synchronously, inside `put`         |
//! | `Deferred`    | yes           | queued until [`MemoryGraph::flush`] |
//! | `Detached`    | no            | never (write is only recorded)      |
//!
//! Deferred mode models the graph engine handing events to a single-consumer
//! queue that the UI thread drains; it is what a real networked client looks
//! like from the binding's point of view.
//!
//! # Invariants
//!
//! 1. Listeners for a node are invoked in registration order.
//! 2. No internal borrow is held while a listener runs, so listeners may call
//!    back into the graph (`put`, `on`, `off`).
//! 3. Queued payloads are delivered in FIFO order.
//! 4. A listener removed with `off` is never invoked afterwards, including
//!    for payloads that were already queued or a dispatch in progress.
//! 5. A listener registered while a payload is being dispatched does not
//!    receive that payload.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use nodestate_core::{Fields, NodeStateConfig, Payload};

use crate::client::{GraphClient, Listener, ListenerId, NodeRef};

/// How a [`MemoryGraph`] delivers local writes back to listeners.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Delivery {
    #[default]
    Immediate,
    Deferred,
    Detached,
}

enum Pending {
    /// Deliver to every listener of the node.
    Broadcast { node: String, payload: Payload },
    /// Deliver to a single freshly registered listener.
    Replay {
        node: String,
        listener: ListenerId,
        payload: Payload,
    },
}

#[derive(Default)]
struct NodeSlot {
    data: Fields,
    listeners: Vec<(ListenerId, Listener)>,
}

struct GraphState {
    nodes: HashMap<String, NodeSlot>,
    queue: VecDeque<Pending>,
    writes: Vec<(String, Payload)>,
    next_listener: u64,
    delivery: Delivery,
    replay_on_subscribe: bool,
    trace_payloads: bool,
}

/// In-memory [`GraphClient`].
///
/// Cloning a `MemoryGraph` creates a new handle to the **same** graph, the
/// way two peers on one relay would see each other's writes.
#[derive(Clone)]
pub struct MemoryGraph {
    state: Rc<RefCell<GraphState>>,
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGraph {
    /// Empty graph with immediate delivery and replay on subscribe.
    #[must_use]
    pub fn new() -> Self {
        Self::with_delivery(Delivery::Immediate)
    }

    #[must_use]
    pub fn with_delivery(delivery: Delivery) -> Self {
        Self {
            state: Rc::new(RefCell::new(GraphState {
                nodes: HashMap::new(),
                queue: VecDeque::new(),
                writes: Vec::new(),
                next_listener: 1,
                delivery,
                replay_on_subscribe: true,
                trace_payloads: false,
            })),
        }
    }

    /// Apply the graph-related settings from `config`.
    #[must_use]
    pub fn configured(self, config: &NodeStateConfig) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.replay_on_subscribe = config.replay_on_subscribe;
            state.trace_payloads = config.trace_payloads;
        }
        self
    }

    pub fn set_delivery(&self, delivery: Delivery) {
        self.state.borrow_mut().delivery = delivery;
    }

    #[must_use]
    pub fn delivery(&self) -> Delivery {
        self.state.borrow().delivery
    }

    /// Simulate a write from another peer arriving over the network.
    ///
    /// Always commits. Notifies immediately unless the graph is in
    /// `Deferred` mode, in which case the payload is queued.
    pub fn receive_remote(&self, node_id: &str, payload: Payload) {
        self.log_payload("graph.remote", node_id, &payload);
        let deferred = {
            let mut state = self.state.borrow_mut();
            state
                .nodes
                .entry(node_id.to_owned())
                .or_default()
                .data
                .merge(&payload);
            state.delivery == Delivery::Deferred
        };
        if deferred {
            self.enqueue(Pending::Broadcast {
                node: node_id.to_owned(),
                payload,
            });
        } else {
            self.broadcast(node_id, &payload);
        }
    }

    /// Deliver queued payloads. Returns how many were delivered.
    ///
    /// Payloads queued by listeners during the flush are delivered in the
    /// same call.
    pub fn flush(&self) -> usize {
        let mut delivered = 0;
        loop {
            let next = self.state.borrow_mut().queue.pop_front();
            let Some(pending) = next else { break };
            match pending {
                Pending::Broadcast { node, payload } => self.broadcast(&node, &payload),
                Pending::Replay {
                    node,
                    listener,
                    payload,
                } => self.deliver_to(&node, listener, &payload),
            }
            delivered += 1;
        }
        if delivered > 0 {
            tracing::trace!(message = "graph.flush", delivered);
        }
        delivered
    }

    /// Number of queued, undelivered payloads.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Committed fields of a node (empty for unknown ids).
    #[must_use]
    pub fn node_data(&self, node_id: &str) -> Fields {
        self.state
            .borrow()
            .nodes
            .get(node_id)
            .map(|slot| slot.data.clone())
            .unwrap_or_default()
    }

    /// Live listener registrations on a node.
    #[must_use]
    pub fn listener_count(&self, node_id: &str) -> usize {
        self.state
            .borrow()
            .nodes
            .get(node_id)
            .map_or(0, |slot| slot.listeners.len())
    }

    /// Every local `put`, in call order, regardless of delivery mode.
    #[must_use]
    pub fn writes(&self) -> Vec<(String, Payload)> {
        self.state.borrow().writes.clone()
    }

    /// Ids of every node that has been written or subscribed to.
    #[must_use]
    pub fn node_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.borrow().nodes.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn put_local(&self, node_id: &str, payload: Payload) {
        self.log_payload("graph.put", node_id, &payload);
        let delivery = {
            let mut state = self.state.borrow_mut();
            state.writes.push((node_id.to_owned(), payload.clone()));
            if state.delivery != Delivery::Detached {
                state
                    .nodes
                    .entry(node_id.to_owned())
                    .or_default()
                    .data
                    .merge(&payload);
            }
            state.delivery
        };
        match delivery {
            Delivery::Immediate => self.broadcast(node_id, &payload),
            Delivery::Deferred => self.enqueue(Pending::Broadcast {
                node: node_id.to_owned(),
                payload,
            }),
            Delivery::Detached => {}
        }
    }

    fn register(&self, node_id: &str, listener: Listener) -> ListenerId {
        let (id, replay, delivery) = {
            let mut state = self.state.borrow_mut();
            let id = ListenerId(state.next_listener);
            state.next_listener += 1;
            let replay_on_subscribe = state.replay_on_subscribe;
            let delivery = state.delivery;
            let slot = state.nodes.entry(node_id.to_owned()).or_default();
            slot.listeners.push((id, Rc::clone(&listener)));
            let replay = (replay_on_subscribe && !slot.data.is_empty())
                .then(|| slot.data.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<Payload>());
            (id, replay, delivery)
        };
        if let Some(payload) = replay {
            if delivery == Delivery::Deferred {
                self.enqueue(Pending::Replay {
                    node: node_id.to_owned(),
                    listener: id,
                    payload,
                });
            } else {
                listener(&payload);
            }
        }
        id
    }

    fn unregister(&self, node_id: &str, id: ListenerId) {
        let mut state = self.state.borrow_mut();
        if let Some(slot) = state.nodes.get_mut(node_id) {
            slot.listeners.retain(|(lid, _)| *lid != id);
        }
    }

    fn enqueue(&self, pending: Pending) {
        self.state.borrow_mut().queue.push_back(pending);
    }

    fn broadcast(&self, node_id: &str, payload: &Payload) {
        let ids: Vec<ListenerId> = self
            .state
            .borrow()
            .nodes
            .get(node_id)
            .map(|slot| slot.listeners.iter().map(|(id, _)| *id).collect())
            .unwrap_or_default();
        // Earlier listeners may call `off` on later ones; each id is looked
        // up again right before it runs.
        for id in ids {
            self.deliver_to(node_id, id, payload);
        }
    }

    fn deliver_to(&self, node_id: &str, id: ListenerId, payload: &Payload) {
        let listener = self.live_listener(node_id, id);
        if let Some(listener) = listener {
            listener(payload);
        }
    }

    fn live_listener(&self, node_id: &str, id: ListenerId) -> Option<Listener> {
        self.state.borrow().nodes.get(node_id).and_then(|slot| {
            slot.listeners
                .iter()
                .find(|(lid, _)| *lid == id)
                .map(|(_, l)| Rc::clone(l))
        })
    }

    fn log_payload(&self, event: &'static str, node_id: &str, payload: &Payload) {
        if self.state.borrow().trace_payloads {
            tracing::trace!(message = event, node = node_id, payload = %payload.to_json());
        } else {
            tracing::trace!(message = event, node = node_id, fields = payload.len());
        }
    }
}

impl GraphClient for MemoryGraph {
    fn get(&self, node_id: &str) -> Rc<dyn NodeRef> {
        Rc::new(MemoryNode {
            id: node_id.to_owned(),
            graph: self.clone(),
        })
    }
}

impl fmt::Debug for MemoryGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("MemoryGraph")
            .field("nodes", &state.nodes.len())
            .field("pending", &state.queue.len())
            .field("delivery", &state.delivery)
            .finish()
    }
}

/// Node handle handed out by [`MemoryGraph::get`].
struct MemoryNode {
    id: String,
    graph: MemoryGraph,
}

impl NodeRef for MemoryNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn on(&self, listener: Listener) -> ListenerId {
        self.graph.register(&self.id, listener)
    }

    fn off(&self, id: ListenerId) {
        self.graph.unregister(&self.id, id);
    }

    fn put(&self, payload: Payload) {
        self.graph.put_local(&self.id, payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    fn recorder() -> (Rc<RefCell<Vec<Payload>>>, Listener) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        (seen, Rc::new(move |p: &Payload| s.borrow_mut().push(p.clone())))
    }

    #[test]
    fn immediate_put_echoes_to_listeners() {
        let graph = MemoryGraph::new();
        let node = graph.get("todo-1");
        let (seen, listener) = recorder();
        node.on(listener);

        node.put(Payload::new().with("title", "A"));
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(graph.node_data("todo-1").len(), 1);
    }

    #[test]
    fn deferred_put_waits_for_flush() {
        let graph = MemoryGraph::with_delivery(Delivery::Deferred);
        let node = graph.get("n");
        let (seen, listener) = recorder();
        node.on(listener);

        node.put(Payload::new().with("x", 1));
        assert!(seen.borrow().is_empty());
        assert_eq!(graph.pending(), 1);
        assert_eq!(graph.node_data("n").len(), 1, "commit is not deferred");

        assert_eq!(graph.flush(), 1);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(graph.pending(), 0);
    }

    #[test]
    fn detached_put_is_recorded_only() {
        let graph = MemoryGraph::with_delivery(Delivery::Detached);
        let node = graph.get("n");
        let (seen, listener) = recorder();
        node.on(listener);

        node.put(Payload::new().with("x", 5));
        assert!(seen.borrow().is_empty());
        assert!(graph.node_data("n").is_empty());
        assert_eq!(graph.writes(), vec![("n".to_owned(), Payload::new().with("x", 5))]);
    }

    #[test]
    fn subscribe_replays_committed_data() {
        let graph = MemoryGraph::new();
        graph.receive_remote("n", Payload::new().with("title", "existing"));

        let (seen, listener) = recorder();
        graph.get("n").on(listener);
        assert_eq!(*seen.borrow(), vec![Payload::new().with("title", "existing")]);
    }

    #[test]
    fn replay_can_be_disabled() {
        let config = NodeStateConfig {
            replay_on_subscribe: false,
            ..NodeStateConfig::default()
        };
        let graph = MemoryGraph::new().configured(&config);
        graph.receive_remote("n", Payload::new().with("title", "existing"));

        let (seen, listener) = recorder();
        graph.get("n").on(listener);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn deferred_replay_targets_only_new_listener() {
        let graph = MemoryGraph::with_delivery(Delivery::Deferred);
        graph.receive_remote("n", Payload::new().with("a", 1));
        graph.flush();

        let (first, l1) = recorder();
        let (second, l2) = recorder();
        let node = graph.get("n");
        node.on(l1);
        graph.flush();
        node.on(l2);
        graph.flush();

        assert_eq!(first.borrow().len(), 1);
        assert_eq!(second.borrow().len(), 1);
    }

    #[test]
    fn off_stops_delivery_even_for_queued_payloads() {
        let graph = MemoryGraph::with_delivery(Delivery::Deferred);
        let node = graph.get("n");
        let (seen, listener) = recorder();
        let id = node.on(listener);

        node.put(Payload::new().with("x", 1));
        node.off(id);
        graph.flush();
        assert!(seen.borrow().is_empty());
        assert_eq!(graph.listener_count("n"), 0);
    }

    #[test]
    fn off_during_dispatch_skips_removed_listener() {
        let graph = MemoryGraph::new();
        let node = graph.get("n");
        let (second_seen, second) = recorder();
        let second_id = Rc::new(Cell::new(None));

        let remover = {
            let node = graph.get("n");
            let second_id = Rc::clone(&second_id);
            Rc::new(move |_: &Payload| {
                if let Some(id) = second_id.take() {
                    node.off(id);
                }
            })
        };
        node.on(remover);
        second_id.set(Some(node.on(second)));

        node.put(Payload::new().with("x", 1));
        assert!(second_seen.borrow().is_empty());
        assert_eq!(graph.listener_count("n"), 1);
    }

    #[test]
    fn listener_added_during_dispatch_waits_for_next_payload() {
        let graph = MemoryGraph::new().configured(&NodeStateConfig {
            replay_on_subscribe: false,
            ..NodeStateConfig::default()
        });
        let node = graph.get("n");
        let (late_seen, late) = recorder();
        let pending = Rc::new(RefCell::new(Some(late)));

        let adder = {
            let node = graph.get("n");
            let pending = Rc::clone(&pending);
            Rc::new(move |_: &Payload| {
                if let Some(listener) = pending.borrow_mut().take() {
                    node.on(listener);
                }
            })
        };
        node.on(adder);

        node.put(Payload::new().with("x", 1));
        assert!(late_seen.borrow().is_empty());
        node.put(Payload::new().with("x", 2));
        assert_eq!(late_seen.borrow().len(), 1);
    }

    #[test]
    fn listener_may_put_reentrantly() {
        let graph = MemoryGraph::new();
        let node = graph.get("counter");
        let inner = graph.get("log");
        node.on(Rc::new(move |p: &Payload| {
            inner.put(Payload::new().with("last", p.len() as i64));
        }));

        node.put(Payload::new().with("n", 1));
        assert_eq!(graph.node_data("log").len(), 1);
    }

    #[test]
    fn clones_share_state() {
        let a = MemoryGraph::new();
        let b = a.clone();
        a.get("n").put(Payload::new().with("x", true));
        assert_eq!(b.node_data("n").len(), 1);
        assert_eq!(b.node_ids(), vec!["n".to_owned()]);
    }

    #[test]
    fn writes_recorded_in_every_mode() {
        let graph = MemoryGraph::new();
        graph.get("n").put(Payload::new().with("x", 1));
        graph.set_delivery(Delivery::Deferred);
        graph.get("n").put(Payload::new().with("x", 2));
        assert_eq!(graph.writes().len(), 2);
        assert_eq!(graph.delivery(), Delivery::Deferred);
    }

    #[tracing_test::traced_test]
    #[test]
    fn put_logs_field_count_not_body() {
        let graph = MemoryGraph::new();
        graph.get("secret").put(Payload::new().with("password", "hunter2"));
        assert!(logs_contain("graph.put"));
        assert!(!logs_contain("hunter2"));
    }
}
