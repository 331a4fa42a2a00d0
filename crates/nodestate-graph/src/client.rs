#![forbid(unsafe_code)]

//! Traits for the external graph client.
//!
//! # Contract
//!
//! - [`GraphClient::get`] returns a live handle to the node with that id. The
//!   handle is not owned by the caller in any meaningful sense: two `get`
//!   calls for the same id address the same node.
//! - [`NodeRef::on`] registers a listener for inbound partial payloads. The
//!   client may invoke it at any later point on the owning thread, including
//!   from inside [`NodeRef::put`].
//! - [`NodeRef::put`] is fire-and-forget. There is no acknowledgement; the
//!   only evidence of a committed write is a later listener invocation.
//! - [`NodeRef::off`] removes a listener. Clients are not required to clean up
//!   listeners on their own, so callers should hold a [`ListenerGuard`].

use std::fmt;
use std::rc::Rc;

use nodestate_core::Payload;

/// Inbound payload callback.
pub type Listener = Rc<dyn Fn(&Payload)>;

/// Identifies one listener registration on one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Handle to one addressable node in the external graph.
pub trait NodeRef {
    /// Node id this handle addresses.
    fn id(&self) -> &str;

    /// Register `listener` for inbound payloads.
    fn on(&self, listener: Listener) -> ListenerId;

    /// Remove a listener. Unknown ids are ignored.
    fn off(&self, id: ListenerId);

    /// Write fields to the node.
    fn put(&self, payload: Payload);
}

/// Shared graph database client.
pub trait GraphClient {
    /// Obtain a handle to the node with id `node_id`.
    fn get(&self, node_id: &str) -> Rc<dyn NodeRef>;
}

/// RAII listener registration; dropping it deregisters the listener.
#[must_use = "dropping the guard deregisters the listener"]
pub struct ListenerGuard {
    node: Rc<dyn NodeRef>,
    id: ListenerId,
}

impl ListenerGuard {
    /// Register `listener` on `node`.
    pub fn register(node: Rc<dyn NodeRef>, listener: Listener) -> Self {
        let id = node.on(listener);
        tracing::debug!(message = "listener.register", node = node.id(), id = id.0);
        Self { node, id }
    }

    #[must_use]
    pub fn node(&self) -> &Rc<dyn NodeRef> {
        &self.node
    }

    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.node.off(self.id);
        tracing::debug!(message = "listener.release", node = self.node.id(), id = self.id.0);
    }
}

impl fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerGuard")
            .field("node", &self.node.id())
            .field("id", &self.id)
            .finish()
    }
}
