#![forbid(unsafe_code)]

//! nodestate public facade.
//!
//! Binds live nodes of a decentralized graph database to reactive UI state.
//!
//! - [`NodeBinding`]: keeps one node's fields in a [`Store`], merging inbound
//!   payloads field by field and forwarding local edits to the node.
//! - [`Mount`]: component-lifetime hook layer; `use_store` and
//!   `use_node_state` are memoized per mount.
//! - [`Store`]: the snapshot/update proxy store on its own.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use nodestate::prelude::*;
//!
//! let graph = Rc::new(MemoryGraph::new());
//! let context = GraphContext::new(graph.clone());
//! let _provided = context.provide();
//!
//! let mut mount = Mount::from_current();
//! let setter = mount
//!     .render(|cx| cx.use_node_state("todo-1").map(|(_, set)| set))
//!     .unwrap();
//!
//! // Writes go to the node; the store follows once the node echoes them.
//! setter.set(Payload::new().with("title", "Buy milk"));
//!
//! let (todo, _) = mount.render(|cx| cx.use_node_state("todo-1")).unwrap();
//! assert_eq!(todo.get("title"), Some(&Value::from("Buy milk")));
//! ```

pub mod binding;
pub mod mount;

pub use binding::{NodeBinding, SetState};
pub use mount::{Mount, RenderCx};

pub use nodestate_core::{Fields, NodeStateConfig, NodeStateError, Payload, Result, Value};
pub use nodestate_graph::{
    Delivery, GraphClient, GraphContext, ListenerGuard, MemoryGraph, NodeRef, ProvideGuard,
};
pub use nodestate_runtime::{BindingScope, Observable, Snapshot, Store, Subscription, Updater};

/// Read half of a store pair.
pub type State<T> = Snapshot<T>;

pub mod prelude {
    //! Everything a component needs to bind graph nodes.
    pub use crate::{
        Delivery, Fields, GraphClient, GraphContext, MemoryGraph, Mount, NodeBinding,
        NodeStateConfig, NodeStateError, Payload, RenderCx, SetState, Snapshot, State, Store,
        Updater, Value,
    };
}
