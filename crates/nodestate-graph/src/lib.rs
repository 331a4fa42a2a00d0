#![forbid(unsafe_code)]

//! Boundary to the external graph database.
//!
//! The graph engine (sync, conflict resolution, transport, persistence) lives
//! outside this workspace. This crate describes the small surface nodestate
//! consumes from it and how a single client instance reaches every binding:
//!
//! - [`GraphClient`] / [`NodeRef`]: `get(node_id)`, `on(listener)`,
//!   `off(id)`, `put(payload)`.
//! - [`ListenerGuard`]: RAII listener registration.
//! - [`GraphContext`]: scoped provide/consume injection of the shared client.
//! - [`MemoryGraph`]: single-process client for tests and demos.

pub mod client;
pub mod context;
pub mod memory;

pub use client::{GraphClient, Listener, ListenerGuard, ListenerId, NodeRef};
pub use context::{GraphContext, ProvideGuard};
pub use memory::{Delivery, MemoryGraph};
