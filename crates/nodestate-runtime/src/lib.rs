#![forbid(unsafe_code)]

//! Single-threaded reactive runtime for nodestate.
//!
//! - [`reactive`]: observables, subscriptions, and binding scopes.
//! - [`store`]: the proxy store handing out immutable snapshots and an
//!   in-place update entry point.

pub mod reactive;
pub mod store;

pub use reactive::{BindingScope, Observable, Subscription};
pub use store::{Snapshot, Store, Updater};
