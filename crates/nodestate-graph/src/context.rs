#![forbid(unsafe_code)]

//! Ambient graph client injection.
//!
//! A [`GraphContext`] carries the one shared [`GraphClient`] for an
//! application tree. Components receive it either explicitly (pass the
//! context down at construction) or ambiently: the root calls
//! [`GraphContext::provide`] and any code beneath it on the same thread reads
//! [`GraphContext::current`].
//!
//! Provided contexts form a thread-local stack. The innermost guard wins, and
//! dropping a guard restores the previous context, so independent clients can
//! be provided side by side in tests.
//!
//! Reading a client from an empty context fails with
//! [`NodeStateError::MissingClient`] instead of handing out a client that
//! silently never delivers anything.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use nodestate_core::{NodeStateError, Result};

use crate::client::GraphClient;

thread_local! {
    static PROVIDED: RefCell<Vec<GraphContext>> = const { RefCell::new(Vec::new()) };
}

/// Carrier for the shared graph client.
#[derive(Clone, Default)]
pub struct GraphContext {
    client: Option<Rc<dyn GraphClient>>,
}

impl GraphContext {
    /// Context holding `client`.
    pub fn new(client: Rc<dyn GraphClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Context with no client. Every binding created from it fails.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The shared client.
    ///
    /// # Errors
    ///
    /// [`NodeStateError::MissingClient`] when no client was provided.
    pub fn client(&self) -> Result<Rc<dyn GraphClient>> {
        self.client.clone().ok_or(NodeStateError::MissingClient)
    }

    #[must_use]
    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// Make this context ambient for the current thread until the guard drops.
    #[must_use = "dropping this guard withdraws the provided context"]
    pub fn provide(&self) -> ProvideGuard {
        let depth = PROVIDED.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(self.clone());
            stack.len()
        });
        tracing::debug!(message = "context.provide", depth);
        ProvideGuard { depth }
    }

    /// Innermost provided context, or an empty one outside any provider.
    #[must_use]
    pub fn current() -> Self {
        PROVIDED.with(|stack| stack.borrow().last().cloned().unwrap_or_default())
    }

    /// Number of contexts currently provided on this thread.
    #[must_use]
    pub fn provided_depth() -> usize {
        PROVIDED.with(|stack| stack.borrow().len())
    }
}

impl fmt::Debug for GraphContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphContext")
            .field("has_client", &self.client.is_some())
            .finish()
    }
}

/// RAII guard returned by [`GraphContext::provide`].
#[must_use = "dropping this guard withdraws the provided context"]
pub struct ProvideGuard {
    depth: usize,
}

impl Drop for ProvideGuard {
    fn drop(&mut self) {
        PROVIDED.with(|stack| {
            let mut stack = stack.borrow_mut();
            debug_assert_eq!(stack.len(), self.depth, "provide guards dropped out of order");
            stack.pop();
        });
    }
}

impl fmt::Debug for ProvideGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvideGuard")
            .field("depth", &self.depth)
            .finish()
    }
}
