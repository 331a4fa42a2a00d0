#![forbid(unsafe_code)]

//! Lifecycle management for groups of subscriptions.

use super::observable::{Observable, Subscription};
use crate::store::Store;

/// Collects subscriptions for a logical scope (e.g., a mounted component).
///
/// When the scope is dropped, all held subscriptions are released, cleanly
/// disconnecting every callback associated with that scope.
///
/// # Usage
///
/// ```
/// use nodestate_runtime::{BindingScope, Observable};
///
/// let mut scope = BindingScope::new();
/// let obs = Observable::new(42);
/// scope.subscribe(&obs, |v| println!("value: {v}"));
/// assert_eq!(scope.binding_count(), 1);
/// // When scope drops, all subscriptions are released.
/// ```
///
/// # Invariants
///
/// 1. Subscriptions are released in registration order on drop.
/// 2. After drop, no callbacks from this scope will fire.
/// 3. `clear()` releases all subscriptions immediately (reusable scope).
/// 4. Binding count is always accurate.
pub struct BindingScope {
    subscriptions: Vec<Subscription>,
}

impl BindingScope {
    /// Create an empty binding scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
        }
    }

    /// Add a subscription to this scope. The subscription will be held alive
    /// until the scope is dropped or `clear()` is called.
    pub fn hold(&mut self, sub: Subscription) {
        self.subscriptions.push(sub);
    }

    /// Subscribe to an observable within this scope.
    ///
    /// Returns a reference to the scope for chaining.
    pub fn subscribe<T: Clone + 'static>(
        &mut self,
        source: &Observable<T>,
        callback: impl Fn(&T) + 'static,
    ) -> &mut Self {
        let sub = source.subscribe(callback);
        self.subscriptions.push(sub);
        self
    }

    /// Watch a projection of a store within this scope.
    ///
    /// See [`Store::watch`].
    pub fn watch<T, U>(
        &mut self,
        store: &Store<T>,
        select: impl Fn(&T) -> U + 'static,
        on_change: impl Fn(&U) + 'static,
    ) -> &mut Self
    where
        T: Clone + 'static,
        U: PartialEq + 'static,
    {
        let sub = store.watch(select, on_change);
        self.subscriptions.push(sub);
        self
    }

    /// Number of active subscriptions in this scope.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether the scope has no active subscriptions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Release all subscriptions immediately (scope becomes empty but reusable).
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}

impl Default for BindingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingScope")
            .field("binding_count", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn scope_drop_releases_subscriptions() {
        let obs = Observable::new(0);
        let seen = Rc::new(Cell::new(0));

        {
            let mut scope = BindingScope::new();
            let s = Rc::clone(&seen);
            scope.subscribe(&obs, move |v| s.set(*v));
            obs.set(1);
            assert_eq!(seen.get(), 1);
        }

        obs.set(99);
        assert_eq!(seen.get(), 1, "callback should not fire after scope dropped");
    }

    #[test]
    fn scope_clear_releases() {
        let obs = Observable::new(0);
        let seen = Rc::new(Cell::new(0));

        let mut scope = BindingScope::new();
        let s = Rc::clone(&seen);
        scope.subscribe(&obs, move |v| s.set(*v));
        assert_eq!(scope.binding_count(), 1);

        scope.clear();
        assert!(scope.is_empty());

        obs.set(42);
        assert_eq!(seen.get(), 0, "callback should not fire after clear");
    }

    #[test]
    fn scope_hold_external_subscription() {
        let obs = Observable::new(0);
        let seen = Rc::new(Cell::new(0));

        let mut scope = BindingScope::new();
        let s = Rc::clone(&seen);
        scope.hold(obs.subscribe(move |v| s.set(*v)));

        obs.set(5);
        drop(scope);
        obs.set(99);
        assert_eq!(seen.get(), 5);
    }

    #[test]
    fn scope_watch_store_field() {
        let store = Store::new((0u8, String::new()));
        let hits = Rc::new(Cell::new(0));

        let mut scope = BindingScope::new();
        let h = Rc::clone(&hits);
        scope.watch(&store, |s| s.0, move |_| h.set(h.get() + 1));

        store.update(|s| s.1.push('x'));
        assert_eq!(hits.get(), 0);
        store.update(|s| s.0 = 3);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn scope_debug_format() {
        let mut scope = BindingScope::new();
        let obs = Observable::new(0);
        scope.subscribe(&obs, |_| {}).subscribe(&obs, |_| {});
        let debug = format!("{scope:?}");
        assert!(debug.contains("binding_count: 2"));
    }
}
