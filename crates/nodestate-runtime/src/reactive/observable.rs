#![forbid(unsafe_code)]

//! Version-tracked shared values with change notification.
//!
//! # Failure Modes
//!
//! - Callback panic: propagates to the caller of the mutating method. The
//!   value and version already reflect the mutation; callbacks registered
//!   after the panicking one are skipped for that cycle.
//! - Mutating closure panic ([`Observable::mutate`]): the version is bumped
//!   before the closure runs, so partial writes are visible to later reads.
//!   No notification is sent for the interrupted mutation.
//! - Re-entrant access from inside a `mutate` closure panics with a
//!   `RefCell` borrow error. Callbacks are not affected (see module invariant
//!   5 in [`super`]).

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Callback<T> = dyn Fn(&T);

struct ObservableInner<T> {
    value: T,
    version: u64,
    subscribers: Vec<Weak<Callback<T>>>,
}

/// A shared, version-tracked value with subscriber callbacks.
///
/// Cloning an `Observable` creates a new handle to the **same** value.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + 'static> Observable<T> {
    /// Wrap `value`. Version starts at 0.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Current value together with the version it was read at.
    #[must_use]
    pub fn get_versioned(&self) -> (T, u64) {
        let inner = self.inner.borrow();
        (inner.value.clone(), inner.version)
    }

    /// Borrow the current value for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Mutate the value in place. Always bumps the version and notifies.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = {
            let mut inner = self.inner.borrow_mut();
            inner.version += 1;
            f(&mut inner.value)
        };
        self.notify();
        result
    }

    /// Register `callback`, invoked with the new value after every change.
    ///
    /// The callback stays registered while the returned [`Subscription`] is
    /// alive.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: Rc<Callback<T>> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&strong));
        Subscription {
            _callback: Box::new(strong),
        }
    }

    fn notify(&self) {
        let (value, callbacks) = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|w| w.strong_count() > 0);
            let callbacks: Vec<Rc<Callback<T>>> =
                inner.subscribers.iter().filter_map(Weak::upgrade).collect();
            (inner.value.clone(), callbacks)
        };
        for callback in callbacks {
            callback(&value);
        }
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Replace the value. Equal values are a no-op.
    pub fn set(&self, value: T) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
        }
        self.notify();
    }

    /// Apply `f` to a copy of the value; commits and notifies only if the
    /// result differs from the current value.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut next = self.get();
        f(&mut next);
        self.set(next);
    }
}

/// RAII guard for an [`Observable`] subscription.
///
/// Dropping it releases the callback; it will not fire again.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    _callback: Box<dyn Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
