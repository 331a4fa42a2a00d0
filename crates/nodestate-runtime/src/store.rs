#![forbid(unsafe_code)]

//! Proxy store: immutable snapshots plus an in-place update entry point.
//!
//! A [`Store<T>`] owns one value of shape `T`. Readers take a [`Snapshot`],
//! an immutable, reference-counted view of the value as of the last completed
//! mutation. Writers call [`Store::update`] with a closure that mutates the
//! live value directly, the way one would assign fields on a plain struct.
//!
//! # Usage
//!
//! ```
//! use nodestate_runtime::Store;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Todo {
//!     title: String,
//!     completed: bool,
//! }
//!
//! let store = Store::new(Todo { title: "A Title".into(), completed: false });
//! let (state, update) = store.pair();
//!
//! update.update(|todo| todo.title = "Buy milk".into());
//!
//! assert_eq!(state.title, "A Title");          // taken before the update
//! assert_eq!(store.snapshot().title, "Buy milk");
//! ```
//!
//! # Copy-on-write
//!
//! The live value sits behind an `Rc<T>`. Snapshots share that `Rc`. An update
//! goes through `Rc::make_mut`, which clones the value only when a snapshot is
//! still holding the previous version. With a persistent `T` (such as an
//! `im` map) that clone is O(1) and shares structure.
//!
//! # Invariants
//!
//! 1. A snapshot taken after `update` returns reflects that update; a
//!    snapshot taken before does not.
//! 2. A snapshot never changes after it is taken.
//! 3. Subscribers fire once per completed `update`, after the mutation.
//! 4. `watch` callbacks fire only when their selected projection changes.
//!
//! # Failure Modes
//!
//! - Mutator panic: propagates to the caller. Writes made before the panic
//!   stay in effect (no rollback) and are visible to the next snapshot; no
//!   subscriber is notified for the interrupted update.
//! - Calling back into the same store from inside a mutator panics with a
//!   `RefCell` borrow error.

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use crate::reactive::{Observable, Subscription};

/// Immutable point-in-time view of a [`Store`].
pub struct Snapshot<T> {
    value: Rc<T>,
    version: u64,
}

impl<T> Snapshot<T> {
    /// Store version this snapshot was taken at.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether two snapshots share the same underlying allocation.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.value, &b.value)
    }
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            value: Rc::clone(&self.value),
            version: self.version,
        }
    }
}

impl<T> Deref for Snapshot<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> AsRef<T> for Snapshot<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

impl<T: PartialEq> PartialEq for Snapshot<T> {
    fn eq(&self, other: &Self) -> bool {
        *self.value == *other.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Snapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("version", &self.version)
            .field("value", &self.value)
            .finish()
    }
}

/// Mutable proxy over a value of shape `T`.
///
/// Cloning a `Store` creates a new handle to the **same** value.
pub struct Store<T> {
    state: Observable<Rc<T>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: fmt::Debug + Clone + 'static> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl<T: Clone + 'static> Store<T> {
    pub fn new(initial: T) -> Self {
        Self {
            state: Observable::new(Rc::new(initial)),
        }
    }

    /// Current immutable view.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<T> {
        let (value, version) = self.state.get_versioned();
        Snapshot { value, version }
    }

    /// Apply `mutator` to the live value.
    ///
    /// The mutation is synchronous; the next [`snapshot`](Self::snapshot)
    /// reflects it.
    pub fn update(&self, mutator: impl FnOnce(&mut T)) {
        self.state.mutate(|shared| mutator(Rc::make_mut(shared)));
        tracing::trace!(message = "store.update", version = self.state.version());
    }

    /// Cloneable handle to [`update`](Self::update).
    #[must_use]
    pub fn updater(&self) -> Updater<T> {
        Updater {
            store: self.clone(),
        }
    }

    /// Current snapshot together with the update handle.
    #[must_use]
    pub fn pair(&self) -> (Snapshot<T>, Updater<T>) {
        (self.snapshot(), self.updater())
    }

    /// Mutation counter; bumps once per `update`.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.state.version()
    }

    /// Register a re-render trigger, invoked with the new snapshot after each
    /// completed update.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&Snapshot<T>) + 'static) -> Subscription {
        let state = self.state.clone();
        self.state.subscribe(move |value| {
            let snapshot = Snapshot {
                value: Rc::clone(value),
                version: state.version(),
            };
            callback(&snapshot);
        })
    }

    /// Field-granular change detection.
    ///
    /// `select` projects the part of `T` a consumer reads; `on_change` fires
    /// only when that projection differs from the last one seen.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn watch<U: PartialEq + 'static>(
        &self,
        select: impl Fn(&T) -> U + 'static,
        on_change: impl Fn(&U) + 'static,
    ) -> Subscription {
        let last = RefCell::new(self.state.with(|v| select(&**v)));
        self.state.subscribe(move |value| {
            let next = select(&**value);
            if *last.borrow() == next {
                return;
            }
            on_change(&next);
            *last.borrow_mut() = next;
        })
    }
}

/// The update half of a store pair.
pub struct Updater<T> {
    store: Store<T>,
}

impl<T> Clone for Updater<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<T> fmt::Debug for Updater<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Updater").finish_non_exhaustive()
    }
}

impl<T: Clone + 'static> Updater<T> {
    /// See [`Store::update`].
    pub fn update(&self, mutator: impl FnOnce(&mut T)) {
        self.store.update(mutator);
    }
}
