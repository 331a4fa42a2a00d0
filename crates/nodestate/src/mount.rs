#![forbid(unsafe_code)]

//! Component-lifetime hook layer.
//!
//! A [`Mount`] stands for one mounted component. Each render pass runs a
//! closure with a [`RenderCx`]; hooks called inside it are matched to slots
//! by call order, so the value a hook creates on the first pass is handed
//! back on every later pass:
//!
//! - [`RenderCx::use_store`] builds its [`Store`] once per mount.
//! - [`RenderCx::use_node_state`] binds a node once per id and re-binds when
//!   the id passed on a later pass differs.
//!
//! Any change to a store created by a hook marks the mount as needing a
//! render ([`Mount::needs_render`]). Dropping the mount releases every
//! listener and subscription it acquired.
//!
//! # Invariants
//!
//! 1. Hooks must be called in the same order on every pass. Calling a
//!    different hook kind at a slot panics.
//! 2. A failing `use_node_state` (no client) still occupies its slot, so
//!    later hooks keep their positions. The bind is retried on the next pass.
//! 3. After drop, no listener registered through this mount remains.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use nodestate_core::{Fields, NodeStateConfig, Result};
use nodestate_graph::GraphContext;
use nodestate_runtime::{BindingScope, Snapshot, Store, Updater};

use crate::binding::{NodeBinding, SetState};

struct Slot {
    hook: &'static str,
    value: Box<dyn Any>,
}

/// One mounted component's hook state.
pub struct Mount {
    context: GraphContext,
    config: NodeStateConfig,
    slots: Vec<Slot>,
    scope: BindingScope,
    dirty: Rc<Cell<bool>>,
    renders: u64,
}

impl Mount {
    /// Mount with an explicit context and configuration.
    #[must_use]
    pub fn new(context: GraphContext, config: NodeStateConfig) -> Self {
        Self {
            context,
            config,
            slots: Vec::new(),
            scope: BindingScope::new(),
            dirty: Rc::new(Cell::new(true)),
            renders: 0,
        }
    }

    /// Mount under the ambient [`GraphContext::current`] with default
    /// configuration. The context is captured now, not at each render.
    #[must_use]
    pub fn from_current() -> Self {
        Self::new(GraphContext::current(), NodeStateConfig::default())
    }

    /// Run one render pass.
    pub fn render<R>(&mut self, f: impl FnOnce(&mut RenderCx<'_>) -> R) -> R {
        self.dirty.set(false);
        self.renders += 1;
        let _span = tracing::trace_span!("mount.render", pass = self.renders).entered();
        let mut cx = RenderCx {
            mount: self,
            cursor: 0,
        };
        f(&mut cx)
    }

    /// Whether a hook-owned store changed since the last render began.
    /// True before the first render.
    #[must_use]
    pub fn needs_render(&self) -> bool {
        self.dirty.get()
    }

    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.renders
    }

    /// Number of hook slots allocated so far.
    #[must_use]
    pub fn hook_count(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn context(&self) -> &GraphContext {
        &self.context
    }

    fn mark_dirty_on_change<T: Clone + 'static>(&mut self, store: &Store<T>) {
        let dirty = Rc::clone(&self.dirty);
        self.scope.hold(store.subscribe(move |_| dirty.set(true)));
    }
}

impl Drop for Mount {
    fn drop(&mut self) {
        if !self.slots.is_empty() {
            tracing::debug!(message = "mount.unmount", hooks = self.slots.len());
        }
    }
}

impl fmt::Debug for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mount")
            .field("hooks", &self.slots.len())
            .field("renders", &self.renders)
            .field("needs_render", &self.dirty.get())
            .finish()
    }
}

/// Hook entry points for one render pass.
pub struct RenderCx<'m> {
    mount: &'m mut Mount,
    cursor: usize,
}

impl RenderCx<'_> {
    /// Proxy store created once per mount from `init`.
    ///
    /// # Panics
    ///
    /// Panics if the hook at this position was a different hook or a store of
    /// a different type on an earlier pass.
    pub fn use_store<T: Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> (Snapshot<T>, Updater<T>) {
        const HOOK: &str = "use_store";
        let index = self.cursor;
        if index == self.mount.slots.len() {
            let store = Store::new(init());
            self.mount.mark_dirty_on_change(&store);
            self.mount.slots.push(Slot {
                hook: HOOK,
                value: Box::new(store),
            });
        }
        self.cursor += 1;
        let store = self.slot_mut::<Store<T>>(index, HOOK);
        store.pair()
    }

    /// Live state of graph node `node_id` plus its write handle.
    ///
    /// # Errors
    ///
    /// [`MissingClient`](nodestate_core::NodeStateError::MissingClient) when
    /// the mount's context holds no client.
    ///
    /// # Panics
    ///
    /// Panics if the hook at this position was a different hook on an
    /// earlier pass.
    pub fn use_node_state(&mut self, node_id: &str) -> Result<(Snapshot<Fields>, SetState)> {
        const HOOK: &str = "use_node_state";
        let index = self.cursor;
        if index == self.mount.slots.len() {
            self.mount.slots.push(Slot {
                hook: HOOK,
                value: Box::new(None::<NodeBinding>),
            });
        }
        self.cursor += 1;
        if let Some(binding) = self.slot_mut::<Option<NodeBinding>>(index, HOOK) {
            binding.rebind(node_id);
            return Ok(binding.pair());
        }

        // Empty slot: first pass, or every earlier bind attempt failed.
        let binding = NodeBinding::bind(&self.mount.context, node_id, &self.mount.config)?;
        self.mount.mark_dirty_on_change(binding.store());
        let pair = binding.pair();
        *self.slot_mut::<Option<NodeBinding>>(index, HOOK) = Some(binding);
        Ok(pair)
    }

    fn slot_mut<T: 'static>(&mut self, index: usize, hook: &'static str) -> &mut T {
        let slot = &mut self.mount.slots[index];
        assert_eq!(
            slot.hook, hook,
            "hook order changed between renders at slot {index}"
        );
        slot.value
            .downcast_mut::<T>()
            .unwrap_or_else(|| panic!("{hook} at slot {index} changed type between renders"))
    }
}

impl fmt::Debug for RenderCx<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderCx")
            .field("cursor", &self.cursor)
            .finish()
    }
}
