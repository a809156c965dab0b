//! An in-process headless rendering engine for Estuary.
//!
//! This backend plays the foreign rendering engine for the test suite. It
//! owns a document equivalent (style nodes, committed node trees, location
//! state), implements the per-slot primitives the lifecycle renders
//! through, reconciles re-renders with type-identity slot reuse, and runs
//! scheduled tasks on a single-threaded executor.
//!
//! The reconciliation here is deliberately naive — children are matched by
//! position, and a changed component identity remounts the subtree — but
//! it honors the contract the runtime depends on: a slot's state cell
//! persists across re-renders of the same position and type, mount effects
//! run exactly once per mount, and their cleanups run child-first at
//! unmount.

mod dom;

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt as _;

use estuary_core::{
    ComponentType, HostEngine, HostNode, Instance, MountEffect, Payload, ScopeToken, Slot, Value,
    host, render_entry,
};

use dom::{ComponentCell, ElementNode, Node};

/// Engine-side slot storage: the state cell, the once-per-mount effect and
/// its cleanup, and the back-pointer to the component cell currently
/// rendering through this slot.
pub(crate) struct SlotCell {
    stored: RefCell<Option<Instance>>,
    pending: RefCell<Option<MountEffect>>,
    cleanup: RefCell<Option<Box<dyn FnOnce()>>>,
    effect_ran: Cell<bool>,
    engine: Weak<EngineShared>,
    cell: RefCell<Option<Weak<ComponentCell>>>,
}

impl SlotCell {
    fn new(engine: Weak<EngineShared>) -> Self {
        Self {
            stored: RefCell::new(None),
            pending: RefCell::new(None),
            cleanup: RefCell::new(None),
            effect_ran: Cell::new(false),
            engine,
            cell: RefCell::new(None),
        }
    }
}

impl Slot for SlotCell {
    fn stored(&self) -> Option<Instance> {
        self.stored.borrow().clone()
    }

    fn store(&self, instance: Instance) {
        *self.stored.borrow_mut() = Some(instance);
    }

    fn update_setter(&self) -> Rc<dyn Fn(u16)> {
        let engine = self.engine.clone();
        let cell = self.cell.borrow().clone();
        Rc::new(move |_generation| {
            let engine = engine.upgrade();
            let cell = cell.as_ref().and_then(Weak::upgrade);
            if let (Some(engine), Some(cell)) = (engine, cell) {
                engine.mark_dirty(&cell);
            }
        })
    }

    fn effect_once(&self, effect: MountEffect) {
        if !self.effect_ran.get() && self.pending.borrow().is_none() {
            *self.pending.borrow_mut() = Some(effect);
        }
    }
}

struct EngineShared {
    styles: RefCell<BTreeMap<String, String>>,
    location: RefCell<String>,
    reported: RefCell<Vec<String>>,
    roots: RefCell<Vec<HostNode>>,
    dirty: RefCell<Vec<Rc<ComponentCell>>>,
    pending_effects: RefCell<Vec<Rc<SlotCell>>>,
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

impl EngineShared {
    fn mark_dirty(&self, cell: &Rc<ComponentCell>) {
        let mut dirty = self.dirty.borrow_mut();
        if !dirty.iter().any(|queued| Rc::ptr_eq(queued, cell)) {
            dirty.push(cell.clone());
        }
    }
}

/// The headless engine. Clones share the same document and executor.
#[derive(Clone)]
pub struct HeadlessEngine {
    shared: Rc<EngineShared>,
}

estuary_core::impl_debug!(HeadlessEngine);

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessEngine {
    /// Creates a fresh engine with an empty document at location `/`.
    #[must_use]
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            shared: Rc::new(EngineShared {
                styles: RefCell::new(BTreeMap::new()),
                location: RefCell::new("/".to_owned()),
                reported: RefCell::new(Vec::new()),
                roots: RefCell::new(Vec::new()),
                dirty: RefCell::new(Vec::new()),
                pending_effects: RefCell::new(Vec::new()),
                pool: RefCell::new(pool),
                spawner,
            }),
        }
    }

    /// Installs this engine as the execution context's host engine.
    pub fn install(&self) {
        host::install(Rc::new(self.clone()));
    }

    /// Re-renders every component marked dirty, then runs newly queued
    /// mount effects, until the document is stable.
    ///
    /// # Errors
    ///
    /// Propagates render failures under the strict render failure policy.
    pub fn flush(&self) -> anyhow::Result<()> {
        loop {
            let dirty: Vec<Rc<ComponentCell>> =
                self.shared.dirty.borrow_mut().drain(..).collect();
            if dirty.is_empty() {
                break;
            }
            for cell in dirty {
                self.rerender_cell(&cell)?;
            }
            self.run_pending_effects();
        }
        Ok(())
    }

    /// Runs scheduled tasks and flushes re-renders until both the executor
    /// and the document are idle.
    ///
    /// # Errors
    ///
    /// Propagates render failures under the strict render failure policy.
    pub fn run_until_idle(&self) -> anyhow::Result<()> {
        loop {
            self.shared.pool.borrow_mut().run_until_stalled();
            if self.shared.dirty.borrow().is_empty() {
                break;
            }
            self.flush()?;
        }
        Ok(())
    }

    /// Serializes every mounted root into markup.
    #[must_use]
    pub fn markup(&self) -> String {
        let mut out = String::new();
        for root in self.shared.roots.borrow().iter() {
            dom::serialize(root, &mut out);
        }
        out
    }

    /// Returns the installed stylesheets keyed by scoping token.
    #[must_use]
    pub fn styles(&self) -> BTreeMap<String, String> {
        self.shared.styles.borrow().clone()
    }

    /// Returns the messages forwarded to the diagnostic channel.
    #[must_use]
    pub fn reported_errors(&self) -> Vec<String> {
        self.shared.reported.borrow().clone()
    }

    /// Returns the current location path.
    #[must_use]
    pub fn location(&self) -> String {
        self.shared.location.borrow().clone()
    }

    /// Unmounts every mounted root, running cleanups child-first.
    pub fn unmount_roots(&self) {
        let roots: Vec<HostNode> = self.shared.roots.borrow_mut().drain(..).collect();
        for root in roots {
            self.unmount_tree(&root);
        }
    }

    fn mount_tree(&self, node: &HostNode) -> anyhow::Result<()> {
        let Some(realized) = node.downcast_ref::<Node>() else {
            return Ok(());
        };
        match realized {
            Node::Text(_) => Ok(()),
            Node::Element(element) => {
                if let Some(handle) = &element.node_ref {
                    handle.set_current(Some(node.clone()));
                }
                for child in &element.children {
                    self.mount_tree(child)?;
                }
                Ok(())
            }
            Node::Component(cell) => {
                let slot = Rc::new(SlotCell::new(Rc::downgrade(&self.shared)));
                *cell.slot.borrow_mut() = Some(slot.clone());
                let subtree = self.render_cell(cell, &slot)?;
                *cell.rendered.borrow_mut() = Some(subtree.clone());
                self.mount_tree(&subtree)?;
                self.shared.pending_effects.borrow_mut().push(slot);
                Ok(())
            }
        }
    }

    fn render_cell(
        &self,
        cell: &Rc<ComponentCell>,
        slot: &Rc<SlotCell>,
    ) -> anyhow::Result<HostNode> {
        *slot.cell.borrow_mut() = Some(Rc::downgrade(cell));
        let entry_slot: Rc<dyn Slot> = slot.clone();
        render_entry(&entry_slot, &cell.payload)
    }

    fn rerender_cell(&self, cell: &Rc<ComponentCell>) -> anyhow::Result<()> {
        // The cell may have been unmounted after it was marked dirty.
        let Some(slot) = cell.slot.borrow().clone() else {
            return Ok(());
        };
        let previous = cell.rendered.borrow_mut().take();
        let subtree = self.render_cell(cell, &slot)?;
        match previous {
            Some(previous) => self.reconcile(&previous, &subtree)?,
            None => self.mount_tree(&subtree)?,
        }
        *cell.rendered.borrow_mut() = Some(subtree);
        Ok(())
    }

    fn reconcile(&self, old: &HostNode, new: &HostNode) -> anyhow::Result<()> {
        let (Some(old_node), Some(new_node)) =
            (old.downcast_ref::<Node>(), new.downcast_ref::<Node>())
        else {
            return Ok(());
        };
        match (old_node, new_node) {
            (Node::Component(old_cell), Node::Component(new_cell))
                if ComponentType::same(&old_cell.ty, &new_cell.ty) =>
            {
                // Same identity at the same position: the new cell adopts
                // the old slot, so the stored instance survives.
                let slot = old_cell.slot.borrow_mut().take();
                let Some(slot) = slot else {
                    return self.mount_tree(new);
                };
                *new_cell.slot.borrow_mut() = Some(slot.clone());
                let old_subtree = old_cell.rendered.borrow_mut().take();
                let new_subtree = self.render_cell(new_cell, &slot)?;
                match old_subtree {
                    Some(old_subtree) => self.reconcile(&old_subtree, &new_subtree)?,
                    None => self.mount_tree(&new_subtree)?,
                }
                *new_cell.rendered.borrow_mut() = Some(new_subtree);
                Ok(())
            }
            (Node::Element(old_element), Node::Element(new_element))
                if old_element.name == new_element.name =>
            {
                if let Some(handle) = &new_element.node_ref {
                    handle.set_current(Some(new.clone()));
                }
                let shared = old_element.children.len().min(new_element.children.len());
                for index in 0..shared {
                    self.reconcile(&old_element.children[index], &new_element.children[index])?;
                }
                for removed in &old_element.children[shared..] {
                    self.unmount_tree(removed);
                }
                for added in &new_element.children[shared..] {
                    self.mount_tree(added)?;
                }
                Ok(())
            }
            (Node::Text(_), Node::Text(_)) => Ok(()),
            _ => {
                self.unmount_tree(old);
                self.mount_tree(new)
            }
        }
    }

    fn unmount_tree(&self, node: &HostNode) {
        let Some(realized) = node.downcast_ref::<Node>() else {
            return;
        };
        match realized {
            Node::Text(_) => {}
            Node::Element(element) => {
                for child in &element.children {
                    self.unmount_tree(child);
                }
                if let Some(handle) = &element.node_ref {
                    handle.set_current(None);
                }
            }
            Node::Component(cell) => {
                let subtree = cell.rendered.borrow_mut().take();
                if let Some(subtree) = subtree {
                    self.unmount_tree(&subtree);
                }
                let slot = cell.slot.borrow_mut().take();
                if let Some(slot) = slot {
                    let cleanup = slot.cleanup.borrow_mut().take();
                    if let Some(cleanup) = cleanup {
                        cleanup();
                    }
                }
            }
        }
    }

    fn run_pending_effects(&self) {
        let queued: Vec<Rc<SlotCell>> =
            self.shared.pending_effects.borrow_mut().drain(..).collect();
        for slot in queued {
            if slot.effect_ran.get() {
                continue;
            }
            let effect = slot.pending.borrow_mut().take();
            if let Some(effect) = effect {
                slot.effect_ran.set(true);
                let cleanup = effect();
                *slot.cleanup.borrow_mut() = Some(cleanup);
            }
        }
    }
}

impl HostEngine for HeadlessEngine {
    fn element(
        &self,
        name: &str,
        mut attrs: BTreeMap<String, Value>,
        children: Vec<HostNode>,
    ) -> HostNode {
        let node_ref = attrs
            .remove("ref")
            .and_then(|value| value.as_ref_handle().cloned());
        HostNode::new(Node::Element(ElementNode {
            name: name.to_owned(),
            attrs,
            node_ref,
            children,
        }))
    }

    fn text(&self, content: &str) -> HostNode {
        HostNode::new(Node::Text(content.to_owned()))
    }

    fn component(&self, ty: &ComponentType, payload: Payload) -> HostNode {
        HostNode::new(Node::Component(Rc::new(ComponentCell {
            ty: ty.clone(),
            payload,
            slot: RefCell::new(None),
            rendered: RefCell::new(None),
        })))
    }

    fn install_style(&self, token: &ScopeToken, css: &str) {
        self.shared
            .styles
            .borrow_mut()
            .insert(token.to_string(), css.to_owned());
    }

    fn remove_style(&self, token: &ScopeToken) {
        self.shared.styles.borrow_mut().remove(token.as_str());
    }

    fn mount(&self, root: HostNode) -> anyhow::Result<()> {
        self.mount_tree(&root)?;
        self.run_pending_effects();
        self.shared.roots.borrow_mut().push(root);
        self.flush()
    }

    fn location_path(&self) -> String {
        self.location()
    }

    fn push_location(&self, path: &str) {
        *self.shared.location.borrow_mut() = path.to_owned();
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        if let Err(error) = self.shared.spawner.spawn_local(task) {
            tracing::error!("failed to schedule task: {error}");
        }
    }

    fn report_error(&self, message: &str) {
        self.shared.reported.borrow_mut().push(message.to_owned());
    }
}
