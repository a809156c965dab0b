//! The interface to the foreign rendering engine.
//!
//! The core never talks to a concrete renderer. It drives an installed
//! [`HostEngine`] through a narrow element-construction surface, and the
//! engine calls back into the lifecycle's render entry point with the
//! per-slot primitives described by [`Slot`]. One engine is installed per
//! execution context; everything here is single-threaded by construction.

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use core::fmt;

use futures::future::LocalBoxFuture;

use crate::component::ComponentType;
use crate::handle::Payload;
use crate::instance::Instance;
use crate::scope::ScopeToken;
use crate::value::Value;

/// An opaque host-side node value.
///
/// The core treats host nodes as tokens: it creates them through the engine,
/// passes them back as children, and never inspects them. Engines downcast
/// to their own node type.
#[derive(Clone)]
pub struct HostNode(Rc<dyn Any>);

impl HostNode {
    /// Wraps an engine-defined node value.
    #[must_use]
    pub fn new<T: 'static>(node: T) -> Self {
        Self(Rc::new(node))
    }

    /// Downcasts to the engine's node type.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }

    /// Identity comparison.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for HostNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HostNode")
    }
}

impl PartialEq for HostNode {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

/// A handle to a host node, populated by the engine when the node carrying
/// it is committed.
///
/// Created lazily by ref accessors, passed around as a [`Value`], and
/// attached to markup via [`Tag::node_ref`](crate::Tag::node_ref). Compares
/// by identity.
#[derive(Clone, Default)]
pub struct NodeRef(Rc<RefCell<Option<HostNode>>>);

impl NodeRef {
    /// Creates an unattached node reference.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the node this reference currently points at.
    #[must_use]
    pub fn current(&self) -> Option<HostNode> {
        self.0.borrow().clone()
    }

    /// Points the reference at `node`. Called by the engine at commit time.
    pub fn set_current(&self, node: Option<HostNode>) {
        *self.0.borrow_mut() = node;
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("attached", &self.0.borrow().is_some())
            .finish()
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A mount effect: runs once per mount, returns the cleanup to run at
/// unmount.
pub type MountEffect = Box<dyn FnOnce() -> Box<dyn FnOnce()>>;

/// The engine's per-slot primitives, handed to the render entry point.
///
/// A slot is the engine-owned storage for one component position. Its state
/// cell persists across re-renders of the same position; the generation
/// setter forces the engine to re-render the slot; the mount effect runs
/// exactly once per mount and its return value runs at unmount.
pub trait Slot {
    /// Reads the slot's state cell.
    fn stored(&self) -> Option<Instance>;

    /// Writes the slot's state cell.
    fn store(&self, instance: Instance);

    /// Returns the setter that records an update generation and schedules a
    /// re-render of this slot.
    fn update_setter(&self) -> Rc<dyn Fn(u16)>;

    /// Registers the run-once-per-mount effect. Registering again after the
    /// effect has run (or been registered) for the current mount is a no-op.
    fn effect_once(&self, effect: MountEffect);
}

/// The foreign rendering engine.
///
/// Element construction mirrors the engine's own create-element call; style
/// nodes are keyed by scoping token so hot reload can remove them
/// precisely; `spawn` is the engine's cooperative task queue.
pub trait HostEngine {
    /// Creates a host element with converted attributes and projected
    /// children.
    fn element(
        &self,
        name: &str,
        attrs: BTreeMap<String, Value>,
        children: Vec<HostNode>,
    ) -> HostNode;

    /// Creates a host text node.
    fn text(&self, content: &str) -> HostNode;

    /// Creates a host component element: the stable render identity of `ty`
    /// plus the opaque `payload` the engine threads through reconciliation.
    fn component(&self, ty: &ComponentType, payload: Payload) -> HostNode;

    /// Installs a compiled stylesheet keyed by `token`.
    fn install_style(&self, token: &ScopeToken, css: &str);

    /// Removes the stylesheet keyed by `token`, silently succeeding when no
    /// such node exists.
    fn remove_style(&self, token: &ScopeToken);

    /// Mounts a projected root node into the host document.
    ///
    /// # Errors
    ///
    /// Returns an error when rendering the tree fails under the strict
    /// render failure policy.
    fn mount(&self, root: HostNode) -> anyhow::Result<()>;

    /// Reads the current location path.
    fn location_path(&self) -> String;

    /// Pushes a new location path into the host's history state.
    fn push_location(&self, path: &str);

    /// Schedules a task on the engine's cooperative executor.
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);

    /// Forwards a diagnostic message to the host's error channel.
    fn report_error(&self, message: &str);
}

thread_local! {
    static ENGINE: RefCell<Option<Rc<dyn HostEngine>>> = const { RefCell::new(None) };
}

/// Installs the engine for this execution context, replacing any previous
/// one.
pub fn install(engine: Rc<dyn HostEngine>) {
    ENGINE.with(|slot| *slot.borrow_mut() = Some(engine));
}

/// Returns the installed engine, if any.
#[must_use]
pub fn engine() -> Option<Rc<dyn HostEngine>> {
    ENGINE.with(|slot| slot.borrow().clone())
}

/// Removes the installed engine.
pub fn uninstall() {
    ENGINE.with(|slot| slot.borrow_mut().take());
}
