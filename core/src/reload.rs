//! Live reload: flags, the identity-preserving wrapper mechanism, and the
//! per-module reconcile entry point.
//!
//! When live reload is enabled, every component construction is redirected
//! through a synthesized wrapper type — one per (module, component name),
//! memoized. The wrapper is an ordinary component: it receives the same
//! props and children, and on render lazily builds a raw instance of the
//! *current* implementation, substituting its own update path so the host
//! only ever sees the wrapper's stable identity. Swapping the current
//! implementation then reaches every live wrapper instance without the host
//! renderer noticing that anything changed above the swapped subtree.
//!
//! The reload notification surface is exactly one entry point:
//! [`reconcile`], called once per changed module with the re-evaluated
//! definitions.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::component::{ComponentType, TypeKind};
use crate::element::Element;
use crate::host;
use crate::instance::{Instance, InstanceId};

thread_local! {
    static LIVE_RELOAD: Cell<bool> = const { Cell::new(false) };
    static REPLACEMENT: Cell<bool> = const { Cell::new(false) };
    static REGISTRY: RefCell<BTreeMap<String, BTreeMap<String, WrapperEntry>>> =
        RefCell::new(BTreeMap::new());
}

/// Enables or disables live reload for this execution context.
///
/// Must be set before component types are instantiated; construction
/// redirection only applies to instances created while enabled.
pub fn set_live_reload(enabled: bool) {
    LIVE_RELOAD.with(|flag| flag.set(enabled));
}

/// Returns whether live reload is enabled.
#[must_use]
pub fn live_reload_enabled() -> bool {
    LIVE_RELOAD.with(Cell::get)
}

/// Returns whether a reload-replacement scope is active.
///
/// Inside the scope, re-registrations that would otherwise conflict (route
/// paths, reused scoping tokens) are permitted as overwrites.
#[must_use]
pub fn replacement_active() -> bool {
    REPLACEMENT.with(Cell::get)
}

/// Runs `f` inside a reload-replacement scope.
///
/// The scope flag is restored when `f` returns, including on panic.
pub fn replacement_scope<R>(f: impl FnOnce() -> R) -> R {
    struct Reset(bool);
    impl Drop for Reset {
        fn drop(&mut self) {
            REPLACEMENT.with(|flag| flag.set(self.0));
        }
    }
    let _reset = Reset(REPLACEMENT.with(|flag| flag.replace(true)));
    f()
}

/// A reloaded module object: the module's name plus the component types
/// re-registered while re-evaluating it.
#[derive(Debug, Default)]
pub struct Module {
    name: String,
    components: BTreeMap<String, ComponentType>,
}

impl Module {
    /// Creates an empty module description.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            components: BTreeMap::new(),
        }
    }

    /// Records a component type defined by the module.
    #[must_use]
    pub fn component(mut self, ty: ComponentType) -> Self {
        self.components.insert(ty.name().to_owned(), ty);
        self
    }

    /// Returns the module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a component by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ComponentType> {
        self.components.get(name)
    }
}

struct WrapperShared {
    /// The implementation currently bound; swapped by [`reconcile`].
    current: RefCell<ComponentType>,
    /// Live wrapper instances keyed by id. Instances register after their
    /// first successful render and deregister in their unmount hook, so
    /// transient never-mounted instances are not reachable from here.
    instances: RefCell<BTreeMap<InstanceId, Instance>>,
}

#[derive(Clone)]
struct WrapperEntry {
    shared: Rc<WrapperShared>,
    ty: ComponentType,
}

/// Returns the memoized wrapper type for `target`, synthesizing it on first
/// use.
pub(crate) fn wrapper_for(target: &ComponentType) -> ComponentType {
    let existing = REGISTRY.with(|registry| {
        registry
            .borrow()
            .get(target.module())
            .and_then(|named| named.get(target.name()))
            .map(|entry| entry.ty.clone())
    });
    if let Some(ty) = existing {
        return ty;
    }

    let shared = Rc::new(WrapperShared {
        current: RefCell::new(target.clone()),
        instances: RefCell::new(BTreeMap::new()),
    });

    let render = {
        let shared = Rc::clone(&shared);
        move |wrapper: &Instance| -> anyhow::Result<Element> {
            let current = shared.current.borrow().clone();
            if let Some((_, inner)) = wrapper.delegate() {
                // Implementation unchanged since last render: refresh the
                // inner instance's props and children and keep its state.
                inner.replace_props(wrapper.props_map());
                inner.replace_children(wrapper.children());
                return Ok(Element::Component(inner));
            }

            let inner = Instance::raw(
                current.clone(),
                wrapper.props_map(),
                wrapper.children(),
                wrapper.classes(),
            );
            let weak = wrapper.downgrade();
            inner.set_update_override(Rc::new(move || {
                if let Some(wrapper) = Instance::upgrade(&weak) {
                    wrapper.request_update();
                }
            }));
            wrapper.set_scope(current.token().clone());
            inner.set_parent_scope(wrapper.parent_scope());
            wrapper.set_delegate(current, inner.clone());
            shared
                .instances
                .borrow_mut()
                .insert(wrapper.id(), wrapper.clone());
            Ok(Element::Component(inner))
        }
    };

    let on_unload = {
        let shared = Rc::clone(&shared);
        move |wrapper: &Instance| {
            shared.instances.borrow_mut().remove(&wrapper.id());
            wrapper.clear_delegate();
        }
    };

    let ty = ComponentType::builder(
        target.module(),
        &format!("ReloadWrapper<{}::{}>", target.module(), target.name()),
    )
    .allow_unexpected_props()
    .kind(TypeKind::Wrapper)
    .render(render)
    .on_unload(on_unload)
    .build();

    REGISTRY.with(|registry| {
        registry
            .borrow_mut()
            .entry(target.module().to_owned())
            .or_default()
            .insert(
                target.name().to_owned(),
                WrapperEntry {
                    shared,
                    ty: ty.clone(),
                },
            );
    });
    ty
}

/// Reconciles every wrapper bound to a name in the reloaded `module`.
///
/// For each wrapper: the old implementation's style node is removed from
/// the host, the wrapper rebinds to the freshly registered type of the same
/// name, and every live wrapper instance discards its cached inner instance
/// and requests an update so its next render reconstructs against the new
/// implementation. A name missing from the reloaded module is logged and
/// skipped, leaving the previous implementation live.
pub fn reconcile(module: &Module) {
    let entries: Vec<(String, WrapperEntry)> = REGISTRY.with(|registry| {
        registry
            .borrow()
            .get(module.name())
            .map(|named| {
                named
                    .iter()
                    .map(|(name, entry)| (name.clone(), entry.clone()))
                    .collect()
            })
            .unwrap_or_default()
    });

    for (name, entry) in entries {
        let Some(next) = module.get(&name) else {
            tracing::warn!(
                module = module.name(),
                component = name.as_str(),
                "unable to find component in reloaded module; keeping previous implementation"
            );
            continue;
        };

        let old = entry.shared.current.replace(next.clone());
        if let Some(engine) = host::engine() {
            engine.remove_style(old.token());
        }

        let live: Vec<Instance> = entry.shared.instances.borrow().values().cloned().collect();
        for wrapper in live {
            wrapper.clear_delegate();
            wrapper.request_update();
        }
        tracing::debug!(
            module = module.name(),
            component = name.as_str(),
            "rebound component implementation"
        );
    }
}
