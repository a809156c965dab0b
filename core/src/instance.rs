//! Component instances: per-render-tree-position state, props, refs and
//! children, plus the update path back into the host renderer.
//!
//! An instance is a cheaply clonable shared handle. All mutation goes
//! through interior mutability — the runtime is single-threaded and
//! re-entrancy is bounded by the render-context guard, so no locking is
//! involved.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::{Rc, Weak};

use crate::component::{ComponentType, Props};
use crate::element::Element;
use crate::error::AccessError;
use crate::handle::Payload;
use crate::host::{self, NodeRef};
use crate::impl_debug;
use crate::lifecycle::MountHandles;
use crate::schema::{Accessor, PropDefault, StateInit, ValueFuture};
use crate::scope::ScopeToken;
use crate::value::Value;

/// The update generation wraps at this bound; the counter only exists to
/// give the host's state cell a small, always-changing value.
pub(crate) const UPDATE_GENERATION_BOUND: u16 = 8192;

thread_local! {
    static NEXT_ID: Cell<u64> = const { Cell::new(0) };
}

/// A stable per-instance identifier, used to key explicit registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    fn next() -> Self {
        NEXT_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            Self(id)
        })
    }
}

pub(crate) struct InstanceShared {
    id: InstanceId,
    ty: ComponentType,
    scope: RefCell<ScopeToken>,
    parent_scope: RefCell<Option<ScopeToken>>,
    classes: RefCell<BTreeSet<String>>,
    state: RefCell<BTreeMap<String, Value>>,
    props: RefCell<Props>,
    refs: RefCell<BTreeMap<String, NodeRef>>,
    children: RefCell<Vec<Element>>,
    generation: Cell<u16>,
    update_setter: RefCell<Option<Rc<dyn Fn(u16)>>>,
    update_override: RefCell<Option<Rc<dyn Fn()>>>,
    mount: RefCell<Option<MountHandles>>,
    payload: RefCell<Option<Payload>>,
    delegate: RefCell<Option<(ComponentType, Instance)>>,
}

/// A component instance.
#[derive(Clone)]
pub struct Instance(Rc<InstanceShared>);

impl_debug!(Instance);

impl Instance {
    /// Constructs an instance without validation or context inheritance.
    ///
    /// This is the shared raw path: `ComponentType::create` layers contract
    /// validation and parent-scope inheritance on top, and the hot-reload
    /// wrapper uses it directly to build inner instances that bypass both.
    pub(crate) fn raw(
        ty: ComponentType,
        props: Props,
        children: Vec<Element>,
        classes: BTreeSet<String>,
    ) -> Self {
        let scope = ty.token().clone();
        Self(Rc::new(InstanceShared {
            id: InstanceId::next(),
            ty,
            scope: RefCell::new(scope),
            parent_scope: RefCell::new(None),
            classes: RefCell::new(classes),
            state: RefCell::new(BTreeMap::new()),
            props: RefCell::new(props),
            refs: RefCell::new(BTreeMap::new()),
            children: RefCell::new(children),
            generation: Cell::new(0),
            update_setter: RefCell::new(None),
            update_override: RefCell::new(None),
            mount: RefCell::new(None),
            payload: RefCell::new(None),
            delegate: RefCell::new(None),
        }))
    }

    /// Returns the instance's stable identifier.
    #[must_use]
    pub fn id(&self) -> InstanceId {
        self.0.id
    }

    /// Returns the component type this instance was built from.
    #[must_use]
    pub fn component_type(&self) -> ComponentType {
        self.0.ty.clone()
    }

    /// Identity comparison.
    #[must_use]
    pub fn same(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub(crate) fn downgrade(&self) -> Weak<InstanceShared> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn upgrade(weak: &Weak<InstanceShared>) -> Option<Self> {
        weak.upgrade().map(Self)
    }

    /// Returns the instance's scoping token.
    #[must_use]
    pub fn scope(&self) -> ScopeToken {
        self.0.scope.borrow().clone()
    }

    pub(crate) fn set_scope(&self, token: ScopeToken) {
        *self.0.scope.borrow_mut() = token;
    }

    /// Returns the inherited parent scoping token, if any.
    #[must_use]
    pub fn parent_scope(&self) -> Option<ScopeToken> {
        self.0.parent_scope.borrow().clone()
    }

    pub(crate) fn set_parent_scope(&self, token: Option<ScopeToken>) {
        *self.0.parent_scope.borrow_mut() = token;
    }

    /// Reads a declared state key, evaluating its initializer on first
    /// access.
    ///
    /// An asynchronous initializer stores a [`Value::Null`] placeholder,
    /// schedules the future on the host engine, and requests an update once
    /// the value resolves; reads before resolution observe the placeholder.
    ///
    /// # Errors
    ///
    /// Fails with [`AccessError::UnknownState`] for undeclared keys.
    pub fn state(&self, key: &str) -> Result<Value, AccessError> {
        let init = self.state_init(key)?;
        if let Some(value) = self.0.state.borrow().get(key) {
            return Ok(value.clone());
        }
        let value = match init {
            StateInit::Value(value) => value,
            StateInit::Compute(init) => init(),
            StateInit::Deferred(init) => {
                self.0
                    .state
                    .borrow_mut()
                    .insert(key.to_owned(), Value::Null);
                self.schedule_deferred_init(key, &init);
                return Ok(Value::Null);
            }
        };
        self.0
            .state
            .borrow_mut()
            .insert(key.to_owned(), value.clone());
        Ok(value)
    }

    /// Writes a declared state key and unconditionally requests an update.
    ///
    /// There is no equality short-circuit: every write re-renders.
    ///
    /// # Errors
    ///
    /// Fails with [`AccessError::UnknownState`] for undeclared keys.
    pub fn set_state(&self, key: &str, value: impl Into<Value>) -> Result<(), AccessError> {
        let _ = self.state_init(key)?;
        self.0.state.borrow_mut().insert(key.to_owned(), value.into());
        self.request_update();
        Ok(())
    }

    fn state_init(&self, key: &str) -> Result<StateInit, AccessError> {
        match self.0.ty.shared().table.entries.get(key) {
            Some(Accessor::State(init)) => Ok(init.clone()),
            _ => Err(AccessError::UnknownState {
                component: self.0.ty.name().to_owned(),
                key: key.to_owned(),
            }),
        }
    }

    fn schedule_deferred_init(&self, key: &str, init: &Rc<dyn Fn() -> ValueFuture>) {
        let Some(engine) = host::engine() else {
            tracing::warn!(
                key,
                component = self.0.ty.name(),
                "no host engine installed; deferred state initializer left pending"
            );
            return;
        };
        let future = init();
        let weak = self.downgrade();
        let key = key.to_owned();
        engine.spawn(Box::pin(async move {
            let value = future.await;
            // The owning instance may have unmounted or been dropped while
            // the initializer was in flight; resolution is then a no-op.
            if let Some(instance) = Self::upgrade(&weak) {
                instance.0.state.borrow_mut().insert(key, value);
                instance.request_update();
            }
        }));
    }

    /// Reads a declared prop key, evaluating and caching its default when
    /// the caller omitted it.
    ///
    /// # Errors
    ///
    /// Fails with [`AccessError::UnknownProp`] for undeclared keys and with
    /// [`AccessError::AsyncDefault`] when the declared default is
    /// asynchronous.
    pub fn prop(&self, key: &str) -> Result<Value, AccessError> {
        if let Some(value) = self.0.props.borrow().get(key) {
            return Ok(value.clone());
        }
        let default = match self.0.ty.shared().table.entries.get(key) {
            Some(Accessor::Prop(default)) => default.clone(),
            _ => {
                return Err(AccessError::UnknownProp {
                    component: self.0.ty.name().to_owned(),
                    key: key.to_owned(),
                })
            }
        };
        let value = match default {
            None => Value::Null,
            Some(PropDefault::Value(value)) => value,
            Some(PropDefault::Compute(default)) => default(),
            Some(PropDefault::Deferred(_)) => {
                return Err(AccessError::AsyncDefault {
                    component: self.0.ty.name().to_owned(),
                    key: key.to_owned(),
                })
            }
        };
        self.0
            .props
            .borrow_mut()
            .insert(key.to_owned(), value.clone());
        Ok(value)
    }

    /// Reads a declared ref key, lazily creating the handle on first access.
    ///
    /// # Errors
    ///
    /// Fails with [`AccessError::UnknownRef`] for undeclared keys.
    pub fn ref_handle(&self, key: &str) -> Result<NodeRef, AccessError> {
        if !matches!(
            self.0.ty.shared().table.entries.get(key),
            Some(Accessor::Ref)
        ) {
            return Err(AccessError::UnknownRef {
                component: self.0.ty.name().to_owned(),
                key: key.to_owned(),
            });
        }
        let mut refs = self.0.refs.borrow_mut();
        Ok(refs.entry(key.to_owned()).or_default().clone())
    }

    /// Returns the instance's children.
    #[must_use]
    pub fn children(&self) -> Vec<Element> {
        self.0.children.borrow().clone()
    }

    /// Returns the instance's extra class names.
    #[must_use]
    pub fn classes(&self) -> BTreeSet<String> {
        self.0.classes.borrow().clone()
    }

    pub(crate) fn merge_classes(&self, classes: impl IntoIterator<Item = String>) {
        self.0.classes.borrow_mut().extend(classes);
    }

    pub(crate) fn props_map(&self) -> Props {
        self.0.props.borrow().clone()
    }

    pub(crate) fn replace_props(&self, props: Props) {
        *self.0.props.borrow_mut() = props;
    }

    pub(crate) fn replace_children(&self, children: Vec<Element>) {
        *self.0.children.borrow_mut() = children;
    }

    pub(crate) fn insert_prop(&self, key: &str, value: Value) {
        self.0.props.borrow_mut().insert(key.to_owned(), value);
    }

    pub(crate) fn has_prop_key(&self, key: &str) -> bool {
        self.0.props.borrow().contains_key(key)
    }

    /// Requests a host re-render of this instance.
    ///
    /// Increments the bounded update generation and forwards it to the
    /// host's registered state setter. Before the first mount — or after the
    /// owning slot is gone — the request is a no-op.
    pub fn request_update(&self) {
        let forwarded = self.0.update_override.borrow().clone();
        if let Some(forward) = forwarded {
            forward();
            return;
        }
        let next = (self.0.generation.get() + 1) % UPDATE_GENERATION_BOUND;
        self.0.generation.set(next);
        let setter = self.0.update_setter.borrow().clone();
        if let Some(setter) = setter {
            setter(next);
        }
    }

    pub(crate) fn bind_update_setter(&self, setter: Rc<dyn Fn(u16)>) {
        *self.0.update_setter.borrow_mut() = Some(setter);
    }

    pub(crate) fn set_update_override(&self, forward: Rc<dyn Fn()>) {
        *self.0.update_override.borrow_mut() = Some(forward);
    }

    /// Returns the delegate cached by an indirection component, if any.
    ///
    /// Indirection components (the hot-reload wrapper, the router) forward
    /// rendering to a dynamically chosen inner instance and cache it here
    /// together with the type it was resolved against.
    #[must_use]
    pub fn delegate(&self) -> Option<(ComponentType, Instance)> {
        self.0.delegate.borrow().clone()
    }

    /// Caches a delegate instance resolved against `ty`.
    pub fn set_delegate(&self, ty: ComponentType, instance: Self) {
        *self.0.delegate.borrow_mut() = Some((ty, instance));
    }

    /// Discards the cached delegate.
    pub fn clear_delegate(&self) {
        self.0.delegate.borrow_mut().take();
    }

    pub(crate) fn set_mount(&self, handles: MountHandles) {
        *self.0.mount.borrow_mut() = Some(handles);
    }

    pub(crate) fn payload(&self) -> Option<Payload> {
        self.0.payload.borrow().clone()
    }

    pub(crate) fn set_payload(&self, payload: Payload) {
        *self.0.payload.borrow_mut() = Some(payload);
    }

    /// Returns `true` while the instance holds live mount handles.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.0
            .mount
            .borrow()
            .as_ref()
            .is_some_and(|handles| !handles.instance.is_released())
    }

    pub(crate) fn fire_load(&self) {
        let trigger = {
            let mount = self.0.mount.borrow();
            mount.as_ref().map(|handles| handles.load.get())
        };
        if let Some(trigger) = trigger {
            trigger();
        }
    }

    pub(crate) fn fire_unload(&self) {
        let trigger = {
            let mount = self.0.mount.borrow();
            mount.as_ref().map(|handles| handles.unload.get())
        };
        if let Some(trigger) = trigger {
            trigger();
        }
    }

    /// Runs the unmount path: the user hook, then the atomic release of
    /// every proxy handle created at mount, in creation order, then the
    /// props wrapper.
    ///
    /// # Panics
    ///
    /// Panics when called twice — a double-unmount violates the
    /// single-releaser contract and is detected rather than ignored — or
    /// when called before the instance was ever mounted.
    pub fn unmount(&self) {
        tracing::debug!(component = self.0.ty.name(), "unmounting");
        let hook = self.0.ty.shared().on_unload.clone();
        if let Some(hook) = hook {
            hook(self);
        }
        {
            let mount = self.0.mount.borrow();
            let handles = mount.as_ref().unwrap_or_else(|| {
                panic!("`{}` unmounted before mount", self.0.ty.name())
            });
            handles.instance.release();
            handles.load.release();
            handles.unload.release();
        }
        let payload = self.0.payload.borrow().clone();
        if let Some(payload) = payload {
            payload.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::schema::Schema;

    fn ty(schema: Schema) -> ComponentType {
        ComponentType::builder("tests", "Sample")
            .schema(schema)
            .render(|_| Ok(Element::Text(String::new())))
            .build()
    }

    #[test]
    fn test_sync_state_initializer_runs_once() {
        let calls = Rc::new(Cell::new(0));
        let counted = calls.clone();
        let ty = ty(Schema::new().state_with("value", move || {
            counted.set(counted.get() + 1);
            Value::from(41)
        }));
        let instance = ty.create(Props::new(), Vec::new(), "").unwrap();

        assert_eq!(instance.state("value").unwrap(), Value::Int(41));
        assert_eq!(instance.state("value").unwrap(), Value::Int(41));
        assert_eq!(calls.get(), 1);

        instance.set_state("value", 5).unwrap();
        assert_eq!(instance.state("value").unwrap(), Value::Int(5));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_deferred_state_placeholder_without_engine() {
        let ty = ty(Schema::new()
            .state_async("value", || Box::pin(futures::future::ready(Value::from(1)))));
        let instance = ty.create(Props::new(), Vec::new(), "").unwrap();
        assert_eq!(instance.state("value").unwrap(), Value::Null);
    }

    #[test]
    fn test_prop_default_cached() {
        let ty = ty(Schema::new().prop_or_else("label", || Value::from("fallback")));
        let instance = ty.create(Props::new(), Vec::new(), "").unwrap();
        assert_eq!(instance.prop("label").unwrap(), Value::from("fallback"));

        let supplied = ty
            .create(crate::props! { "label" => "given" }, Vec::new(), "")
            .unwrap();
        assert_eq!(supplied.prop("label").unwrap(), Value::from("given"));
    }

    #[test]
    fn test_prop_async_default_rejected() {
        let ty = ty(Schema::new()
            .prop_or_async("label", || Box::pin(futures::future::ready(Value::Null))));
        let instance = ty.create(Props::new(), Vec::new(), "").unwrap();
        assert_eq!(
            instance.prop("label").unwrap_err(),
            AccessError::AsyncDefault {
                component: "Sample".to_owned(),
                key: "label".to_owned(),
            }
        );
    }

    #[test]
    fn test_undeclared_keys_rejected() {
        let ty = ty(Schema::new());
        let instance = ty.create(Props::new(), Vec::new(), "").unwrap();
        assert!(matches!(
            instance.state("nope"),
            Err(AccessError::UnknownState { .. })
        ));
        assert!(matches!(
            instance.prop("nope"),
            Err(AccessError::UnknownProp { .. })
        ));
        assert!(matches!(
            instance.ref_handle("nope"),
            Err(AccessError::UnknownRef { .. })
        ));
    }

    #[test]
    fn test_ref_handle_cached_per_instance() {
        let ty = ty(Schema::new().reference("el"));
        let instance = ty.create(Props::new(), Vec::new(), "").unwrap();
        let first = instance.ref_handle("el").unwrap();
        let second = instance.ref_handle("el").unwrap();
        assert_eq!(first, second);

        let other = ty.create(Props::new(), Vec::new(), "").unwrap();
        assert_ne!(first, other.ref_handle("el").unwrap());
    }

    #[test]
    fn test_update_before_mount_is_noop() {
        let ty = ty(Schema::new().state("value", 0));
        let instance = ty.create(Props::new(), Vec::new(), "").unwrap();
        // No setter bound yet; must not panic.
        instance.set_state("value", 1).unwrap();
    }

    #[test]
    fn test_update_generation_wraps() {
        let ty = ty(Schema::new());
        let instance = ty.create(Props::new(), Vec::new(), "").unwrap();
        let seen = Rc::new(Cell::new(0u16));
        let sink = seen.clone();
        instance.bind_update_setter(Rc::new(move |generation| sink.set(generation)));
        for _ in 0..UPDATE_GENERATION_BOUND {
            instance.request_update();
        }
        assert_eq!(seen.get(), 0);
    }
}
