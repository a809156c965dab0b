//! The per-instance lifecycle state machine.
//!
//! The host renderer owns reconciliation; this module owns everything on the
//! authoring side of the boundary. Each component position renders through
//! [`render_entry`], the stable entry point the engine invokes with the
//! slot's primitives and the opaque payload it carried through its own
//! tree:
//!
//! - **first mount** — the slot's state cell is empty, so the payload's
//!   instance is adopted, the proxy set (instance wrapper, load trigger,
//!   unload trigger) is created atomically, and the instance is stored back
//!   through the slot's state cell;
//! - **re-render** — the stored instance is reused; when the incoming
//!   payload differs by identity from the one held, the old props wrapper
//!   is released and the new prop/children payload is copied onto the
//!   instance;
//! - **unmount** — the slot's effect cleanup fires the unload trigger,
//!   which runs the user hook and releases every handle exactly once.
//!
//! Failures escaping a render closure are contained at the failing
//! component: logged, forwarded to the host's diagnostic channel, and
//! replaced by a textual placeholder, so one broken subtree cannot take
//! down the whole tree.

use std::cell::Cell;
use std::rc::Rc;

use anyhow::Context as _;

use crate::context::RenderGuard;
use crate::element::Element;
use crate::handle::{Payload, ProxyHandle};
use crate::host::{self, HostNode, Slot};
use crate::instance::Instance;
use crate::project::project;
use crate::value::Value;

/// The proxy set created atomically at first mount.
///
/// Release happens atomically in the unmount path, in creation order, and
/// exactly once; see [`Instance::unmount`].
pub(crate) struct MountHandles {
    pub instance: ProxyHandle<Instance>,
    pub load: ProxyHandle<Rc<dyn Fn()>>,
    pub unload: ProxyHandle<Rc<dyn Fn()>>,
}

thread_local! {
    static STRICT_RENDER_FAILURES: Cell<bool> = const { Cell::new(false) };
}

/// Enables or disables strict render failures for this execution context.
///
/// Under the strict policy every render failure propagates to the engine
/// instead of being contained; the test suite uses this to fail fast.
pub fn set_strict_render_failures(strict: bool) {
    STRICT_RENDER_FAILURES.with(|flag| flag.set(strict));
}

/// Returns whether strict render failures are enabled.
#[must_use]
pub fn strict_render_failures() -> bool {
    STRICT_RENDER_FAILURES.with(Cell::get)
}

/// The stable render entry point, invoked by the host engine for every
/// render pass of a component slot.
///
/// # Errors
///
/// Fails when no host engine is installed, or when the render closure fails
/// and the component type (or the strict policy) demands propagation.
///
/// # Panics
///
/// Panics when called re-entrantly while another instance is rendering.
pub fn render_entry(slot: &Rc<dyn Slot>, payload: &Payload) -> anyhow::Result<HostNode> {
    let engine = host::engine().context("no host engine installed")?;

    let instance = match slot.stored() {
        Some(instance) => instance,
        None => {
            let instance = payload.instance();
            instance.set_mount(mount_handles(&instance));
            instance.set_payload(payload.clone());
            slot.store(instance.clone());
            tracing::debug!(component = instance.component_type().name(), "first mount");
            instance
        }
    };
    let ty = instance.component_type();

    // Everything from here to the end of projection runs with this instance
    // as the active render context; the guard resets it on every exit path.
    let _guard = RenderGuard::enter(&instance);

    instance.bind_update_setter(slot.update_setter());
    slot.effect_once({
        let instance = instance.clone();
        Box::new(move || {
            instance.fire_load();
            let instance = instance.clone();
            Box::new(move || instance.fire_unload())
        })
    });

    if let Some(held) = instance.payload() {
        if !Payload::same(&held, payload) {
            held.release();
            instance.set_payload(payload.clone());
            let replacement = payload.instance();
            instance.replace_props(replacement.props_map());
            instance.replace_children(replacement.children());
        }
    }

    let output = match (ty.shared().render)(&instance) {
        Ok(mut output) => {
            stamp_output(&instance, &mut output);
            output
        }
        Err(error) => {
            if ty.propagate_render_failures() || strict_render_failures() {
                return Err(error);
            }
            let report = format!("{error:#}");
            tracing::error!(component = ty.name(), "render failed: {report}");
            engine.report_error(&report);
            Element::Text(format!("Error: {error}"))
        }
    };

    Ok(project(output, &engine))
}

/// Merges the instance's extra classes into its rendered output and stamps
/// the inherited parent scoping token on the outermost projected attribute.
fn stamp_output(instance: &Instance, output: &mut Element) {
    match output {
        Element::Tag(tag) => {
            tag.add_classes(instance.classes());
            if let Some(parent) = instance.parent_scope() {
                tag.set_attr(parent.as_str(), Value::Text(String::new()));
            }
        }
        Element::Component(inner) => {
            inner.merge_classes(instance.classes());
            if let Some(parent) = instance.parent_scope() {
                inner.insert_prop(parent.as_str(), Value::Text(String::new()));
            }
        }
        Element::Native(_) | Element::Text(_) => {}
    }
}

fn mount_handles(instance: &Instance) -> MountHandles {
    let load: Rc<dyn Fn()> = {
        let instance = instance.clone();
        Rc::new(move || {
            let hook = instance.component_type().shared().on_load.clone();
            if let Some(hook) = hook {
                hook(&instance);
            }
        })
    };
    let unload: Rc<dyn Fn()> = {
        let instance = instance.clone();
        Rc::new(move || instance.unmount())
    };
    MountHandles {
        instance: ProxyHandle::new(instance.clone(), "component instance"),
        load: ProxyHandle::new(load, "load trigger"),
        unload: ProxyHandle::new(unload, "unload trigger"),
    }
}

/// Projects `instance` as a root component and mounts it on the installed
/// engine.
///
/// # Errors
///
/// Fails when no host engine is installed or when mounting fails.
pub fn create_root(instance: Instance) -> anyhow::Result<HostNode> {
    let engine = host::engine().context("no host engine installed")?;
    let root = project(Element::Component(instance), &engine);
    engine.mount(root.clone())?;
    Ok(root)
}
