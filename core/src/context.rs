//! The render-context guard: the dynamically scoped "currently rendering"
//! instance.
//!
//! While a component's `render` runs, markup tags and child instances built
//! inside it need to discover which instance is rendering so scoping tokens
//! can be stamped without threading a context parameter through every
//! constructor. The context is deliberately limited to the dynamic extent of
//! one render call: entering is guarded against re-entrancy, and the guard
//! resets the context on drop, including on failure paths.

use std::cell::RefCell;

use crate::instance::Instance;

thread_local! {
    static CURRENT: RefCell<Option<Instance>> = const { RefCell::new(None) };
}

/// RAII guard marking an instance as the active render context.
///
/// Only one instance may be current at a time; nested entry is a programming
/// error and asserts.
pub(crate) struct RenderGuard(());

impl RenderGuard {
    pub(crate) fn enter(instance: &Instance) -> Self {
        CURRENT.with(|current| {
            let mut current = current.borrow_mut();
            assert!(
                current.is_none(),
                "render re-entered while `{}` is already rendering",
                current
                    .as_ref()
                    .map_or_else(String::new, |active| active.component_type().name().to_owned())
            );
            *current = Some(instance.clone());
        });
        Self(())
    }
}

impl Drop for RenderGuard {
    fn drop(&mut self) {
        CURRENT.with(|current| current.borrow_mut().take());
    }
}

/// Returns the instance currently rendering, if any.
#[must_use]
pub fn current() -> Option<Instance> {
    CURRENT.with(|current| current.borrow().clone())
}
