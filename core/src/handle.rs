//! Cross-runtime proxy handles with a single-owner create/release contract.
//!
//! The host renderer holds opaque references into the authoring runtime (the
//! instance itself, its load and unload triggers) and the authoring runtime
//! holds a reference to the host's props wrapper. Each of these is modeled
//! as an explicit handle with exactly one releaser. Releasing twice, or
//! using a handle after release, indicates a double-unmount or a
//! use-after-free and is a fatal programming error rather than a
//! recoverable one.

use std::cell::RefCell;
use std::rc::Rc;

use core::fmt;

use crate::instance::Instance;

/// An owned cross-runtime reference with an explicit release step.
///
/// The handle is created around a clonable target; [`ProxyHandle::get`]
/// hands out clones until [`ProxyHandle::release`] drops the target.
pub struct ProxyHandle<T: Clone> {
    target: RefCell<Option<T>>,
    label: &'static str,
}

impl<T: Clone> ProxyHandle<T> {
    /// Wraps `target` in a new handle. `label` names the handle in
    /// violation messages.
    #[must_use]
    pub fn new(target: T, label: &'static str) -> Self {
        Self {
            target: RefCell::new(Some(target)),
            label,
        }
    }

    /// Returns a clone of the target.
    ///
    /// # Panics
    ///
    /// Panics if the handle was already released; a released handle must
    /// never be used again.
    #[must_use]
    pub fn get(&self) -> T {
        self.target.borrow().clone().unwrap_or_else(|| {
            panic!("proxy handle `{}` used after release", self.label)
        })
    }

    /// Releases the handle, dropping the target.
    ///
    /// # Panics
    ///
    /// Panics if the handle was already released; a second release means a
    /// double-unmount.
    pub fn release(&self) {
        let released = self.target.borrow_mut().take();
        assert!(
            released.is_some(),
            "proxy handle `{}` released twice",
            self.label
        );
    }

    /// Returns `true` once the handle has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.target.borrow().is_none()
    }
}

impl<T: Clone> fmt::Debug for ProxyHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyHandle")
            .field("label", &self.label)
            .field("released", &self.is_released())
            .finish()
    }
}

/// The props wrapper: the opaque payload the host threads through its own
/// reconciliation and hands back to the render entry point.
///
/// A payload proxies the instance produced by the parent's render pass.
/// Payloads compare by identity; the lifecycle adopts an incoming payload
/// whenever it differs from the one currently held, releasing the old one.
#[derive(Clone)]
pub struct Payload(Rc<PayloadShared>);

struct PayloadShared {
    instance: ProxyHandle<Instance>,
}

impl Payload {
    /// Proxies `instance` into a new payload.
    #[must_use]
    pub fn new(instance: Instance) -> Self {
        Self(Rc::new(PayloadShared {
            instance: ProxyHandle::new(instance, "props wrapper"),
        }))
    }

    /// Returns the proxied instance.
    ///
    /// # Panics
    ///
    /// Panics if the payload has been released.
    #[must_use]
    pub fn instance(&self) -> Instance {
        self.0.instance.get()
    }

    /// Releases the payload's instance proxy.
    ///
    /// # Panics
    ///
    /// Panics on double release.
    pub fn release(&self) {
        self.0.instance.release();
    }

    /// Returns `true` once the payload has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.0.instance.is_released()
    }

    /// Identity comparison: `true` when both refer to the same payload.
    #[must_use]
    pub fn same(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_get_and_release() {
        let handle = ProxyHandle::new(7, "seven");
        assert_eq!(handle.get(), 7);
        assert!(!handle.is_released());
        handle.release();
        assert!(handle.is_released());
    }

    #[test]
    #[should_panic(expected = "released twice")]
    fn test_handle_double_release() {
        let handle = ProxyHandle::new(7, "seven");
        handle.release();
        handle.release();
    }

    #[test]
    #[should_panic(expected = "used after release")]
    fn test_handle_use_after_release() {
        let handle = ProxyHandle::new(7, "seven");
        handle.release();
        let _ = handle.get();
    }
}
