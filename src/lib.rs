#![doc = include_str!("../README.md")]

pub mod tags;

#[doc(inline)]
pub use estuary_core::{
    AccessError, ComponentType, ConstructError, Element, HostEngine, HostNode, Instance,
    InstanceId, Module, NodeRef, Payload, Props, Schema, ScopeToken, Style, Tag, TypeBuilder,
    Value, create_root, props, reconcile, render_entry, replacement_scope,
    set_live_reload, set_strict_render_failures,
};

pub use estuary_router as router;

pub mod prelude {
    //! A collection of commonly used types and functions for easy
    //! importing.
    //!
    //! # Example
    //!
    //! ```rust
    //! use estuary::prelude::*;
    //!
    //! let schema = Schema::new().state("count", 0);
    //! ```

    pub use super::tags::*;
    pub use super::{
        ComponentType, Element, Instance, Props, Schema, Style, Tag, Value, create_root, props,
    };
    pub use crate::router::{navigate, route, router};
}
