//! Core component model and lifecycle runtime for Estuary.
//!
//! Estuary lets component trees, written once against this component model,
//! be rendered by a foreign UI rendering engine — a host that owns the
//! actual document and paint pipeline — while the authoring side keeps
//! composable state, props, refs and CSS scoping.
//!
//! This crate contains the reactivity core: component schemas compiled into
//! accessor tables, component types and instances, the render-context
//! guard, proxy-handle ownership, element projection, the lifecycle state
//! machine bridging instances to the host's reconciliation, and the
//! hot-reload wrapper mechanism. Concrete renderers implement
//! [`HostEngine`]; see the `estuary-headless` backend for the in-process
//! engine used by the test suite.

#[macro_use]
mod macros;

pub mod component;
pub mod context;
pub mod element;
pub mod error;
pub mod handle;
pub mod host;
pub mod lifecycle;
pub mod project;
pub mod reload;
pub mod schema;
pub mod scope;
pub mod style;
pub mod value;

mod instance;

#[doc(inline)]
pub use component::{ComponentType, Props, TypeBuilder};
#[doc(inline)]
pub use element::{Element, Tag};
#[doc(inline)]
pub use error::{AccessError, ConstructError};
#[doc(inline)]
pub use handle::{Payload, ProxyHandle};
#[doc(inline)]
pub use host::{HostEngine, HostNode, MountEffect, NodeRef, Slot};
#[doc(inline)]
pub use instance::{Instance, InstanceId};
#[doc(inline)]
pub use lifecycle::{create_root, render_entry, set_strict_render_failures};
#[doc(inline)]
pub use reload::{Module, reconcile, replacement_scope, set_live_reload};
#[doc(inline)]
pub use schema::Schema;
#[doc(inline)]
pub use scope::ScopeToken;
#[doc(inline)]
pub use style::Style;
#[doc(inline)]
pub use value::Value;
