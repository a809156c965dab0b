//! Component types: named, statically declared shapes built from a schema.
//!
//! A component type is created once, at definition time, through
//! [`ComponentType::builder`]. Building compiles the schema into the fixed
//! accessor table, assigns the process-lifetime scoping token, and — when a
//! host engine is installed and the type declares styles — compiles and
//! installs the type's stylesheet keyed by that token.
//!
//! Instances are created with [`ComponentType::create`], which validates the
//! supplied props against the declared contract and, when live reload is
//! enabled, transparently redirects construction through the type's
//! hot-reload wrapper.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::context;
use crate::element::Element;
use crate::error::ConstructError;
use crate::host;
use crate::impl_debug;
use crate::instance::Instance;
use crate::reload;
use crate::schema::{AccessorTable, Schema};
use crate::scope::ScopeToken;
use crate::style::{self, Style};
use crate::value::Value;

/// A prop map supplied to [`ComponentType::create`].
pub type Props = BTreeMap<String, Value>;

/// The render closure of a component type.
pub type RenderFn = Rc<dyn Fn(&Instance) -> anyhow::Result<Element>>;

/// A lifecycle hook closure.
pub type HookFn = Rc<dyn Fn(&Instance)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TypeKind {
    /// An ordinary authored component.
    User,
    /// A synthesized hot-reload wrapper; construction is never redirected.
    Wrapper,
}

pub(crate) struct TypeShared {
    pub name: String,
    pub module: String,
    pub table: AccessorTable,
    pub render: RenderFn,
    pub on_load: Option<HookFn>,
    pub on_unload: Option<HookFn>,
    pub styles: Vec<Style>,
    pub token: ScopeToken,
    pub allow_unexpected_props: bool,
    pub propagate_render_failures: bool,
    pub kind: TypeKind,
}

/// A registered component type.
///
/// Cloning is cheap; clones share identity (see [`ComponentType::same`]).
#[derive(Clone)]
pub struct ComponentType(Rc<TypeShared>);

impl_debug!(ComponentType);

impl ComponentType {
    /// Starts building a component type.
    ///
    /// `module` is the module identity used by hot reload to find the
    /// type's replacement; `name` is the component name within it.
    #[must_use]
    pub fn builder(module: &str, name: &str) -> TypeBuilder {
        TypeBuilder {
            module: module.to_owned(),
            name: name.to_owned(),
            schema: Schema::new(),
            render: None,
            on_load: None,
            on_unload: None,
            styles: Vec::new(),
            allow_unexpected_props: false,
            propagate_render_failures: false,
            kind: TypeKind::User,
        }
    }

    /// Returns the component name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Returns the module identity the type was defined in.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.0.module
    }

    /// Returns the type's scoping token.
    #[must_use]
    pub fn token(&self) -> &ScopeToken {
        &self.0.token
    }

    /// Identity comparison: `true` when both refer to the same registered
    /// type.
    #[must_use]
    pub fn same(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// Returns whether render failures propagate for this type.
    #[must_use]
    pub fn propagate_render_failures(&self) -> bool {
        self.0.propagate_render_failures
    }

    pub(crate) fn shared(&self) -> &TypeShared {
        &self.0
    }

    /// Creates an instance of this type.
    ///
    /// `class` is a whitespace-separated list of extra class names merged
    /// into the instance's rendered output. If a parent render context is
    /// active, the new instance inherits the parent's scoping token as an
    /// implicit prop.
    ///
    /// # Errors
    ///
    /// Fails with [`ConstructError::UnexpectedProps`] when `props` contains
    /// keys the type does not declare (unless the type opts out), and with
    /// [`ConstructError::MissingProps`] when a declared-required key is
    /// absent.
    ///
    /// # Panics
    ///
    /// Panics when the inherited scoping token already exists on the props
    /// outside reload mode; a collision means the same token was minted
    /// twice, which is an invariant violation.
    pub fn create(
        &self,
        props: Props,
        children: Vec<Element>,
        class: &str,
    ) -> Result<Instance, ConstructError> {
        if reload::live_reload_enabled() && self.0.kind == TypeKind::User {
            return reload::wrapper_for(self).create(props, children, class);
        }

        if !self.0.allow_unexpected_props {
            let unknown: Vec<String> = props
                .keys()
                .filter(|key| !self.0.table.props_declared.contains(*key))
                .cloned()
                .collect();
            if !unknown.is_empty() {
                return Err(ConstructError::UnexpectedProps {
                    component: self.0.name.clone(),
                    keys: unknown,
                });
            }
        }

        let missing: Vec<String> = self
            .0
            .table
            .props_required
            .iter()
            .filter(|key| !props.contains_key(*key))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ConstructError::MissingProps {
                component: self.0.name.clone(),
                keys: missing,
            });
        }

        let classes = class.split_whitespace().map(str::to_owned).collect();
        let instance = Instance::raw(self.clone(), props, children, classes);

        if let Some(parent) = context::current() {
            let token = parent.scope();
            if !reload::live_reload_enabled() {
                assert!(
                    !instance.has_prop_key(token.as_str()),
                    "scoping token `{token}` already present on props of `{}`",
                    self.0.name
                );
            }
            instance.insert_prop(token.as_str(), Value::Text(String::new()));
            instance.set_parent_scope(Some(token));
        }

        Ok(instance)
    }
}

/// Builder for [`ComponentType`].
#[must_use]
pub struct TypeBuilder {
    module: String,
    name: String,
    schema: Schema,
    render: Option<RenderFn>,
    on_load: Option<HookFn>,
    on_unload: Option<HookFn>,
    styles: Vec<Style>,
    allow_unexpected_props: bool,
    propagate_render_failures: bool,
    kind: TypeKind,
}

impl_debug!(TypeBuilder);

impl TypeBuilder {
    /// Sets the declared schema.
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Sets the render closure.
    pub fn render(
        mut self,
        render: impl Fn(&Instance) -> anyhow::Result<Element> + 'static,
    ) -> Self {
        self.render = Some(Rc::new(render));
        self
    }

    /// Sets the hook invoked once per mount, after the instance's first
    /// paint is committed.
    pub fn on_load(mut self, hook: impl Fn(&Instance) + 'static) -> Self {
        self.on_load = Some(Rc::new(hook));
        self
    }

    /// Sets the hook invoked at unmount, before proxy handles are released.
    pub fn on_unload(mut self, hook: impl Fn(&Instance) + 'static) -> Self {
        self.on_unload = Some(Rc::new(hook));
        self
    }

    /// Appends a style unit.
    pub fn style(mut self, style: Style) -> Self {
        self.styles.push(style);
        self
    }

    /// Opts out of unexpected-prop validation.
    pub fn allow_unexpected_props(mut self) -> Self {
        self.allow_unexpected_props = true;
        self
    }

    /// Opts into propagating render failures instead of containing them.
    pub fn propagate_render_failures(mut self) -> Self {
        self.propagate_render_failures = true;
        self
    }

    pub(crate) fn kind(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Registers the component type.
    ///
    /// Compiles the accessor table, assigns the scoping token, and installs
    /// the type's stylesheet when a host engine is present.
    pub fn build(self) -> ComponentType {
        let table = AccessorTable::compile(&self.schema);
        let token = ScopeToken::generate();
        let name = self.name;
        let render = self.render.unwrap_or_else(|| {
            let name = name.clone();
            Rc::new(move |_: &Instance| {
                Err(anyhow::anyhow!("render is not implemented for `{name}`"))
            })
        });

        if !self.styles.is_empty() {
            if let Some(engine) = host::engine() {
                engine.install_style(&token, &style::compile(&self.styles, &token));
            }
        }

        ComponentType(Rc::new(TypeShared {
            name,
            module: self.module,
            table,
            render,
            on_load: self.on_load,
            on_unload: self.on_unload,
            styles: self.styles,
            token,
            allow_unexpected_props: self.allow_unexpected_props,
            propagate_render_failures: self.propagate_render_failures,
            kind: self.kind,
        }))
    }
}
