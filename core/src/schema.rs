//! Component schemas: the declared shape of a component type.
//!
//! A schema is an explicit list of descriptors, one per declared state, prop
//! or ref key. It is processed exactly once, when the component type is
//! built, into a fixed accessor table; accessor reads and writes are then a
//! table lookup plus a small interpreter over the declared initializer —
//! there is no reflection and no dynamic attribute interception.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::impl_debug;
use crate::value::Value;

/// The future produced by an asynchronous state initializer.
pub type ValueFuture = LocalBoxFuture<'static, Value>;

/// How a declared state key obtains its first value.
#[derive(Clone)]
pub enum StateInit {
    /// A plain initial value.
    Value(Value),
    /// A zero-argument producer, evaluated at most once on first read.
    Compute(Rc<dyn Fn() -> Value>),
    /// An asynchronous producer. The first read stores a null placeholder,
    /// schedules the future on the host, and the resolved value arrives with
    /// an update request.
    Deferred(Rc<dyn Fn() -> ValueFuture>),
}

impl_debug!(StateInit);

/// How a declared prop key obtains a value when the caller omits it.
#[derive(Clone)]
pub enum PropDefault {
    /// A plain default value.
    Value(Value),
    /// A zero-argument producer, evaluated and cached on first read.
    Compute(Rc<dyn Fn() -> Value>),
    /// An asynchronous producer. Prop defaults must be synchronous, so
    /// reading a prop declared this way fails with
    /// [`AccessError::AsyncDefault`](crate::AccessError::AsyncDefault).
    Deferred(Rc<dyn Fn() -> ValueFuture>),
}

impl_debug!(PropDefault);

/// One declared key of a component type.
#[derive(Debug, Clone)]
pub enum Descriptor {
    /// A mutable state key with its initializer.
    State {
        /// The state key.
        key: String,
        /// The initializer evaluated on first read.
        init: StateInit,
    },
    /// A prop key; `default: None` marks the prop required.
    Prop {
        /// The prop key.
        key: String,
        /// The default applied when the caller omits the prop.
        default: Option<PropDefault>,
    },
    /// A ref key; the handle is created lazily per instance.
    Ref {
        /// The ref key.
        key: String,
    },
}

impl Descriptor {
    fn key(&self) -> &str {
        match self {
            Self::State { key, .. } | Self::Prop { key, .. } | Self::Ref { key } => key,
        }
    }
}

/// The declared shape of a component type: an ordered descriptor list.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    descriptors: Vec<Descriptor>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a state key with a plain initial value.
    #[must_use]
    pub fn state(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.descriptors.push(Descriptor::State {
            key: key.to_owned(),
            init: StateInit::Value(value.into()),
        });
        self
    }

    /// Declares a state key initialized by a producer on first read.
    #[must_use]
    pub fn state_with(mut self, key: &str, init: impl Fn() -> Value + 'static) -> Self {
        self.descriptors.push(Descriptor::State {
            key: key.to_owned(),
            init: StateInit::Compute(Rc::new(init)),
        });
        self
    }

    /// Declares a state key initialized by an asynchronous producer.
    #[must_use]
    pub fn state_async(mut self, key: &str, init: impl Fn() -> ValueFuture + 'static) -> Self {
        self.descriptors.push(Descriptor::State {
            key: key.to_owned(),
            init: StateInit::Deferred(Rc::new(init)),
        });
        self
    }

    /// Declares a required prop.
    #[must_use]
    pub fn prop(mut self, key: &str) -> Self {
        self.descriptors.push(Descriptor::Prop {
            key: key.to_owned(),
            default: None,
        });
        self
    }

    /// Declares a prop with a plain default value.
    #[must_use]
    pub fn prop_or(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.descriptors.push(Descriptor::Prop {
            key: key.to_owned(),
            default: Some(PropDefault::Value(value.into())),
        });
        self
    }

    /// Declares a prop whose default is produced on first read.
    #[must_use]
    pub fn prop_or_else(mut self, key: &str, default: impl Fn() -> Value + 'static) -> Self {
        self.descriptors.push(Descriptor::Prop {
            key: key.to_owned(),
            default: Some(PropDefault::Compute(Rc::new(default))),
        });
        self
    }

    /// Declares a prop with an asynchronous default.
    ///
    /// Such a declaration is accepted here but rejected on first read, since
    /// prop defaults must resolve synchronously.
    #[must_use]
    pub fn prop_or_async(mut self, key: &str, default: impl Fn() -> ValueFuture + 'static) -> Self {
        self.descriptors.push(Descriptor::Prop {
            key: key.to_owned(),
            default: Some(PropDefault::Deferred(Rc::new(default))),
        });
        self
    }

    /// Declares a ref key.
    #[must_use]
    pub fn reference(mut self, key: &str) -> Self {
        self.descriptors.push(Descriptor::Ref {
            key: key.to_owned(),
        });
        self
    }

    /// Returns the declared descriptors in declaration order.
    #[must_use]
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }
}

/// The behavior attached to one declared key.
#[derive(Debug, Clone)]
pub(crate) enum Accessor {
    State(StateInit),
    Prop(Option<PropDefault>),
    Ref,
}

/// The fixed `{key → behavior}` table a schema compiles into.
#[derive(Debug, Clone, Default)]
pub(crate) struct AccessorTable {
    pub entries: BTreeMap<String, Accessor>,
    pub props_declared: BTreeSet<String>,
    pub props_required: BTreeSet<String>,
}

impl AccessorTable {
    /// Compiles a schema. Duplicate keys are a declaration error.
    pub(crate) fn compile(schema: &Schema) -> Self {
        let mut table = Self::default();
        for descriptor in schema.descriptors() {
            let key = descriptor.key().to_owned();
            assert!(
                !table.entries.contains_key(&key),
                "key `{key}` declared twice in component schema"
            );
            match descriptor {
                Descriptor::State { init, .. } => {
                    table.entries.insert(key, Accessor::State(init.clone()));
                }
                Descriptor::Prop { default, .. } => {
                    if default.is_none() {
                        table.props_required.insert(key.clone());
                    }
                    table.props_declared.insert(key.clone());
                    table.entries.insert(key, Accessor::Prop(default.clone()));
                }
                Descriptor::Ref { .. } => {
                    table.entries.insert(key, Accessor::Ref);
                }
            }
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_compiles_prop_sets() {
        let schema = Schema::new()
            .prop("title")
            .prop_or("count", 0)
            .state("loaded", false)
            .reference("el");
        let table = AccessorTable::compile(&schema);
        assert_eq!(
            table.props_declared.iter().collect::<Vec<_>>(),
            ["count", "title"]
        );
        assert_eq!(table.props_required.iter().collect::<Vec<_>>(), ["title"]);
        assert_eq!(table.entries.len(), 4);
    }

    #[test]
    #[should_panic(expected = "declared twice")]
    fn test_schema_rejects_duplicate_keys() {
        let schema = Schema::new().state("x", 1).prop("x");
        let _ = AccessorTable::compile(&schema);
    }
}
