//! Style units: immutable selector + property-map values compiled to
//! attribute-scoped CSS rules.
//!
//! A component type declares zero or more style units. At type registration
//! the units are compiled against the type's scoping token, producing rules
//! of the form `selector[token] { key: value }` that match exactly the
//! markup produced by instances of that type (see the scoping notes in
//! [`crate::scope`]).

use crate::scope::ScopeToken;

/// An immutable CSS rule: a selector plus a property map.
///
/// Property keys are written in snake case and converted to kebab case, so
/// `font_size` becomes `font-size` in the compiled rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Style {
    selector: String,
    properties: Vec<(String, String)>,
}

impl Style {
    /// Creates a style unit for the given selector.
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            properties: Vec::new(),
        }
    }

    /// Adds a property to the rule, kebab-casing the key.
    #[must_use]
    pub fn property(mut self, key: &str, value: impl ToString) -> Self {
        self.properties
            .push((key.replace('_', "-"), value.to_string()));
        self
    }

    /// Returns the selector this unit applies to.
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Compiles the rule scoped by an attribute selector for `token`.
    #[must_use]
    pub fn to_css(&self, token: &ScopeToken) -> String {
        let properties = self
            .properties
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect::<Vec<_>>()
            .join(";");
        format!("{}[{token}] {{ {properties} }}", self.selector)
    }
}

/// Compiles a type's style units into one stylesheet body.
#[must_use]
pub fn compile(styles: &[Style], token: &ScopeToken) -> String {
    styles
        .iter()
        .map(|style| style.to_css(token))
        .collect::<Vec<_>>()
        .join("\n")
}
