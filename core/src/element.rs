//! The authored output model: a closed variant of everything `render` can
//! produce, plus the markup tag value type.
//!
//! The variant is resolved once at the projection boundary — there is no
//! duck typing downstream of a render call.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::context;
use crate::host::{HostNode, NodeRef};
use crate::instance::Instance;
use crate::value::Value;

/// An authored render output.
#[derive(Debug, Clone)]
pub enum Element {
    /// A nested component instance.
    Component(Instance),
    /// A markup tag.
    Tag(Tag),
    /// A raw host-native value, passed through projection unchanged.
    Native(HostNode),
    /// Plain text.
    Text(String),
}

impl From<Instance> for Element {
    fn from(instance: Instance) -> Self {
        Self::Component(instance)
    }
}

impl From<Tag> for Element {
    fn from(tag: Tag) -> Self {
        Self::Tag(tag)
    }
}

impl From<HostNode> for Element {
    fn from(node: HostNode) -> Self {
        Self::Native(node)
    }
}

impl From<&str> for Element {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Element {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// A markup tag: name, attributes, class set and children.
///
/// Tags built while a component instance is the active render context are
/// stamped with that instance's scoping token as an empty attribute, which
/// is what makes the type's compiled CSS match exactly the markup produced
/// during its renders.
#[derive(Debug, Clone)]
pub struct Tag {
    name: Rc<str>,
    void: bool,
    attrs: BTreeMap<String, Value>,
    classes: BTreeSet<String>,
    children: Vec<Element>,
}

impl Tag {
    /// Creates a tag.
    #[must_use]
    pub fn new(name: impl Into<Rc<str>>) -> Self {
        Self::build(name.into(), false)
    }

    /// Creates a void tag; void tags reject children.
    #[must_use]
    pub fn void(name: impl Into<Rc<str>>) -> Self {
        Self::build(name.into(), true)
    }

    fn build(name: Rc<str>, void: bool) -> Self {
        let mut attrs = BTreeMap::new();
        if let Some(active) = context::current() {
            attrs.insert(active.scope().as_str().to_owned(), Value::Text(String::new()));
        }
        Self {
            name,
            void,
            attrs,
            classes: BTreeSet::new(),
            children: Vec::new(),
        }
    }

    /// Sets an attribute.
    #[must_use]
    pub fn attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.to_owned(), value.into());
        self
    }

    /// Sets an empty attribute, projected to the host as `true`.
    #[must_use]
    pub fn flag(mut self, key: &str) -> Self {
        self.attrs.insert(key.to_owned(), Value::Null);
        self
    }

    /// Attaches a node reference, populated by the host at commit time.
    #[must_use]
    pub fn node_ref(self, handle: &NodeRef) -> Self {
        self.attr("ref", handle.clone())
    }

    /// Adds one class name.
    #[must_use]
    pub fn class_name(mut self, class: &str) -> Self {
        self.classes.insert(class.to_owned());
        self
    }

    /// Adds whitespace-separated class names.
    #[must_use]
    pub fn classes(mut self, classes: &str) -> Self {
        self.classes
            .extend(classes.split_whitespace().map(str::to_owned));
        self
    }

    /// Appends a child.
    ///
    /// # Panics
    ///
    /// Panics for void tags, which cannot have children.
    #[must_use]
    pub fn child(mut self, child: impl Into<Element>) -> Self {
        assert!(!self.void, "void tag <{}> cannot have children", self.name);
        self.children.push(child.into());
        self
    }

    /// Appends children.
    ///
    /// # Panics
    ///
    /// Panics for void tags, which cannot have children.
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        assert!(!self.void, "void tag <{}> cannot have children", self.name);
        self.children.extend(children);
        self
    }

    /// Returns the tag name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the attribute map.
    #[must_use]
    pub const fn attrs(&self) -> &BTreeMap<String, Value> {
        &self.attrs
    }

    /// Returns the class set.
    #[must_use]
    pub const fn class_set(&self) -> &BTreeSet<String> {
        &self.classes
    }

    /// Returns the children.
    #[must_use]
    pub fn child_elements(&self) -> &[Element] {
        &self.children
    }

    pub(crate) fn add_classes(&mut self, classes: impl IntoIterator<Item = String>) {
        self.classes.extend(classes);
    }

    pub(crate) fn set_attr(&mut self, key: &str, value: Value) {
        self.attrs.insert(key.to_owned(), value);
    }

    pub(crate) fn into_parts(self) -> (Rc<str>, BTreeMap<String, Value>, BTreeSet<String>, Vec<Element>) {
        (self.name, self.attrs, self.classes, self.children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_builder() {
        let tag = Tag::new("div")
            .attr("id", "root")
            .classes("a b")
            .child("text");
        assert_eq!(tag.name(), "div");
        assert_eq!(tag.attrs().get("id"), Some(&Value::from("root")));
        assert_eq!(tag.class_set().len(), 2);
        assert_eq!(tag.child_elements().len(), 1);
    }

    #[test]
    #[should_panic(expected = "cannot have children")]
    fn test_void_tag_rejects_children() {
        let _ = Tag::void("input").child("text");
    }

    #[test]
    fn test_tag_outside_render_context_is_unscoped() {
        let tag = Tag::new("span");
        assert!(tag.attrs().is_empty());
    }
}
