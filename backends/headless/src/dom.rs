//! The headless document model: realized nodes and markup serialization.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use estuary_core::{ComponentType, HostNode, NodeRef, Payload, Value};

/// A realized headless node, stored inside a [`HostNode`].
pub(crate) enum Node {
    /// A text node.
    Text(String),
    /// A markup element.
    Element(ElementNode),
    /// A component position driven through the render entry point.
    Component(Rc<ComponentCell>),
}

pub(crate) struct ElementNode {
    pub name: String,
    pub attrs: BTreeMap<String, Value>,
    pub node_ref: Option<NodeRef>,
    pub children: Vec<HostNode>,
}

/// Engine-side storage for one component position.
pub(crate) struct ComponentCell {
    /// The stable render identity used for slot reuse during
    /// reconciliation.
    pub ty: ComponentType,
    /// The opaque payload carried through reconciliation.
    pub payload: Payload,
    /// The slot assigned at mount, transplanted between cells of the same
    /// type at the same position.
    pub slot: RefCell<Option<Rc<crate::SlotCell>>>,
    /// The currently committed subtree.
    pub rendered: RefCell<Option<HostNode>>,
}

/// Serializes a committed node into markup for test assertions.
///
/// Attribute values follow the shape the host would paint: `true` renders
/// as a bare attribute, text values are quoted, numbers are bare.
pub(crate) fn serialize(node: &HostNode, out: &mut String) {
    let Some(node) = node.downcast_ref::<Node>() else {
        return;
    };
    match node {
        Node::Text(text) => out.push_str(text),
        Node::Element(element) => {
            out.push('<');
            out.push_str(&element.name);
            for (key, value) in &element.attrs {
                match value {
                    Value::Bool(true) => {
                        out.push(' ');
                        out.push_str(key);
                    }
                    Value::Text(text) => {
                        out.push_str(&format!(" {key}=\"{text}\""));
                    }
                    other => {
                        out.push_str(&format!(" {key}={other}"));
                    }
                }
            }
            out.push('>');
            for child in &element.children {
                serialize(child, out);
            }
            out.push_str(&format!("</{}>", element.name));
        }
        Node::Component(cell) => {
            let rendered = cell.rendered.borrow().clone();
            if let Some(subtree) = rendered {
                serialize(&subtree, out);
            }
        }
    }
}
