//! Element projection: converting authored render output into the foreign
//! engine's element-construction calls.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::element::Element;
use crate::handle::Payload;
use crate::host::{HostEngine, HostNode};
use crate::value::Value;

/// Projects an authored element into a host node.
///
/// Component outputs become a component element carrying the type's stable
/// render identity plus a freshly proxied payload; tag outputs become a
/// host element with camel-cased attributes and recursively projected
/// children; native host values and text pass through.
pub fn project(element: Element, engine: &Rc<dyn HostEngine>) -> HostNode {
    match element {
        Element::Text(text) => engine.text(&text),
        Element::Native(node) => node,
        Element::Component(instance) => {
            let classes = instance.classes();
            if !classes.is_empty() {
                instance.insert_prop(
                    "className",
                    Value::Text(classes.into_iter().collect::<Vec<_>>().join(" ")),
                );
            }
            let ty = instance.component_type();
            engine.component(&ty, Payload::new(instance))
        }
        Element::Tag(tag) => {
            let (name, attrs, classes, children) = tag.into_parts();
            let mut attrs = camel_case_attrs(attrs);
            if !classes.is_empty() {
                attrs.insert(
                    "className".to_owned(),
                    Value::Text(classes.into_iter().collect::<Vec<_>>().join(" ")),
                );
            }
            let children = children
                .into_iter()
                .map(|child| project(child, engine))
                .collect();
            engine.element(&name, attrs, children)
        }
    }
}

/// Camel-cases attribute keys and turns empty attributes into `true`.
fn camel_case_attrs(attrs: BTreeMap<String, Value>) -> BTreeMap<String, Value> {
    attrs
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Null => Value::Bool(true),
                other => other,
            };
            (to_camel_case(&key), value)
        })
        .collect()
}

/// Converts a snake-case key to camel case: `tab_index` becomes `tabIndex`.
#[must_use]
pub fn to_camel_case(key: &str) -> String {
    let mut parts = key.split('_');
    let mut camel = parts.next().unwrap_or_default().to_owned();
    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            camel.extend(first.to_uppercase());
            camel.push_str(chars.as_str());
        }
    }
    camel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("tab_index"), "tabIndex");
        assert_eq!(to_camel_case("aria_hidden_label"), "ariaHiddenLabel");
        assert_eq!(to_camel_case("ref"), "ref");
        assert_eq!(to_camel_case(""), "");
    }

    #[test]
    fn test_camel_case_attrs_null_becomes_true() {
        let mut attrs = BTreeMap::new();
        attrs.insert("disabled".to_owned(), Value::Null);
        attrs.insert("max_length".to_owned(), Value::from(3));
        let converted = camel_case_attrs(attrs);
        assert_eq!(converted.get("disabled"), Some(&Value::Bool(true)));
        assert_eq!(converted.get("maxLength"), Some(&Value::Int(3)));
    }
}
