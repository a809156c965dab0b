//! End-to-end lifecycle tests driven through the headless engine.

use std::cell::RefCell;
use std::rc::Rc;

use estuary::prelude::*;
use estuary::{InstanceId, set_strict_render_failures};
use estuary_headless::HeadlessEngine;

fn engine() -> HeadlessEngine {
    let engine = HeadlessEngine::new();
    engine.install();
    engine
}

#[test]
fn test_mount_and_state_update() {
    let engine = engine();
    set_strict_render_failures(true);

    let counter = ComponentType::builder("app", "Counter")
        .schema(Schema::new().state("count", 0))
        .render(|cx| {
            let count = cx.state("count")?;
            Ok(div().child(format!("count: {count}")).into())
        })
        .build();

    let instance = counter.create(props! {}, Vec::new(), "").unwrap();
    create_root(instance.clone()).unwrap();

    assert!(engine.markup().contains("count: 0"));
    assert!(instance.is_mounted());

    instance.set_state("count", 3).unwrap();
    engine.flush().unwrap();
    assert!(engine.markup().contains("count: 3"));
}

#[test]
fn test_prop_replacement_preserves_child_identity() {
    let engine = engine();
    set_strict_render_failures(true);

    let mounted: Rc<RefCell<Vec<InstanceId>>> = Rc::new(RefCell::new(Vec::new()));

    let label = ComponentType::builder("app", "Label")
        .schema(Schema::new().prop("text"))
        .on_load({
            let mounted = mounted.clone();
            move |cx| mounted.borrow_mut().push(cx.id())
        })
        .render(|cx| {
            let text = cx.prop("text")?;
            Ok(span().child(text.to_string()).into())
        })
        .build();

    let inner = label.clone();
    let parent = ComponentType::builder("app", "Parent")
        .schema(Schema::new().state("text", "first"))
        .render(move |cx| {
            let text = cx.state("text")?;
            let child = inner.create(props! { "text" => text.to_string() }, Vec::new(), "")?;
            Ok(div().child(child).into())
        })
        .build();

    let instance = parent.create(props! {}, Vec::new(), "").unwrap();
    create_root(instance.clone()).unwrap();
    assert!(engine.markup().contains("first"));

    instance.set_state("text", "second").unwrap();
    engine.flush().unwrap();

    // New external input reached the child without reconstructing it.
    assert!(engine.markup().contains("second"));
    assert_eq!(mounted.borrow().len(), 1);
}

#[test]
fn test_unmount_releases_handles_once() {
    let engine = engine();
    set_strict_render_failures(true);

    let unloaded = Rc::new(RefCell::new(0));
    let child_slot: Rc<RefCell<Option<Instance>>> = Rc::new(RefCell::new(None));

    let child = ComponentType::builder("app", "Child")
        .on_load({
            let child_slot = child_slot.clone();
            move |cx| *child_slot.borrow_mut() = Some(cx.clone())
        })
        .on_unload({
            let unloaded = unloaded.clone();
            move |_| *unloaded.borrow_mut() += 1
        })
        .render(|_| Ok(span().child("child").into()))
        .build();

    let inner = child.clone();
    let parent = ComponentType::builder("app", "Parent")
        .schema(Schema::new().state("show", true))
        .render(move |cx| {
            let tag = if cx.state("show")? == Value::Bool(true) {
                div().child(inner.create(props! {}, Vec::new(), "")?)
            } else {
                div()
            };
            Ok(tag.into())
        })
        .build();

    let instance = parent.create(props! {}, Vec::new(), "").unwrap();
    create_root(instance.clone()).unwrap();
    let child_instance = child_slot.borrow().clone().unwrap();
    assert!(child_instance.is_mounted());

    instance.set_state("show", false).unwrap();
    engine.flush().unwrap();

    assert_eq!(*unloaded.borrow(), 1);
    assert!(!child_instance.is_mounted());
    assert!(!engine.markup().contains("child"));
}

#[test]
#[should_panic(expected = "released twice")]
fn test_double_unmount_is_a_contract_violation() {
    let engine = engine();
    set_strict_render_failures(true);

    let child_slot: Rc<RefCell<Option<Instance>>> = Rc::new(RefCell::new(None));
    let child = ComponentType::builder("app", "Child")
        .on_load({
            let child_slot = child_slot.clone();
            move |cx| *child_slot.borrow_mut() = Some(cx.clone())
        })
        .render(|_| Ok(span().child("child").into()))
        .build();

    let instance = child.create(props! {}, Vec::new(), "").unwrap();
    create_root(instance).unwrap();

    let child_instance = child_slot.borrow().clone().unwrap();
    engine.unmount_roots();
    assert!(!child_instance.is_mounted());

    // A second unmount must be detected, not silently accepted.
    child_instance.unmount();
}

#[test]
fn test_render_failure_is_contained() {
    let engine = engine();

    let broken = ComponentType::builder("app", "Broken")
        .render(|_| Err(anyhow::anyhow!("boom")))
        .build();

    let instance = broken.create(props! {}, Vec::new(), "").unwrap();
    create_root(instance).unwrap();

    assert!(engine.markup().contains("Error: boom"));
    assert_eq!(engine.reported_errors().len(), 1);
    assert!(engine.reported_errors()[0].contains("boom"));
}

#[test]
fn test_render_failure_propagates_in_strict_mode() {
    let _engine = engine();
    set_strict_render_failures(true);

    let broken = ComponentType::builder("app", "Broken")
        .render(|_| Err(anyhow::anyhow!("boom")))
        .build();

    let instance = broken.create(props! {}, Vec::new(), "").unwrap();
    assert!(create_root(instance).is_err());
}

#[test]
fn test_render_failure_propagates_when_type_opts_in() {
    let _engine = engine();

    let broken = ComponentType::builder("app", "Broken")
        .propagate_render_failures()
        .render(|_| Err(anyhow::anyhow!("boom")))
        .build();

    let instance = broken.create(props! {}, Vec::new(), "").unwrap();
    assert!(create_root(instance).is_err());
}

#[test]
fn test_host_native_output_passes_through() {
    let engine = engine();
    set_strict_render_failures(true);

    use estuary::HostEngine as _;
    let raw = engine.text("raw host node");
    let wrapper = ComponentType::builder("app", "Raw")
        .render(move |_| Ok(Element::Native(raw.clone())))
        .build();

    let instance = wrapper.create(props! {}, Vec::new(), "").unwrap();
    create_root(instance).unwrap();
    assert!(engine.markup().contains("raw host node"));
}

#[test]
fn test_children_render_through_parent() {
    let engine = engine();
    set_strict_render_failures(true);

    let list = ComponentType::builder("app", "List")
        .render(|cx| Ok(ul().children(cx.children()).into()))
        .build();

    let instance = list
        .create(
            props! {},
            vec![
                li().child("one").into(),
                li().child("two").into(),
            ],
            "",
        )
        .unwrap();
    create_root(instance).unwrap();

    let markup = engine.markup();
    assert!(markup.contains("<li"));
    assert!(markup.contains("one"));
    assert!(markup.contains("two"));
}
