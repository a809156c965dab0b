//! CSS scoping and ref population, observed through the headless document.

use std::cell::RefCell;
use std::rc::Rc;

use estuary::prelude::*;
use estuary::set_strict_render_failures;
use estuary_headless::HeadlessEngine;

fn engine() -> HeadlessEngine {
    let engine = HeadlessEngine::new();
    engine.install();
    set_strict_render_failures(true);
    engine
}

#[test]
fn test_style_compiled_and_scoped_to_markup() {
    let engine = engine();

    let styled = ComponentType::builder("app", "Styled")
        .style(Style::new(".accent").property("color", "red"))
        .render(|_| Ok(div().child(span().classes("accent").child("x")).into()))
        .build();

    let token = styled.token().clone();
    let css = engine.styles().get(token.as_str()).cloned().unwrap();
    assert_eq!(css, format!(".accent[{token}] {{ color: red }}"));

    let instance = styled.create(props! {}, Vec::new(), "").unwrap();
    create_root(instance).unwrap();

    // Every tag built during the render carries the type's token, so the
    // compiled selector matches exactly this markup.
    let markup = engine.markup();
    assert!(markup.contains(&format!("<div {token}=\"\"")));
    assert!(markup.contains("className=\"accent\""));
    assert_eq!(markup.matches(&format!("{token}=\"\"")).count(), 2);
}

#[test]
fn test_parent_scope_reaches_child_markup() {
    let engine = engine();

    let child = ComponentType::builder("app", "Child")
        .render(|_| Ok(span().child("inner").into()))
        .build();

    let inner = child.clone();
    let parent = ComponentType::builder("app", "Parent")
        .style(Style::new("span").property("font_weight", "bold"))
        .render(move |_| {
            let child = inner.create(props! {}, Vec::new(), "")?;
            Ok(div().child(child).into())
        })
        .build();

    let parent_token = parent.token().clone();
    let instance = parent.create(props! {}, Vec::new(), "").unwrap();
    create_root(instance).unwrap();

    // The child's outermost output is stamped with the parent's token, so
    // parent CSS scoping rules reach nested markup.
    let markup = engine.markup();
    assert!(markup.contains(&format!("<span {parent_token}=\"\"")));
}

#[test]
fn test_instance_classes_merge_into_output() {
    let engine = engine();

    let chip = ComponentType::builder("app", "Chip")
        .render(|_| Ok(div().class_name("chip").child("x").into()))
        .build();

    let instance = chip.create(props! {}, Vec::new(), "pill wide").unwrap();
    create_root(instance).unwrap();

    assert!(engine.markup().contains("className=\"chip pill wide\""));
}

#[test]
fn test_empty_attribute_projects_as_true() {
    let engine = engine();

    let field = ComponentType::builder("app", "Field")
        .render(|_| {
            Ok(div()
                .child(input().flag("disabled").attr("tab_index", 3))
                .into())
        })
        .build();

    let instance = field.create(props! {}, Vec::new(), "").unwrap();
    create_root(instance).unwrap();

    let markup = engine.markup();
    assert!(markup.contains("<input"));
    assert!(markup.contains(" disabled"));
    assert!(markup.contains("tabIndex=3"));
}

#[test]
fn test_refs_populated_before_load() {
    let _engine = engine();

    let attached = Rc::new(RefCell::new(false));

    let form = ComponentType::builder("app", "Form")
        .schema(Schema::new().reference("el"))
        .on_load({
            let attached = attached.clone();
            move |cx| {
                let handle = cx.ref_handle("el").unwrap();
                *attached.borrow_mut() = handle.current().is_some();
            }
        })
        .render(|cx| {
            let handle = cx.ref_handle("el")?;
            Ok(div().child(input().node_ref(&handle)).into())
        })
        .build();

    let instance = form.create(props! {}, Vec::new(), "").unwrap();
    create_root(instance).unwrap();

    assert!(*attached.borrow());
}

#[test]
fn test_ref_passed_as_prop_to_child() {
    let _engine = engine();

    let seen = Rc::new(RefCell::new(false));

    let child = ComponentType::builder("app", "Child")
        .schema(Schema::new().prop("target"))
        .render(|cx| {
            let target = cx.prop("target")?;
            let handle = target.as_ref_handle().cloned().unwrap();
            Ok(span().node_ref(&handle).child("test").into())
        })
        .build();

    let inner = child.clone();
    let app = ComponentType::builder("app", "App")
        .schema(Schema::new().reference("el_child"))
        .on_load({
            let seen = seen.clone();
            move |cx| {
                let handle = cx.ref_handle("el_child").unwrap();
                *seen.borrow_mut() = handle.current().is_some();
            }
        })
        .render(move |cx| {
            let handle = cx.ref_handle("el_child")?;
            let child = inner.create(props! { "target" => handle }, Vec::new(), "")?;
            Ok(div().child(child).into())
        })
        .build();

    let instance = app.create(props! {}, Vec::new(), "").unwrap();
    create_root(instance).unwrap();

    assert!(*seen.borrow());
}
