//! End-to-end routing through the router component.

use std::cell::RefCell;
use std::rc::Rc;

use estuary::prelude::*;
use estuary::router::{self, with_routes};
use estuary::set_strict_render_failures;
use estuary_headless::HeadlessEngine;

fn engine() -> HeadlessEngine {
    let engine = HeadlessEngine::new();
    engine.install();
    set_strict_render_failures(true);
    engine
}

#[test]
fn test_literal_route_beats_parametrized() {
    let engine = engine();

    let detail_mounts = Rc::new(RefCell::new(0));
    let detail = ComponentType::builder("app", "ItemDetail")
        .on_load({
            let detail_mounts = detail_mounts.clone();
            move |_| *detail_mounts.borrow_mut() += 1
        })
        .render(|_| Ok(div().child("item detail").into()))
        .build();
    let create_form = ComponentType::builder("app", "ItemCreate")
        .render(|_| Ok(div().child("new item form").into()))
        .build();

    route("/items/:id", &detail).unwrap();
    route("/items/new", &create_form).unwrap();

    navigate("/items/new");
    let instance = router::router().unwrap();
    create_root(instance).unwrap();
    assert!(engine.markup().contains("new item form"));

    // The literal matched; the parametrized handler captures its segment.
    with_routes(|routes| {
        let matched = routes.match_path("/items/42").unwrap();
        assert_eq!(matched.params, ["42"]);
    });

    navigate("/items/42");
    engine.flush().unwrap();
    assert!(engine.markup().contains("item detail"));
    assert!(!engine.markup().contains("new item form"));
    assert_eq!(*detail_mounts.borrow(), 1);

    // Same handler type for another concrete id: the cached instance is
    // reused rather than remounted.
    navigate("/items/7");
    engine.flush().unwrap();
    assert!(engine.markup().contains("item detail"));
    assert_eq!(*detail_mounts.borrow(), 1);
}

#[test]
fn test_unmatched_path_renders_placeholder() {
    let engine = engine();

    let instance = router::router().unwrap();
    create_root(instance).unwrap();
    assert!(engine.markup().contains("Unmatched path /"));

    navigate("/nowhere/at/all");
    engine.flush().unwrap();
    assert!(engine.markup().contains("Unmatched path /nowhere/at/all"));
}

#[test]
fn test_navigate_updates_location_state() {
    let engine = engine();

    let home = ComponentType::builder("app", "Home")
        .render(|_| Ok(div().child("home").into()))
        .build();
    route("/", &home).unwrap();

    let instance = router::router().unwrap();
    create_root(instance).unwrap();
    assert!(engine.markup().contains("home"));

    navigate("/away");
    engine.flush().unwrap();
    assert_eq!(engine.location(), "/away");
}

#[test]
fn test_route_conflict_outside_reload() {
    let _engine = engine();

    let page = ComponentType::builder("app", "Page")
        .render(|_| Ok(div().into()))
        .build();
    route("/page", &page).unwrap();
    assert!(route("/page", &page).is_err());

    // Re-registration during module re-evaluation overwrites instead.
    estuary::replacement_scope(|| {
        route("/page", &page).unwrap();
    });
}
