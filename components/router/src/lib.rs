//! URL path routing for Estuary components.
//!
//! Paths are registered against component types with [`route`], matched by
//! the router component against the host's location, and changed at runtime
//! with [`navigate`], which pushes the new location into the host's history
//! state and re-renders every mounted router.
//!
//! The route table and the mounted-router registry live in the execution
//! context, matching the runtime's single-context concurrency model.

pub mod tree;

use std::cell::RefCell;
use std::collections::BTreeMap;

use anyhow::Context as _;

use estuary_core::{
    ComponentType, ConstructError, Element, Instance, InstanceId, Props, host,
};

#[doc(inline)]
pub use tree::{Matched, RouteError, RouteTree};

thread_local! {
    static ROUTES: RefCell<RouteTree<ComponentType>> = RefCell::new(RouteTree::new());
    static ROUTERS: RefCell<BTreeMap<InstanceId, Instance>> = RefCell::new(BTreeMap::new());
    static ROUTER_TYPE: RefCell<Option<ComponentType>> = const { RefCell::new(None) };
}

/// Registers `component` at `path` in the route table.
///
/// # Errors
///
/// Fails with [`RouteError::Conflict`] when the path is already registered
/// outside a reload-replacement scope.
pub fn route(path: &str, component: &ComponentType) -> Result<(), RouteError> {
    ROUTES.with(|routes| routes.borrow_mut().insert(path, component.clone()))
}

/// Runs `f` with read access to the route table, e.g. to enumerate
/// registered paths for an external registrar.
pub fn with_routes<R>(f: impl FnOnce(&RouteTree<ComponentType>) -> R) -> R {
    ROUTES.with(|routes| f(&routes.borrow()))
}

/// Pushes `path` into the host's location state and re-renders every
/// mounted router.
pub fn navigate(path: &str) {
    if let Some(engine) = host::engine() {
        engine.push_location(path);
    }
    let mounted: Vec<Instance> =
        ROUTERS.with(|routers| routers.borrow().values().cloned().collect());
    tracing::debug!(path, routers = mounted.len(), "navigating");
    for router in mounted {
        router.request_update();
    }
}

/// Returns the router component type, building it on first use.
///
/// The router matches the host's current location against the route table
/// on every render. A matched component type is instantiated once and
/// cached until the match resolves to a different type, so navigating
/// between two paths handled by the same component keeps its instance
/// alive. An unmatched location renders a textual placeholder.
pub fn router_type() -> ComponentType {
    ROUTER_TYPE.with(|cached| {
        cached
            .borrow_mut()
            .get_or_insert_with(build_router_type)
            .clone()
    })
}

/// Creates a router instance.
///
/// # Errors
///
/// Fails when instance construction fails; the router declares no props, so
/// this only happens through construction redirection layers.
pub fn router() -> Result<Instance, ConstructError> {
    router_type().create(Props::new(), Vec::new(), "")
}

fn build_router_type() -> ComponentType {
    ComponentType::builder("estuary::router", "Router")
        .render(|router: &Instance| {
            let engine = host::engine().context("no host engine installed")?;
            let path = engine.location_path();

            let target = ROUTES.with(|routes| {
                routes
                    .borrow()
                    .match_path(&path)
                    .map(|matched| matched.item.clone())
            });
            let Some(target) = target else {
                router.clear_delegate();
                return Ok(Element::Text(format!("Unmatched path {path}")));
            };

            if let Some((ty, instance)) = router.delegate() {
                if ComponentType::same(&ty, &target) {
                    return Ok(Element::Component(instance));
                }
            }
            let instance = target.create(Props::new(), Vec::new(), "")?;
            router.set_delegate(target, instance.clone());
            Ok(Element::Component(instance))
        })
        .on_load(|router: &Instance| {
            ROUTERS.with(|routers| {
                routers
                    .borrow_mut()
                    .insert(router.id(), router.clone());
            });
        })
        .on_unload(|router: &Instance| {
            ROUTERS.with(|routers| {
                routers.borrow_mut().remove(&router.id());
            });
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_registers_path() {
        let page = ComponentType::builder("tests", "Page")
            .render(|_| Ok(Element::Text("page".to_owned())))
            .build();
        route("/pages/:id", &page).unwrap();
        assert_eq!(
            route("/pages/:id", &page),
            Err(RouteError::Conflict {
                path: "/pages/:id".to_owned()
            })
        );
        with_routes(|routes| {
            let matched = routes.match_path("/pages/7").unwrap();
            assert!(ComponentType::same(matched.item, &page));
            assert_eq!(matched.params, ["7"]);
        });
    }

    #[test]
    fn test_router_type_memoized() {
        assert!(ComponentType::same(&router_type(), &router_type()));
    }
}
