#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use brrtrouter_dispatch::dispatcher::{endpoint, Handler};
use brrtrouter_dispatch::router::{PatternError, RouteLookup, Router};
use http::Method;

fn h(name: &str) -> Arc<dyn Handler> {
    endpoint(name, |_ctx| Ok(()))
}

fn zoo_router() -> Router {
    let mut router = Router::new();
    router.get("/", h("root_handler")).unwrap();
    router.get("/zoo/animals", h("get_animals")).unwrap();
    router.post("/zoo/animals", h("create_animal")).unwrap();
    router.get("/zoo/animals/{id}", h("get_animal")).unwrap();
    router.put("/zoo/animals/{id}", h("update_animal")).unwrap();
    router.patch("/zoo/animals/{id}", h("patch_animal")).unwrap();
    router.delete("/zoo/animals/{id}", h("delete_animal")).unwrap();
    router.head("/zoo/health", h("health_check")).unwrap();
    router.options("/zoo/health", h("supported_ops")).unwrap();
    router
        .register(Method::TRACE, "/zoo/health", h("trace_route"))
        .unwrap();
    router.get("/zoo/files/*path", h("get_file")).unwrap();
    router
}

fn assert_route_match(router: &Router, method: Method, path: &str, expected_handler: &str) {
    match router.resolve(&method, path) {
        RouteLookup::Match(m) => assert_eq!(
            m.entry.name.as_ref(),
            expected_handler,
            "{method} {path} matched the wrong route"
        ),
        other => panic!("{method} {path}: expected {expected_handler}, got {other:?}"),
    }
}

#[test]
fn test_every_verb_routes_to_its_handler() {
    let router = zoo_router();
    let cases = [
        (Method::GET, "/", "root_handler"),
        (Method::GET, "/zoo/animals", "get_animals"),
        (Method::POST, "/zoo/animals", "create_animal"),
        (Method::GET, "/zoo/animals/123", "get_animal"),
        (Method::PUT, "/zoo/animals/123", "update_animal"),
        (Method::PATCH, "/zoo/animals/123", "patch_animal"),
        (Method::DELETE, "/zoo/animals/123", "delete_animal"),
        (Method::HEAD, "/zoo/health", "health_check"),
        (Method::OPTIONS, "/zoo/health", "supported_ops"),
        (Method::TRACE, "/zoo/health", "trace_route"),
        (Method::GET, "/zoo/files/a/b/c.png", "get_file"),
    ];
    for (method, path, expected) in cases {
        assert_route_match(&router, method, path, expected);
    }
}

#[test]
fn test_params_are_extracted() {
    let router = zoo_router();
    let m = router
        .resolve(&Method::GET, "/zoo/animals/tiger-7")
        .into_match()
        .unwrap();
    assert_eq!(m.params.get("id"), Some("tiger-7"));
    assert_eq!(m.pattern(), "/zoo/animals/{id}");
}

#[test]
fn test_unknown_paths_are_not_found() {
    let router = zoo_router();
    for path in ["/zoo", "/zoo/animals/1/extra", "/zoo/files", "/nothing"] {
        assert!(
            matches!(router.resolve(&Method::GET, path), RouteLookup::NotFound),
            "{path} should not match"
        );
    }
}

#[test]
fn test_method_mismatch_lists_allowed_methods() {
    let router = zoo_router();
    match router.resolve(&Method::POST, "/zoo/health") {
        RouteLookup::MethodNotAllowed { allowed } => {
            assert_eq!(allowed.header_value(), "HEAD, OPTIONS, TRACE");
        }
        other => panic!("expected MethodNotAllowed, got {other:?}"),
    }
}

#[test]
fn test_head_falls_back_to_get_route() {
    let router = zoo_router();
    assert_route_match(&router, Method::HEAD, "/zoo/animals/1", "get_animal");
}

#[test]
fn test_registration_order_decides_ties() {
    let mut shadowed = Router::new();
    shadowed.get("/users/:id", h("by_id")).unwrap();
    shadowed.get("/users/new", h("new_form")).unwrap();
    assert_route_match(&shadowed, Method::GET, "/users/new", "by_id");

    let mut ordered = Router::new();
    ordered.get("/users/new", h("new_form")).unwrap();
    ordered.get("/users/:id", h("by_id")).unwrap();
    assert_route_match(&ordered, Method::GET, "/users/new", "new_form");
    assert_route_match(&ordered, Method::GET, "/users/5", "by_id");
}

#[test]
fn test_catch_all_after_param_sibling() {
    let mut router = Router::new();
    router.get("/static/:file", h("single")).unwrap();
    router.get("/static/*rest", h("deep")).unwrap();
    assert_route_match(&router, Method::GET, "/static/app.js", "single");
    let m = router
        .resolve(&Method::GET, "/static/js/app.js")
        .into_match()
        .unwrap();
    assert_eq!(m.entry.name.as_ref(), "deep");
    assert_eq!(m.params.get("rest"), Some("js/app.js"));
}

#[test]
fn test_conflicting_catch_all_is_rejected() {
    let mut router = Router::new();
    router.get("/files/*path", h("a")).unwrap();
    let err = router.get("/files/*rest", h("b")).unwrap_err();
    assert!(matches!(err, PatternError::ConflictingCatchAll { .. }));
    assert_eq!(router.len(), 1);
    assert_route_match(&router, Method::GET, "/files/x", "a");
}

#[test]
fn test_malformed_patterns_fail_registration() {
    let mut router = Router::new();
    for pattern in ["nope", "/a/{id", "/a/:", "/a/*rest/b", "/a/:x/b/:x"] {
        assert!(router.get(pattern, h("x")).is_err(), "{pattern} should fail");
    }
    assert!(router.is_empty());
}

#[test]
fn test_routes_listing_and_patterns() {
    let router = zoo_router();
    assert_eq!(router.len(), 11);
    assert_eq!(router.routes()[0].pattern.as_ref(), "/");
    let patterns = router.get_all_path_patterns();
    assert_eq!(
        patterns,
        vec!["/", "/zoo/animals", "/zoo/animals/{id}", "/zoo/health", "/zoo/files/*path"]
    );
    router.dump_routes();
}

#[test]
fn test_groups_share_prefix_and_middleware() {
    let mut router = Router::new();
    {
        let mut api = router.group("/api");
        api.add_middleware(h("auth"));
        api.get("/pets/:id", h("get_pet")).unwrap();
        let mut v2 = api.group("/v2");
        v2.get("/pets/:id", h("get_pet_v2")).unwrap();
    }
    router.get("/health", h("health")).unwrap();

    assert_route_match(&router, Method::GET, "/api/pets/1", "get_pet");
    assert_route_match(&router, Method::GET, "/api/v2/pets/1", "get_pet_v2");

    let v2 = router
        .resolve(&Method::GET, "/api/v2/pets/1")
        .into_match()
        .unwrap();
    assert_eq!(v2.entry.chain.len(), 2);
    let health = router.resolve(&Method::GET, "/health").into_match().unwrap();
    assert_eq!(health.entry.chain.len(), 1);
}
