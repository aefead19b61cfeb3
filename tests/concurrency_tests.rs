#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use brrtrouter_dispatch::dispatcher::{endpoint, Dispatcher, HandlerResponse, Request};
use brrtrouter_dispatch::middleware::{MetricsMiddleware, RecoveryMiddleware};
use brrtrouter_dispatch::router::{RouteLookup, Router, SharedRouter};
use brrtrouter_dispatch::runtime_config::RuntimeConfig;
use http::Method;
use serde_json::json;

fn item_handler() -> Arc<dyn brrtrouter_dispatch::dispatcher::Handler> {
    endpoint("get_item", |ctx| {
        let id = ctx.id()?.to_string();
        ctx.response = HandlerResponse::json(200, json!({ "id": id }));
        Ok(())
    })
}

#[test]
fn test_concurrent_dispatch_keeps_params_isolated() {
    let metrics = Arc::new(MetricsMiddleware::new());
    let mut router = Router::new();
    router.add_middleware(Arc::new(RecoveryMiddleware::new()));
    router.add_middleware(Arc::clone(&metrics) as _);
    router.get("/items/:id", item_handler()).unwrap();
    let dispatcher = Dispatcher::new(router);

    let workers: Vec<_> = (0..8)
        .map(|worker| {
            let d = dispatcher.clone();
            thread::spawn(move || {
                for i in 0..200 {
                    let id = format!("{worker}-{i}");
                    let resp = d.dispatch(Request::get(&format!("/items/{id}"))).unwrap();
                    assert_eq!(resp.status, 200);
                    assert_eq!(resp.body["id"], id);
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    assert_eq!(metrics.request_count(), 1600);
    assert_eq!(metrics.path_count("/items/:id"), 1600);
}

#[test]
fn test_routes_registered_while_readers_run() {
    let shared = Arc::new(SharedRouter::default());
    shared
        .register(Method::GET, "/stable", endpoint("stable", |_| Ok(())))
        .unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let lookups = Arc::new(AtomicUsize::new(0));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let shared = Arc::clone(&shared);
            let done = Arc::clone(&done);
            let lookups = Arc::clone(&lookups);
            thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    // the stable route never disappears mid-update
                    assert!(shared.resolve(&Method::GET, "/stable").is_match());
                    lookups.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    for i in 0..50 {
        shared
            .register(
                Method::GET,
                &format!("/dyn/{i}/:id"),
                endpoint("dyn", |_| Ok(())),
            )
            .unwrap();
    }
    done.store(true, Ordering::Release);
    for r in readers {
        r.join().unwrap();
    }

    let snapshot = shared.load();
    assert_eq!(snapshot.len(), 51);
    for i in 0..50 {
        let m = shared
            .resolve(&Method::GET, &format!("/dyn/{i}/x"))
            .into_match()
            .unwrap();
        assert_eq!(m.params.get("id"), Some("x"));
    }
}

#[test]
fn test_dispatcher_sees_routes_added_through_shared_handle() {
    let dispatcher = Dispatcher::new(Router::new());
    assert_eq!(dispatcher.handle(Request::get("/late")).status, 404);

    dispatcher
        .router()
        .register(
            Method::GET,
            "/late",
            endpoint("late", |ctx| {
                ctx.response = HandlerResponse::json(200, json!({ "late": true }));
                Ok(())
            }),
        )
        .unwrap();

    let clone = dispatcher.clone();
    let resp = thread::spawn(move || clone.handle(Request::get("/late")))
        .join()
        .unwrap();
    assert_eq!(resp.status, 200);
}

#[test]
fn test_snapshot_is_stable_across_replace() {
    let shared = Arc::new(SharedRouter::default());
    shared
        .register(Method::GET, "/old", endpoint("old", |_| Ok(())))
        .unwrap();
    let before = shared.load();

    let mut fresh = Router::new();
    fresh.get("/new", endpoint("new", |_| Ok(()))).unwrap();
    shared.replace(fresh);

    assert!(before.resolve(&Method::GET, "/old").is_match());
    assert!(matches!(
        shared.resolve(&Method::GET, "/old"),
        RouteLookup::NotFound
    ));
    assert!(shared.resolve(&Method::GET, "/new").is_match());

    let d = Dispatcher::from_shared(Arc::clone(&shared), RuntimeConfig::default());
    assert_eq!(d.handle(Request::get("/new")).status, 200);
}
