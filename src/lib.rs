//! # BRRTRouter Dispatch
//!
//! The request-routing core of BRRTRouter: a segment trie that maps
//! `/`-delimited path patterns to handler chains, and a cooperative dispatch
//! chain in which every middleware decides whether, and when, the rest of the
//! chain runs.
//!
//! ## Overview
//!
//! - **[`router`]** - Pattern tokenizing, the per-method [`PathTrie`](router::PathTrie),
//!   route groups and the live [`SharedRouter`](router::SharedRouter)
//! - **[`dispatcher`]** - The [`Handler`](dispatcher::Handler) contract, the
//!   [`Chain`](dispatcher::Chain) cursor, request context and the
//!   [`Dispatcher`](dispatcher::Dispatcher)
//! - **[`middleware`]** - Recovery, tracing, metrics and request-id middleware
//! - **[`table`]** - Route tables loaded from YAML, TOML or JSON
//! - **[`runtime_config`]** and **[`logging`]** - `BRRTR_*` configuration and
//!   the `tracing` subscriber setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host as Host server
//!     participant Dispatcher
//!     participant Router as SharedRouter
//!     participant Recovery as RecoveryMiddleware
//!     participant Tracing as TracingMiddleware
//!     participant Handler as Route handler
//!
//!     Host->>Dispatcher: dispatch(Request GET /pets/123?full=1)
//!     Dispatcher->>Router: resolve(GET, "/pets/123")
//!     Router-->>Dispatcher: Match(/pets/:id, {id: "123"})
//!     Dispatcher->>Recovery: chain.advance(ctx)
//!     Recovery->>Tracing: chain.advance(ctx)
//!     Tracing->>Handler: chain.advance(ctx)
//!     Handler-->>Tracing: Ok (response written)
//!     Tracing-->>Recovery: Ok (status + latency recorded)
//!     Recovery-->>Dispatcher: Ok
//!     Dispatcher-->>Host: HandlerResponse
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brrtrouter_dispatch::dispatcher::{endpoint, Dispatcher, HandlerResponse, Request};
//! use brrtrouter_dispatch::middleware::RecoveryMiddleware;
//! use brrtrouter_dispatch::router::Router;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let mut router = Router::new();
//! router.add_middleware(Arc::new(RecoveryMiddleware::new()));
//! router
//!     .get(
//!         "/pets/:id",
//!         endpoint("get_pet", |ctx| {
//!             let id = ctx.id()?.to_string();
//!             ctx.response = HandlerResponse::json(200, json!({ "id": id }));
//!             Ok(())
//!         }),
//!     )
//!     .unwrap();
//!
//! let dispatcher = Dispatcher::new(router);
//! let response = dispatcher.handle(Request::get("/pets/123"));
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body["id"], "123");
//! ```
//!
//! ## Matching Order
//!
//! Sibling segments are tried in the order they were first registered and the
//! first complete match wins; a parameter registered before a static sibling
//! shadows it. See [`router`] for the full rules.

pub mod cli;

pub mod dispatcher;
mod echo;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod table;

pub use dispatcher::{
    Chain, DispatchError, Dispatcher, Handler, HandlerError, HandlerResponse, HandlerResult,
    Request, RequestContext,
};
pub use echo::{echo, echo_handler};
pub use ids::RequestId;
pub use router::{PatternError, RouteLookup, Router, SharedRouter};
pub use runtime_config::RuntimeConfig;
pub use table::{HandlerRegistry, RouteSpec, RouteTable};
