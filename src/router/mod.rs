//! # Router Module
//!
//! Path matching and route resolution for BRRTRouter services.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Tokenizing route patterns into static, parameter and catch-all segments
//! - Storing patterns in a segment trie, one trie per HTTP method
//! - Matching request paths and binding path parameters
//! - Assembling each route's handler chain at registration time
//!
//! ## Matching rules
//!
//! Children are tried in the order they were first inserted. The first
//! registered pattern that can consume the whole path wins; static segments
//! get no priority over parameters. Register `/users/new` before
//! `/users/:id` if both must be reachable.
//!
//! A catch-all consumes every remaining part (at least one) and ends the
//! walk. Interior nodes never match: `/users/1` does not match a table that
//! only holds `/users/:id/posts`.
//!
//! ## Example
//!
//! ```rust
//! use brrtrouter_dispatch::dispatcher::endpoint;
//! use brrtrouter_dispatch::router::{RouteLookup, Router};
//! use http::Method;
//!
//! let mut router = Router::new();
//! router
//!     .get("/pets/:id", endpoint("get_pet", |_ctx| Ok(())))
//!     .unwrap();
//!
//! match router.resolve(&Method::GET, "/pets/123") {
//!     RouteLookup::Match(m) => assert_eq!(m.params.get("id"), Some("123")),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

mod core;
mod group;
mod params;
mod pattern;
mod shared;
mod trie;

pub use core::{
    AllowedMethods, RouteEntry, RouteLookup, RouteMatch, Router, DEFAULT_SLOW_MATCH_THRESHOLD,
};
pub use group::RouteGroup;
pub use params::{ParamError, ParamVec, Params, ID_KEYS, MAX_INLINE_PARAMS};
pub use pattern::{
    parse_pattern, split_path, PathParts, PatternError, PatternPart, Segment, MAX_INLINE_SEGMENTS,
};
pub use shared::SharedRouter;
pub use trie::{NodeId, ParamSlot, PathTrie, TrieMatch, TrieNode};
