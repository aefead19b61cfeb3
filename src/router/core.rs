//! Router core - per-method path tries and route resolution.
//!
//! Every registered route owns its full handler chain, built once at
//! registration: global middleware, then group middleware, then the route's
//! own handlers. Resolution never allocates a chain; it hands out the stored
//! `Arc<RouteEntry>`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Method;
use tracing::{debug, info, warn};

use super::group::RouteGroup;
use super::params::Params;
use super::pattern::PatternError;
use super::trie::PathTrie;
use crate::dispatcher::{Handler, HandlerChain};
use crate::runtime_config::RuntimeConfig;

/// Default threshold above which a single resolution is logged as slow.
pub const DEFAULT_SLOW_MATCH_THRESHOLD: Duration = Duration::from_millis(1);

/// A registered route: method, pattern and the complete handler chain.
pub struct RouteEntry {
    pub method: Method,
    pub pattern: Arc<str>,
    /// Name of the terminal handler, used in logs and route dumps.
    pub name: Arc<str>,
    pub chain: HandlerChain,
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("name", &self.name)
            .field("chain_len", &self.chain.len())
            .finish()
    }
}

/// Result of successfully matching a request path to a route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub entry: Arc<RouteEntry>,
    /// Path parameters extracted from the URL, in path order.
    pub params: Params,
}

impl RouteMatch {
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.entry.pattern
    }

    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }
}

/// Outcome of [`Router::resolve`].
#[derive(Debug)]
pub enum RouteLookup {
    Match(RouteMatch),
    /// The path exists under other methods.
    MethodNotAllowed { allowed: AllowedMethods },
    NotFound,
}

impl RouteLookup {
    #[must_use]
    pub fn is_match(&self) -> bool {
        matches!(self, RouteLookup::Match(_))
    }

    /// Consume the lookup, keeping only a successful match.
    #[must_use]
    pub fn into_match(self) -> Option<RouteMatch> {
        match self {
            RouteLookup::Match(m) => Some(m),
            _ => None,
        }
    }
}

/// Methods registered for a path, normalized for an `Allow` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedMethods {
    methods: Vec<Method>,
}

impl AllowedMethods {
    /// Sorts, de-duplicates, and adds `HEAD` whenever `GET` is present.
    #[must_use]
    pub fn new(methods: Vec<Method>) -> Self {
        Self::with_implicit_head(methods, true)
    }

    /// Like [`new`](Self::new); `HEAD` is only implied by `GET` when
    /// `implicit_head` is set, matching the router's HEAD fallback.
    #[must_use]
    pub fn with_implicit_head(mut methods: Vec<Method>, implicit_head: bool) -> Self {
        if implicit_head && methods.contains(&Method::GET) && !methods.contains(&Method::HEAD) {
            methods.push(Method::HEAD);
        }
        methods.sort_by(|a, b| {
            method_order(a)
                .cmp(&method_order(b))
                .then_with(|| a.as_str().cmp(b.as_str()))
        });
        methods.dedup();
        Self { methods }
    }

    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    #[must_use]
    pub fn contains(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// Format as an HTTP `Allow` header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        self.methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn method_order(method: &Method) -> u8 {
    match *method {
        Method::GET => 0,
        Method::HEAD => 1,
        Method::POST => 2,
        Method::PUT => 3,
        Method::DELETE => 4,
        Method::PATCH => 5,
        Method::OPTIONS => 6,
        Method::TRACE => 7,
        _ => 8,
    }
}

/// Router matching requests to handler chains through one [`PathTrie`] per
/// HTTP method.
///
/// # Performance
///
/// - Route matching: O(k) in the number of path segments for static routes
/// - Shared prefixes are stored once per method
/// - Resolution clones one `Arc` and the bound parameter values, nothing else
#[derive(Clone)]
pub struct Router {
    trees: HashMap<Method, PathTrie<Arc<RouteEntry>>>,
    entries: Vec<Arc<RouteEntry>>,
    middleware: Vec<Arc<dyn Handler>>,
    head_fallback: bool,
    slow_match_threshold: Duration,
}

impl Default for Router {
    fn default() -> Self {
        Self {
            trees: HashMap::new(),
            entries: Vec::new(),
            middleware: Vec::new(),
            head_fallback: true,
            slow_match_threshold: DEFAULT_SLOW_MATCH_THRESHOLD,
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.entries)
            .field("middleware", &self.middleware.len())
            .field("head_fallback", &self.head_fallback)
            .field("slow_match_threshold", &self.slow_match_threshold)
            .finish()
    }
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Router with resolution settings taken from `config`.
    #[must_use]
    pub fn with_config(config: &RuntimeConfig) -> Self {
        let mut router = Self::default();
        router.configure(config);
        router
    }

    /// Apply resolution settings without touching registered routes.
    pub fn configure(&mut self, config: &RuntimeConfig) {
        self.head_fallback = config.head_fallback;
        self.slow_match_threshold = config.slow_match_threshold();
    }

    /// Install global middleware.
    ///
    /// Chains are assembled at registration, so middleware added here only
    /// reaches routes registered afterwards.
    pub fn add_middleware(&mut self, middleware: Arc<dyn Handler>) {
        if !self.entries.is_empty() {
            warn!(
                middleware = middleware.name(),
                routes_count = self.entries.len(),
                "Middleware installed after routes - existing routes keep their chains"
            );
        }
        self.middleware.push(middleware);
    }

    #[must_use]
    pub fn middleware(&self) -> &[Arc<dyn Handler>] {
        &self.middleware
    }

    /// Register `handler` for `method` and `pattern` behind the global middleware.
    ///
    /// # Errors
    ///
    /// [`PatternError`] when the pattern is malformed or conflicts with an
    /// existing catch-all.
    pub fn register(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<(), PatternError> {
        self.register_with(method, pattern, &[], vec![handler])
    }

    /// Register a route whose chain is global middleware, then `middleware`,
    /// then `handlers`.
    ///
    /// Re-registering the same method and pattern replaces the previous
    /// route in place.
    pub fn register_with(
        &mut self,
        method: Method,
        pattern: &str,
        middleware: &[Arc<dyn Handler>],
        handlers: Vec<Arc<dyn Handler>>,
    ) -> Result<(), PatternError> {
        let name: Arc<str> = handlers
            .last()
            .map_or_else(|| Arc::from("<empty>"), |h| Arc::from(h.name()));
        let chain: HandlerChain = self
            .middleware
            .iter()
            .chain(middleware.iter())
            .cloned()
            .chain(handlers)
            .collect();
        let entry = Arc::new(RouteEntry {
            method: method.clone(),
            pattern: Arc::from(pattern),
            name,
            chain,
        });

        let tree = self.trees.entry(method.clone()).or_default();
        let replaced = tree.insert(pattern, Arc::clone(&entry))?;

        match replaced {
            Some(previous) => {
                warn!(
                    method = %method,
                    route_pattern = %pattern,
                    previous_handler = %previous.name,
                    handler_name = %entry.name,
                    "Route re-registered - replacing previous handler chain"
                );
                if let Some(slot) = self
                    .entries
                    .iter_mut()
                    .find(|e| Arc::ptr_eq(e, &previous))
                {
                    *slot = entry;
                }
            }
            None => {
                debug!(
                    method = %method,
                    route_pattern = %pattern,
                    handler_name = %entry.name,
                    chain_len = entry.chain.len(),
                    "Route registered"
                );
                self.entries.push(entry);
            }
        }
        Ok(())
    }

    pub fn route(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self, PatternError> {
        self.register(method, pattern, handler)?;
        Ok(self)
    }

    pub fn get(
        &mut self,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self, PatternError> {
        self.route(Method::GET, pattern, handler)
    }

    pub fn post(
        &mut self,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self, PatternError> {
        self.route(Method::POST, pattern, handler)
    }

    pub fn put(
        &mut self,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self, PatternError> {
        self.route(Method::PUT, pattern, handler)
    }

    pub fn patch(
        &mut self,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self, PatternError> {
        self.route(Method::PATCH, pattern, handler)
    }

    pub fn delete(
        &mut self,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self, PatternError> {
        self.route(Method::DELETE, pattern, handler)
    }

    pub fn head(
        &mut self,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self, PatternError> {
        self.route(Method::HEAD, pattern, handler)
    }

    pub fn options(
        &mut self,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self, PatternError> {
        self.route(Method::OPTIONS, pattern, handler)
    }

    /// Open a group of routes sharing `prefix` and group middleware.
    pub fn group(&mut self, prefix: &str) -> RouteGroup<'_> {
        RouteGroup::new(self, prefix)
    }

    /// Match a request to a route.
    ///
    /// `HEAD` requests fall back to the `GET` route when no `HEAD` route
    /// matches (unless disabled in [`RuntimeConfig`]). When the path is only
    /// registered under other methods the lookup reports them.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> RouteLookup {
        debug!(method = %method, path = %path, "Route match attempt");
        let match_start = Instant::now();

        let mut found = self.search(method, path);
        if found.is_none() && self.head_fallback && *method == Method::HEAD {
            found = self.search(&Method::GET, path);
        }

        let match_duration = match_start.elapsed();

        if let Some(route_match) = found {
            if match_duration > self.slow_match_threshold {
                warn!(
                    method = %method,
                    path = %path,
                    handler_name = %route_match.entry.name,
                    route_pattern = %route_match.entry.pattern,
                    path_params = ?route_match.params,
                    duration_us = match_duration.as_micros() as u64,
                    "Slow route matching detected"
                );
            } else {
                debug!(
                    method = %method,
                    path = %path,
                    handler_name = %route_match.entry.name,
                    route_pattern = %route_match.entry.pattern,
                    path_params = ?route_match.params,
                    duration_us = match_duration.as_micros() as u64,
                    "Route matched"
                );
            }
            return RouteLookup::Match(route_match);
        }

        let allowed: Vec<Method> = self
            .trees
            .iter()
            .filter(|(m, tree)| *m != method && tree.search(path).is_some())
            .map(|(m, _)| m.clone())
            .collect();

        if allowed.is_empty() {
            debug!(
                method = %method,
                path = %path,
                duration_us = match_duration.as_micros() as u64,
                "No route matched"
            );
            return RouteLookup::NotFound;
        }

        let allowed = AllowedMethods::with_implicit_head(allowed, self.head_fallback);
        debug!(
            method = %method,
            path = %path,
            allowed = %allowed.header_value(),
            "Path matched under other methods"
        );
        RouteLookup::MethodNotAllowed { allowed }
    }

    fn search(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let found = self.trees.get(method)?.search(path)?;
        Some(RouteMatch {
            entry: Arc::clone(found.value),
            params: found.params,
        })
    }

    /// Registered routes in registration order.
    #[must_use]
    pub fn routes(&self) -> &[Arc<RouteEntry>] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct registered path patterns, in registration order.
    ///
    /// Used to pre-register per-path counters in
    /// [`MetricsMiddleware`](crate::middleware::MetricsMiddleware).
    #[must_use]
    pub fn get_all_path_patterns(&self) -> Vec<String> {
        let mut patterns: Vec<String> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            if !patterns.iter().any(|p| p.as_str() == entry.pattern.as_ref()) {
                patterns.push(entry.pattern.to_string());
            }
        }
        patterns
    }

    /// Emit the routing table through `tracing`.
    pub fn dump_routes(&self) {
        info!(
            routes_count = self.entries.len(),
            middleware_count = self.middleware.len(),
            "Routing table"
        );
        for entry in &self.entries {
            info!(
                method = %entry.method,
                route_pattern = %entry.pattern,
                handler_name = %entry.name,
                chain_len = entry.chain.len(),
                "Route"
            );
        }
    }
}

#[cfg(test)]
mod unit {
    use super::*;
    use crate::dispatcher::endpoint;

    fn ok(name: &str) -> Arc<dyn Handler> {
        endpoint(name, |_ctx| Ok(()))
    }

    #[test]
    fn test_allowed_methods_adds_head_and_sorts() {
        let allowed = AllowedMethods::new(vec![Method::POST, Method::GET, Method::POST]);
        assert_eq!(allowed.methods(), &[Method::GET, Method::HEAD, Method::POST]);
        assert_eq!(allowed.header_value(), "GET, HEAD, POST");
    }

    #[test]
    fn test_reregister_replaces_in_place() {
        let mut router = Router::new();
        router.get("/a", ok("first")).unwrap();
        router.get("/b", ok("other")).unwrap();
        router.get("/a", ok("second")).unwrap();
        assert_eq!(router.len(), 2);
        assert_eq!(router.routes()[0].name.as_ref(), "second");
        let m = router.resolve(&Method::GET, "/a").into_match().unwrap();
        assert_eq!(m.entry.name.as_ref(), "second");
    }

    #[test]
    fn test_head_fallback_can_be_disabled() {
        let mut router = Router::with_config(&RuntimeConfig {
            head_fallback: false,
            ..RuntimeConfig::default()
        });
        router.get("/a", ok("get")).unwrap();
        match router.resolve(&Method::HEAD, "/a") {
            RouteLookup::MethodNotAllowed { allowed } => {
                assert!(!allowed.contains(&Method::HEAD));
                assert_eq!(allowed.header_value(), "GET");
            }
            other => panic!("expected MethodNotAllowed, got {other:?}"),
        }
        // other methods are refused with the same, HEAD-free Allow list
        match router.resolve(&Method::POST, "/a") {
            RouteLookup::MethodNotAllowed { allowed } => assert_eq!(allowed.header_value(), "GET"),
            other => panic!("expected MethodNotAllowed, got {other:?}"),
        }
    }

    #[test]
    fn test_global_middleware_prepended_only_to_later_routes() {
        let mut router = Router::new();
        router.get("/early", ok("early")).unwrap();
        router.add_middleware(ok("mw"));
        router.get("/late", ok("late")).unwrap();
        assert_eq!(router.routes()[0].chain.len(), 1);
        assert_eq!(router.routes()[1].chain.len(), 2);
        assert_eq!(router.routes()[1].chain[0].name(), "mw");
    }

    #[test]
    fn test_path_patterns_are_distinct() {
        let mut router = Router::new();
        router.get("/items/:id", ok("get")).unwrap();
        router.delete("/items/:id", ok("delete")).unwrap();
        router.get("/health", ok("health")).unwrap();
        assert_eq!(router.get_all_path_patterns(), vec!["/items/:id", "/health"]);
    }
}
